use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier assigned by a browser (tab id, window id).
///
/// Only unique within the source that issued it. Chromium and Firefox send
/// integers; anything else is carried as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpaqueId {
    Number(i64),
    Text(String),
}

impl fmt::Display for OpaqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpaqueId::Number(n) => write!(f, "{}", n),
            OpaqueId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for OpaqueId {
    fn from(n: i64) -> Self {
        OpaqueId::Number(n)
    }
}

impl From<&str> for OpaqueId {
    fn from(s: &str) -> Self {
        OpaqueId::Text(s.to_string())
    }
}

/// A browser tab as pushed by an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: OpaqueId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<OpaqueId>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    /// Owning source label, stamped by the registry. Whatever the extension sent is discarded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
}

impl Tab {
    pub fn new(id: impl Into<OpaqueId>, title: &str, url: &str) -> Self {
        Self {
            id: id.into(),
            window_id: None,
            title: title.to_string(),
            url: url.to_string(),
            fav_icon_url: None,
            browser: None,
        }
    }

    pub fn with_window(mut self, window_id: impl Into<OpaqueId>) -> Self {
        self.window_id = Some(window_id.into());
        self
    }
}

// Extensions send `"title": null` for tabs that are still loading
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Merged view of every source's tabs at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// All tabs, grouped by source in first-seen order, each stamped with `browser`
    pub tabs: Vec<Tab>,
    /// Source keys in first-seen order (for the popup's filter)
    pub browsers: Vec<String>,
}

impl Snapshot {
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.tabs.is_empty() && self.browsers.is_empty()
    }
}
