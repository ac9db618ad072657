//! Source Registry
//!
//! Latest tab list per source (browser instance/profile). Every push replaces
//! that source's list wholesale; other sources are never touched. Sources stay
//! in the order they were first seen, which is also the order of the merged view.

use crate::tab::{OpaqueId, Snapshot, Tab};
use crate::UNKNOWN_BROWSER;

/// URL markers that identify the real browser behind an `"Unknown"` source.
const UNKNOWN_SOURCE_MARKERS: &[(&str, &str)] = &[
    ("chrome-extension://", "Chrome"),
    ("brave-extension://", "Brave"),
    ("moz-extension://", "Firefox"),
];

#[derive(Debug, Clone)]
struct SourceEntry {
    browser: String,
    tabs: Vec<Tab>,
}

#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<SourceEntry>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole tab list of `browser`.
    ///
    /// Each tab is stamped with its owning label; tabs pushed by an `"Unknown"`
    /// source are upgraded when their URL carries a known extension origin.
    pub fn replace_tabs(&mut self, browser: &str, tabs: Vec<Tab>) {
        let tabs: Vec<Tab> = tabs
            .into_iter()
            .map(|mut tab| {
                tab.browser = Some(label_for(browser, &tab.url).to_string());
                tab
            })
            .collect();

        match self.sources.iter_mut().find(|s| s.browser == browser) {
            Some(entry) => entry.tabs = tabs,
            None => self.sources.push(SourceEntry {
                browser: browser.to_string(),
                tabs,
            }),
        }
    }

    /// Concatenation of all sources' tabs plus the source keys seen so far.
    pub fn merged_snapshot(&self) -> Snapshot {
        Snapshot {
            tabs: self
                .sources
                .iter()
                .flat_map(|s| s.tabs.iter().cloned())
                .collect(),
            browsers: self.source_names().map(str::to_string).collect(),
        }
    }

    /// Key of the source owning `tab_id`.
    ///
    /// This is the name the source pushed under, not the per-tab label, so an
    /// `"Unknown"` source stays `"Unknown"` here. Ids are only unique per
    /// source, so a collision resolves to the first source in first-seen order.
    /// This can pick the wrong browser; callers have no way to disambiguate
    /// since activation requests carry no source.
    pub fn find_owner(&self, tab_id: &OpaqueId) -> Option<&str> {
        self.sources
            .iter()
            .find(|s| s.tabs.iter().any(|t| &t.id == tab_id))
            .map(|s| s.browser.as_str())
    }

    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.browser.as_str())
    }

    #[cfg(test)]
    pub(crate) fn tabs_for(&self, browser: &str) -> Option<&[Tab]> {
        self.sources
            .iter()
            .find(|s| s.browser == browser)
            .map(|s| s.tabs.as_slice())
    }

    pub fn tab_count(&self) -> usize {
        self.sources.iter().map(|s| s.tabs.len()).sum()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn label_for<'a>(browser: &'a str, url: &str) -> &'a str {
    if browser != UNKNOWN_BROWSER {
        return browser;
    }
    UNKNOWN_SOURCE_MARKERS
        .iter()
        .find(|(marker, _)| url.contains(marker))
        .map(|(_, label)| *label)
        .unwrap_or(browser)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tab(id: i64, window: i64, title: &str, url: &str) -> Tab {
        Tab::new(id, title, url).with_window(window)
    }

    #[test]
    fn test_colliding_ids_across_sources() {
        let mut registry = SourceRegistry::new();
        registry.replace_tabs("Chrome", vec![tab(1, 10, "A", "http://a")]);
        registry.replace_tabs("Brave", vec![tab(1, 20, "B", "http://b")]);

        let snapshot = registry.merged_snapshot();
        assert_eq!(snapshot.tabs.len(), 2);
        assert_eq!(snapshot.tabs[0].title, "A");
        assert_eq!(snapshot.tabs[0].browser.as_deref(), Some("Chrome"));
        assert_eq!(snapshot.tabs[1].title, "B");
        assert_eq!(snapshot.tabs[1].browser.as_deref(), Some("Brave"));
        assert_eq!(snapshot.browsers, vec!["Chrome", "Brave"]);
    }

    #[test]
    fn test_replace_is_idempotent() {
        let mut registry = SourceRegistry::new();
        let tabs = vec![tab(1, 10, "A", "http://a"), tab(2, 10, "B", "http://b")];

        registry.replace_tabs("Firefox", tabs.clone());
        let first = registry.merged_snapshot();
        registry.replace_tabs("Firefox", tabs);
        assert_eq!(registry.merged_snapshot(), first);
    }

    #[test]
    fn test_push_leaves_other_sources_alone() {
        let mut registry = SourceRegistry::new();
        registry.replace_tabs("Chrome", vec![tab(1, 10, "A", "http://a")]);
        registry.replace_tabs("Firefox", vec![tab(5, 50, "F", "http://f")]);
        registry.replace_tabs("Chrome", vec![tab(2, 10, "A2", "http://a2")]);

        let firefox = registry.tabs_for("Firefox").unwrap();
        assert_eq!(firefox.len(), 1);
        assert_eq!(firefox[0].title, "F");

        let snapshot = registry.merged_snapshot();
        let titles: Vec<&str> = snapshot.tabs.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["A2", "F"]);
        // Chrome keeps its first-seen position
        assert_eq!(snapshot.browsers, vec!["Chrome", "Firefox"]);
    }

    #[test]
    fn test_empty_push_clears_only_that_source() {
        let mut registry = SourceRegistry::new();
        registry.replace_tabs("Chrome", vec![tab(1, 10, "A", "http://a")]);
        registry.replace_tabs("Edge", vec![tab(3, 30, "E", "http://e")]);
        registry.replace_tabs("Chrome", Vec::new());

        let snapshot = registry.merged_snapshot();
        assert_eq!(snapshot.tabs.len(), 1);
        assert_eq!(snapshot.browsers, vec!["Chrome", "Edge"]);
    }

    #[test]
    fn test_browser_label_is_forced() {
        let mut registry = SourceRegistry::new();
        let mut lying = tab(1, 10, "A", "http://a");
        lying.browser = Some("Firefox".to_string());
        registry.replace_tabs("Opera GX", vec![lying]);

        let snapshot = registry.merged_snapshot();
        assert_eq!(snapshot.tabs[0].browser.as_deref(), Some("Opera GX"));
    }

    #[test]
    fn test_unknown_source_reclassified_by_url() {
        let mut registry = SourceRegistry::new();
        registry.replace_tabs(
            "Unknown",
            vec![
                tab(1, 10, "Options", "chrome-extension://abcdef/options.html"),
                tab(2, 10, "Page", "https://example.com"),
            ],
        );

        let snapshot = registry.merged_snapshot();
        assert_eq!(snapshot.tabs[0].browser.as_deref(), Some("Chrome"));
        assert_eq!(snapshot.tabs[1].browser.as_deref(), Some("Unknown"));
        assert_eq!(snapshot.browsers, vec!["Unknown"]);
    }

    #[test]
    fn test_known_source_never_reclassified() {
        let mut registry = SourceRegistry::new();
        registry.replace_tabs(
            "Edge",
            vec![tab(1, 10, "Ext", "chrome-extension://abcdef/popup.html")],
        );
        assert_eq!(
            registry.merged_snapshot().tabs[0].browser.as_deref(),
            Some("Edge")
        );
    }

    #[test]
    fn test_find_owner_first_source_wins() {
        let mut registry = SourceRegistry::new();
        registry.replace_tabs("Chrome", vec![tab(1, 10, "A", "http://a")]);
        registry.replace_tabs(
            "Firefox",
            vec![tab(1, 20, "B", "http://b"), tab(2, 20, "C", "http://c")],
        );

        assert_eq!(registry.find_owner(&OpaqueId::Number(1)), Some("Chrome"));
        assert_eq!(registry.find_owner(&OpaqueId::Number(2)), Some("Firefox"));
        assert_eq!(registry.find_owner(&OpaqueId::Number(3)), None);
    }

    #[test]
    fn test_find_owner_returns_source_key() {
        let mut registry = SourceRegistry::new();
        registry.replace_tabs(
            "Unknown",
            vec![tab(9, 10, "Ext", "chrome-extension://abc/p.html")],
        );
        // The tab is labelled Chrome, but it was pushed under "Unknown"
        assert_eq!(
            registry.merged_snapshot().tabs[0].browser.as_deref(),
            Some("Chrome")
        );
        assert_eq!(registry.find_owner(&OpaqueId::Number(9)), Some("Unknown"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = SourceRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.merged_snapshot().is_empty());
        assert_eq!(registry.tab_count(), 0);
    }
}
