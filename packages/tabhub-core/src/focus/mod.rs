//! Window Focus Adapter
//!
//! Raises the top-level OS window of a browser, identified only by the source
//! label its extension reported. Matching is heuristic:
//! - the window must be visible
//! - its title must be longer than a bare browser name (rejects splash windows)
//! - its title must contain one of the browser's markers (case-insensitive)
//! - when the platform reports a window class, it must look like the browser's
//!
//! The first window in OS enumeration order wins, which is not necessarily the
//! most recently used one.
//!
//! Back ends:
//! - `win32` - `EnumWindows` on Windows
//! - `wmctrl` - X11 window managers through the `wmctrl` tool
//! - `macos` - `osascript` application activation

#[cfg(target_os = "macos")]
mod macos;
#[cfg(windows)]
mod win32;
#[cfg(all(unix, not(target_os = "macos")))]
mod wmctrl;

use std::sync::Arc;

use crate::error::FocusError;

/// Titles of this length or shorter are placeholder windows ("Brave", "Opera").
pub const MIN_TITLE_LEN: usize = 5;

/// Brings a browser's window to the foreground.
///
/// Implementations block; the hub runs them on the blocking thread pool.
pub trait WindowFocuser: Send + Sync {
    /// Returns whether a window was found and raised. Failures are logged, not returned.
    fn focus(&self, source: &str) -> bool;
}

/// How to recognise a browser's top-level window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserPattern {
    pub title_markers: Vec<String>,
    /// Win32 class names and X11 WM_CLASS fragments; empty means "don't check"
    pub window_classes: Vec<String>,
    /// Application name for platforms that activate apps rather than windows
    pub app_name: String,
}

struct KnownBrowser {
    name: &'static str,
    title_markers: &'static [&'static str],
    window_classes: &'static [&'static str],
    app_name: &'static str,
}

const CHROMIUM_CLASS: &str = "Chrome_WidgetWin_1";

const KNOWN_BROWSERS: &[KnownBrowser] = &[
    KnownBrowser {
        name: "Chrome",
        title_markers: &["Google Chrome", "Chrome"],
        window_classes: &[CHROMIUM_CLASS, "google-chrome", "chromium"],
        app_name: "Google Chrome",
    },
    KnownBrowser {
        name: "Firefox",
        title_markers: &["Mozilla Firefox", "Firefox"],
        window_classes: &["MozillaWindowClass", "firefox", "navigator"],
        app_name: "Firefox",
    },
    KnownBrowser {
        name: "Brave",
        title_markers: &["Brave"],
        window_classes: &[CHROMIUM_CLASS, "brave"],
        app_name: "Brave Browser",
    },
    KnownBrowser {
        name: "Opera",
        title_markers: &["Opera"],
        window_classes: &[CHROMIUM_CLASS, "opera"],
        app_name: "Opera",
    },
    KnownBrowser {
        name: "Opera GX",
        title_markers: &["Opera GX"],
        window_classes: &[CHROMIUM_CLASS, "opera"],
        app_name: "Opera GX",
    },
    KnownBrowser {
        name: "Edge",
        title_markers: &["Microsoft Edge", "Edge"],
        window_classes: &[CHROMIUM_CLASS, "microsoft-edge", "msedge"],
        app_name: "Microsoft Edge",
    },
];

/// Pattern for a source label. Unlisted sources match on their own name.
pub fn pattern_for(source: &str) -> BrowserPattern {
    match KNOWN_BROWSERS.iter().find(|b| b.name == source) {
        Some(known) => BrowserPattern {
            title_markers: owned(known.title_markers),
            window_classes: owned(known.window_classes),
            app_name: known.app_name.to_string(),
        },
        None => BrowserPattern {
            title_markers: vec![source.to_string()],
            window_classes: Vec::new(),
            app_name: source.to_string(),
        },
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// What a back end knows about one top-level window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowCandidate {
    pub title: String,
    pub class: Option<String>,
    pub visible: bool,
}

impl BrowserPattern {
    pub fn matches(&self, window: &WindowCandidate) -> bool {
        if !window.visible {
            return false;
        }
        if window.title.trim().chars().count() <= MIN_TITLE_LEN {
            return false;
        }

        let title = window.title.to_lowercase();
        if !self
            .title_markers
            .iter()
            .any(|m| title.contains(&m.to_lowercase()))
        {
            return false;
        }

        match &window.class {
            Some(class) if !self.window_classes.is_empty() => {
                let class = class.to_lowercase();
                self.window_classes
                    .iter()
                    .any(|c| class.contains(&c.to_lowercase()))
            }
            _ => true,
        }
    }
}

/// First window (in enumeration order) matching `pattern`.
pub fn select_window<H>(
    pattern: &BrowserPattern,
    windows: impl IntoIterator<Item = (H, WindowCandidate)>,
) -> Option<H> {
    windows
        .into_iter()
        .find(|(_, window)| pattern.matches(window))
        .map(|(handle, _)| handle)
}

/// Outcome of raising a found window in two steps (foreground switch, then
/// z-order). Failures are logged; either step landing counts as raised.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn combine_raise(
    source: &str,
    foreground: Result<(), FocusError>,
    top: Result<(), FocusError>,
) -> bool {
    for (step, result) in [("foreground", &foreground), ("z-order", &top)] {
        if let Err(e) = result {
            tracing::warn!(browser = %source, step, "window raise step failed: {}", e);
        }
    }
    foreground.is_ok() || top.is_ok()
}

/// Focuser for targets without a supported window manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedFocuser;

impl WindowFocuser for UnsupportedFocuser {
    fn focus(&self, source: &str) -> bool {
        tracing::debug!(browser = %source, "window focus not supported on this platform");
        false
    }
}

/// The focuser for the platform this binary was built for.
pub fn platform_focuser() -> Arc<dyn WindowFocuser> {
    #[cfg(windows)]
    return Arc::new(win32::Win32Focuser);

    #[cfg(target_os = "macos")]
    return Arc::new(macos::OsascriptFocuser);

    #[cfg(all(unix, not(target_os = "macos")))]
    return Arc::new(wmctrl::WmctrlFocuser);

    #[cfg(not(any(windows, unix)))]
    return Arc::new(UnsupportedFocuser);
}
