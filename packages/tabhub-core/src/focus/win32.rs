//! Windows back end: walk top-level windows with `EnumWindows`, stop at the
//! first one matching the browser pattern, then restore and raise it.

use tracing::{debug, info};
use windows::Win32::Foundation::{BOOL, FALSE, HWND, LPARAM, TRUE};
use windows::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, EnumWindows, GetClassNameW, GetWindowTextLengthW, GetWindowTextW, IsIconic,
    IsWindowVisible, SetForegroundWindow, ShowWindow, SW_RESTORE,
};

use super::{combine_raise, pattern_for, BrowserPattern, WindowCandidate, WindowFocuser};
use crate::error::FocusError;

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Focuser;

impl WindowFocuser for Win32Focuser {
    fn focus(&self, source: &str) -> bool {
        let pattern = pattern_for(source);
        // SAFETY: the search state outlives the EnumWindows call that borrows it
        let found = unsafe { find_window(&pattern) };

        let Some(hwnd) = found else {
            debug!(browser = %source, "no matching browser window");
            return false;
        };

        let (foreground, top) = unsafe { raise(hwnd) };
        let raised = combine_raise(source, foreground, top);
        if raised {
            info!(browser = %source, "raised browser window");
        }
        raised
    }
}

struct Search<'a> {
    pattern: &'a BrowserPattern,
    found: Option<HWND>,
}

unsafe fn find_window(pattern: &BrowserPattern) -> Option<HWND> {
    let mut search = Search {
        pattern,
        found: None,
    };
    // Returns an error when the callback stops the walk early; the result lives in `search`
    let _ = EnumWindows(
        Some(enum_windows_cb),
        LPARAM(&mut search as *mut Search as isize),
    );
    search.found
}

unsafe extern "system" fn enum_windows_cb(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let search = &mut *(lparam.0 as *mut Search);
    if search.pattern.matches(&describe(hwnd)) {
        search.found = Some(hwnd);
        return FALSE;
    }
    TRUE
}

unsafe fn describe(hwnd: HWND) -> WindowCandidate {
    let visible = IsWindowVisible(hwnd).as_bool();

    let len = GetWindowTextLengthW(hwnd);
    let title = if len > 0 {
        let mut buf = vec![0u16; len as usize + 1];
        let copied = GetWindowTextW(hwnd, &mut buf);
        String::from_utf16_lossy(&buf[..copied.max(0) as usize])
    } else {
        String::new()
    };

    let mut class_buf = [0u16; 256];
    let class_len = GetClassNameW(hwnd, &mut class_buf);
    let class = (class_len > 0)
        .then(|| String::from_utf16_lossy(&class_buf[..class_len as usize]));

    WindowCandidate {
        title,
        class,
        visible,
    }
}

/// Restore if minimized, then attempt both the foreground switch and the
/// z-order raise. The second runs even when the first is refused.
unsafe fn raise(hwnd: HWND) -> (Result<(), FocusError>, Result<(), FocusError>) {
    if IsIconic(hwnd).as_bool() {
        let _ = ShowWindow(hwnd, SW_RESTORE);
    }

    let foreground = if SetForegroundWindow(hwnd).as_bool() {
        Ok(())
    } else {
        Err(FocusError::Platform(
            "SetForegroundWindow refused the request".to_string(),
        ))
    };
    let top = BringWindowToTop(hwnd).map_err(|e| FocusError::Platform(e.to_string()));

    (foreground, top)
}
