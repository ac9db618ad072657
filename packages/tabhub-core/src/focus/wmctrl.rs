//! X11 back end driven by `wmctrl`.
//!
//! `wmctrl -lx` lists managed top-level windows in stacking order:
//! `<id> <desktop> <wm_class> <host> <title...>`. `wmctrl -i -a <id>` switches
//! to the window's desktop, de-iconifies it and raises it.

use std::process::Command;

use tracing::{debug, info, warn};

use super::{pattern_for, select_window, WindowCandidate, WindowFocuser};
use crate::error::FocusError;

const WMCTRL: &str = "wmctrl";

#[derive(Debug, Default, Clone, Copy)]
pub struct WmctrlFocuser;

impl WindowFocuser for WmctrlFocuser {
    fn focus(&self, source: &str) -> bool {
        match focus_source(source) {
            Ok(Some(id)) => {
                info!(browser = %source, window = %id, "raised browser window");
                true
            }
            Ok(None) => {
                debug!(browser = %source, "no matching browser window");
                false
            }
            Err(e) => {
                warn!(browser = %source, "window focus failed: {}", e);
                false
            }
        }
    }
}

fn focus_source(source: &str) -> Result<Option<String>, FocusError> {
    let listing = run_wmctrl(&["-l", "-x"])?;
    let pattern = pattern_for(source);
    let Some(id) = select_window(&pattern, parse_window_list(&listing)) else {
        return Ok(None);
    };
    run_wmctrl(&["-i", "-a", &id])?;
    Ok(Some(id))
}

fn run_wmctrl(args: &[&str]) -> Result<String, FocusError> {
    let output = Command::new(WMCTRL)
        .args(args)
        .output()
        .map_err(|source| FocusError::Spawn {
            program: WMCTRL,
            source,
        })?;

    if !output.status.success() {
        return Err(FocusError::CommandFailed {
            program: WMCTRL,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Parse `wmctrl -lx` output into (window id, candidate) pairs.
///
/// wmctrl only lists managed windows, so every entry counts as visible.
pub(crate) fn parse_window_list(listing: &str) -> Vec<(String, WindowCandidate)> {
    listing
        .lines()
        .filter_map(|line| {
            let mut rest = line;
            let id = next_field(&mut rest)?;
            let _desktop = next_field(&mut rest)?;
            let class = next_field(&mut rest)?;
            let _host = next_field(&mut rest)?;
            Some((
                id.to_string(),
                WindowCandidate {
                    title: rest.trim().to_string(),
                    class: Some(class.to_string()),
                    visible: true,
                },
            ))
        })
        .collect()
}

fn next_field<'a>(rest: &mut &'a str) -> Option<&'a str> {
    let trimmed = rest.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    let (field, tail) = trimmed.split_at(end);
    *rest = tail;
    Some(field)
}
