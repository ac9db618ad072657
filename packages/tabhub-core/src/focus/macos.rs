//! macOS back end.
//!
//! Window titles are not readable without accessibility permission, so this
//! activates the browser application instead: `reopen` restores a minimized
//! window and `activate` brings the app to the front. Browsers that are not
//! running are left alone.

use std::process::Command;

use tracing::{debug, info, warn};

use super::{pattern_for, WindowFocuser};
use crate::error::FocusError;

const OSASCRIPT: &str = "osascript";

#[derive(Debug, Default, Clone, Copy)]
pub struct OsascriptFocuser;

impl WindowFocuser for OsascriptFocuser {
    fn focus(&self, source: &str) -> bool {
        let app = pattern_for(source).app_name;
        match activate_app(&app) {
            Ok(true) => {
                info!(browser = %source, app = %app, "activated browser");
                true
            }
            Ok(false) => {
                debug!(browser = %source, app = %app, "browser is not running");
                false
            }
            Err(e) => {
                warn!(browser = %source, "window focus failed: {}", e);
                false
            }
        }
    }
}

fn activate_script(app: &str) -> String {
    let app = app.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        r#"if application "{app}" is running then
    tell application "{app}"
        reopen
        activate
    end tell
    return "true"
end if
return "false""#
    )
}

fn activate_app(app: &str) -> Result<bool, FocusError> {
    let output = Command::new(OSASCRIPT)
        .arg("-e")
        .arg(activate_script(app))
        .output()
        .map_err(|source| FocusError::Spawn {
            program: OSASCRIPT,
            source,
        })?;

    if !output.status.success() {
        return Err(FocusError::CommandFailed {
            program: OSASCRIPT,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim() == "true")
}
