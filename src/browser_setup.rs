//! Chrome/Chromium discovery for the browser backend.
//!
//! Looks for an installed browser in the `CHROME` environment variable, then
//! on `PATH`, then in the usual install locations for the platform.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{Result, SearchError};

/// Well-known Chrome/Chromium executable paths per platform.
#[cfg(target_os = "macos")]
const KNOWN_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(all(unix, not(target_os = "macos")))]
const KNOWN_PATHS: &[&str] = &[
    "/opt/google/chrome/chrome",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

#[cfg(windows)]
const KNOWN_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

/// Command names searched on `PATH`.
const KNOWN_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

fn existing(path: impl AsRef<Path>) -> Option<PathBuf> {
    let path = path.as_ref();
    path.exists().then(|| path.to_path_buf())
}

/// Detect an existing Chrome/Chromium installation.
///
/// Returns `None` when nothing usable is found. A `CHROME` value pointing at
/// a missing file is ignored rather than trusted.
pub fn detect_chrome() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("CHROME").and_then(existing) {
        debug!("Chrome found via CHROME env var: {}", path.display());
        return Some(path);
    }

    for cmd in KNOWN_COMMANDS {
        if let Ok(path) = which::which(cmd) {
            debug!("Chrome found in PATH: {}", path.display());
            return Some(path);
        }
    }

    KNOWN_PATHS.iter().find_map(|p| existing(p)).inspect(|path| {
        debug!("Chrome found at known path: {}", path.display());
    })
}

/// Returns the Chrome executable to launch, or a browser error explaining
/// how to point at one.
pub fn ensure_chrome() -> Result<PathBuf> {
    match detect_chrome() {
        Some(path) => {
            info!("Using system Chrome: {}", path.display());
            Ok(path)
        }
        None => Err(SearchError::Browser(
            "No Chrome/Chromium installation found; install one or set CHROME".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_paths_not_empty() {
        assert!(!KNOWN_PATHS.is_empty());
        assert!(!KNOWN_COMMANDS.is_empty());
    }

    #[test]
    fn test_existing_filters_missing_paths() {
        assert!(existing("/nonexistent/chrome/binary").is_none());
        let here = std::env::current_dir().unwrap();
        assert_eq!(existing(&here), Some(here.clone()));
    }

    #[test]
    fn test_detect_chrome_result_exists() {
        // Environment dependent: only assert on what was found.
        if let Some(path) = detect_chrome() {
            assert!(path.exists());
        }
    }

    #[test]
    fn test_ensure_chrome_matches_detection() {
        match (detect_chrome(), ensure_chrome()) {
            (Some(found), Ok(path)) => assert_eq!(found, path),
            (None, Err(SearchError::Browser(msg))) => assert!(msg.contains("CHROME")),
            (found, result) => panic!("mismatch: {:?} vs {:?}", found, result.is_ok()),
        }
    }
}
