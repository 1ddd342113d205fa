//! Locating the adb executable

use std::path::{Path, PathBuf};

/// Resolved adb executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbTool {
    pub path: PathBuf,
    /// False when nothing was found and `path` is the bare fallback name
    pub found: bool,
}

impl AdbTool {
    /// Resolve adb, preferring an explicitly configured path
    ///
    /// Lookup order: configured path, `PATH`, `$ANDROID_HOME/platform-tools`,
    /// `$ANDROID_SDK_ROOT/platform-tools`. Falls back to plain `adb` so the
    /// runner still produces a clear not-found error.
    pub fn locate(configured: Option<&Path>) -> Self {
        if let Some(path) = configured {
            return Self {
                path: path.to_path_buf(),
                found: path.exists(),
            };
        }

        for candidate in Self::candidate_paths() {
            if let Ok(resolved) = which::which(&candidate) {
                tracing::debug!("Using adb at {}", resolved.display());
                return Self {
                    path: resolved,
                    found: true,
                };
            }
        }

        tracing::debug!("adb not found in PATH or Android SDK locations");
        Self {
            path: PathBuf::from("adb"),
            found: false,
        }
    }

    /// Get list of paths to try for the adb command
    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("adb")];

        for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
            if let Ok(sdk) = std::env::var(var) {
                paths.push(Path::new(&sdk).join("platform-tools").join("adb"));
            }
        }

        paths
    }

    /// Get user-friendly message for a missing adb
    pub fn unavailable_message(&self) -> Option<&'static str> {
        if self.found {
            None
        } else {
            Some("adb not found. Install Android platform-tools or set [adb] path in the config.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_configured_path_wins() {
        let tool = AdbTool::locate(Some(Path::new("/opt/platform-tools/adb")));
        assert_eq!(tool.path, PathBuf::from("/opt/platform-tools/adb"));
    }

    #[test]
    #[serial]
    fn test_candidate_paths_include_android_home() {
        std::env::set_var("ANDROID_HOME", "/test/android");
        let paths = AdbTool::candidate_paths();
        assert!(paths
            .iter()
            .any(|p| p == Path::new("/test/android/platform-tools/adb")));
        std::env::remove_var("ANDROID_HOME");
    }

    #[test]
    #[serial]
    fn test_candidate_paths_include_default() {
        let paths = AdbTool::candidate_paths();
        assert_eq!(paths[0], PathBuf::from("adb"));
    }

    #[test]
    fn test_unavailable_message() {
        let missing = AdbTool {
            path: PathBuf::from("adb"),
            found: false,
        };
        assert!(missing.unavailable_message().is_some());

        let present = AdbTool {
            path: PathBuf::from("/usr/bin/adb"),
            found: true,
        };
        assert!(present.unavailable_message().is_none());
    }
}
