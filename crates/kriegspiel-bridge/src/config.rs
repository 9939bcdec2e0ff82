//! Bridge configuration

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the logical library name
pub const LIBRARY_ENV: &str = "KRIEGSPIEL_LIBRARY";

/// Environment variable naming the directory to load the library from
pub const LIBRARY_PATH_ENV: &str = "KRIEGSPIEL_LIBRARY_PATH";

/// Variable the platform loader searches when no directory is configured
#[cfg(target_os = "macos")]
pub const PLATFORM_SEARCH_ENV: &str = "DYLD_LIBRARY_PATH";
#[cfg(windows)]
pub const PLATFORM_SEARCH_ENV: &str = "PATH";
#[cfg(not(any(target_os = "macos", windows)))]
pub const PLATFORM_SEARCH_ENV: &str = "LD_LIBRARY_PATH";

/// Configuration for loading and registering the native agent
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Logical library name: no path, no extension, no `lib` prefix
    pub library_name: String,
    /// Directory to load from; `None` defers to the platform loader
    pub search_path: Option<PathBuf>,
    /// Name the agent is registered under
    pub display_name: String,
    /// Slack the watchdog allows past `max_seconds`
    pub watchdog_grace: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            library_name: "kriegspiel_agent".into(),
            search_path: None,
            display_name: "Kriegspiel Native Agent".into(),
            watchdog_grace: Duration::from_millis(250),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by `KRIEGSPIEL_LIBRARY` and `KRIEGSPIEL_LIBRARY_PATH`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(name) = lookup(LIBRARY_ENV).filter(|v| !v.is_empty()) {
            config.library_name = name;
        }
        if let Some(dir) = lookup(LIBRARY_PATH_ENV).filter(|v| !v.is_empty()) {
            config.search_path = Some(PathBuf::from(dir));
        }
        config
    }

    /// Search path as reported in load diagnostics
    pub fn describe_search_path(&self) -> String {
        match &self.search_path {
            Some(dir) => std::path::absolute(dir)
                .unwrap_or_else(|_| dir.clone())
                .display()
                .to_string(),
            None => match std::env::var(PLATFORM_SEARCH_ENV) {
                Ok(value) if !value.is_empty() => format!("{}={}", PLATFORM_SEARCH_ENV, value),
                _ => format!("{} (unset)", PLATFORM_SEARCH_ENV),
            },
        }
    }
}
