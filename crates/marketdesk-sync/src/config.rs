//! # Console Configuration
//!
//! Configuration for the workspace engine: where the REST API lives, store
//! timings, and the demo-mode knobs.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MARKETDESK_API_URL=https://admin.example.com                        │
//! │     MARKETDESK_DEMO_URL=http://localhost:5173/admin?demo=1              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/console/console.toml (Linux)                             │
//! │     ~/Library/Application Support/com.marketdesk.console/console.toml  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     localhost API, 350ms search debounce, 200-300ms demo latency       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # console.toml
//! [api]
//! base_url = "https://admin.example.com"
//! timeout_secs = 30
//! session_cookie = "session=abc123"
//!
//! [workspace]
//! search_debounce_ms = 350
//! notice_ttl_ms = 4000
//!
//! [demo]
//! query_flag = "demo"
//! min_delay_ms = 200
//! max_delay_ms = 300
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{WorkspaceError, WorkspaceResult};

// =============================================================================
// API Settings
// =============================================================================

/// Where the admin REST API lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Origin the module roots (`/api/admin/rentals`, ...) are joined onto.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Session cookie (`name=value`) seeded into the cookie jar.
    ///
    /// The browser console relies on its ambient session; the preview
    /// binary and tests have none, so one can be supplied here.
    #[serde(default)]
    pub session_cookie: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            session_cookie: None,
        }
    }
}

// =============================================================================
// Workspace Settings
// =============================================================================

/// Store timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    /// Quiet period after the last search keystroke before refetching.
    #[serde(default = "default_search_debounce")]
    pub search_debounce_ms: u64,

    /// How long a mutation notice stays visible.
    #[serde(default = "default_notice_ttl")]
    pub notice_ttl_ms: u64,
}

fn default_search_debounce() -> u64 {
    350
}

fn default_notice_ttl() -> u64 {
    4_000
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        WorkspaceSettings {
            search_debounce_ms: default_search_debounce(),
            notice_ttl_ms: default_notice_ttl(),
        }
    }
}

// =============================================================================
// Demo Settings
// =============================================================================

/// Demo-mode gate and simulated latency.
///
/// ## Activation
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  debug build?  ──no──► remote backend                                   │
/// │      │ yes                                                              │
/// │      ▼                                                                  │
/// │  launch URL has ?<query_flag>=1|true|yes|on ?  ──no──► remote backend  │
/// │      │ yes                                                              │
/// │      ▼                                                                  │
/// │  demo backend (seeded fixtures, min..=max delay per call)              │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSettings {
    /// Query parameter that opts in.
    #[serde(default = "default_query_flag")]
    pub query_flag: String,

    /// URL the console was launched with (normally from the environment).
    #[serde(default)]
    pub launch_url: Option<String>,

    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_query_flag() -> String {
    "demo".to_string()
}

fn default_min_delay() -> u64 {
    200
}

fn default_max_delay() -> u64 {
    300
}

impl Default for DemoSettings {
    fn default() -> Self {
        DemoSettings {
            query_flag: default_query_flag(),
            launch_url: None,
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

// =============================================================================
// Main Console Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub workspace: WorkspaceSettings,

    #[serde(default)]
    pub demo: DemoSettings,
}

impl ConsoleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (console.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> WorkspaceResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading console config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load console config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> WorkspaceResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| WorkspaceError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WorkspaceError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| WorkspaceError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Console config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> WorkspaceResult<()> {
        let base = Url::parse(&self.api.base_url)?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(WorkspaceError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(WorkspaceError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.demo.query_flag.trim().is_empty() {
            return Err(WorkspaceError::InvalidConfig(
                "demo query_flag must not be empty".into(),
            ));
        }

        if self.demo.min_delay_ms > self.demo.max_delay_ms {
            return Err(WorkspaceError::InvalidConfig(format!(
                "demo min_delay_ms ({}) exceeds max_delay_ms ({})",
                self.demo.min_delay_ms, self.demo.max_delay_ms
            )));
        }

        if let Some(cookie) = &self.api.session_cookie {
            if !cookie.contains('=') {
                return Err(WorkspaceError::InvalidConfig(
                    "session_cookie must look like name=value".into(),
                ));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `MARKETDESK_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("MARKETDESK_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(timeout) = lookup("MARKETDESK_API_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.api.timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring non-numeric MARKETDESK_API_TIMEOUT_SECS"),
            }
        }

        if let Some(cookie) = lookup("MARKETDESK_SESSION_COOKIE") {
            self.api.session_cookie = Some(cookie);
        }

        if let Some(debounce) = lookup("MARKETDESK_SEARCH_DEBOUNCE_MS") {
            match debounce.parse::<u64>() {
                Ok(ms) => self.workspace.search_debounce_ms = ms,
                Err(_) => warn!(value = %debounce, "Ignoring non-numeric MARKETDESK_SEARCH_DEBOUNCE_MS"),
            }
        }

        if let Some(url) = lookup("MARKETDESK_DEMO_URL") {
            debug!(url = %url, "Launch URL from environment");
            self.demo.launch_url = Some(url);
        }

        if let Some(flag) = lookup("MARKETDESK_DEMO_FLAG") {
            self.demo.query_flag = flag;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "marketdesk", "console")
            .map(|dirs| dirs.config_dir().join("console.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.workspace.search_debounce_ms)
    }

    /// Inclusive demo latency window.
    pub fn demo_delay(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.demo.min_delay_ms),
            Duration::from_millis(self.demo.max_delay_ms),
        )
    }
}
