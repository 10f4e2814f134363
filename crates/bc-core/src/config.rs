//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML. Every section
//! defaults sensibly so a completely empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub library: LibraryConfig,
    pub feed: FeedConfig,
    pub watch: WatchConfig,
    pub transcode: TranscodeConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Validate the configuration, returning a list of warnings.
    ///
    /// Warnings are non-fatal; the caller decides whether to log or abort.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if let Some(url) = &self.server.public_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                warnings.push(format!("server.public_url '{url}' is not an http(s) URL"));
            }
        }

        if self.library.roots.is_empty() {
            warnings.push("library.roots is empty; no books will be served".into());
        }

        for (i, root) in self.library.roots.iter().enumerate() {
            if !root.is_dir() {
                warnings.push(format!(
                    "library.roots[{i}] ({}) is not a directory",
                    root.display()
                ));
            }
            if self.library.roots[..i].contains(root) {
                warnings.push(format!(
                    "library.roots[{i}] ({}) is listed more than once",
                    root.display()
                ));
            }
        }

        if self.library.override_file_names.is_empty() {
            warnings.push("library.override_file_names is empty; overrides are disabled".into());
        }

        if self.transcode.enabled && !is_valid_bitrate(&self.transcode.bitrate) {
            warnings.push(format!(
                "transcode.bitrate '{}' is not of the form <digits>[k]",
                self.transcode.bitrate
            ));
        }

        if let Some(path) = &self.transcode.encoder_path {
            if !path.exists() {
                warnings.push(format!(
                    "transcode.encoder_path ({}) does not exist",
                    path.display()
                ));
            }
        }

        warnings
    }
}

fn is_valid_bitrate(s: &str) -> bool {
    let digits = s.strip_suffix(['k', 'K']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Default locations searched when no explicit config path is given.
const DEFAULT_PATHS: &[&str] = &[
    "./bookcast.toml",
    "~/.config/bookcast/config.toml",
    "/etc/bookcast/config.toml",
];

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Validation(format!("failed to read config file {}: {e}", path.display()))
    })?;
    Config::from_toml(&content)
}

/// Load config from `custom_path`, else the first default location that
/// exists, else built-in defaults.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!(path = %path.display(), "Loading config");
            return load_config(path);
        }
    }

    tracing::info!("No config file found; using defaults");
    Ok(Config::default())
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible base URL used in feed links. When unset, it is
    /// derived from the request's `Host` header.
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            public_url: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

/// Library scanning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root directories; every directory beneath a root is a candidate book.
    pub roots: Vec<PathBuf>,
    /// Sidecar file names recognised as overrides, in priority order.
    pub override_file_names: Vec<String>,
    /// Per-directory exclusion list. An empty file hides the whole
    /// directory; otherwise each line names an audio file to leave out.
    pub ignore_file_name: String,
    pub default_language: String,
    pub default_author: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            override_file_names: vec!["abook".into(), "abook.yaml".into(), "abook.yml".into()],
            ignore_file_name: ".bookcast_ignore".into(),
            default_language: "en".into(),
            default_author: "Unknown author".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// Feed rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Value of the channel `<ttl>` element, in minutes.
    pub ttl_minutes: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { ttl_minutes: 1440 }
    }
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

/// Change detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,
    /// Quiet period after the last file-system event before rescanning.
    pub settle_time_secs: u64,
    /// Periodic rescan interval. Zero disables polling.
    pub poll_interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settle_time_secs: 5,
            poll_interval_secs: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Transcode
// ---------------------------------------------------------------------------

/// External encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    pub enabled: bool,
    /// Explicit encoder binary. When unset, `ffmpeg` is looked up on `PATH`.
    pub encoder_path: Option<PathBuf>,
    /// Target audio bitrate passed to the encoder, e.g. `64k`.
    pub bitrate: String,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            encoder_path: None,
            bitrate: "64k".into(),
        }
    }
}
