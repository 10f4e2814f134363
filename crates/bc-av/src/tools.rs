//! Encoder discovery.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bc_core::config::TranscodeConfig;
use serde::{Deserialize, Serialize};

use crate::command::ToolCommand;

/// Name looked up on `PATH` when no encoder path is configured.
const DEFAULT_ENCODER: &str = "ffmpeg";

/// A located encoder binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoder {
    pub name: String,
    pub path: PathBuf,
}

/// Availability information, as printed by `bookcast check-tools`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderInfo {
    pub name: String,
    pub available: bool,
    /// First line of `-version` output.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

impl Encoder {
    /// Locate the encoder.
    ///
    /// A configured `encoder_path` that exists is used directly; otherwise
    /// `ffmpeg` is searched on `PATH`. Returns `None` when transcoding is
    /// disabled or nothing is found.
    pub fn discover(config: &TranscodeConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let resolved = match config.encoder_path.as_deref() {
            Some(p) if p.exists() => Some(p.to_path_buf()),
            Some(p) => {
                tracing::warn!(
                    path = %p.display(),
                    "Configured encoder does not exist; searching PATH"
                );
                which::which(DEFAULT_ENCODER).ok()
            }
            None => which::which(DEFAULT_ENCODER).ok(),
        };

        match resolved {
            Some(path) => Some(Self::at(path)),
            None => {
                tracing::info!("No encoder found; transcoding disabled");
                None
            }
        }
    }

    /// Use the binary at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = program_name(&path);
        Self { name, path }
    }

    /// Query the encoder's version line.
    pub async fn version(&self) -> bc_core::Result<String> {
        let output = ToolCommand::new(self.path.clone())
            .arg("-version")
            .timeout(Duration::from_secs(10))
            .execute()
            .await?;
        Ok(output.stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    /// Availability report for this encoder (or its absence).
    pub async fn check(encoder: Option<&Encoder>) -> EncoderInfo {
        let Some(encoder) = encoder else {
            return EncoderInfo {
                name: DEFAULT_ENCODER.into(),
                available: false,
                version: None,
                path: None,
            };
        };

        let version = match encoder.version().await {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "Encoder version check failed");
                None
            }
        };

        EncoderInfo {
            name: encoder.name.clone(),
            available: version.is_some(),
            version,
            path: Some(encoder.path.clone()),
        }
    }
}

fn program_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
