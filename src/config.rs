//! Player configuration with persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mpv::{default_socket_dir, ConnectTiming};

const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Config I/O error: {0}")]
  Io(#[from] std::io::Error),
  #[error("Config JSON error: {0}")]
  Json(#[from] serde_json::Error),
  #[error("Invalid config: {0}")]
  Invalid(String),
}

/// Player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
  /// Custom MPV executable path (None = auto-detect).
  #[serde(default)]
  pub mpv_path: Option<String>,

  /// Additional MPV command-line arguments.
  #[serde(default)]
  pub mpv_args: Vec<String>,

  /// Directory for IPC sockets (None = runtime dir, else temp dir).
  #[serde(default)]
  pub socket_dir: Option<String>,

  /// Percent added or removed by one volume step.
  #[serde(default = "default_volume_step")]
  pub volume_step: i64,

  /// How long to wait for MPV's IPC socket to appear.
  #[serde(default = "default_connect_timeout_ms")]
  pub connect_timeout_ms: u64,

  /// How often to look for the socket while waiting.
  #[serde(default = "default_connect_poll_ms")]
  pub connect_poll_ms: u64,

  /// Time MPV gets to exit after SIGTERM before SIGKILL.
  #[serde(default = "default_terminate_grace_ms")]
  pub terminate_grace_ms: u64,

  /// Custom yt-dlp executable path (None = auto-detect).
  #[serde(default)]
  pub ytdlp_path: Option<String>,

  /// yt-dlp format selector.
  #[serde(default = "default_ytdlp_format")]
  pub ytdlp_format: String,
}

fn default_volume_step() -> i64 {
  5
}

fn default_connect_timeout_ms() -> u64 {
  4000
}

fn default_connect_poll_ms() -> u64 {
  100
}

fn default_terminate_grace_ms() -> u64 {
  2000
}

fn default_ytdlp_format() -> String {
  "bestaudio".to_string()
}

impl Default for PlayerConfig {
  fn default() -> Self {
    Self {
      mpv_path: None,
      mpv_args: Vec::new(),
      socket_dir: None,
      volume_step: default_volume_step(),
      connect_timeout_ms: default_connect_timeout_ms(),
      connect_poll_ms: default_connect_poll_ms(),
      terminate_grace_ms: default_terminate_grace_ms(),
      ytdlp_path: None,
      ytdlp_format: default_ytdlp_format(),
    }
  }
}

fn non_empty_path(value: &Option<String>) -> Option<PathBuf> {
  value
    .as_ref()
    .filter(|s| !s.trim().is_empty())
    .map(PathBuf::from)
}

impl PlayerConfig {
  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.volume_step == 0 {
      return Err(ConfigError::Invalid("Volume step cannot be zero".to_string()));
    }
    if self.connect_poll_ms == 0 {
      return Err(ConfigError::Invalid(
        "Connect poll interval must be at least 1 ms".to_string(),
      ));
    }
    if self.connect_poll_ms > self.connect_timeout_ms {
      return Err(ConfigError::Invalid(
        "Connect poll interval cannot exceed the connect timeout".to_string(),
      ));
    }
    if self.ytdlp_format.trim().is_empty() {
      return Err(ConfigError::Invalid("yt-dlp format cannot be empty".to_string()));
    }
    Ok(())
  }

  /// Default location: `<config dir>/cplayer/config.json`.
  pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cplayer").join(CONFIG_FILE))
  }

  /// Load from `path`. A missing file yields the defaults.
  pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
    let text = match std::fs::read_to_string(path) {
      Ok(text) => text,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        log::info!("No config at {}, using defaults", path.display());
        return Ok(Self::default());
      }
      Err(e) => return Err(e.into()),
    };
    let config: Self = serde_json::from_str(&text)?;
    config.validate()?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
  }

  /// Load from [`Self::default_path`], or defaults if there is none.
  pub fn load() -> Result<Self, ConfigError> {
    match Self::default_path() {
      Some(path) => Self::load_from(&path),
      None => Ok(Self::default()),
    }
  }

  pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
    self.validate()?;
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(self)?)?;
    Ok(())
  }

  pub fn mpv_path(&self) -> Option<PathBuf> {
    non_empty_path(&self.mpv_path)
  }

  pub fn ytdlp_path(&self) -> Option<PathBuf> {
    non_empty_path(&self.ytdlp_path)
  }

  pub fn socket_dir(&self) -> PathBuf {
    non_empty_path(&self.socket_dir).unwrap_or_else(default_socket_dir)
  }

  pub fn connect_timing(&self) -> ConnectTiming {
    ConnectTiming {
      poll: Duration::from_millis(self.connect_poll_ms),
      timeout: Duration::from_millis(self.connect_timeout_ms),
    }
  }

  pub fn terminate_grace(&self) -> Duration {
    Duration::from_millis(self.terminate_grace_ms)
  }
}
