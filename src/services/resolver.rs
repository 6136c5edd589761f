//! Stream URL resolution through yt-dlp.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Deserialize;

use super::StreamResolver;

const WATCH_URL: &str = "https://music.youtube.com/watch?v=";

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
  url: Option<String>,
}

/// Resolves track IDs by running `yt-dlp -j`.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
  ytdlp_path: Option<PathBuf>,
  format: String,
}

impl YtDlpResolver {
  pub fn new(ytdlp_path: Option<PathBuf>, format: impl Into<String>) -> Self {
    Self {
      ytdlp_path,
      format: format.into(),
    }
  }

  fn binary(&self) -> Option<PathBuf> {
    self
      .ytdlp_path
      .clone()
      .or_else(|| which::which("yt-dlp").ok())
  }
}

impl Default for YtDlpResolver {
  fn default() -> Self {
    Self::new(None, "bestaudio")
  }
}

/// Pull the direct stream URL out of yt-dlp's JSON dump.
fn parse_info(stdout: &[u8]) -> Option<String> {
  match serde_json::from_slice::<YtDlpInfo>(stdout) {
    Ok(info) => info.url.filter(|u| !u.is_empty()),
    Err(e) => {
      log::warn!("Unparseable yt-dlp output: {}", e);
      None
    }
  }
}

impl StreamResolver for YtDlpResolver {
  fn resolve(&self, track_id: &str) -> Option<String> {
    let Some(binary) = self.binary() else {
      log::error!("yt-dlp executable not found");
      return None;
    };

    log::info!("Resolving stream for {}", track_id);
    let output = Command::new(&binary)
      .arg("-f")
      .arg(&self.format)
      .arg("-j")
      .arg("--quiet")
      .arg(format!("{WATCH_URL}{track_id}"))
      .stdin(Stdio::null())
      .stderr(Stdio::null())
      .output();

    match output {
      Ok(output) if output.status.success() => parse_info(&output.stdout),
      Ok(output) => {
        log::warn!("yt-dlp exited with {} for {}", output.status, track_id);
        None
      }
      Err(e) => {
        log::error!("Failed to run yt-dlp: {}", e);
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_url_field() {
    let json = br#"{"id":"abc","url":"https://cdn.example/audio.webm","ext":"webm"}"#;
    assert_eq!(
      parse_info(json).as_deref(),
      Some("https://cdn.example/audio.webm")
    );
    assert!(parse_info(br#"{"id":"abc"}"#).is_none());
    assert!(parse_info(b"garbage").is_none());
  }

  #[test]
  fn failing_binary_resolves_to_none() {
    let resolver = YtDlpResolver::new(Some(PathBuf::from("/bin/false")), "bestaudio");
    assert!(resolver.resolve("abc").is_none());
  }

  #[test]
  fn missing_binary_resolves_to_none() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = YtDlpResolver::new(Some(dir.path().join("yt-dlp")), "bestaudio");
    assert!(resolver.resolve("abc").is_none());
  }
}
