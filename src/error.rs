//! Playback error types.

use thiserror::Error;

use crate::mpv::ProcessError;

/// Errors returned by the playback facade and queue.
#[derive(Error, Debug)]
pub enum PlayerError {
  #[error("No playable stream for track {0}")]
  Resolution(String),

  #[error("Failed to launch player: {0}")]
  Launch(#[from] ProcessError),

  #[error("Queue is empty")]
  EmptyQueue,
}
