//! Playback core for a terminal music player.
//!
//! Spawns MPV per track, drives it over its JSON IPC socket and keeps a
//! navigable queue. Logging goes through the `log` facade; the host
//! application installs the backend.

mod config;
mod error;
mod mpv;
mod player;
mod queue;
pub mod services;
mod track;

pub use config::{ConfigError, PlayerConfig};
pub use error::PlayerError;
pub use mpv::{
  find_mpv, ConnectResult, ConnectTiming, EndOfTrack, IpcError, MpvClient, MpvCommand,
  MpvMessage, PlaybackSnapshot, PlaybackState, ProcessError, ProcessHandle, PropertyChange,
  SessionEnd, SessionOutcome, Supervisor, UNKNOWN_DURATION,
};
pub use player::Player;
pub use queue::{Queue, TrackPlayer};
pub use track::Track;
