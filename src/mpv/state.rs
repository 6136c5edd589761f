//! Playback state observed from MPV.
//!
//! The reader task is the only writer; everyone else reads through
//! [`PlaybackState::snapshot`] or the individual getters. Fields are
//! atomics so no lock is held across the reader's awaits.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Duration reported while MPV has not told us one yet.
pub const UNKNOWN_DURATION: f64 = 1.0;

/// MPV's own default volume.
pub const DEFAULT_VOLUME: i64 = 100;

/// Shared playback state.
#[derive(Debug)]
pub struct PlaybackState {
  time_pos: AtomicU64,
  duration: AtomicU64,
  volume: AtomicI64,
  running: AtomicBool,
  connected: AtomicBool,
}

/// Point-in-time copy handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
  pub time_pos: f64,
  pub duration: f64,
  pub volume: i64,
  /// A process was launched and not yet stopped.
  pub running: bool,
  /// A control channel is currently live.
  pub connected: bool,
}

impl PlaybackSnapshot {
  /// Fraction of the track played, in `0.0..=1.0`.
  pub fn progress(&self) -> f64 {
    (self.time_pos / self.duration).clamp(0.0, 1.0)
  }
}

impl Default for PlaybackState {
  fn default() -> Self {
    Self {
      time_pos: AtomicU64::new(0f64.to_bits()),
      duration: AtomicU64::new(UNKNOWN_DURATION.to_bits()),
      volume: AtomicI64::new(DEFAULT_VOLUME),
      running: AtomicBool::new(false),
      connected: AtomicBool::new(false),
    }
  }
}

impl PlaybackState {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn time_pos(&self) -> f64 {
    f64::from_bits(self.time_pos.load(Ordering::Acquire))
  }

  pub fn duration(&self) -> f64 {
    f64::from_bits(self.duration.load(Ordering::Acquire))
  }

  pub fn volume(&self) -> i64 {
    self.volume.load(Ordering::Acquire)
  }

  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::Acquire)
  }

  pub fn is_connected(&self) -> bool {
    self.connected.load(Ordering::Acquire)
  }

  pub fn snapshot(&self) -> PlaybackSnapshot {
    PlaybackSnapshot {
      time_pos: self.time_pos(),
      duration: self.duration(),
      volume: self.volume(),
      running: self.is_running(),
      connected: self.is_connected(),
    }
  }

  pub(crate) fn set_running(&self, running: bool) {
    self.running.store(running, Ordering::Release);
  }

  pub(crate) fn set_connected(&self, connected: bool) {
    self.connected.store(connected, Ordering::Release);
  }

  pub(crate) fn set_time_pos(&self, seconds: f64) {
    self.time_pos.store(seconds.to_bits(), Ordering::Release);
  }

  /// Zero, negative and NaN values collapse to [`UNKNOWN_DURATION`].
  pub(crate) fn set_duration(&self, seconds: f64) {
    let seconds = if seconds > 0.0 {
      seconds
    } else {
      UNKNOWN_DURATION
    };
    self.duration.store(seconds.to_bits(), Ordering::Release);
  }

  pub(crate) fn set_volume(&self, volume: i64) {
    self.volume.store(volume, Ordering::Release);
  }

  /// Forget per-track values at the start of a session.
  pub(crate) fn reset_track(&self) {
    self.set_time_pos(0.0);
    self.set_duration(UNKNOWN_DURATION);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let state = PlaybackState::default();
    let snap = state.snapshot();
    assert_eq!(snap.time_pos, 0.0);
    assert_eq!(snap.duration, UNKNOWN_DURATION);
    assert_eq!(snap.volume, DEFAULT_VOLUME);
    assert!(!snap.running);
    assert!(!snap.connected);
  }

  #[test]
  fn duration_never_zero() {
    let state = PlaybackState::default();
    state.set_duration(0.0);
    assert_eq!(state.duration(), UNKNOWN_DURATION);
    state.set_duration(f64::NAN);
    assert_eq!(state.duration(), UNKNOWN_DURATION);
    state.set_duration(217.5);
    assert_eq!(state.duration(), 217.5);
  }

  #[test]
  fn progress_is_clamped() {
    let state = PlaybackState::default();
    state.set_duration(200.0);
    state.set_time_pos(50.0);
    assert_eq!(state.snapshot().progress(), 0.25);
    state.set_time_pos(500.0);
    assert_eq!(state.snapshot().progress(), 1.0);
  }
}
