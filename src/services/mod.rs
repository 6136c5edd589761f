//! Boundaries to the services the playback core consumes.
//!
//! All calls are blocking and infallible from the caller's point of view:
//! failure is an empty/`None`/`false` result.

mod memory;
mod resolver;

pub use memory::{MemoryHistory, MemoryPlaylists, MAX_HISTORY_SIZE};
pub use resolver::YtDlpResolver;

use crate::track::Track;

/// Turns a track identifier into a URL MPV can open.
pub trait StreamResolver: Send + Sync {
  fn resolve(&self, track_id: &str) -> Option<String>;
}

impl<F> StreamResolver for F
where
  F: Fn(&str) -> Option<String> + Send + Sync,
{
  fn resolve(&self, track_id: &str) -> Option<String> {
    self(track_id)
  }
}

/// Remote catalog search.
pub trait TrackCatalog: Send + Sync {
  fn search(&self, query: &str) -> Vec<Track>;
}

/// Named playlist storage.
pub trait PlaylistStore: Send + Sync {
  fn load(&self, name: &str) -> Option<Vec<Track>>;
  fn save(&self, name: &str, tracks: &[Track]) -> bool;
  fn list(&self) -> Vec<String>;
  /// True if a playlist by that name existed.
  fn delete(&self, name: &str) -> bool;
}

/// Play history, newest first.
pub trait HistoryStore: Send + Sync {
  fn record(&self, track: &Track);
  fn recent(&self, limit: usize) -> Vec<Track>;
  fn clear(&self) -> bool;
}
