//! In-process playlist and history stores.

use std::collections::{BTreeMap, VecDeque};

use parking_lot::RwLock;

use super::{HistoryStore, PlaylistStore};
use crate::track::Track;

/// History entries kept before the oldest are dropped.
pub const MAX_HISTORY_SIZE: usize = 100;

#[derive(Debug, Default)]
pub struct MemoryPlaylists {
  playlists: RwLock<BTreeMap<String, Vec<Track>>>,
}

impl MemoryPlaylists {
  pub fn new() -> Self {
    Self::default()
  }
}

impl PlaylistStore for MemoryPlaylists {
  fn load(&self, name: &str) -> Option<Vec<Track>> {
    self.playlists.read().get(name).cloned()
  }

  fn save(&self, name: &str, tracks: &[Track]) -> bool {
    if name.trim().is_empty() {
      return false;
    }
    self
      .playlists
      .write()
      .insert(name.to_string(), tracks.to_vec());
    true
  }

  fn list(&self) -> Vec<String> {
    self.playlists.read().keys().cloned().collect()
  }

  fn delete(&self, name: &str) -> bool {
    self.playlists.write().remove(name).is_some()
  }
}

#[derive(Debug, Default)]
pub struct MemoryHistory {
  entries: RwLock<VecDeque<Track>>,
}

impl MemoryHistory {
  pub fn new() -> Self {
    Self::default()
  }
}

impl HistoryStore for MemoryHistory {
  fn record(&self, track: &Track) {
    let mut entries = self.entries.write();
    entries.push_front(track.clone());
    entries.truncate(MAX_HISTORY_SIZE);
  }

  fn recent(&self, limit: usize) -> Vec<Track> {
    self.entries.read().iter().take(limit).cloned().collect()
  }

  fn clear(&self) -> bool {
    self.entries.write().clear();
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn playlists_round_trip_and_list_sorted() {
    let store = MemoryPlaylists::new();
    assert!(store.load("missing").is_none());
    assert!(store.save("zeta", &[Track::new("a", "A", "X")]));
    assert!(store.save("alpha", &[]));
    assert!(!store.save("  ", &[]));

    assert_eq!(store.list(), vec!["alpha", "zeta"]);
    assert_eq!(store.load("zeta").unwrap()[0].id, "a");

    assert!(store.delete("zeta"));
    assert!(!store.delete("zeta"));
    assert!(store.load("zeta").is_none());
    assert_eq!(store.list(), vec!["alpha"]);
  }

  #[test]
  fn history_is_newest_first_and_capped() {
    let history = MemoryHistory::new();
    for i in 0..(MAX_HISTORY_SIZE + 10) {
      history.record(&Track::new(i.to_string(), "T", "A"));
    }

    let recent = history.recent(3);
    let ids: Vec<&str> = recent.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["109", "108", "107"]);
    assert_eq!(history.recent(usize::MAX).len(), MAX_HISTORY_SIZE);

    assert!(history.clear());
    assert!(history.recent(10).is_empty());
  }
}
