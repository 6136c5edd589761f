//! Navigable playback queue.

use std::future::Future;
use std::sync::Arc;

use crate::error::PlayerError;
use crate::track::Track;

/// Something that can start playback of a track.
pub trait TrackPlayer: Send + Sync {
  fn play(&self, track: &Track) -> impl Future<Output = Result<(), PlayerError>> + Send;
}

/// Ordered tracks plus a cursor. `index` is `None` until something has
/// been selected, and otherwise always points inside `tracks`.
pub struct Queue<P> {
  player: Arc<P>,
  tracks: Vec<Track>,
  index: Option<usize>,
}

impl<P: TrackPlayer> Queue<P> {
  pub fn new(player: Arc<P>) -> Self {
    Self {
      player,
      tracks: Vec::new(),
      index: None,
    }
  }

  /// Replace the queue. Nothing starts playing.
  pub fn load(&mut self, tracks: Vec<Track>) {
    self.tracks = tracks;
    self.index = None;
  }

  pub fn tracks(&self) -> &[Track] {
    &self.tracks
  }

  pub fn index(&self) -> Option<usize> {
    self.index
  }

  pub fn current_track(&self) -> Option<&Track> {
    self.index.and_then(|i| self.tracks.get(i))
  }

  pub fn len(&self) -> usize {
    self.tracks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tracks.is_empty()
  }

  pub fn player(&self) -> &Arc<P> {
    &self.player
  }

  /// Play `track`, moving the cursor to it if it is in the queue.
  ///
  /// A track that is not queued is still played; the cursor stays put.
  pub async fn play_single(&mut self, track: &Track) -> Result<(), PlayerError> {
    match self.tracks.iter().position(|t| t.id == track.id) {
      Some(i) => self.index = Some(i),
      None => log::debug!("Track {} is not in the queue, cursor unchanged", track.id),
    }
    self.player.play(track).await
  }

  /// Advance with wraparound and play. From no selection, starts at the
  /// first track.
  pub async fn next(&mut self) -> Result<(), PlayerError> {
    let len = self.tracks.len();
    if len == 0 {
      return Err(PlayerError::EmptyQueue);
    }
    let index = self.index.map_or(0, |i| (i + 1) % len);
    self.play_at(index).await
  }

  /// Retreat with wraparound and play. From no selection, starts at the
  /// last track.
  pub async fn previous(&mut self) -> Result<(), PlayerError> {
    let len = self.tracks.len();
    if len == 0 {
      return Err(PlayerError::EmptyQueue);
    }
    let index = self.index.map_or(len - 1, |i| (i + len - 1) % len);
    self.play_at(index).await
  }

  async fn play_at(&mut self, index: usize) -> Result<(), PlayerError> {
    self.index = Some(index);
    let track = &self.tracks[index];
    log::info!("Queue position {}: {} - {}", index, track.artist, track.title);
    self.player.play(track).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use parking_lot::Mutex;

  #[derive(Default)]
  struct RecordingPlayer {
    played: Mutex<Vec<String>>,
    reject: bool,
  }

  impl TrackPlayer for RecordingPlayer {
    async fn play(&self, track: &Track) -> Result<(), PlayerError> {
      self.played.lock().push(track.id.clone());
      if self.reject {
        Err(PlayerError::Resolution(track.id.clone()))
      } else {
        Ok(())
      }
    }
  }

  fn tracks(ids: &[&str]) -> Vec<Track> {
    ids
      .iter()
      .map(|id| Track::new(*id, format!("Title {id}"), "Artist"))
      .collect()
  }

  fn queue(ids: &[&str]) -> Queue<RecordingPlayer> {
    let mut queue = Queue::new(Arc::new(RecordingPlayer::default()));
    queue.load(tracks(ids));
    queue
  }

  fn played(queue: &Queue<RecordingPlayer>) -> Vec<String> {
    queue.player().played.lock().clone()
  }

  #[tokio::test]
  async fn navigation_scenario() {
    let mut queue = queue(&["A", "B", "C"]);
    assert_eq!(queue.index(), None);

    queue.next().await.unwrap();
    assert_eq!(queue.index(), Some(0));
    queue.next().await.unwrap();
    assert_eq!(queue.index(), Some(1));
    queue.previous().await.unwrap();
    assert_eq!(queue.index(), Some(0));
    assert_eq!(queue.current_track().unwrap().id, "A");

    assert_eq!(played(&queue), vec!["A", "B", "A"]);
  }

  #[tokio::test]
  async fn empty_queue_fails_without_moving() {
    let mut queue = queue(&[]);
    assert!(matches!(queue.next().await, Err(PlayerError::EmptyQueue)));
    assert!(matches!(queue.previous().await, Err(PlayerError::EmptyQueue)));
    assert_eq!(queue.index(), None);
    assert!(played(&queue).is_empty());
  }

  #[tokio::test]
  async fn next_cycles_back_to_start() {
    for len in 1..=5usize {
      let ids: Vec<String> = (0..len).map(|i| i.to_string()).collect();
      let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
      let mut queue = queue(&ids);
      for start in 0..len {
        let track = queue.tracks()[start].clone();
        queue.play_single(&track).await.unwrap();
        for _ in 0..len {
          queue.next().await.unwrap();
        }
        assert_eq!(queue.index(), Some(start));
      }
    }
  }

  #[tokio::test]
  async fn previous_inverts_next() {
    let mut queue = queue(&["A", "B", "C", "D"]);
    for start in 0..4 {
      let track = queue.tracks()[start].clone();
      queue.play_single(&track).await.unwrap();
      queue.next().await.unwrap();
      queue.previous().await.unwrap();
      assert_eq!(queue.index(), Some(start));
      queue.previous().await.unwrap();
      queue.next().await.unwrap();
      assert_eq!(queue.index(), Some(start));
    }
  }

  #[tokio::test]
  async fn previous_from_nothing_wraps_to_last() {
    let mut queue = queue(&["A", "B", "C"]);
    queue.previous().await.unwrap();
    assert_eq!(queue.index(), Some(2));
  }

  #[tokio::test]
  async fn load_resets_cursor() {
    let mut queue = queue(&["A", "B"]);
    queue.next().await.unwrap();
    queue.load(tracks(&["X", "Y", "Z"]));
    assert_eq!(queue.index(), None);
    assert!(queue.current_track().is_none());
  }

  #[tokio::test]
  async fn play_single_moves_cursor_only_when_present() {
    let mut queue = queue(&["A", "B", "C"]);
    queue.play_single(&Track::new("C", "", "")).await.unwrap();
    assert_eq!(queue.index(), Some(2));

    queue.play_single(&Track::new("Q", "", "")).await.unwrap();
    assert_eq!(queue.index(), Some(2));
    assert_eq!(played(&queue), vec!["C", "Q"]);
  }

  #[tokio::test]
  async fn rejected_playback_still_moves_cursor() {
    let player = Arc::new(RecordingPlayer {
      reject: true,
      ..Default::default()
    });
    let mut queue = Queue::new(player);
    queue.load(tracks(&["A", "B"]));
    assert!(queue.next().await.is_err());
    assert_eq!(queue.index(), Some(0));
  }
}
