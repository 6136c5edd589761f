//! Playback facade: one MPV session at a time.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::config::PlayerConfig;
use crate::error::PlayerError;
use crate::mpv::{
  cleanup_ipc, fresh_ipc_path, MpvClient, PlaybackSnapshot, PlaybackState, ProcessHandle,
  SessionOutcome, Supervisor,
};
use crate::queue::TrackPlayer;
use crate::services::{StreamResolver, YtDlpResolver};
use crate::track::Track;

/// One spawned MPV and the task talking to it.
struct Session {
  process: ProcessHandle,
  ipc_path: PathBuf,
  task: JoinHandle<SessionOutcome>,
}

/// Control surface used by the presentation layer.
pub struct Player {
  supervisor: Supervisor,
  resolver: Arc<dyn StreamResolver>,
  client: MpvClient,
  socket_dir: PathBuf,
  volume_step: i64,
  session: Mutex<Option<Session>>,
  /// Serializes play/stop so sessions never overlap.
  lifecycle: tokio::sync::Mutex<()>,
}

impl Player {
  pub fn new(config: &PlayerConfig, resolver: Arc<dyn StreamResolver>) -> Self {
    Self {
      supervisor: Supervisor::new(
        config.mpv_path(),
        config.mpv_args.clone(),
        config.terminate_grace(),
      ),
      resolver,
      client: MpvClient::new(config.connect_timing()),
      socket_dir: config.socket_dir(),
      volume_step: config.volume_step,
      session: Mutex::new(None),
      lifecycle: tokio::sync::Mutex::new(()),
    }
  }

  /// Player resolving streams through yt-dlp.
  pub fn with_ytdlp(config: &PlayerConfig) -> Self {
    let resolver = YtDlpResolver::new(config.ytdlp_path(), config.ytdlp_format.clone());
    Self::new(config, Arc::new(resolver))
  }

  /// Register the callback run whenever MPV reports `end-file`.
  ///
  /// Runs on the reader task; keep it short (e.g. send on a channel).
  pub fn on_track_end<F>(&self, callback: F)
  where
    F: Fn() + Send + Sync + 'static,
  {
    self.client.set_on_end(Arc::new(callback));
  }

  /// Replace any current session with one playing `track`.
  ///
  /// Returns once MPV is spawned; the control channel connects later.
  pub async fn play(&self, track: &Track) -> Result<(), PlayerError> {
    let _lifecycle = self.lifecycle.lock().await;
    self.stop_session().await;

    let resolver = self.resolver.clone();
    let id = track.id.clone();
    let url = tokio::task::spawn_blocking(move || resolver.resolve(&id))
      .await
      .ok()
      .flatten()
      .ok_or_else(|| {
        log::warn!("No stream URL for {} ({})", track.id, track.title);
        PlayerError::Resolution(track.id.clone())
      })?;

    let ipc_path = fresh_ipc_path(&self.socket_dir);
    let process = self.supervisor.launch(&url, &ipc_path)?;

    // Means "a process was launched", not "the channel is live".
    self.client.mark_running(true);
    let task = self.client.connect(ipc_path.clone());

    log::info!("Playing {} - {}", track.artist, track.title);
    *self.session.lock() = Some(Session {
      process,
      ipc_path,
      task,
    });
    Ok(())
  }

  /// Stop playback. Safe to call when nothing is running.
  pub async fn stop(&self) {
    let _lifecycle = self.lifecycle.lock().await;
    self.stop_session().await;
  }

  async fn stop_session(&self) {
    self.client.mark_running(false);
    self.client.close();

    let Some(session) = self.session.lock().take() else {
      return;
    };

    session.process.terminate().await;
    match session.task.await {
      Ok(outcome) => log::debug!("Previous session finished: {:?}", outcome),
      Err(e) => log::error!("Session task failed: {}", e),
    }
    cleanup_ipc(&session.ipc_path);
    log::info!("Playback stopped");
  }

  pub fn toggle_pause(&self) {
    self.client.toggle_pause();
  }

  pub fn volume_up(&self) {
    self.client.add_volume(self.volume_step);
  }

  pub fn volume_down(&self) {
    self.client.add_volume(-self.volume_step);
  }

  pub fn state(&self) -> PlaybackSnapshot {
    self.client.snapshot()
  }

  /// Live view of the state, for callers polling at a high rate.
  pub fn shared_state(&self) -> Arc<PlaybackState> {
    self.client.state().clone()
  }

  pub fn is_running(&self) -> bool {
    self.client.state().is_running()
  }

  pub fn is_connected(&self) -> bool {
    self.client.is_connected()
  }

  /// PID of the current MPV, if a session exists.
  pub fn pid(&self) -> Option<u32> {
    self.session.lock().as_ref().map(|s| s.process.pid())
  }
}

impl TrackPlayer for Player {
  async fn play(&self, track: &Track) -> Result<(), PlayerError> {
    Player::play(self, track).await
  }
}
