//! High-level MPV control-channel client.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::ipc::{self, ConnectResult, EndOfTrack, IpcError, IpcWriter, SessionEnd};
use super::protocol::MpvCommand;
use super::state::{PlaybackSnapshot, PlaybackState};

/// How long to wait for MPV's socket, and how often to look.
#[derive(Debug, Clone, Copy)]
pub struct ConnectTiming {
  pub poll: Duration,
  pub timeout: Duration,
}

impl Default for ConnectTiming {
  fn default() -> Self {
    Self {
      poll: Duration::from_millis(100),
      timeout: Duration::from_secs(4),
    }
  }
}

/// What happened to one background session task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
  /// The socket never appeared (or the session was stopped first).
  TimedOut,
  /// The socket appeared but connecting failed.
  ConnectFailed,
  /// Connected; the reader later stopped for this reason.
  Ended(SessionEnd),
}

/// Connection slot shared with the background task.
#[derive(Default)]
struct Channel {
  writer: Option<IpcWriter>,
  cancel: Option<CancellationToken>,
}

/// MPV control-channel client.
///
/// Owns [`PlaybackState`]; only its background task writes the observed
/// fields.
#[derive(Clone)]
pub struct MpvClient {
  state: Arc<PlaybackState>,
  channel: Arc<Mutex<Channel>>,
  on_end: Arc<Mutex<Option<EndOfTrack>>>,
  timing: ConnectTiming,
}

impl MpvClient {
  pub fn new(timing: ConnectTiming) -> Self {
    Self {
      state: PlaybackState::new(),
      channel: Arc::new(Mutex::new(Channel::default())),
      on_end: Arc::new(Mutex::new(None)),
      timing,
    }
  }

  /// Register the callback run on every `end-file` event.
  pub fn set_on_end(&self, on_end: EndOfTrack) {
    *self.on_end.lock() = Some(on_end);
  }

  /// Run the callback registered right now, outside the lock.
  fn notify_end(&self) {
    let on_end = self.on_end.lock().clone();
    if let Some(on_end) = on_end {
      on_end();
    }
  }

  pub fn state(&self) -> &Arc<PlaybackState> {
    &self.state
  }

  pub fn snapshot(&self) -> PlaybackSnapshot {
    self.state.snapshot()
  }

  pub(crate) fn mark_running(&self, running: bool) {
    self.state.set_running(running);
  }

  /// Check if a channel is currently live.
  pub fn is_connected(&self) -> bool {
    self
      .channel
      .lock()
      .writer
      .as_ref()
      .is_some_and(|w| !w.is_closed())
  }

  /// Connect to `path` in the background and subscribe to properties.
  ///
  /// Returns immediately. The task never surfaces errors; its outcome is
  /// only reported through the join handle.
  pub fn connect(&self, path: PathBuf) -> JoinHandle<SessionOutcome> {
    // A previous session must not keep writing state.
    self.close();

    let cancel = CancellationToken::new();
    self.channel.lock().cancel = Some(cancel.clone());

    let client = self.clone();
    tokio::spawn(async move { client.run_session(path, cancel).await })
  }

  async fn run_session(self, path: PathBuf, cancel: CancellationToken) -> SessionOutcome {
    self.state.reset_track();

    let stream =
      match ipc::wait_and_connect(&path, self.timing.poll, self.timing.timeout, &cancel).await {
        ConnectResult::Connected(stream) => stream,
        ConnectResult::TimedOut => return SessionOutcome::TimedOut,
        ConnectResult::IoError(_) => return SessionOutcome::ConnectFailed,
      };

    let (reader, writer) = stream.into_split();
    let (ipc_writer, _writer_handle) = IpcWriter::spawn(writer);

    {
      let mut channel = self.channel.lock();
      if cancel.is_cancelled() {
        ipc_writer.close();
        return SessionOutcome::Ended(SessionEnd::Cancelled);
      }
      channel.writer = Some(ipc_writer.clone());
      self.state.set_connected(true);
      for cmd in MpvCommand::subscriptions() {
        if let Err(e) = ipc_writer.send(&cmd) {
          log::error!("Failed to queue subscription: {}", e);
        }
      }
    }

    log::info!("MPV client connected to {}", path.display());

    let end = ipc::read_loop(reader, &self.state, || self.notify_end(), &cancel).await;

    ipc_writer.close();
    {
      // A cancelled session's slot may already belong to the next one.
      let mut channel = self.channel.lock();
      if !cancel.is_cancelled() {
        channel.writer = None;
        self.state.set_connected(false);
      }
    }
    log::info!("MPV session ended: {:?}", end);
    SessionOutcome::Ended(end)
  }

  /// Send a command. A no-op when nothing is connected; a dead peer
  /// drops the channel so later sends are no-ops too.
  pub fn send(&self, cmd: MpvCommand) {
    let mut channel = self.channel.lock();
    let Some(writer) = channel.writer.as_ref() else {
      log::debug!("Not connected, dropping command {:?}", cmd.command);
      return;
    };

    match writer.send(&cmd) {
      Ok(()) => {}
      Err(IpcError::Disconnected) => {
        log::warn!("MPV channel is gone, discarding it");
        if let Some(writer) = channel.writer.take() {
          writer.close();
        }
      }
      Err(e) => log::error!("Failed to send MPV command: {}", e),
    }
  }

  /// Toggle pause.
  pub fn toggle_pause(&self) {
    self.send(MpvCommand::cycle("pause"));
  }

  /// Adjust volume by `delta` percent.
  pub fn add_volume(&self, delta: i64) {
    self.send(MpvCommand::add("volume", delta));
  }

  /// Cancel the background task and close the channel.
  pub fn close(&self) {
    let mut channel = self.channel.lock();
    if let Some(cancel) = channel.cancel.take() {
      cancel.cancel();
    }
    if let Some(writer) = channel.writer.take() {
      log::info!("Closing IPC connection");
      writer.close();
    }
    self.state.set_connected(false);
  }
}
