//! Async IPC connection to MPV over a Unix socket.
//!
//! One writer task drains an unbounded queue so sending never blocks the
//! caller. One reader task per connection applies property updates to
//! [`PlaybackState`] and reports `end-file`.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::protocol::{MpvCommand, MpvMessage, PROP_DURATION, PROP_TIME_POS, PROP_VOLUME};
use super::state::PlaybackState;

#[derive(Error, Debug)]
pub enum IpcError {
  #[error("Failed to encode command: {0}")]
  Encode(#[from] serde_json::Error),
  #[error("Disconnected")]
  Disconnected,
}

/// Result of waiting for MPV's socket to come up.
#[derive(Debug)]
pub enum ConnectResult {
  Connected(UnixStream),
  TimedOut,
  IoError(io::Error),
}

/// Why a reader loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
  /// Zero-length read.
  PeerClosed,
  IoError,
  /// The session was stopped locally.
  Cancelled,
}

/// Poll for `path` every `poll` until `timeout`, then connect once.
///
/// Returns `TimedOut` early if `cancel` fires while waiting.
pub async fn wait_and_connect(
  path: &Path,
  poll: Duration,
  timeout: Duration,
  cancel: &CancellationToken,
) -> ConnectResult {
  let deadline = Instant::now() + timeout;

  loop {
    if path.exists() {
      break;
    }
    if Instant::now() >= deadline {
      log::warn!(
        "MPV IPC socket {} did not appear within {:?}",
        path.display(),
        timeout
      );
      return ConnectResult::TimedOut;
    }
    tokio::select! {
      _ = cancel.cancelled() => return ConnectResult::TimedOut,
      _ = tokio::time::sleep(poll) => {}
    }
  }

  match UnixStream::connect(path).await {
    Ok(stream) => ConnectResult::Connected(stream),
    Err(e) => {
      log::error!("MPV IPC connect to {} failed: {}", path.display(), e);
      ConnectResult::IoError(e)
    }
  }
}

/// Writer channel message.
enum WriteMessage {
  Command(Vec<u8>),
  Close,
}

/// Sending half of a connection. Cheap to clone.
#[derive(Clone)]
pub struct IpcWriter {
  write_tx: async_channel::Sender<WriteMessage>,
}

impl IpcWriter {
  /// Spawn the writer task over `writer`.
  pub fn spawn<W>(writer: W) -> (Self, JoinHandle<()>)
  where
    W: tokio::io::AsyncWrite + Send + Unpin + 'static,
  {
    let (write_tx, write_rx) = async_channel::unbounded::<WriteMessage>();
    let handle = tokio::spawn(async move {
      Self::writer_loop(writer, write_rx).await;
    });
    (Self { write_tx }, handle)
  }

  async fn writer_loop<W: tokio::io::AsyncWrite + Unpin>(
    mut writer: W,
    write_rx: async_channel::Receiver<WriteMessage>,
  ) {
    log::debug!("MPV IPC writer loop started");

    while let Ok(msg) = write_rx.recv().await {
      match msg {
        WriteMessage::Command(data) => {
          if let Err(e) = writer.write_all(&data).await {
            log::error!("MPV IPC write error: {}", e);
            break;
          }
          if let Err(e) = writer.flush().await {
            log::error!("MPV IPC flush error: {}", e);
            break;
          }
        }
        WriteMessage::Close => {
          log::info!("MPV IPC writer closing");
          let _ = writer.shutdown().await;
          break;
        }
      }
    }

    // Senders see `Disconnected` from here on.
    write_rx.close();
  }

  /// Queue a command without waiting for it to be written.
  pub fn send(&self, cmd: &MpvCommand) -> Result<(), IpcError> {
    let line = cmd.to_line()?;
    log::debug!("Queueing MPV command: {:?}", cmd.command);
    self
      .write_tx
      .try_send(WriteMessage::Command(line))
      .map_err(|_| IpcError::Disconnected)
  }

  pub fn is_closed(&self) -> bool {
    self.write_tx.is_closed()
  }

  /// Ask the writer task to shut the socket down.
  pub fn close(&self) {
    let _ = self.write_tx.try_send(WriteMessage::Close);
    self.write_tx.close();
  }
}

/// Callback invoked on every `end-file` event.
pub type EndOfTrack = Arc<dyn Fn() + Send + Sync>;

/// Longest inbound line accepted. Longer lines are dropped whole.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Read newline-delimited messages until EOF, error or cancellation.
///
/// Lines that are too long or not UTF-8 are skipped, not fatal.
pub async fn read_loop<R, F>(
  reader: R,
  state: &PlaybackState,
  on_end: F,
  cancel: &CancellationToken,
) -> SessionEnd
where
  R: tokio::io::AsyncRead + Unpin,
  F: Fn(),
{
  log::debug!("MPV IPC reader loop started");
  let mut buf_reader = BufReader::new(reader);
  let mut buf = Vec::new();
  // Set while skipping the tail of an oversized line.
  let mut discarding = false;

  loop {
    buf.clear();
    let mut limited = (&mut buf_reader).take(MAX_LINE_BYTES as u64);
    let read = tokio::select! {
      biased;
      _ = cancel.cancelled() => return SessionEnd::Cancelled,
      read = limited.read_until(b'\n', &mut buf) => read,
    };

    let n = match read {
      Ok(0) => {
        log::info!("MPV IPC connection closed");
        return SessionEnd::PeerClosed;
      }
      Ok(n) => n,
      Err(e) => {
        log::error!("MPV IPC read error: {}", e);
        return SessionEnd::IoError;
      }
    };
    if cancel.is_cancelled() {
      return SessionEnd::Cancelled;
    }

    let complete = buf.last() == Some(&b'\n');
    if discarding {
      discarding = !complete;
      continue;
    }
    if !complete && n == MAX_LINE_BYTES {
      log::warn!("Dropping MPV message longer than {} bytes", MAX_LINE_BYTES);
      discarding = true;
      continue;
    }

    let line = match std::str::from_utf8(&buf) {
      Ok(line) => line.trim(),
      Err(e) => {
        log::warn!("Skipping non-UTF-8 MPV message: {}", e);
        continue;
      }
    };
    if !line.is_empty() && apply_line(line, state) {
      log::info!("MPV reported end-file");
      on_end();
    }
  }
}

/// Apply one inbound line to `state`. Returns true for `end-file`.
pub fn apply_line(line: &str, state: &PlaybackState) -> bool {
  let msg = match MpvMessage::parse(line) {
    Ok(msg) => msg,
    Err(e) => {
      log::warn!("Failed to parse MPV message: {} - {}", e, line);
      return false;
    }
  };

  match msg {
    MpvMessage::Property(prop) => {
      match prop.name.as_str() {
        PROP_TIME_POS => state.set_time_pos(prop.as_f64().unwrap_or(0.0)),
        PROP_DURATION => state.set_duration(prop.as_f64().unwrap_or(0.0)),
        PROP_VOLUME => match prop.as_f64() {
          Some(volume) => state.set_volume(volume.trunc() as i64),
          None => log::debug!("Ignoring non-numeric volume: {:?}", prop.data),
        },
        other => log::debug!("Ignoring property {}", other),
      }
      false
    }
    msg @ MpvMessage::Event { .. } => {
      log::debug!("MPV event {:?}", msg);
      msg.is_end_file()
    }
    MpvMessage::Reply { error } => {
      if error != "success" {
        log::warn!("MPV command failed: {}", error);
      }
      false
    }
    MpvMessage::Unknown => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[test]
  fn apply_line_updates_state() {
    let state = PlaybackState::default();
    assert!(!apply_line(r#"{"name":"time-pos","data":12.25}"#, &state));
    assert!(!apply_line(r#"{"name":"duration","data":null}"#, &state));
    assert!(!apply_line(r#"{"name":"volume","data":55.9}"#, &state));
    assert_eq!(state.time_pos(), 12.25);
    assert_eq!(state.duration(), 1.0);
    assert_eq!(state.volume(), 55);

    assert!(!apply_line(r#"{"name":"time-pos","data":null}"#, &state));
    assert_eq!(state.time_pos(), 0.0);
  }

  #[test]
  fn apply_line_ignores_garbage() {
    let state = PlaybackState::default();
    assert!(!apply_line("{not json", &state));
    assert!(!apply_line(r#"{"name":"volume","data":"loud"}"#, &state));
    assert!(!apply_line(r#"{"event":"idle"}"#, &state));
    assert_eq!(state.snapshot(), PlaybackState::default().snapshot());
    assert!(apply_line(r#"{"event":"end-file","reason":"eof"}"#, &state));
  }

  #[tokio::test]
  async fn read_loop_applies_in_order_and_stops_on_eof() {
    let (mut peer, ours) = tokio::io::duplex(1024);
    let state = PlaybackState::default();
    let ends = AtomicUsize::new(0);

    peer
      .write_all(b"{\"name\":\"duration\",\"data\":217.5}\n{\"event\":\"end-file\"}\n")
      .await
      .unwrap();
    drop(peer);

    let cancel = CancellationToken::new();
    let on_end = || {
      ends.fetch_add(1, Ordering::SeqCst);
    };
    let end = read_loop(ours, &state, on_end, &cancel).await;

    assert_eq!(end, SessionEnd::PeerClosed);
    assert_eq!(state.duration(), 217.5);
    assert_eq!(ends.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn read_loop_skips_non_utf8_line() {
    let (mut peer, ours) = tokio::io::duplex(1024);
    let state = PlaybackState::default();
    let ends = AtomicUsize::new(0);

    peer
      .write_all(b"{\"event\":\"x\",\"s\":\"\xff\xfe\"}\n{\"name\":\"duration\",\"data\":217.5}\n{\"event\":\"end-file\"}\n")
      .await
      .unwrap();
    drop(peer);

    let cancel = CancellationToken::new();
    let on_end = || {
      ends.fetch_add(1, Ordering::SeqCst);
    };
    let end = read_loop(ours, &state, on_end, &cancel).await;

    assert_eq!(end, SessionEnd::PeerClosed);
    assert_eq!(state.duration(), 217.5);
    assert_eq!(ends.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn read_loop_drops_oversized_line() {
    let (mut peer, ours) = tokio::io::duplex(64 * 1024);
    let state = PlaybackState::default();

    let writer = tokio::spawn(async move {
      let mut huge = b"{\"name\":\"duration\",\"data\":".to_vec();
      huge.resize(MAX_LINE_BYTES * 2, b'9');
      huge.extend_from_slice(b"}\n{\"name\":\"time-pos\",\"data\":3.5}\n");
      peer.write_all(&huge).await.unwrap();
    });

    let cancel = CancellationToken::new();
    let end = read_loop(ours, &state, || {}, &cancel).await;
    writer.await.unwrap();

    assert_eq!(end, SessionEnd::PeerClosed);
    assert_eq!(state.duration(), 1.0);
    assert_eq!(state.time_pos(), 3.5);
  }

  #[tokio::test]
  async fn read_loop_observes_cancellation() {
    let (_peer, ours) = tokio::io::duplex(64);
    let state = PlaybackState::default();
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert_eq!(
      read_loop(ours, &state, || {}, &cancel).await,
      SessionEnd::Cancelled
    );
  }

  #[tokio::test]
  async fn writer_frames_one_command_per_line() {
    let (ours, mut peer) = tokio::io::duplex(1024);
    let (writer, handle) = IpcWriter::spawn(ours);

    writer.send(&MpvCommand::cycle("pause")).unwrap();
    writer.send(&MpvCommand::add("volume", 5)).unwrap();
    writer.close();
    handle.await.unwrap();

    let mut received = String::new();
    peer.read_to_string(&mut received).await.unwrap();
    assert_eq!(
      received,
      "{\"command\":[\"cycle\",\"pause\"]}\n{\"command\":[\"add\",\"volume\",5]}\n"
    );
    assert!(matches!(
      writer.send(&MpvCommand::cycle("pause")),
      Err(IpcError::Disconnected)
    ));
  }

  #[tokio::test]
  async fn wait_and_connect_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    let result = wait_and_connect(
      &dir.path().join("missing.sock"),
      Duration::from_millis(10),
      Duration::from_millis(50),
      &cancel,
    )
    .await;
    assert!(matches!(result, ConnectResult::TimedOut));
  }

  #[tokio::test]
  async fn wait_and_connect_reports_io_error_for_non_socket() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain-file");
    std::fs::write(&path, b"").unwrap();
    let cancel = CancellationToken::new();
    let result = wait_and_connect(
      &path,
      Duration::from_millis(10),
      Duration::from_millis(50),
      &cancel,
    )
    .await;
    assert!(matches!(result, ConnectResult::IoError(_)));
  }
}
