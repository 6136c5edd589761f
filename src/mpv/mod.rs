//! MPV IPC module - spawns and controls an external MPV player via JSON IPC.
//!
//! Architecture:
//! - `process.rs` - MPV binary detection, process-group spawning and teardown
//! - `ipc.rs` - Unix socket connection, reader and writer tasks
//! - `protocol.rs` - JSON command/message types
//! - `state.rs` - Atomic playback state written by the reader
//! - `client.rs` - Control-channel client with command methods

mod client;
mod ipc;
mod process;
mod protocol;
mod state;

pub use client::{ConnectTiming, MpvClient, SessionOutcome};
pub use ipc::{ConnectResult, EndOfTrack, IpcError, SessionEnd};
pub use process::{
  cleanup_ipc, default_socket_dir, find_mpv, fresh_ipc_path, ProcessError, ProcessHandle,
  Supervisor,
};
pub use protocol::{MpvCommand, MpvMessage, PropertyChange};
pub use state::{PlaybackSnapshot, PlaybackState, UNKNOWN_DURATION};
