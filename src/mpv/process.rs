//! MPV process detection, spawning and teardown.

use std::io;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
  #[error("MPV executable not found")]
  NotFound,
  #[error("Failed to spawn MPV: {0}")]
  SpawnFailed(#[from] io::Error),
}

/// Pick a fresh IPC socket path inside `dir`.
pub fn fresh_ipc_path(dir: &Path) -> PathBuf {
  dir.join(format!("cplayer-{}.sock", uuid::Uuid::new_v4()))
}

/// Default directory for IPC sockets.
pub fn default_socket_dir() -> PathBuf {
  dirs::runtime_dir().unwrap_or_else(std::env::temp_dir)
}

/// Find MPV executable in common locations.
pub fn find_mpv() -> Option<PathBuf> {
  if let Ok(path) = which::which("mpv") {
    return Some(path);
  }

  let common_paths = [
    "/usr/bin/mpv",
    "/usr/local/bin/mpv",
    "/opt/homebrew/bin/mpv",
  ];
  common_paths
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}

/// Remove a leftover socket. A stale endpoint left by a crashed engine
/// would otherwise look like a ready one.
pub fn cleanup_ipc(path: &Path) {
  match std::fs::remove_file(path) {
    Ok(()) => log::debug!("Removed stale IPC socket {}", path.display()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => log::warn!("Failed to remove IPC socket {}: {}", path.display(), e),
  }
}

/// Launches MPV processes with a fixed binary and argument set.
#[derive(Debug, Clone)]
pub struct Supervisor {
  mpv_path: Option<PathBuf>,
  extra_args: Vec<String>,
  terminate_grace: Duration,
}

impl Supervisor {
  pub fn new(mpv_path: Option<PathBuf>, extra_args: Vec<String>, terminate_grace: Duration) -> Self {
    Self {
      mpv_path,
      extra_args,
      terminate_grace,
    }
  }

  /// Spawn MPV playing `url` with its IPC server at `ipc_path`.
  ///
  /// The child leads its own process group so helpers it forks are
  /// reached by [`ProcessHandle::terminate`].
  pub fn launch(&self, url: &str, ipc_path: &Path) -> Result<ProcessHandle, ProcessError> {
    cleanup_ipc(ipc_path);

    let mpv_exe = self
      .mpv_path
      .clone()
      .or_else(find_mpv)
      .ok_or(ProcessError::NotFound)?;

    log::info!("Spawning MPV: {:?} with IPC: {}", mpv_exe, ipc_path.display());
    if !self.extra_args.is_empty() {
      log::info!("Extra MPV args: {:?}", self.extra_args);
    }

    let mut cmd = Command::new(&mpv_exe);
    cmd
      .arg(url)
      .arg("--no-video")
      .arg("--quiet")
      .arg(format!("--input-ipc-server={}", ipc_path.display()))
      .args(&self.extra_args)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .process_group(0);

    let child = cmd.spawn().map_err(|e| {
      cleanup_ipc(ipc_path);
      ProcessError::SpawnFailed(e)
    })?;

    let pid = child.id();
    log::info!("MPV started (pid: {})", pid);

    Ok(ProcessHandle {
      child: Some(child),
      pgid: pid as libc::pid_t,
      grace: self.terminate_grace,
    })
  }
}

/// A running MPV process and its process group.
#[derive(Debug)]
pub struct ProcessHandle {
  child: Option<Child>,
  pgid: libc::pid_t,
  grace: Duration,
}

impl ProcessHandle {
  pub fn pid(&self) -> u32 {
    self.pgid as u32
  }

  pub fn pgid(&self) -> i32 {
    self.pgid
  }

  fn signal_group(&self, signal: libc::c_int) -> io::Result<()> {
    // SAFETY: killpg has no memory-safety preconditions.
    let rc = unsafe { libc::killpg(self.pgid, signal) };
    if rc == 0 {
      Ok(())
    } else {
      Err(io::Error::last_os_error())
    }
  }

  /// SIGTERM the whole group, then reap the leader off the runtime.
  ///
  /// Escalates to SIGKILL if the leader outlives the grace period.
  /// Never fails: a group that is already gone is not an error.
  pub async fn terminate(mut self) -> Option<ExitStatus> {
    let mut child = self.child.take()?;
    let pgid = self.pgid;

    match self.signal_group(libc::SIGTERM) {
      Ok(()) => log::info!("Sent SIGTERM to MPV process group {}", pgid),
      Err(e) => log::debug!("SIGTERM to process group {} failed: {}", pgid, e),
    }

    let mut reaper = tokio::task::spawn_blocking(move || child.wait());

    let joined = match tokio::time::timeout(self.grace, &mut reaper).await {
      Ok(joined) => joined,
      Err(_) => {
        log::warn!(
          "MPV process group {} still alive after {:?}, sending SIGKILL",
          pgid,
          self.grace
        );
        if let Err(e) = self.signal_group(libc::SIGKILL) {
          log::debug!("SIGKILL to process group {} failed: {}", pgid, e);
        }
        reaper.await
      }
    };

    match joined {
      Ok(Ok(status)) => {
        log::info!("MPV process exited with: {}", status);
        Some(status)
      }
      Ok(Err(e)) => {
        log::error!("wait() failed: {}", e);
        None
      }
      Err(e) => {
        log::error!("spawn_blocking panicked during process cleanup: {}", e);
        None
      }
    }
  }
}

impl Drop for ProcessHandle {
  /// SIGTERM the group and reap the leader on a detached thread, so a
  /// handle dropped without [`ProcessHandle::terminate`] leaves no zombie.
  fn drop(&mut self) {
    let Some(mut child) = self.child.take() else {
      return;
    };
    log::debug!("ProcessHandle dropped without terminate, signalling group {}", self.pgid);
    let _ = self.signal_group(libc::SIGTERM);

    if let Ok(Some(_)) = child.try_wait() {
      return;
    }
    let spawned = std::thread::Builder::new()
      .name("mpv-reaper".into())
      .spawn(move || {
        if let Err(e) = child.wait() {
          log::warn!("Failed to reap dropped MPV process: {}", e);
        }
      });
    if let Err(e) = spawned {
      log::warn!("Failed to start MPV reaper thread: {}", e);
    }
  }
}
