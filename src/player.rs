use anyhow::{Context, Result};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

const REAP_TIMEOUT: Duration = Duration::from_millis(500);
const REAP_POLL: Duration = Duration::from_millis(10);

/// Receives play commands from the session. Fire-and-forget: failures are logged by
/// the implementation and never reported back.
pub trait PlaybackSink {
  fn request_play(&mut self, url: &str);

  /// Terminate whatever is playing. Called when the session exits.
  fn stop(&mut self);
}

/// Plays URLs by spawning an external player process, one at a time.
pub struct ExternalPlayer {
  command: String,
  args: Vec<String>,
  current_process: Option<Child>,
  current_url: Option<String>,
  /// Killed players that had not exited yet. Reaped by `check_status` and `shutdown`.
  stopping: Vec<Child>,
}

impl ExternalPlayer {
  pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
    Self { command: command.into(), args, current_process: None, current_url: None, stopping: Vec::new() }
  }

  pub fn is_playing(&self) -> bool {
    self.current_process.is_some()
  }

  pub fn current_url(&self) -> Option<&str> {
    self.current_url.as_deref()
  }

  #[cfg(test)]
  fn pid(&self) -> Option<u32> {
    self.current_process.as_ref().and_then(Child::id)
  }

  /// Drop the handle if the player already exited on its own, and reap killed players.
  pub fn check_status(&mut self) {
    self.stopping.retain_mut(|child| !matches!(child.try_wait(), Ok(Some(_))));
    let Some(child) = self.current_process.as_mut() else { return };
    match child.try_wait() {
      Ok(Some(status)) => {
        info!(%status, "player: process exited");
        self.current_process = None;
        self.current_url = None;
      }
      Ok(None) => {}
      Err(e) => debug!(err = %e, "player: failed to poll process"),
    }
  }

  fn spawn(&self, url: &str) -> Result<Child> {
    let mut cmd = Command::new(&self.command);
    cmd.args(&self.args).arg(url);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());
    cmd.kill_on_drop(true);

    cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow::anyhow!("{} not found. Install it or pass --player with another command", self.command)
      } else {
        anyhow::Error::new(e).context(format!("Failed to spawn {} process", self.command))
      }
    })
  }

  /// Kill the running player and every player still terminating, and wait for all of them.
  /// Used on program shutdown.
  pub async fn shutdown(&mut self) -> Result<()> {
    self.current_url = None;
    if let Some(child) = self.current_process.take() {
      self.stopping.push(child);
    }
    let mut first_error = None;
    for mut child in std::mem::take(&mut self.stopping) {
      let pid = child.id();
      let result = match child.try_wait() {
        Ok(Some(_)) => Ok(()),
        Ok(None) => child.kill().await.context("Failed to kill player process"),
        Err(e) => Err(anyhow::Error::new(e).context("Failed to poll player process")),
      };
      match result {
        Ok(()) => info!(pid = ?pid, "player: stopped on shutdown"),
        Err(e) => {
          error!(pid = ?pid, "player: shutdown failed: {:#}", e);
          first_error.get_or_insert(e);
        }
      }
    }
    first_error.map_or(Ok(()), Err)
  }

  /// Kill `child` and wait a bounded time for it to exit. A player that outlives the
  /// wait is kept in `stopping` for later reaping.
  fn terminate(&mut self, mut child: Child) {
    if let Err(e) = child.start_kill() {
      debug!(err = %e, "player: kill of previous process failed");
    }
    let deadline = Instant::now() + REAP_TIMEOUT;
    loop {
      match child.try_wait() {
        Ok(Some(status)) => {
          debug!(%status, "player: previous process reaped");
          return;
        }
        Ok(None) if Instant::now() < deadline => std::thread::sleep(REAP_POLL),
        Ok(None) => {
          warn!(pid = ?child.id(), "player: previous process still terminating");
          self.stopping.push(child);
          return;
        }
        Err(e) => {
          debug!(err = %e, "player: failed to reap previous process");
          self.stopping.push(child);
          return;
        }
      }
    }
  }
}

impl PlaybackSink for ExternalPlayer {
  fn request_play(&mut self, url: &str) {
    self.stop();
    match self.spawn(url) {
      Ok(child) => {
        info!(pid = ?child.id(), url = %url, "player: started");
        self.current_process = Some(child);
        self.current_url = Some(url.to_string());
      }
      Err(e) => {
        error!(url = %url, "player: failed to start: {:#}", e);
      }
    }
  }

  fn stop(&mut self) {
    self.current_url = None;
    if let Some(child) = self.current_process.take() {
      self.terminate(child);
    }
  }
}
