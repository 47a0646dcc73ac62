//! CommandExecutor - non-privileged commands through the host shell

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use super::result::{CommandResult, ExitState};
use crate::config::Config;
use crate::tools::ToolError;

/// Runs a command with `shell -c` under a hard timeout
///
/// The child gets its own process group so a timeout kills every
/// descendant, not only the shell.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    shell: String,
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new(shell: impl Into<String>, timeout: Duration) -> Self {
        Self {
            shell: shell.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.shell.clone(), config.command.timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `command` in `cwd`, capturing stdout and stderr separately
    pub async fn run(&self, command: &str, cwd: &Path) -> Result<CommandResult, ToolError> {
        debug!(%command, ?cwd, timeout = ?self.timeout, "CommandExecutor::run: called");
        if command.trim().is_empty() {
            debug!("CommandExecutor::run: empty command");
            return Err(ToolError::EmptyInput);
        }

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(c) => {
                debug!(pid = ?c.id(), "CommandExecutor::run: spawned");
                c
            }
            Err(e) => {
                debug!(%e, "CommandExecutor::run: spawn failed");
                return Err(ToolError::ProcessSpawnFailure {
                    command: command.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        let pid = child.id();

        let (stdout_task, stdout_buf) = spawn_pipe_reader(child.stdout.take());
        let (stderr_task, stderr_buf) = spawn_pipe_reader(child.stderr.take());

        // Wait for exit and for both pipes to close under one deadline
        let outcome = tokio::time::timeout(self.timeout, async {
            let status = child.wait().await;
            let _ = stdout_task.await;
            let _ = stderr_task.await;
            status
        })
        .await;

        match outcome {
            Ok(Ok(status)) => {
                debug!(?status, "CommandExecutor::run: command completed");
                Ok(CommandResult::completed(
                    command,
                    cwd,
                    take_lossy(&stdout_buf),
                    take_lossy(&stderr_buf),
                    exit_state(status),
                ))
            }
            Ok(Err(e)) => {
                debug!(%e, "CommandExecutor::run: wait failed");
                kill_process_group(pid);
                Err(ToolError::ProcessSpawnFailure {
                    command: command.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                warn!(%command, timeout = ?self.timeout, "Command timed out, killing process group");
                kill_process_group(pid);
                let _ = child.kill().await;
                let _ = child.wait().await;
                let mut partial = take_lossy(&stdout_buf);
                partial.push_str(&take_lossy(&stderr_buf));
                Ok(CommandResult::timed_out(command, cwd, partial, self.timeout))
            }
        }
    }
}

type SharedBuf = Arc<Mutex<Vec<u8>>>;

/// Drain a pipe into a shared buffer so partial output survives a timeout
fn spawn_pipe_reader<R>(pipe: Option<R>) -> (tokio::task::JoinHandle<()>, SharedBuf)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf: SharedBuf = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buf);
    let handle = tokio::spawn(async move {
        let Some(mut pipe) = pipe else {
            return;
        };
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut b) = sink.lock() {
                        b.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        }
    });
    (handle, buf)
}

fn take_lossy(buf: &SharedBuf) -> String {
    match buf.lock() {
        Ok(b) => String::from_utf8_lossy(&b).to_string(),
        Err(_) => String::new(),
    }
}

fn exit_state(status: ExitStatus) -> ExitState {
    if let Some(code) = status.code() {
        return ExitState::Exited(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return ExitState::Signaled(sig);
        }
    }
    ExitState::Unknown
}

/// SIGKILL the process group led by `pid`
fn kill_process_group(pid: Option<u32>) {
    debug!(?pid, "kill_process_group: called");
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;
        if let Some(pid) = pid
            && let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL)
        {
            debug!(%e, "kill_process_group: killpg failed");
        }
    }
}
