//! PrivilegedCommandExecutor - password-prompting commands under a pty
//!
//! A privileged command runs attached to a pseudo terminal so that prompts a
//! plain pipe would never surface can be observed and answered. The
//! interaction is a small state machine:
//!
//! - `AwaitingPasswordPrompt`: watch for a password prompt for a short
//!   sub-timeout and answer it with the credential, exactly once
//! - `AwaitingConfirmation`: answer every yes/no prompt affirmatively until
//!   end of output, a completion marker, or an iteration timeout
//! - `Draining`: wait out the remaining overall timeout for natural exit
//! - `Done`: reap the process (or kill it if the overall timeout elapsed)

use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::credential::CredentialStore;
use super::policy::{InteractionPolicy, PromptAction};
use super::pty::{Expectation, Expecter, NativePty, PtySession};
use super::result::{CommandResult, ExitState};
use crate::config::{Config, PrivilegedConfig};
use crate::tools::ToolError;

/// How long to wait for the child to be reaped after its output closes
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Slack allowed on top of the overall timeout for the blocking worker
const WORKER_SLACK: Duration = Duration::from_secs(5);

/// States of the prompt-response interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    AwaitingPasswordPrompt,
    AwaitingConfirmation,
    Draining,
    Done,
}

/// Why the interaction reached `Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// Output closed on its own
    Eof,
    /// A completion marker was seen; nothing further can help
    Completed,
    /// The overall timeout elapsed
    TimedOut,
    /// Writing to the terminal failed
    WriteFailed,
}

/// Timeouts governing one privileged run
#[derive(Debug, Clone, Copy)]
pub struct PromptTimeouts {
    pub overall: Duration,
    pub password: Duration,
    pub confirmation: Duration,
}

impl From<&PrivilegedConfig> for PromptTimeouts {
    fn from(config: &PrivilegedConfig) -> Self {
        Self {
            overall: config.timeout(),
            password: config.password_timeout(),
            confirmation: config.confirmation_timeout(),
        }
    }
}

/// Drives one pty session through the prompt state machine
pub struct PromptDriver<'a, S: PtySession> {
    expecter: Expecter<S>,
    policy: &'a InteractionPolicy,
    secret: &'a SecretString,
    timeouts: PromptTimeouts,
    deadline: Instant,
    state: PromptState,
    finish: Option<Finish>,
    credential_sent: bool,
    confirmations: usize,
}

impl<'a, S: PtySession> PromptDriver<'a, S> {
    pub fn new(session: S, policy: &'a InteractionPolicy, secret: &'a SecretString, timeouts: PromptTimeouts) -> Self {
        Self {
            expecter: Expecter::new(session),
            policy,
            secret,
            timeouts,
            deadline: Instant::now() + timeouts.overall,
            state: PromptState::AwaitingPasswordPrompt,
            finish: None,
            credential_sent: false,
            confirmations: 0,
        }
    }

    pub fn state(&self) -> PromptState {
        self.state
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn done(&mut self, finish: Finish) -> PromptState {
        debug!(?finish, "PromptDriver::done: called");
        self.finish = Some(finish);
        PromptState::Done
    }

    /// Advance the state machine by one transition
    pub fn step(&mut self) -> PromptState {
        debug!(state = ?self.state, "PromptDriver::step: called");
        let next = match self.state {
            PromptState::AwaitingPasswordPrompt => self.await_password(),
            PromptState::AwaitingConfirmation => self.await_confirmation(),
            PromptState::Draining => self.drain(),
            PromptState::Done => PromptState::Done,
        };
        self.state = next;
        next
    }

    fn await_password(&mut self) -> PromptState {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return self.done(Finish::TimedOut);
        }
        let wait = self.timeouts.password.min(remaining);
        match self.expecter.expect(self.policy.password_rules(), wait) {
            Expectation::Matched(_) => {
                debug!("PromptDriver::await_password: password prompt seen, supplying credential");
                self.credential_sent = true;
                match self.expecter.send_line(self.secret.expose_secret()) {
                    Ok(()) => PromptState::AwaitingConfirmation,
                    Err(e) => {
                        warn!(%e, "Failed to write credential to terminal");
                        self.done(Finish::WriteFailed)
                    }
                }
            }
            Expectation::Eof => self.done(Finish::Eof),
            Expectation::TimedOut => {
                debug!("PromptDriver::await_password: no password prompt, continuing");
                PromptState::AwaitingConfirmation
            }
        }
    }

    fn await_confirmation(&mut self) -> PromptState {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return self.done(Finish::TimedOut);
        }
        let wait = self.timeouts.confirmation.min(remaining);
        match self.expecter.expect(self.policy.confirmation_rules(), wait) {
            Expectation::Matched(idx) => {
                if self.policy.confirmation_rules()[idx].action == PromptAction::Complete {
                    debug!("PromptDriver::await_confirmation: completion marker seen");
                    return self.done(Finish::Completed);
                }
                self.confirmations += 1;
                debug!(count = self.confirmations, "PromptDriver::await_confirmation: answering prompt");
                match self.expecter.send_line(self.policy.affirmative()) {
                    Ok(()) => PromptState::AwaitingConfirmation,
                    Err(e) => {
                        warn!(%e, "Failed to answer confirmation prompt");
                        self.done(Finish::WriteFailed)
                    }
                }
            }
            Expectation::Eof => self.done(Finish::Eof),
            Expectation::TimedOut => {
                debug!("PromptDriver::await_confirmation: iteration timed out, draining");
                PromptState::Draining
            }
        }
    }

    fn drain(&mut self) -> PromptState {
        let remaining = self.remaining();
        if self.expecter.wait_eof(remaining) {
            self.done(Finish::Eof)
        } else {
            self.done(Finish::TimedOut)
        }
    }

    /// Run to `Done` and reap the process
    pub fn run(mut self) -> DriveOutcome {
        while self.step() != PromptState::Done {}

        let finish = self.finish.unwrap_or(Finish::Eof);
        let exit = match finish {
            Finish::Eof => self.expecter.session_mut().close(CLOSE_GRACE),
            Finish::Completed | Finish::WriteFailed => {
                let state = self.expecter.session_mut().terminate();
                debug!(?state, "PromptDriver::run: terminated after interaction ended");
                state
            }
            Finish::TimedOut => {
                self.expecter.session_mut().terminate();
                ExitState::TimedOut
            }
        };

        DriveOutcome {
            transcript: self.expecter.transcript(),
            exit,
            finish,
            credential_sent: self.credential_sent,
            confirmations: self.confirmations,
        }
    }
}

/// What a finished interaction produced
#[derive(Debug, Clone)]
pub struct DriveOutcome {
    pub transcript: String,
    pub exit: ExitState,
    pub finish: Finish,
    pub credential_sent: bool,
    pub confirmations: usize,
}

/// Runs privileged commands under a pty, answering prompts automatically
#[derive(Debug, Clone)]
pub struct PrivilegedCommandExecutor {
    shell: String,
    credentials: CredentialStore,
    policy: InteractionPolicy,
    timeouts: PromptTimeouts,
}

impl PrivilegedCommandExecutor {
    pub fn new(
        shell: impl Into<String>,
        credentials: CredentialStore,
        policy: InteractionPolicy,
        timeouts: PromptTimeouts,
    ) -> Self {
        Self {
            shell: shell.into(),
            credentials,
            policy,
            timeouts,
        }
    }

    /// Build from config; a relative credential path resolves against `base_dir`
    pub fn from_config(config: &Config, base_dir: &Path) -> Result<Self, regex::Error> {
        let credential_path: PathBuf = if config.privileged.credential_file.is_absolute() {
            config.privileged.credential_file.clone()
        } else {
            base_dir.join(&config.privileged.credential_file)
        };
        Ok(Self::new(
            config.shell.clone(),
            CredentialStore::new(credential_path),
            InteractionPolicy::from_config(&config.privileged)?,
            PromptTimeouts::from(&config.privileged),
        ))
    }

    pub fn timeouts(&self) -> PromptTimeouts {
        self.timeouts
    }

    /// Run `command` in `cwd` under a pty
    ///
    /// Returns `CredentialUnavailable` without spawning anything when the
    /// credential cannot be loaded.
    pub async fn run(&self, command: &str, cwd: &Path) -> Result<CommandResult, ToolError> {
        debug!(%command, ?cwd, "PrivilegedCommandExecutor::run: called");
        if command.trim().is_empty() {
            return Err(ToolError::EmptyInput);
        }

        let secret = self.credentials.load()?;

        let shell = self.shell.clone();
        let owned_command = command.to_string();
        let owned_cwd = cwd.to_path_buf();
        let policy = self.policy.clone();
        let timeouts = self.timeouts;

        info!(%command, "Running privileged command under pty");
        let worker = tokio::task::spawn_blocking(move || -> Result<DriveOutcome, String> {
            let session = NativePty::spawn(&shell, &owned_command, &owned_cwd)?;
            Ok(PromptDriver::new(session, &policy, &secret, timeouts).run())
        });

        let outcome = match tokio::time::timeout(timeouts.overall + WORKER_SLACK, worker).await {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(reason))) => {
                debug!(%reason, "PrivilegedCommandExecutor::run: spawn failed");
                return Err(ToolError::ProcessSpawnFailure {
                    command: command.to_string(),
                    reason,
                });
            }
            Ok(Err(join_err)) => {
                return Err(ToolError::ProcessSpawnFailure {
                    command: command.to_string(),
                    reason: join_err.to_string(),
                });
            }
            Err(_) => {
                warn!(%command, "Privileged worker exceeded its deadline");
                return Ok(CommandResult::timed_out(command, cwd, "", timeouts.overall));
            }
        };

        debug!(
            finish = ?outcome.finish,
            exit = ?outcome.exit,
            credential_sent = outcome.credential_sent,
            confirmations = outcome.confirmations,
            "PrivilegedCommandExecutor::run: interaction finished"
        );

        if outcome.exit == ExitState::TimedOut {
            return Ok(CommandResult::timed_out(command, cwd, outcome.transcript, timeouts.overall));
        }
        Ok(CommandResult::completed(command, cwd, outcome.transcript, "", outcome.exit))
    }
}
