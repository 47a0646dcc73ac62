//! Pseudo-terminal sessions and pattern-driven reads over them

use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::policy::{PromptRule, find_earliest};
use super::result::ExitState;

/// One read from a terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    Data(Vec<u8>),
    Eof,
    TimedOut,
}

/// A process attached to a pseudo terminal
///
/// Implemented by [`NativePty`] for real processes and by scripted fakes in
/// tests.
pub trait PtySession: Send {
    /// Wait at most `timeout` for the next chunk of output
    fn read(&mut self, timeout: Duration) -> ReadEvent;

    /// Write `line` followed by a line terminator
    fn send_line(&mut self, line: &str) -> std::io::Result<()>;

    /// Reap the process without killing it, waiting at most `grace`
    ///
    /// Falls back to [`PtySession::terminate`] if it is still running.
    fn close(&mut self, grace: Duration) -> ExitState;

    /// Kill the whole process group and reap it
    fn terminate(&mut self) -> ExitState;
}

/// Terminal geometry for spawned commands
const PTY_SIZE: PtySize = PtySize {
    rows: 24,
    cols: 200,
    pixel_width: 0,
    pixel_height: 0,
};

/// A real process running under a portable-pty pseudo terminal
pub struct NativePty {
    child: Box<dyn Child + Send + Sync>,
    writer: Box<dyn Write + Send>,
    output: Receiver<Vec<u8>>,
    // Held so the master side stays open until the session is dropped
    _master: Box<dyn MasterPty + Send>,
}

impl NativePty {
    /// Spawn `shell -c command` in `cwd` attached to a fresh pty
    pub fn spawn(shell: &str, command: &str, cwd: &Path) -> Result<Self, String> {
        debug!(%shell, %command, ?cwd, "NativePty::spawn: called");
        let pair = native_pty_system()
            .openpty(PTY_SIZE)
            .map_err(|e| format!("Failed to open PTY: {}", e))?;

        let mut cmd = CommandBuilder::new(shell);
        cmd.arg("-c");
        cmd.arg(command);
        cmd.cwd(cwd);
        cmd.env("TERM", "dumb");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| format!("Failed to spawn PTY command: {}", e))?;
        // Only the child may hold the slave, otherwise EOF never arrives
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| format!("Failed to clone PTY reader: {}", e))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| format!("Failed to take PTY writer: {}", e))?;

        debug!(pid = ?child.process_id(), "NativePty::spawn: child started");
        Ok(Self {
            child,
            writer,
            output: spawn_reader_thread(reader),
            _master: pair.master,
        })
    }

    fn exit_state(status: portable_pty::ExitStatus) -> ExitState {
        ExitState::Exited(status.exit_code() as i32)
    }
}

/// Pump pty output into a channel; the channel closes at EOF
fn spawn_reader_thread(mut reader: Box<dyn Read + Send>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                // Linux reports EIO once the slave side has closed
                Err(_) => break,
            }
        }
    });
    rx
}

impl PtySession for NativePty {
    fn read(&mut self, timeout: Duration) -> ReadEvent {
        match self.output.recv_timeout(timeout) {
            Ok(chunk) => ReadEvent::Data(chunk),
            Err(RecvTimeoutError::Timeout) => ReadEvent::TimedOut,
            Err(RecvTimeoutError::Disconnected) => ReadEvent::Eof,
        }
    }

    fn send_line(&mut self, line: &str) -> std::io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    fn close(&mut self, grace: Duration) -> ExitState {
        debug!(?grace, "NativePty::close: called");
        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(?status, "NativePty::close: child exited");
                    return Self::exit_state(status);
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(20)),
                Ok(None) => {
                    warn!("PTY child still running after output closed, terminating");
                    self.terminate();
                    return ExitState::Unknown;
                }
                Err(e) => {
                    warn!(%e, "Failed to query PTY child status");
                    return ExitState::Unknown;
                }
            }
        }
    }

    fn terminate(&mut self) -> ExitState {
        debug!(pid = ?self.child.process_id(), "NativePty::terminate: called");
        #[cfg(unix)]
        {
            if let Some(pid) = self.child.process_id() {
                use nix::sys::signal::{Signal, killpg};
                use nix::unistd::Pid;
                // The pty child is a session leader, so its pid is the group id
                if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                    debug!(%e, "NativePty::terminate: killpg failed");
                }
            }
        }
        let _ = self.child.kill();
        match self.child.wait() {
            Ok(status) => Self::exit_state(status),
            Err(e) => {
                debug!(%e, "NativePty::terminate: wait failed");
                ExitState::Unknown
            }
        }
    }
}

/// Outcome of waiting for a set of patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Rule at this index matched; output up to the match was consumed
    Matched(usize),
    Eof,
    TimedOut,
}

/// Unmatched output kept for pattern matching after a miss, in bytes
///
/// Prompts are short and arrive at the end of output, so only the tail matters.
pub const PENDING_TAIL: usize = 1024;

/// Buffered, pattern-matching reader over a [`PtySession`]
pub struct Expecter<S: PtySession> {
    session: S,
    pending: String,
    transcript: String,
    // Incomplete UTF-8 sequence held back until the next chunk
    carry: Vec<u8>,
    eof: bool,
}

impl<S: PtySession> Expecter<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            pending: String::new(),
            transcript: String::new(),
            carry: Vec::new(),
            eof: false,
        }
    }

    /// Wait up to `timeout` for the earliest match of any rule
    pub fn expect(&mut self, rules: &[PromptRule], timeout: Duration) -> Expectation {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some((idx, end)) = find_earliest(rules, &self.pending) {
                debug!(rule = idx, "Expecter::expect: matched");
                self.pending.drain(..end);
                return Expectation::Matched(idx);
            }
            if self.eof {
                return Expectation::Eof;
            }
            self.trim_pending();
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Expectation::TimedOut;
            }
            match self.session.read(remaining) {
                ReadEvent::Data(bytes) => self.push(&bytes),
                ReadEvent::Eof => self.finish(),
                ReadEvent::TimedOut => return Expectation::TimedOut,
            }
        }
    }

    /// Wait up to `timeout` for end of output; true if it arrived
    pub fn wait_eof(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.eof {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.session.read(remaining) {
                ReadEvent::Data(bytes) => {
                    self.push(&bytes);
                    self.trim_pending();
                }
                ReadEvent::Eof => self.finish(),
                ReadEvent::TimedOut => return false,
            }
        }
        true
    }

    pub fn send_line(&mut self, line: &str) -> std::io::Result<()> {
        self.session.send_line(line)
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Everything the process printed, with terminal line endings normalized
    pub fn transcript(&self) -> String {
        self.transcript.replace("\r\n", "\n")
    }

    /// Decode `bytes` after any carried partial sequence
    ///
    /// A multi-byte character split across reads is held in `carry` until
    /// its remaining bytes arrive. Invalid bytes decode to U+FFFD.
    fn push(&mut self, bytes: &[u8]) {
        self.carry.extend_from_slice(bytes);
        let mut text = String::with_capacity(self.carry.len());
        let mut rest: &[u8] = &self.carry;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        let carry = rest.to_vec();
        self.carry = carry;
        self.pending.push_str(&text);
        self.transcript.push_str(&text);
    }

    /// End of output: a dangling partial sequence can no longer complete
    fn finish(&mut self) {
        if !self.carry.is_empty() {
            let tail = String::from_utf8_lossy(&self.carry).into_owned();
            self.carry.clear();
            self.pending.push_str(&tail);
            self.transcript.push_str(&tail);
        }
        self.eof = true;
    }

    /// Drop all but the last [`PENDING_TAIL`] bytes of unmatched output
    fn trim_pending(&mut self) {
        if self.pending.len() <= PENDING_TAIL {
            return;
        }
        let mut cut = self.pending.len() - PENDING_TAIL;
        while !self.pending.is_char_boundary(cut) {
            cut += 1;
        }
        self.pending.drain(..cut);
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted pty used to drive the prompt state machine without a shell

    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    pub enum Step {
        Output(&'static str),
        /// Raw bytes, possibly cutting a character in half
        Bytes(&'static [u8]),
        /// Nothing arrives before the caller's timeout
        Stall,
        Eof,
    }

    pub struct ScriptedPty {
        steps: VecDeque<Step>,
        pub sent: Arc<Mutex<Vec<String>>>,
        pub terminated: Arc<Mutex<bool>>,
        exit: ExitState,
    }

    impl ScriptedPty {
        pub fn new(steps: Vec<Step>, exit: ExitState) -> Self {
            Self {
                steps: steps.into(),
                sent: Arc::new(Mutex::new(Vec::new())),
                terminated: Arc::new(Mutex::new(false)),
                exit,
            }
        }
    }

    impl PtySession for ScriptedPty {
        fn read(&mut self, _timeout: Duration) -> ReadEvent {
            match self.steps.pop_front() {
                Some(Step::Output(text)) => ReadEvent::Data(text.as_bytes().to_vec()),
                Some(Step::Bytes(bytes)) => ReadEvent::Data(bytes.to_vec()),
                Some(Step::Stall) => ReadEvent::TimedOut,
                Some(Step::Eof) | None => ReadEvent::Eof,
            }
        }

        fn send_line(&mut self, line: &str) -> std::io::Result<()> {
            self.sent.lock().unwrap().push(line.to_string());
            Ok(())
        }

        fn close(&mut self, _grace: Duration) -> ExitState {
            self.exit
        }

        fn terminate(&mut self) -> ExitState {
            *self.terminated.lock().unwrap() = true;
            ExitState::Signaled(9)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{ScriptedPty, Step};
    use super::*;
    use crate::shell::policy::InteractionPolicy;

    #[test]
    fn test_expect_matches_across_chunks() {
        let policy = InteractionPolicy::default();
        let pty = ScriptedPty::new(
            vec![Step::Output("[sudo] pass"), Step::Output("word for bob: "), Step::Eof],
            ExitState::Exited(0),
        );
        let mut expecter = Expecter::new(pty);

        let hit = expecter.expect(policy.password_rules(), Duration::from_secs(1));
        assert_eq!(hit, Expectation::Matched(0));
    }

    #[test]
    fn test_expect_reports_eof_and_timeout() {
        let policy = InteractionPolicy::default();
        let mut expecter = Expecter::new(ScriptedPty::new(vec![Step::Output("hi\n"), Step::Eof], ExitState::Exited(0)));
        assert_eq!(expecter.expect(policy.password_rules(), Duration::from_secs(1)), Expectation::Eof);
        assert_eq!(expecter.transcript(), "hi\n");

        let mut expecter = Expecter::new(ScriptedPty::new(vec![Step::Stall], ExitState::Exited(0)));
        assert_eq!(expecter.expect(policy.password_rules(), Duration::from_secs(1)), Expectation::TimedOut);
    }

    #[test]
    fn test_transcript_normalizes_crlf() {
        let mut expecter = Expecter::new(ScriptedPty::new(
            vec![Step::Output("a\r\nb\r\n"), Step::Eof],
            ExitState::Exited(0),
        ));
        assert!(expecter.wait_eof(Duration::from_secs(1)));
        assert_eq!(expecter.transcript(), "a\nb\n");
    }

    #[test]
    fn test_character_split_across_reads() {
        // `…` is E2 80 A6
        let mut expecter = Expecter::new(ScriptedPty::new(
            vec![Step::Bytes(b"gelesen\xE2"), Step::Bytes(b"\x80\xA6 Fertig"), Step::Eof],
            ExitState::Exited(0),
        ));
        assert!(expecter.wait_eof(Duration::from_secs(1)));
        assert_eq!(expecter.transcript(), "gelesen\u{2026} Fertig");
    }

    #[test]
    fn test_invalid_and_dangling_bytes_are_replaced() {
        let mut expecter = Expecter::new(ScriptedPty::new(
            vec![Step::Bytes(b"a\xFFb"), Step::Bytes(b"c\xE2\x80"), Step::Eof],
            ExitState::Exited(0),
        ));
        assert!(expecter.wait_eof(Duration::from_secs(1)));
        assert_eq!(expecter.transcript(), "a\u{FFFD}bc\u{FFFD}");
    }

    #[test]
    fn test_prompt_split_mid_character_still_matches() {
        let policy = InteractionPolicy::default();
        let mut expecter = Expecter::new(ScriptedPty::new(
            vec![
                Step::Bytes(b"\xC3\xBCbersetze\n[sudo] password for j\xC3"),
                Step::Bytes(b"\xBCrgen: "),
                Step::Eof,
            ],
            ExitState::Exited(0),
        ));
        assert_eq!(
            expecter.expect(policy.password_rules(), Duration::from_secs(1)),
            Expectation::Matched(0)
        );
        assert!(!expecter.transcript().contains('\u{FFFD}'));
    }

    #[test]
    fn test_pending_stays_bounded_without_matches() {
        const LINE: &str = "Unpacking libfoo (1.2.3) over (1.2.2) ...\n";
        let policy = InteractionPolicy::default();
        let mut steps: Vec<Step> = (0..2_000).map(|_| Step::Output(LINE)).collect();
        steps.push(Step::Eof);
        let mut expecter = Expecter::new(ScriptedPty::new(steps, ExitState::Exited(0)));

        assert_eq!(
            expecter.expect(policy.confirmation_rules(), Duration::from_secs(5)),
            Expectation::Eof
        );
        assert!(expecter.pending.len() <= PENDING_TAIL + LINE.len());
        assert_eq!(expecter.transcript().len(), LINE.len() * 2_000);
    }

    #[test]
    fn test_prompt_after_long_output_still_matches() {
        const LINE: &str = "Get:1 http://deb.example.org stable/main amd64 pkg [10 kB]\n";
        let policy = InteractionPolicy::default();
        let mut steps: Vec<Step> = (0..500).map(|_| Step::Output(LINE)).collect();
        steps.push(Step::Output("Do you want to continue? [Y/n] "));
        steps.push(Step::Eof);
        let mut expecter = Expecter::new(ScriptedPty::new(steps, ExitState::Exited(0)));

        assert!(matches!(
            expecter.expect(policy.confirmation_rules(), Duration::from_secs(5)),
            Expectation::Matched(_)
        ));
    }

    #[test]
    #[cfg(unix)]
    fn test_native_pty_echo() {
        let temp = tempfile::tempdir().unwrap();
        let pty = NativePty::spawn("/bin/sh", "echo from-pty", temp.path()).unwrap();
        let mut expecter = Expecter::new(pty);

        assert!(expecter.wait_eof(Duration::from_secs(10)));
        assert!(expecter.transcript().contains("from-pty"));
        assert_eq!(expecter.session_mut().close(Duration::from_secs(5)), ExitState::Exited(0));
    }
}
