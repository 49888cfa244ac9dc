//! The narrow interface the prompt engine drives.
//!
//! A [`Terminal`] is anything that yields output chunks under a deadline,
//! accepts input lines and can be closed or forcibly terminated. The real
//! implementation is a pseudo-terminal subprocess; tests use a scripted one.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::error::PtyResult;

/// Default grace period between asking a child to exit and killing it.
pub const DEFAULT_GRACE_MILLIS: u64 = 2000;

/// Outcome of a single bounded read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStatus {
    /// Bytes were read from the terminal.
    Data(Vec<u8>),
    /// The other end closed the terminal.
    Eof,
    /// The deadline passed with no output.
    TimedOut,
}

/// How the subprocess ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Exited on its own with this status code.
    Exited(i32),
    /// Killed by a signal it did not receive from us.
    Signaled(i32),
    /// Forcibly terminated by the caller.
    Terminated,
}

impl ExitState {
    /// Exited on its own with status zero.
    pub fn is_clean(&self) -> bool {
        matches!(self, ExitState::Exited(0))
    }
}

impl std::fmt::Display for ExitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitState::Exited(code) => write!(f, "exit status {}", code),
            ExitState::Signaled(sig) => write!(f, "killed by signal {}", sig),
            ExitState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Spawn parameters for one terminal subprocess.
///
/// Environment entries are applied to the child only; the parent's
/// environment is never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnConfig {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
    /// How long `close` waits for a voluntary exit, and `terminate` waits
    /// between SIGTERM and SIGKILL.
    pub grace: Duration,
}

impl SpawnConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
            grace: Duration::from_millis(DEFAULT_GRACE_MILLIS),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Program and arguments joined for log output.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

/// A running interactive subprocess.
pub trait Terminal {
    /// Read the next chunk of output, waiting no later than `deadline`.
    fn read_until(&mut self, deadline: Instant) -> PtyResult<ReadStatus>;

    /// Write `line` followed by a newline.
    fn send_line(&mut self, line: &[u8]) -> PtyResult<()>;

    /// Wait briefly for the child to exit, terminating it if it does not.
    fn close(&mut self) -> PtyResult<ExitState>;

    /// Forcibly stop the child and reap it.
    fn terminate(&mut self) -> PtyResult<ExitState>;
}

impl<T: Terminal + ?Sized> Terminal for Box<T> {
    fn read_until(&mut self, deadline: Instant) -> PtyResult<ReadStatus> {
        (**self).read_until(deadline)
    }

    fn send_line(&mut self, line: &[u8]) -> PtyResult<()> {
        (**self).send_line(line)
    }

    fn close(&mut self) -> PtyResult<ExitState> {
        (**self).close()
    }

    fn terminate(&mut self) -> PtyResult<ExitState> {
        (**self).terminate()
    }
}

/// Starts terminals. Lets callers swap real subprocesses for scripted ones.
pub trait Launcher {
    type Terminal: Terminal;

    fn launch(&self, config: &SpawnConfig) -> PtyResult<Self::Terminal>;
}
