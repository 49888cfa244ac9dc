//! Scripted terminals for exercising prompt state machines without a
//! subprocess.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::error::{PtyError, PtyResult};
use crate::terminal::{ExitState, Launcher, ReadStatus, SpawnConfig, Terminal};

/// One scripted behaviour of the fake subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Emit these bytes on the next read.
    Output(Vec<u8>),
    /// Close the terminal. Stays at the head of the script.
    Eof,
    /// Produce nothing until the caller's deadline. Stays at the head.
    Hang,
}

impl Step {
    pub fn output(text: impl AsRef<[u8]>) -> Self {
        Step::Output(text.as_ref().to_vec())
    }
}

#[derive(Debug, Default)]
struct ScriptLog {
    sent: Vec<Vec<u8>>,
    closed: bool,
    terminated: bool,
}

/// Observes what the driver did to a [`ScriptedTerminal`].
#[derive(Debug, Clone, Default)]
pub struct ScriptHandle(Arc<Mutex<ScriptLog>>);

impl ScriptHandle {
    fn log(&self) -> MutexGuard<'_, ScriptLog> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lines written to the terminal, without the trailing newline.
    pub fn sent_lines(&self) -> Vec<Vec<u8>> {
        self.log().sent.clone()
    }

    pub fn was_closed(&self) -> bool {
        self.log().closed
    }

    pub fn was_terminated(&self) -> bool {
        self.log().terminated
    }
}

/// An in-memory terminal replaying a fixed script.
#[derive(Debug)]
pub struct ScriptedTerminal {
    steps: VecDeque<Step>,
    handle: ScriptHandle,
    exit_code: i32,
    echo: bool,
}

impl ScriptedTerminal {
    pub fn new(steps: Vec<Step>) -> (Self, ScriptHandle) {
        let handle = ScriptHandle::default();
        let terminal = Self {
            steps: steps.into(),
            handle: handle.clone(),
            exit_code: 0,
            echo: false,
        };
        (terminal, handle)
    }

    /// Exit status reported by `close` once the script reaches EOF.
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Echo written lines back as output, like a terminal with echo on.
    pub fn echo(mut self) -> Self {
        self.echo = true;
        self
    }
}

impl Terminal for ScriptedTerminal {
    fn read_until(&mut self, deadline: Instant) -> PtyResult<ReadStatus> {
        match self.steps.front() {
            None | Some(Step::Eof) => Ok(ReadStatus::Eof),
            Some(Step::Hang) => {
                std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
                Ok(ReadStatus::TimedOut)
            }
            Some(Step::Output(_)) => match self.steps.pop_front() {
                Some(Step::Output(bytes)) => Ok(ReadStatus::Data(bytes)),
                _ => Ok(ReadStatus::Eof),
            },
        }
    }

    fn send_line(&mut self, line: &[u8]) -> PtyResult<()> {
        if self.handle.was_closed() || self.handle.was_terminated() {
            return Err(PtyError::Closed);
        }
        self.handle.log().sent.push(line.to_vec());
        if self.echo {
            let mut echoed = line.to_vec();
            echoed.extend_from_slice(b"\r\n");
            self.steps.push_front(Step::Output(echoed));
        }
        Ok(())
    }

    fn close(&mut self) -> PtyResult<ExitState> {
        if matches!(self.steps.front(), Some(Step::Hang)) {
            return self.terminate();
        }
        self.handle.log().closed = true;
        Ok(ExitState::Exited(self.exit_code))
    }

    fn terminate(&mut self) -> PtyResult<ExitState> {
        self.handle.log().terminated = true;
        Ok(ExitState::Terminated)
    }
}

/// Hands out queued [`ScriptedTerminal`]s and records every spawn request.
#[derive(Debug, Default)]
pub struct ScriptedLauncher {
    terminals: Mutex<VecDeque<ScriptedTerminal>>,
    launches: Mutex<Vec<SpawnConfig>>,
}

impl ScriptedLauncher {
    pub fn new(terminals: Vec<ScriptedTerminal>) -> Self {
        Self {
            terminals: Mutex::new(terminals.into()),
            launches: Mutex::new(Vec::new()),
        }
    }

    /// Spawn requests seen so far.
    pub fn launches(&self) -> Vec<SpawnConfig> {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Launcher for ScriptedLauncher {
    type Terminal = ScriptedTerminal;

    fn launch(&self, config: &SpawnConfig) -> PtyResult<ScriptedTerminal> {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(config.clone());
        self.terminals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| PtyError::Spawn {
                program: config.program.display().to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no scripted terminal left"),
            })
    }
}

impl<L: Launcher + ?Sized> Launcher for &L {
    type Terminal = L::Terminal;

    fn launch(&self, config: &SpawnConfig) -> PtyResult<L::Terminal> {
        (**self).launch(config)
    }
}
