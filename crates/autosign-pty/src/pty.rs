//! Pseudo-terminal subprocesses.
//!
//! The child runs in its own session with the pty slave as its controlling
//! terminal, so tools that only prompt on a real tty (gpg via rpm) behave as
//! they would interactively. Every read is bounded by `poll(2)`.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};
use nix::pty::{openpty, OpenptyResult};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{setsid, Pid};

use crate::error::{PtyError, PtyResult};
use crate::terminal::{ExitState, Launcher, ReadStatus, SpawnConfig, Terminal};

const READ_CHUNK: usize = 4096;
const REAP_POLL: Duration = Duration::from_millis(20);

/// A subprocess attached to a pseudo-terminal.
#[derive(Debug)]
pub struct PtyProcess {
    child: Child,
    master: File,
    program: String,
    grace: Duration,
    eof: bool,
    exit: Option<ExitState>,
}

impl PtyProcess {
    /// Spawn `config` on a fresh pseudo-terminal.
    pub fn spawn(config: &SpawnConfig) -> PtyResult<Self> {
        let OpenptyResult { master, slave } =
            openpty(None, None).map_err(|e| PtyError::Allocate(e.to_string()))?;
        let program = config.program.display().to_string();

        // The command holds the parent's copies of the slave; dropping it at
        // the end of this block leaves the child as the only holder, so EOF
        // on the master means the child side is gone.
        let child = {
            let mut command = Command::new(&config.program);
            command
                .args(&config.args)
                .envs(&config.env)
                .stdin(Stdio::from(slave.try_clone()?))
                .stdout(Stdio::from(slave.try_clone()?))
                .stderr(Stdio::from(slave));
            if let Some(dir) = &config.working_dir {
                command.current_dir(dir);
            }

            // SAFETY: setsid and ioctl are async-signal-safe and touch no
            // parent state.
            unsafe {
                command.pre_exec(|| {
                    setsid()?;
                    if libc::ioctl(0, libc::TIOCSCTTY as _, 0) == -1 {
                        return Err(io::Error::last_os_error());
                    }
                    Ok(())
                });
            }

            command.spawn().map_err(|source| PtyError::Spawn {
                program: program.clone(),
                source,
            })?
        };

        tracing::debug!(pid = child.id(), program = %program, "spawned terminal subprocess");

        Ok(Self {
            child,
            master: File::from(master),
            program,
            grace: config.grace,
            eof: false,
            exit: None,
        })
    }

    /// Process id of the child.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    fn wait_for_exit(&mut self, limit: Duration) -> PtyResult<Option<ExitStatus>> {
        let start = Instant::now();
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(Some(status));
            }
            if start.elapsed() >= limit {
                return Ok(None);
            }
            std::thread::sleep(REAP_POLL);
        }
    }
}

fn exit_state(status: ExitStatus) -> ExitState {
    match (status.code(), status.signal()) {
        (Some(code), _) => ExitState::Exited(code),
        (None, Some(sig)) => ExitState::Signaled(sig),
        (None, None) => ExitState::Terminated,
    }
}

impl Terminal for PtyProcess {
    fn read_until(&mut self, deadline: Instant) -> PtyResult<ReadStatus> {
        if self.eof {
            return Ok(ReadStatus::Eof);
        }

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(ReadStatus::TimedOut);
            }
            let wait_ms = (deadline - now).as_millis().min(u128::from(u16::MAX)) as u16;

            let ready = {
                let mut fds = [PollFd::new(self.master.as_fd(), PollFlags::POLLIN)];
                poll(&mut fds, wait_ms)
            };
            match ready {
                Ok(0) => continue,
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(PtyError::Io(e.into())),
            }

            let mut buf = [0u8; READ_CHUNK];
            match self.master.read(&mut buf) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(ReadStatus::Eof);
                }
                Ok(n) => return Ok(ReadStatus::Data(buf[..n].to_vec())),
                // Linux reports a closed slave as EIO on the master.
                Err(e) if e.raw_os_error() == Some(libc::EIO) => {
                    self.eof = true;
                    return Ok(ReadStatus::Eof);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn send_line(&mut self, line: &[u8]) -> PtyResult<()> {
        if self.exit.is_some() {
            return Err(PtyError::Closed);
        }
        self.master.write_all(line)?;
        self.master.write_all(b"\n")?;
        self.master.flush()?;
        Ok(())
    }

    fn close(&mut self) -> PtyResult<ExitState> {
        if let Some(state) = self.exit {
            return Ok(state);
        }
        match self.wait_for_exit(self.grace)? {
            Some(status) => {
                let state = exit_state(status);
                self.exit = Some(state);
                Ok(state)
            }
            None => {
                tracing::warn!(program = %self.program, "subprocess did not exit after end of output");
                self.terminate()
            }
        }
    }

    fn terminate(&mut self) -> PtyResult<ExitState> {
        if let Some(state) = self.exit {
            return Ok(state);
        }

        // The child leads its own session, so its pid is also its group id.
        let group = Pid::from_raw(self.child.id() as i32);
        let _ = killpg(group, Signal::SIGTERM);

        if self.wait_for_exit(self.grace)?.is_none() {
            let _ = killpg(group, Signal::SIGKILL);
            let _ = self.child.kill();
            self.child.wait()?;
        }

        tracing::debug!(program = %self.program, "terminated subprocess");
        self.exit = Some(ExitState::Terminated);
        Ok(ExitState::Terminated)
    }
}

impl Drop for PtyProcess {
    fn drop(&mut self) {
        if self.exit.is_none() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Launches real pseudo-terminal subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct PtyLauncher;

impl Launcher for PtyLauncher {
    type Terminal = PtyProcess;

    fn launch(&self, config: &SpawnConfig) -> PtyResult<PtyProcess> {
        PtyProcess::spawn(config)
    }
}
