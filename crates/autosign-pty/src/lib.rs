//! Pseudo-terminal subprocesses and prompt matching.
//!
//! Interactive signing tools only emit their passphrase prompt on a real
//! terminal. This crate spawns such tools on a pty ([`PtyProcess`]) and
//! exposes their output as a stream of labelled [`Event`]s ([`Expect`]),
//! with every wait bounded by a timeout.

mod error;
mod expect;
pub mod script;
mod terminal;

#[cfg(unix)]
mod pty;

pub use error::{PtyError, PtyResult};
pub use expect::{Event, Expect, PatternMatch, PatternTable};
pub use terminal::{ExitState, Launcher, ReadStatus, SpawnConfig, Terminal, DEFAULT_GRACE_MILLIS};

#[cfg(unix)]
pub use pty::{PtyLauncher, PtyProcess};
