//! Signing session driver.
//!
//! Runs the signing tool on a pseudo-terminal, answers every passphrase
//! prompt with the profile's secret and classifies how the session ended:
//!
//! 1. Disabled profiles return [`SignOutcome::Disabled`] without spawning.
//! 2. The prompt loop answers up to [`MAX_PROMPTS`] prompts (tokens may ask
//!    twice) until any other event: EOF, a failure/skip/error marker, or a
//!    timeout. One prompt past the limit counts as a rejected passphrase.
//! 3. Timeouts and over-limit prompts terminate the subprocess; everything
//!    else is closed and reaped.
//! 4. Anything but EOF with a clean exit becomes a [`SigningFailure`]
//!    carrying the redacted transcript. There are no retries here.

mod command;
mod outcome;
mod patterns;

use std::path::PathBuf;
use std::time::Duration;

use autosign_pty::{Event, Expect, Launcher, PatternTable, Terminal};

#[cfg(unix)]
use autosign_pty::PtyLauncher;

pub use command::{SigningCommand, SUBPROCESS_LOCALE};
pub use outcome::{SessionOutcome, SignError, SignOutcome, SignResult, SigningFailure};
pub use patterns::{
    default_patterns, SignPrompt, PASSPHRASE_PROMPT, REJECTED_MARKER, SKIPPED_MARKER,
    TOOL_ERROR_MARKER,
};

use crate::config::SigningProfile;
use crate::verify::{ensure_all_signed, Verifier};

/// Passphrase prompts answered per session. Hardware tokens ask twice.
pub const MAX_PROMPTS: usize = 3;

/// How long to keep collecting diagnostics after a failure marker.
const DIAGNOSTIC_DRAIN: Duration = Duration::from_secs(1);

/// Drives signing sessions through a [`Launcher`].
#[derive(Debug)]
pub struct SigningDriver<L> {
    launcher: L,
    patterns: PatternTable<SignPrompt>,
}

#[cfg(unix)]
impl SigningDriver<PtyLauncher> {
    /// Driver spawning real pseudo-terminal subprocesses.
    pub fn new() -> SignResult<Self> {
        Self::with_launcher(PtyLauncher)
    }
}

impl<L: Launcher> SigningDriver<L> {
    pub fn with_launcher(launcher: L) -> SignResult<Self> {
        Ok(Self {
            launcher,
            patterns: default_patterns()?,
        })
    }

    /// Replace the prompt/marker table, e.g. for another tool version.
    pub fn with_patterns(mut self, patterns: PatternTable<SignPrompt>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Sign `artifacts` (source package first) with `profile`.
    pub fn sign(&self, profile: &SigningProfile, artifacts: &[PathBuf]) -> SignResult<SignOutcome> {
        if !profile.enabled {
            tracing::info!(section = %profile.section, "signing not enabled for this target, skipping");
            return Ok(SignOutcome::Disabled);
        }
        if artifacts.is_empty() {
            return Err(SignError::NoArtifacts);
        }

        let command = SigningCommand::build(profile, artifacts);
        tracing::info!(
            key = %profile.key_name,
            artifacts = artifacts.len(),
            command = %command.display(),
            "attempting to sign packages"
        );

        let terminal = self.launcher.launch(&command.spawn_config())?;
        let mut session = Expect::new(terminal, self.patterns.clone(), profile.timeouts.prompt);

        let mut prompts_answered = 0;
        let last = loop {
            let event = match session.next_event() {
                Ok(event) => event,
                Err(e) => {
                    let _ = session.terminal_mut().terminate();
                    return Err(e.into());
                }
            };
            match event {
                Event::Matched(SignPrompt::Passphrase) if prompts_answered >= MAX_PROMPTS => {
                    tracing::warn!(prompts_answered, "tool keeps asking for the passphrase, giving up");
                    break event;
                }
                Event::Matched(SignPrompt::Passphrase) => {
                    prompts_answered += 1;
                    tracing::debug!(prompt = prompts_answered, "answering passphrase prompt");
                    if let Err(e) = session.send_line(profile.secret.expose().as_bytes()) {
                        let _ = session.terminal_mut().terminate();
                        return Err(e.into());
                    }
                }
                other => break other,
            }
        };

        let exit = match last {
            Event::Timeout | Event::Matched(SignPrompt::Passphrase) => {
                session.terminal_mut().terminate()?
            }
            Event::Eof => session.terminal_mut().close()?,
            Event::Matched(_) => {
                let _ = session.drain(DIAGNOSTIC_DRAIN);
                session.terminal_mut().close()?
            }
        };

        let outcome = SessionOutcome::classify(last, exit);
        if outcome.is_success() {
            tracing::info!(prompts_answered, "package sign successful");
            return Ok(SignOutcome::Signed { prompts_answered });
        }

        tracing::error!(%outcome, %exit, prompts_answered, "package sign failed");
        let (_, raw) = session.into_parts();
        Err(SigningFailure::new(outcome, exit, prompts_answered, &raw, &profile.secret).into())
    }

    /// Sign, then confirm every artifact now carries a signature.
    pub fn sign_and_verify(
        &self,
        profile: &SigningProfile,
        artifacts: &[PathBuf],
    ) -> SignResult<SignOutcome> {
        let outcome = self.sign(profile, artifacts)?;
        if let SignOutcome::Signed { .. } = outcome {
            let verifier = Verifier::with_launcher(&self.launcher, profile.timeouts.verify)?;
            let results = verifier.verify(&profile.tool_path, artifacts);
            ensure_all_signed(&results)?;
            tracing::info!(artifacts = artifacts.len(), "all packages carry a signature");
        }
        Ok(outcome)
    }
}
