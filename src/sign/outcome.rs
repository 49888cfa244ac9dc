//! Session classification and signing errors.

use std::fmt;

use autosign_pty::{Event, ExitState, PtyError};
use thiserror::Error;

use super::patterns::SignPrompt;
use crate::secret::{RedactedTranscript, Secret};
use crate::verify::VerificationFailure;

/// How a signing session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionOutcome {
    Success,
    PassphraseRejected,
    Skipped,
    ToolError,
    TimedOut,
}

impl SessionOutcome {
    /// Classify the event that ended the prompt loop.
    ///
    /// EOF only counts as success when the tool also exited cleanly.
    pub fn classify(last: Event<SignPrompt>, exit: ExitState) -> Self {
        match last {
            Event::Eof if exit.is_clean() => SessionOutcome::Success,
            Event::Eof => SessionOutcome::ToolError,
            Event::Timeout => SessionOutcome::TimedOut,
            Event::Matched(SignPrompt::Rejected) => SessionOutcome::PassphraseRejected,
            Event::Matched(SignPrompt::Skipped) => SessionOutcome::Skipped,
            Event::Matched(SignPrompt::ToolError) => SessionOutcome::ToolError,
            // Only reached once the prompt limit is used up.
            Event::Matched(SignPrompt::Passphrase) => SessionOutcome::PassphraseRejected,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOutcome::Success => "SUCCESS",
            SessionOutcome::PassphraseRejected => "PASSPHRASE_REJECTED",
            SessionOutcome::Skipped => "SKIPPED",
            SessionOutcome::ToolError => "TOOL_ERROR",
            SessionOutcome::TimedOut => "TIMED_OUT",
        }
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed signing session. The transcript is always redacted.
#[derive(Debug, Clone, Error)]
#[error("package signing failed ({outcome}, {exit})\n{transcript}")]
pub struct SigningFailure {
    outcome: SessionOutcome,
    exit: ExitState,
    prompts_answered: usize,
    transcript: RedactedTranscript,
}

impl SigningFailure {
    /// Redacts `raw` against `secret` on capture.
    pub fn new(
        outcome: SessionOutcome,
        exit: ExitState,
        prompts_answered: usize,
        raw: &[u8],
        secret: &Secret,
    ) -> Self {
        Self {
            outcome,
            exit,
            prompts_answered,
            transcript: RedactedTranscript::capture(raw, secret),
        }
    }

    pub fn outcome(&self) -> SessionOutcome {
        self.outcome
    }

    pub fn exit(&self) -> ExitState {
        self.exit
    }

    pub fn prompts_answered(&self) -> usize {
        self.prompts_answered
    }

    pub fn transcript(&self) -> &RedactedTranscript {
        &self.transcript
    }
}

/// Successful result of a signing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutcome {
    /// Signing is disabled for the target; nothing ran.
    Disabled,
    /// The tool signed every artifact.
    Signed { prompts_answered: usize },
}

/// Errors from signing. All abort the enclosing import.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("no artifacts to sign")]
    NoArtifacts,

    #[error("signing tool could not be run: {0}")]
    Pty(#[from] PtyError),

    #[error(transparent)]
    Signing(#[from] SigningFailure),

    #[error(transparent)]
    Verification(#[from] VerificationFailure),
}

/// Result type for signing operations
pub type SignResult<T> = Result<T, SignError>;
