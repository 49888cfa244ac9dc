//! Prompt and marker patterns for `rpm --resign` driving gpg.
//!
//! With pinentry in loopback mode gpg's only prompt is the passphrase
//! request; older rpm releases spell it "pass phrase". Markers are matched
//! earliest-first, so the gpg diagnostic wins over rpm's trailing `error:`.

use autosign_pty::{PatternTable, PtyResult};

/// Labels the signing state machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignPrompt {
    /// Tool is waiting for the passphrase.
    Passphrase,
    /// gpg refused the passphrase.
    Rejected,
    /// Tool declined to sign (already signed, unsupported package).
    Skipped,
    /// Any other tool-reported error.
    ToolError,
}

pub const PASSPHRASE_PROMPT: &str = r"(?i)enter pass ?phrase:";
pub const REJECTED_MARKER: &str = r"(?i)bad pass ?phrase|pass ?phrase check failed";
pub const SKIPPED_MARKER: &str = r"(?i)\bskipping\b";
pub const TOOL_ERROR_MARKER: &str = r"(?m)^\s*error:";

/// The default ordered table.
pub fn default_patterns() -> PtyResult<PatternTable<SignPrompt>> {
    PatternTable::new()
        .with(SignPrompt::Passphrase, PASSPHRASE_PROMPT)?
        .with(SignPrompt::Rejected, REJECTED_MARKER)?
        .with(SignPrompt::Skipped, SKIPPED_MARKER)?
        .with(SignPrompt::ToolError, TOOL_ERROR_MARKER)
}
