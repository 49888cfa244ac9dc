//! rpm-autosign - passphrase-driven package signing for build system hooks
//!
//! Signs packages by driving `rpm --resign` on a pseudo-terminal, answering
//! gpg's passphrase prompt from a per-target signing profile, then checks
//! that every package really carries a signature before the import goes on.
//!
//! - [`config`]: target tag to [`SigningProfile`] resolution
//! - [`sign`]: the interactive signing session
//! - [`verify`]: post-signing signature inspection
//! - [`hooks`]: pre-import and post-sign entry points for the build system

pub mod config;
pub mod hooks;
pub mod secret;
pub mod sign;
pub mod timeout;
pub mod verify;

pub use autosign_pty as pty;

pub use config::{ConfigError, FilePolicyResolver, PolicyResolver, SigningProfile, StaticPolicyResolver};
pub use hooks::{post_sign, pre_import, BuildSystem, HookError, HookOutcome, PostSignEvent, PreImportEvent};
pub use secret::{RedactedTranscript, Secret};
pub use sign::{SessionOutcome, SignError, SignOutcome, SigningDriver, SigningFailure};
pub use timeout::SessionTimeouts;
pub use verify::{ensure_all_signed, VerificationFailure, VerificationResult, Verifier};
