//! Post-signing signature inspection.
//!
//! Each artifact is inspected by its own `<rpm> -qp --qf <query> <path>`
//! subprocess. The query prints only the signature header tags, one per
//! line behind a fixed prefix, so no package-controlled text (summary,
//! description, changelog) ever reaches the matcher. A tag rendered as a key
//! id counts as signed; `(none)` everywhere, silence, a timeout or a spawn
//! failure all count as unsigned.

use std::path::{Path, PathBuf};
use std::time::Duration;

use autosign_pty::{Expect, Launcher, PatternTable, PtyError, PtyResult, SpawnConfig, Terminal};
use regex_lite::Regex;
use thiserror::Error;

#[cfg(unix)]
use autosign_pty::PtyLauncher;

use crate::sign::SUBPROCESS_LOCALE;

/// Query format printing every signature tag rpm may carry. rpm expands
/// the `\n` escapes itself.
pub const SIGNATURE_QUERY: &str = r"sig:%{RSAHEADER:pgpsig}\nsig:%{DSAHEADER:pgpsig}\nsig:%{SIGPGP:pgpsig}\nsig:%{SIGGPG:pgpsig}\n";

/// A signature tag rendered by `:pgpsig`, e.g.
/// `sig:RSA/SHA256, Mon 01 Jan 2024 00:00:00 UTC, Key ID 0123abcd4567ef89`.
pub const SIGNATURE_PATTERN: &str = r"(?m)^sig:[A-Za-z0-9]+/[A-Za-z0-9]+, .*Key ID [0-9a-fA-F]+\s*$";

/// Inspection result for one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub artifact_path: PathBuf,
    pub signed: bool,
    /// Inspection output, or the spawn error when the tool never ran.
    pub transcript: String,
}

/// One or more artifacts were left unsigned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} package(s) not signed: {}", unsigned_artifacts.len(), list_paths(unsigned_artifacts))]
pub struct VerificationFailure {
    pub unsigned_artifacts: Vec<PathBuf>,
}

fn list_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fail naming every unsigned artifact, in input order.
pub fn ensure_all_signed(results: &[VerificationResult]) -> Result<(), VerificationFailure> {
    let unsigned_artifacts: Vec<PathBuf> = results
        .iter()
        .filter(|r| !r.signed)
        .map(|r| r.artifact_path.clone())
        .collect();
    if unsigned_artifacts.is_empty() {
        Ok(())
    } else {
        Err(VerificationFailure { unsigned_artifacts })
    }
}

/// Runs inspection subprocesses through a [`Launcher`].
#[derive(Debug)]
pub struct Verifier<L> {
    launcher: L,
    timeout: Duration,
    signature: Regex,
}

#[cfg(unix)]
impl Verifier<PtyLauncher> {
    pub fn new(timeout: Duration) -> PtyResult<Self> {
        Self::with_launcher(PtyLauncher, timeout)
    }
}

impl<L: Launcher> Verifier<L> {
    pub fn with_launcher(launcher: L, timeout: Duration) -> PtyResult<Self> {
        let signature = Regex::new(SIGNATURE_PATTERN).map_err(|e| PtyError::InvalidPattern {
            pattern: SIGNATURE_PATTERN.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            launcher,
            timeout,
            signature,
        })
    }

    /// Inspect every artifact independently. Never fails as a whole.
    pub fn verify(&self, tool_path: &Path, artifacts: &[PathBuf]) -> Vec<VerificationResult> {
        artifacts
            .iter()
            .map(|artifact| self.verify_one(tool_path, artifact))
            .collect()
    }

    fn verify_one(&self, tool_path: &Path, artifact: &Path) -> VerificationResult {
        let transcript = match self.inspect(tool_path, artifact) {
            Ok(transcript) => transcript,
            Err(e) => {
                tracing::warn!(artifact = %artifact.display(), error = %e, "could not inspect package");
                return VerificationResult {
                    artifact_path: artifact.to_path_buf(),
                    signed: false,
                    transcript: e.to_string(),
                };
            }
        };

        let signed = self.signature.is_match(&transcript);
        if signed {
            tracing::debug!(artifact = %artifact.display(), "package carries a signature");
        } else {
            tracing::warn!(artifact = %artifact.display(), "package is not signed");
        }
        VerificationResult {
            artifact_path: artifact.to_path_buf(),
            signed,
            transcript,
        }
    }

    fn inspect(&self, tool_path: &Path, artifact: &Path) -> PtyResult<String> {
        let (key, value) = SUBPROCESS_LOCALE;
        let config = SpawnConfig::new(tool_path)
            .args(["-qp", "--qf", SIGNATURE_QUERY])
            .arg(artifact.as_os_str())
            .env(key, value);

        let terminal = self.launcher.launch(&config)?;
        let mut session: Expect<_, ()> = Expect::new(terminal, PatternTable::new(), self.timeout);
        let drained = session.drain(self.timeout);
        let _ = session.terminal_mut().close();
        drained?;

        let (_, raw) = session.into_parts();
        Ok(String::from_utf8_lossy(&raw).replace("\r\n", "\n"))
    }
}
