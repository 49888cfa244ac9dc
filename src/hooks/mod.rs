//! Build-event hooks
//!
//! Entry points the host build system calls around an import:
//! - [`pre_import`]: sign and verify a build's packages before they land
//! - [`post_sign`]: mark a signed artifact for strict distribution when the
//!   target's profile asks for it
//!
//! Events without the required context are skipped with a warning. Artifact
//! paths must stay inside the work directory. Every other failure is returned
//! to the host, which rejects the import.

mod events;
mod gate;
mod memory;

use std::iter;
use std::path::{Component, Path, PathBuf};

use autosign_pty::Launcher;
use thiserror::Error;

pub use events::{ArtifactRef, BuildRef, ImportRequest, MissingEventFields, PostSignEvent, PreImportEvent};
pub use gate::{should_mark_strict, StrictMarkRequest};
pub use memory::MemoryBuildSystem;

use crate::config::{ConfigError, PolicyResolver};
use crate::sign::{SignError, SignOutcome, SigningDriver};

/// The only event type whose packages are signed.
pub const SIGNED_EVENT_TYPE: &str = "build";

/// Calls back into the host build system.
pub trait BuildSystem {
    /// Target tag a buildroot builds for.
    fn buildroot_tag(&self, buildroot_id: u64) -> Result<String, BuildSystemError>;

    /// Root that event artifact paths are relative to.
    fn work_dir(&self) -> PathBuf;

    /// Record that an artifact is signed for strict distribution.
    fn write_signed_artifact(&self, request: &StrictMarkRequest) -> Result<(), BuildSystemError>;
}

impl<B: BuildSystem + ?Sized> BuildSystem for &B {
    fn buildroot_tag(&self, buildroot_id: u64) -> Result<String, BuildSystemError> {
        (**self).buildroot_tag(buildroot_id)
    }

    fn work_dir(&self) -> PathBuf {
        (**self).work_dir()
    }

    fn write_signed_artifact(&self, request: &StrictMarkRequest) -> Result<(), BuildSystemError> {
        (**self).write_signed_artifact(request)
    }
}

/// A failed call into the build system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("build system call failed: {0}")]
pub struct BuildSystemError(pub String);

/// Fatal hook errors. The host rejects the import.
#[derive(Debug, Error)]
pub enum HookError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sign(#[from] SignError),

    #[error(transparent)]
    BuildSystem(#[from] BuildSystemError),

    #[error("artifact path {path:?} is not relative to the work directory")]
    InvalidArtifactPath { path: String },
}

/// Result type for hook entry points
pub type HookResult<T> = Result<T, HookError>;

/// Why a hook did nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingFields(MissingEventFields),
    NotABuild(String),
}

/// What a hook did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    Skipped(SkipReason),
    /// The target's profile has signing disabled.
    Disabled,
    Signed {
        tag: String,
        prompts_answered: usize,
        artifacts: usize,
    },
    StrictMarked,
    NotStrict,
}

/// Sign and verify a build's packages before import.
pub fn pre_import<R, B, L>(
    event: &PreImportEvent,
    resolver: &R,
    build_system: &B,
    driver: &SigningDriver<L>,
) -> HookResult<HookOutcome>
where
    R: PolicyResolver + ?Sized,
    B: BuildSystem + ?Sized,
    L: Launcher,
{
    let request = match event.validate() {
        Ok(request) => request,
        Err(missing) => {
            tracing::warn!(
                hook = "pre_import",
                fields = %missing.fields.join(", "),
                "event lacks required fields, not signing"
            );
            return Ok(HookOutcome::Skipped(SkipReason::MissingFields(missing)));
        }
    };
    if request.event_type != SIGNED_EVENT_TYPE {
        tracing::info!(
            hook = "pre_import",
            event_type = request.event_type,
            build_type = request.build_type,
            "not a build import, not signing"
        );
        return Ok(HookOutcome::Skipped(SkipReason::NotABuild(request.event_type.to_string())));
    }

    let work_dir = build_system.work_dir();
    let artifacts = iter::once(request.source_artifact)
        .chain(request.binary_artifacts.iter().map(String::as_str))
        .map(|path| artifact_path(&work_dir, path))
        .collect::<HookResult<Vec<_>>>()?;

    let tag = build_system.buildroot_tag(request.first_buildroot)?;
    let profile = resolver.resolve(&tag)?;

    match driver.sign_and_verify(&profile, &artifacts)? {
        SignOutcome::Disabled => Ok(HookOutcome::Disabled),
        SignOutcome::Signed { prompts_answered } => Ok(HookOutcome::Signed {
            tag,
            prompts_answered,
            artifacts: artifacts.len(),
        }),
    }
}

/// Join an event path onto the work directory. Only plain relative paths
/// are accepted.
fn artifact_path(work_dir: &Path, path: &str) -> HookResult<PathBuf> {
    let relative = Path::new(path);
    let plain = !path.is_empty() && relative.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain {
        return Err(HookError::InvalidArtifactPath { path: path.to_string() });
    }
    Ok(work_dir.join(relative))
}

/// Mark a freshly signed artifact when its target requires strict signing.
pub fn post_sign<R, B>(event: &PostSignEvent, resolver: &R, build_system: &B) -> HookResult<HookOutcome>
where
    R: PolicyResolver + ?Sized,
    B: BuildSystem + ?Sized,
{
    let request = match StrictMarkRequest::from_event(event) {
        Ok(request) => request,
        Err(missing) => {
            tracing::warn!(
                hook = "post_sign",
                fields = %missing.fields.join(", "),
                "event lacks required fields, not marking artifact"
            );
            return Ok(HookOutcome::Skipped(SkipReason::MissingFields(missing)));
        }
    };

    let tag = build_system.buildroot_tag(request.buildroot_id)?;
    let profile = resolver.resolve(&tag)?;
    if !should_mark_strict(&profile) {
        tracing::debug!(tag = %tag, artifact = request.artifact.id, "strict signing off");
        return Ok(HookOutcome::NotStrict);
    }

    build_system.write_signed_artifact(&request)?;
    tracing::info!(
        tag = %tag,
        artifact = request.artifact.id,
        key = %request.signature_key_id,
        "marked artifact signed for strict distribution"
    );
    Ok(HookOutcome::StrictMarked)
}
