//! In-memory build system for tests and dry runs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use super::{BuildSystem, BuildSystemError, StrictMarkRequest};

/// Answers buildroot lookups from a fixed table and records mark calls.
#[derive(Debug, Default)]
pub struct MemoryBuildSystem {
    work_dir: PathBuf,
    buildroot_tags: BTreeMap<u64, String>,
    marked: Mutex<Vec<StrictMarkRequest>>,
    fail_marks: bool,
}

impl MemoryBuildSystem {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_buildroot(mut self, buildroot_id: u64, tag: impl Into<String>) -> Self {
        self.buildroot_tags.insert(buildroot_id, tag.into());
        self
    }

    /// Make every mark call fail.
    pub fn failing_marks(mut self) -> Self {
        self.fail_marks = true;
        self
    }

    /// Mark calls received so far.
    pub fn marked(&self) -> Vec<StrictMarkRequest> {
        self.marked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl BuildSystem for MemoryBuildSystem {
    fn buildroot_tag(&self, buildroot_id: u64) -> Result<String, BuildSystemError> {
        self.buildroot_tags
            .get(&buildroot_id)
            .cloned()
            .ok_or_else(|| BuildSystemError(format!("unknown buildroot {}", buildroot_id)))
    }

    fn work_dir(&self) -> PathBuf {
        self.work_dir.clone()
    }

    fn write_signed_artifact(&self, request: &StrictMarkRequest) -> Result<(), BuildSystemError> {
        if self.fail_marks {
            return Err(BuildSystemError(format!(
                "cannot mark artifact {} signed",
                request.artifact.id
            )));
        }
        self.marked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        Ok(())
    }
}
