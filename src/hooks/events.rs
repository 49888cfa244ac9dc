//! Inbound build-event payloads.
//!
//! Every field is optional on the wire; the hooks validate presence
//! themselves so a callback that does not carry signing context is skipped
//! with a warning instead of failing the build.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Sent before a build's artifacts are imported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreImportEvent {
    #[serde(alias = "type")]
    pub event_type: Option<String>,
    pub build_type: Option<String>,
    /// Architecture label to buildroot id, in build order.
    #[serde(alias = "brmap")]
    pub buildroot_map: Option<IndexMap<String, u64>>,
    /// Source package path relative to the work area.
    #[serde(alias = "srpm")]
    pub source_artifact: Option<String>,
    /// Binary package paths relative to the work area.
    #[serde(alias = "rpms")]
    pub binary_artifacts: Option<Vec<String>>,
}

/// A [`PreImportEvent`] with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest<'a> {
    pub event_type: &'a str,
    pub build_type: &'a str,
    pub first_buildroot: u64,
    pub source_artifact: &'a str,
    pub binary_artifacts: &'a [String],
}

impl PreImportEvent {
    pub fn validate(&self) -> Result<ImportRequest<'_>, MissingEventFields> {
        let mut missing = MissingEventFields::default();
        let event_type = missing.check("event_type", self.event_type.as_deref());
        let build_type = missing.check("build_type", self.build_type.as_deref());
        let first_buildroot = missing.check(
            "buildroot_map",
            self.buildroot_map
                .as_ref()
                .and_then(|map| map.values().next().copied()),
        );
        let source_artifact = missing.check("source_artifact", self.source_artifact.as_deref());
        let binary_artifacts = missing.check("binary_artifacts", self.binary_artifacts.as_deref());

        match (event_type, build_type, first_buildroot, source_artifact, binary_artifacts) {
            (
                Some(event_type),
                Some(build_type),
                Some(first_buildroot),
                Some(source_artifact),
                Some(binary_artifacts),
            ) => Ok(ImportRequest {
                event_type,
                build_type,
                first_buildroot,
                source_artifact,
                binary_artifacts,
            }),
            _ => Err(missing),
        }
    }
}

/// Build reference carried by a post-signature event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRef {
    pub id: u64,
    #[serde(default)]
    pub nvr: Option<String>,
}

/// Artifact reference carried by a post-signature event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    /// The buildroot the artifact was signed in.
    #[serde(default)]
    pub buildroot_id: Option<u64>,
}

/// Sent after a signature has been applied to an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostSignEvent {
    #[serde(alias = "sigkey")]
    pub signature_key_id: Option<String>,
    #[serde(alias = "sighash")]
    pub digest_algorithm_id: Option<String>,
    pub build: Option<BuildRef>,
    #[serde(alias = "rpm")]
    pub artifact: Option<ArtifactRef>,
}

/// Names of the required event fields that were absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingEventFields {
    pub fields: Vec<&'static str>,
}

impl MissingEventFields {
    /// Record `name` when `value` is absent and pass the value through.
    pub(crate) fn check<T>(&mut self, name: &'static str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.fields.push(name);
        }
        value
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for MissingEventFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing event fields: {}", self.fields.join(", "))
    }
}
