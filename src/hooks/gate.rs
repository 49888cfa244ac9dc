//! Strict-distribution gating for signed artifacts.

use super::events::{ArtifactRef, BuildRef, MissingEventFields, PostSignEvent};
use crate::config::SigningProfile;

/// Whether a signed artifact must be marked for strict distribution.
pub fn should_mark_strict(profile: &SigningProfile) -> bool {
    profile.strict_signing
}

/// The fully-populated arguments of the mark-signed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictMarkRequest {
    pub artifact: ArtifactRef,
    pub signature_key_id: String,
    pub build: BuildRef,
    pub buildroot_id: u64,
    pub digest_algorithm_id: Option<String>,
}

impl StrictMarkRequest {
    /// Requires the artifact, key id, build and the artifact's buildroot.
    pub fn from_event(event: &PostSignEvent) -> Result<Self, MissingEventFields> {
        let mut missing = MissingEventFields::default();
        let artifact = missing.check("artifact", event.artifact.as_ref());
        let signature_key_id = missing.check("signature_key_id", event.signature_key_id.as_ref());
        let build = missing.check("build", event.build.as_ref());
        let buildroot_id = match artifact {
            Some(artifact) => missing.check("artifact.buildroot_id", artifact.buildroot_id),
            None => None,
        };

        match (artifact, signature_key_id, build, buildroot_id) {
            (Some(artifact), Some(key), Some(build), Some(buildroot_id)) => Ok(Self {
                artifact: artifact.clone(),
                signature_key_id: key.clone(),
                build: build.clone(),
                buildroot_id,
                digest_algorithm_id: event.digest_algorithm_id.clone(),
            }),
            _ => Err(missing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::Secret;

    fn full_event() -> PostSignEvent {
        PostSignEvent {
            signature_key_id: Some("abcd1234".into()),
            digest_algorithm_id: Some("sha256".into()),
            build: Some(BuildRef {
                id: 5,
                nvr: Some("foo-1.0-1".into()),
            }),
            artifact: Some(ArtifactRef {
                id: 9,
                name: Some("foo".into()),
                buildroot_id: Some(42),
            }),
        }
    }

    #[test]
    fn test_gate_follows_strict_flag() {
        let mut profile =
            SigningProfile::new("k", "/usr/bin/rpm", "/usr/bin/gpg2", "/keys", Secret::new("p"));
        assert!(!should_mark_strict(&profile));
        profile.strict_signing = true;
        assert!(should_mark_strict(&profile));
    }

    #[test]
    fn test_complete_event() {
        let request = StrictMarkRequest::from_event(&full_event()).unwrap();
        assert_eq!(request.buildroot_id, 42);
        assert_eq!(request.signature_key_id, "abcd1234");
        assert_eq!(request.build.id, 5);
    }

    #[test]
    fn test_digest_algorithm_optional() {
        let mut event = full_event();
        event.digest_algorithm_id = None;
        assert!(StrictMarkRequest::from_event(&event).is_ok());
    }

    #[test]
    fn test_missing_build() {
        let mut event = full_event();
        event.build = None;
        let missing = StrictMarkRequest::from_event(&event).unwrap_err();
        assert_eq!(missing.fields, vec!["build"]);
    }

    #[test]
    fn test_missing_buildroot_on_artifact() {
        let mut event = full_event();
        if let Some(artifact) = event.artifact.as_mut() {
            artifact.buildroot_id = None;
        }
        event.signature_key_id = None;
        let missing = StrictMarkRequest::from_event(&event).unwrap_err();
        assert_eq!(missing.fields, vec!["signature_key_id", "artifact.buildroot_id"]);
    }

    #[test]
    fn test_empty_event_lists_all_top_level_fields() {
        let missing = StrictMarkRequest::from_event(&PostSignEvent::default()).unwrap_err();
        assert_eq!(missing.fields, vec!["artifact", "signature_key_id", "build"]);
    }
}
