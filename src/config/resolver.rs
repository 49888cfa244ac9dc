//! Target tag to signing profile lookup.

use std::path::{Path, PathBuf};

use super::{ConfigDocument, ConfigError, SigningProfile};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rpm-autosign/sign.toml";

/// Source of signing profiles.
pub trait PolicyResolver {
    fn resolve(&self, tag: &str) -> Result<SigningProfile, ConfigError>;
}

impl<R: PolicyResolver + ?Sized> PolicyResolver for &R {
    fn resolve(&self, tag: &str) -> Result<SigningProfile, ConfigError> {
        (**self).resolve(tag)
    }
}

/// Re-reads the configuration file on every call, so edits apply to the
/// next build without a restart.
#[derive(Debug, Clone)]
pub struct FilePolicyResolver {
    path: PathBuf,
}

impl FilePolicyResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FilePolicyResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

impl PolicyResolver for FilePolicyResolver {
    fn resolve(&self, tag: &str) -> Result<SigningProfile, ConfigError> {
        let document = ConfigDocument::from_file(&self.path)?;
        let profile = document.resolve(tag)?;
        tracing::info!(
            tag,
            section = %profile.section,
            config = %self.path.display(),
            config_sha256 = document.digest().unwrap_or("-"),
            "resolved signing profile"
        );
        Ok(profile)
    }
}

/// Profiles from an already-parsed document.
#[derive(Debug, Clone, Default)]
pub struct StaticPolicyResolver {
    document: ConfigDocument,
}

impl StaticPolicyResolver {
    pub fn new(document: ConfigDocument) -> Self {
        Self { document }
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        ConfigDocument::parse(contents).map(Self::new)
    }
}

impl PolicyResolver for StaticPolicyResolver {
    fn resolve(&self, tag: &str) -> Result<SigningProfile, ConfigError> {
        self.document.resolve(tag)
    }
}
