//! Resolved signing profile.

use std::path::PathBuf;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use toml::{Table, Value};

use super::{ConfigError, DEFAULT_SECTION};
use crate::secret::Secret;
use crate::timeout::SessionTimeouts;

/// Everything needed to sign one target's artifacts.
///
/// Built either from a configuration section (all required keys present) or
/// directly through [`SigningProfile::new`].
#[derive(Debug, Clone)]
pub struct SigningProfile {
    /// Section the profile came from (`DEFAULT` or the target tag).
    pub section: String,
    pub key_name: String,
    /// Signing CLI, normally `rpm`.
    pub tool_path: PathBuf,
    pub gpg_binary_path: PathBuf,
    pub gpg_home_path: PathBuf,
    pub secret: Secret,
    pub digest_algorithm: Option<String>,
    pub enabled: bool,
    pub strict_signing: bool,
    pub timeouts: SessionTimeouts,
}

impl SigningProfile {
    /// Profile with every optional setting at its default.
    pub fn new(
        key_name: impl Into<String>,
        tool_path: impl Into<PathBuf>,
        gpg_binary_path: impl Into<PathBuf>,
        gpg_home_path: impl Into<PathBuf>,
        secret: Secret,
    ) -> Self {
        Self {
            section: DEFAULT_SECTION.to_string(),
            key_name: key_name.into(),
            tool_path: tool_path.into(),
            gpg_binary_path: gpg_binary_path.into(),
            gpg_home_path: gpg_home_path.into(),
            secret,
            digest_algorithm: None,
            enabled: true,
            strict_signing: false,
            timeouts: SessionTimeouts::default(),
        }
    }

    pub(crate) fn from_section(section: &str, table: Table) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            section: section.to_string(),
            reason,
        };

        // Checked up front so a serde type error never echoes the value.
        if table.get("gpg_pass").is_some_and(|v| !v.is_str()) {
            return Err(invalid("gpg_pass must be a string".to_string()));
        }

        let raw: RawSection = Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| invalid(e.message().to_string()))?;

        let missing = |field: &'static str| ConfigError::MissingField {
            section: section.to_string(),
            field,
        };
        let tool_path = raw.rpm.ok_or_else(|| missing("rpm"))?;
        let gpg_binary_path = raw.gpgbin.ok_or_else(|| missing("gpgbin"))?;
        let gpg_home_path = raw.gpg_path.ok_or_else(|| missing("gpg_path"))?;
        let key_name = raw.gpg_name.ok_or_else(|| missing("gpg_name"))?;
        let secret = raw.gpg_pass.ok_or_else(|| missing("gpg_pass"))?;

        if key_name.trim().is_empty() {
            return Err(invalid("gpg_name must not be empty".to_string()));
        }

        let timeouts = SessionTimeouts::from_config(raw.prompt_timeout, raw.verify_timeout);
        timeouts.validate().map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            section: section.to_string(),
            key_name,
            tool_path,
            gpg_binary_path,
            gpg_home_path,
            secret,
            digest_algorithm: raw.gpg_digest_algo.filter(|algo| !algo.trim().is_empty()),
            enabled: raw.enabled.unwrap_or(true),
            strict_signing: raw.strict_keys.unwrap_or(false),
            timeouts,
        })
    }
}

/// One section as written, before required-field checks.
#[derive(Debug, Default, Deserialize)]
struct RawSection {
    rpm: Option<PathBuf>,
    gpgbin: Option<PathBuf>,
    gpg_path: Option<PathBuf>,
    gpg_name: Option<String>,
    gpg_pass: Option<Secret>,
    gpg_digest_algo: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    enabled: Option<bool>,
    #[serde(default, deserialize_with = "flexible_bool")]
    strict_keys: Option<bool>,
    prompt_timeout: Option<u64>,
    verify_timeout: Option<u64>,
}

/// Accepts TOML booleans and the INI-style spellings `yes`/`no`, `on`/`off`,
/// `true`/`false` and `1`/`0`.
fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Flag::Bool(b)) => Ok(Some(b)),
        Some(Flag::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Ok(Some(true)),
            "0" | "no" | "false" | "off" => Ok(Some(false)),
            other => Err(D::Error::custom(format!("not a boolean: {:?}", other))),
        },
    }
}
