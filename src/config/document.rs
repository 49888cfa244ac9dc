//! Parsed configuration file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use toml::{Table, Value};

use super::{ConfigError, SigningProfile};

/// Name of the fallback section.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// All sections of one configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    sections: BTreeMap<String, Table>,
    digest: Option<String>,
}

impl ConfigDocument {
    /// Parse TOML text. Every top-level key must be a table.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let table: Table =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(describe_parse_error(contents, &e)))?;

        let mut sections = BTreeMap::new();
        for (name, value) in table {
            match value {
                Value::Table(section) => {
                    sections.insert(name, section);
                }
                _ => {
                    return Err(ConfigError::Parse(format!(
                        "key {:?} is outside any section",
                        name
                    )))
                }
            }
        }

        Ok(Self {
            sections,
            digest: None,
        })
    }

    /// Read and parse a file, recording the SHA-256 of its raw bytes.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::Parse(format!("Invalid UTF-8: {}", e)))?;

        let mut document = Self::parse(&contents)?;
        document.digest = Some(digest);
        Ok(document)
    }

    /// SHA-256 of the file this document was read from.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Resolve the profile for `tag`, falling back to `DEFAULT`.
    pub fn resolve(&self, tag: &str) -> Result<SigningProfile, ConfigError> {
        let default = self.sections.get(DEFAULT_SECTION);
        let (section, value) = match (self.sections.get(tag), default) {
            (Some(own), Some(default)) if tag != DEFAULT_SECTION => {
                // Flat overlay: section keys replace DEFAULT keys whole.
                let mut merged = default.clone();
                for (key, value) in own {
                    merged.insert(key.clone(), value.clone());
                }
                (tag, merged)
            }
            (Some(own), _) => (tag, own.clone()),
            (None, Some(default)) => (DEFAULT_SECTION, default.clone()),
            (None, None) => {
                return Err(ConfigError::NoSection {
                    tag: tag.to_string(),
                })
            }
        };

        tracing::debug!(tag, section, "selected configuration section");
        SigningProfile::from_section(section, value)
    }
}

/// Position and message only. The full error quotes the offending line,
/// which may hold a passphrase.
fn describe_parse_error(contents: &str, error: &toml::de::Error) -> String {
    match error.span() {
        Some(span) => {
            let end = span.start.min(contents.len());
            let line = contents.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1;
            format!("TOML parse error at line {}: {}", line, error.message())
        }
        None => format!("TOML parse error: {}", error.message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
[DEFAULT]
rpm = "/usr/bin/rpm"
gpgbin = "/usr/bin/gpg2"
gpg_path = "/keys"
gpg_name = "release-key"
gpg_pass = "secret123"

[f40-candidate]
gpg_name = "f40-key"
gpg_digest_algo = "sha256"
strict_keys = true
"#;

    #[test]
    fn test_parse_sections() {
        let document = ConfigDocument::parse(CONFIG).unwrap();
        let names: Vec<&str> = document.section_names().collect();
        assert_eq!(names, vec!["DEFAULT", "f40-candidate"]);
        assert!(document.digest().is_none());
    }

    #[test]
    fn test_named_section_inherits_default() {
        let profile = ConfigDocument::parse(CONFIG).unwrap().resolve("f40-candidate").unwrap();

        assert_eq!(profile.section, "f40-candidate");
        assert_eq!(profile.key_name, "f40-key");
        assert_eq!(profile.tool_path, Path::new("/usr/bin/rpm"));
        assert_eq!(profile.secret.expose(), "secret123");
        assert_eq!(profile.digest_algorithm.as_deref(), Some("sha256"));
        assert!(profile.strict_signing);
    }

    #[test]
    fn test_section_key_replaces_default_key() {
        let config = format!("{}\n[epel9]\nstrict_keys = \"no\"\n", CONFIG.replace("gpg_pass", "strict_keys = true\ngpg_pass"));
        let document = ConfigDocument::parse(&config).unwrap();

        assert!(document.resolve("rawhide").unwrap().strict_signing);
        let profile = document.resolve("epel9").unwrap();
        assert!(!profile.strict_signing);
        assert_eq!(profile.key_name, "release-key");
    }

    #[test]
    fn test_unknown_tag_falls_back_to_default() {
        let profile = ConfigDocument::parse(CONFIG).unwrap().resolve("rawhide").unwrap();
        assert_eq!(profile.section, DEFAULT_SECTION);
        assert_eq!(profile.key_name, "release-key");
    }

    #[test]
    fn test_no_section_and_no_default() {
        let document = ConfigDocument::parse("[f40]\nrpm = \"/usr/bin/rpm\"\n").unwrap();
        let err = document.resolve("rawhide").unwrap_err();
        assert!(matches!(err, ConfigError::NoSection { ref tag } if tag == "rawhide"));
    }

    #[test]
    fn test_top_level_key_rejected() {
        let err = ConfigDocument::parse("rpm = \"/usr/bin/rpm\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let err = ConfigDocument::parse("[DEFAULT\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_parse_error_does_not_quote_line() {
        let err = ConfigDocument::parse("[DEFAULT]\ngpg_name = \"k\"\ngpg_pass = hunter2 x\n").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("line 3"), "{}", message);
        assert!(!message.contains("hunter2"), "{}", message);
    }

    #[test]
    fn test_from_file_records_digest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let document = ConfigDocument::from_file(file.path()).unwrap();
        let expected = hex::encode(Sha256::digest(CONFIG.as_bytes()));
        assert_eq!(document.digest(), Some(expected.as_str()));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ConfigDocument::from_file(Path::new("/nonexistent/sign.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
