//! Signing policy configuration
//!
//! A TOML file with one table per target tag plus a `DEFAULT` table:
//!
//! ```toml
//! [DEFAULT]
//! rpm = "/usr/bin/rpm"
//! gpgbin = "/usr/bin/gpg2"
//! gpg_path = "/keys"
//! gpg_name = "release-key"
//! gpg_pass = "secret123"
//!
//! [f40-candidate]
//! gpg_name = "f40-key"
//! strict_keys = true
//! ```
//!
//! Named tables inherit keys they do not set from `DEFAULT`; a tag without a
//! table resolves to `DEFAULT` alone.

mod document;
mod profile;
mod resolver;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use document::{ConfigDocument, DEFAULT_SECTION};
pub use profile::SigningProfile;
pub use resolver::{FilePolicyResolver, PolicyResolver, StaticPolicyResolver, DEFAULT_CONFIG_PATH};

/// Errors resolving a signing profile. All are fatal and raised before any
/// subprocess is spawned.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("no section for target {tag:?} and no [DEFAULT] section")]
    NoSection { tag: String },

    #[error("section [{section}] is missing required field {field:?}")]
    MissingField {
        section: String,
        field: &'static str,
    },

    #[error("section [{section}]: {reason}")]
    Invalid { section: String, reason: String },
}
