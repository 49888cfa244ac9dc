//! Passphrase handling and transcript redaction.
//!
//! [`RedactedTranscript::capture`] is the only way subprocess output reaches
//! an error value, and it always scrubs the secret.

use std::fmt;

use serde::{Deserialize, Deserializer};
use zeroize::Zeroizing;

/// Replaces every occurrence of the secret in captured output.
pub const REDACTION_PLACEHOLDER: &str = "[REDACTED]";

/// Used when scrubbed output would still contain the secret.
pub const WITHHELD_NOTICE: &str = "[transcript withheld: output could not be redacted]";

/// A signing passphrase. Zeroized on drop, never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// The raw passphrase. Only the prompt writer should call this.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", REDACTION_PLACEHOLDER)
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Secret::new)
    }
}

/// Subprocess output with the secret scrubbed out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RedactedTranscript {
    text: String,
}

impl RedactedTranscript {
    /// Decode `raw`, normalise terminal line endings and redact `secret`.
    pub fn capture(raw: &[u8], secret: &Secret) -> Self {
        let text = String::from_utf8_lossy(raw).replace("\r\n", "\n");
        if secret.is_empty() {
            return Self { text };
        }

        let needle = secret.expose();
        let scrubbed = text.replace(needle, REDACTION_PLACEHOLDER);
        // A replacement can splice a new occurrence together from the
        // placeholder and its neighbours.
        let text = if !scrubbed.contains(needle) {
            scrubbed
        } else if !WITHHELD_NOTICE.contains(needle) {
            WITHHELD_NOTICE.to_string()
        } else {
            String::new()
        };
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl fmt::Display for RedactedTranscript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
