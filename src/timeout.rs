//! Subprocess wait limits for signing and verification.
//!
//! - `prompt`: maximum wait for each expected pattern while signing
//! - `verify`: maximum wait for each inspection subprocess
//!
//! Both restart on every wait rather than bounding the whole session, so a
//! slow double prompt is still answered.

use std::time::Duration;

/// Default wait for each signing-tool prompt.
pub const DEFAULT_PROMPT_SECONDS: u64 = 30;

/// Default wait for each signature inspection.
pub const DEFAULT_VERIFY_SECONDS: u64 = 5;

/// Upper bound accepted from configuration.
pub const MAX_TIMEOUT_SECONDS: u64 = 3600;

/// Timeout configuration for one signing profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    pub prompt: Duration,
    pub verify: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            prompt: Duration::from_secs(DEFAULT_PROMPT_SECONDS),
            verify: Duration::from_secs(DEFAULT_VERIFY_SECONDS),
        }
    }
}

impl SessionTimeouts {
    /// Build from optional configured seconds, falling back to defaults.
    pub fn from_config(prompt: Option<u64>, verify: Option<u64>) -> Self {
        Self {
            prompt: Duration::from_secs(prompt.unwrap_or(DEFAULT_PROMPT_SECONDS)),
            verify: Duration::from_secs(verify.unwrap_or(DEFAULT_VERIFY_SECONDS)),
        }
    }

    /// Both limits must be in (0, MAX_TIMEOUT_SECONDS].
    pub fn validate(&self) -> Result<(), TimeoutValidationError> {
        let max = Duration::from_secs(MAX_TIMEOUT_SECONDS);
        if self.prompt.is_zero() || self.prompt > max {
            return Err(TimeoutValidationError::PromptOutOfBounds {
                value: self.prompt.as_secs(),
            });
        }
        if self.verify.is_zero() || self.verify > max {
            return Err(TimeoutValidationError::VerifyOutOfBounds {
                value: self.verify.as_secs(),
            });
        }
        Ok(())
    }
}

/// Timeout validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutValidationError {
    #[error("prompt_timeout must be in (0, 3600] seconds, got {value}")]
    PromptOutOfBounds { value: u64 },

    #[error("verify_timeout must be in (0, 3600] seconds, got {value}")]
    VerifyOutOfBounds { value: u64 },
}
