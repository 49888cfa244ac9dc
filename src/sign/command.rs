//! Signing command construction.
//!
//! The command is an argument vector handed straight to `execve`; no shell
//! ever sees it, so metacharacters in paths or key names stay literal.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use autosign_pty::SpawnConfig;

use crate::config::SigningProfile;

/// Locale forced on every subprocess so prompts and banners are in English.
pub const SUBPROCESS_LOCALE: (&str, &str) = ("LC_ALL", "C");

/// `rpm --resign` invocation for one artifact set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl SigningCommand {
    /// Build the argv: resign flag, signature type, gpg overrides, optional
    /// digest, key name, then the artifacts in order.
    pub fn build(profile: &SigningProfile, artifacts: &[PathBuf]) -> Self {
        let mut args: Vec<OsString> = vec!["--resign".into()];
        push_define(&mut args, "_signature", OsStr::new("gpg"));
        push_define(&mut args, "_gpgbin", profile.gpg_binary_path.as_os_str());
        push_define(&mut args, "_gpg_path", profile.gpg_home_path.as_os_str());
        if let Some(algo) = &profile.digest_algorithm {
            push_define(&mut args, "_gpg_digest_algo", OsStr::new(algo));
        }
        push_define(&mut args, "_gpg_name", OsStr::new(&profile.key_name));
        args.extend(artifacts.iter().map(|p| p.as_os_str().to_os_string()));

        Self {
            program: profile.tool_path.clone(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Spawn parameters with the subprocess locale applied.
    pub fn spawn_config(&self) -> SpawnConfig {
        SpawnConfig::new(&self.program)
            .args(self.args.iter().cloned())
            .env(SUBPROCESS_LOCALE.0, SUBPROCESS_LOCALE.1)
    }

    /// Human-readable form for logs. Never contains the passphrase.
    pub fn display(&self) -> String {
        self.spawn_config().display_command()
    }
}

fn push_define(args: &mut Vec<OsString>, macro_name: &str, value: &OsStr) {
    let mut define = OsString::from(macro_name);
    define.push(" ");
    define.push(value);
    args.push("--define".into());
    args.push(define);
}
