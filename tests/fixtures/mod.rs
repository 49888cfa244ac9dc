//! Shared fixtures for the integration tests
//!
//! - a sample signing policy and helpers to write it to disk
//! - fake `rpm` scripts for real pseudo-terminal sessions
//! - log capture through a `tracing_subscriber` writer

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rpm_autosign::{Secret, SigningProfile};
use tracing_subscriber::fmt::MakeWriter;

/// The passphrase configured in [`SAMPLE_CONFIG`].
pub const PASSPHRASE: &str = "secret123";

/// A policy with a DEFAULT section and a few target tags.
pub const SAMPLE_CONFIG: &str = r#"
[DEFAULT]
rpm = "/usr/bin/rpm"
gpgbin = "/usr/bin/gpg2"
gpg_path = "/keys"
gpg_name = "release-key"
gpg_pass = "secret123"

[f40-candidate]
gpg_name = "f40-key"
gpg_digest_algo = "sha256"
strict_keys = "yes"

[epel9]
gpg_name = "epel9-key"
gpg_pass = "epel-pass"
prompt_timeout = 60
verify_timeout = 10

[scratch]
enabled = false
"#;

/// Write `contents` as `sign.toml` under `dir`.
pub fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("sign.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

/// A profile using `tool` with short timeouts for tests.
pub fn profile_with_tool(tool: impl Into<PathBuf>, secret: &str) -> SigningProfile {
    let mut profile = SigningProfile::new(
        "release-key",
        tool,
        "/usr/bin/gpg2",
        "/keys",
        Secret::new(secret),
    );
    profile.timeouts.prompt = Duration::from_millis(500);
    profile.timeouts.verify = Duration::from_secs(2);
    profile
}

pub fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

/// A fake `rpm` that signs when given [`PASSPHRASE`] and reports every
/// package as signed unless its name contains `unsigned`.
pub const FAKE_RPM: &str = r#"#!/bin/sh
case "$1" in
--resign)
    printf 'Enter passphrase: '
    read -r pass
    if [ "$pass" = "secret123" ]; then
        echo "Pass phrase is good."
        exit 0
    fi
    echo "gpg: signing failed: Bad passphrase"
    echo "error: gpg exec failed (2)"
    exit 1
    ;;
-qp)
    # Packages named *unsigned* have no signature but a warning mentioning
    # a key id and a description line that looks like a signature header.
    case "$4" in
    *unsigned*)
        echo "warning: $4: Header V4 RSA/SHA256 Signature, key ID deadbeef: NOKEY"
        printf 'sig:(none)\nsig:(none)\nsig:(none)\nsig:(none)\n'
        echo "Signature   : RSA/SHA256, Mon 01 Jan 2024 00:00:00 UTC, Key ID deadbeef"
        ;;
    *)
        printf 'sig:RSA/SHA256, Mon 01 Jan 2024 00:00:00 UTC, Key ID 0123abcd4567ef89\nsig:(none)\nsig:(none)\nsig:(none)\n'
        ;;
    esac
    exit 0
    ;;
esac
echo "error: unexpected arguments: $*"
exit 2
"#;

/// A fake `rpm` that never prompts and never exits on its own.
pub const SILENT_RPM: &str = "#!/bin/sh\nsleep 30\n";

/// Write an executable script named `rpm` under `dir`.
#[cfg(unix)]
pub fn write_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("rpm");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file.sync_all().unwrap();
    drop(file);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[derive(Clone, Default)]
pub struct StringWriter(Arc<Mutex<Vec<u8>>>);

impl Write for StringWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for StringWriter {
    type Writer = StringWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with all log output at debug and above captured.
pub fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let writer = StringWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8(writer.0.lock().unwrap().clone()).unwrap();
    (result, logs)
}
