//! Target tag to signing profile resolution against real config files.

mod fixtures;

use std::path::PathBuf;
use std::time::Duration;

use fixtures::{write_config, PASSPHRASE, SAMPLE_CONFIG};
use rpm_autosign::config::{ConfigDocument, DEFAULT_SECTION};
use rpm_autosign::{ConfigError, FilePolicyResolver, PolicyResolver, SessionTimeouts, StaticPolicyResolver};

#[test]
fn test_unknown_tag_resolves_to_default_values() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = FilePolicyResolver::new(write_config(dir.path(), SAMPLE_CONFIG));

    let profile = resolver.resolve("rawhide").unwrap();
    assert_eq!(profile.section, DEFAULT_SECTION);
    assert_eq!(profile.tool_path, PathBuf::from("/usr/bin/rpm"));
    assert_eq!(profile.gpg_binary_path, PathBuf::from("/usr/bin/gpg2"));
    assert_eq!(profile.gpg_home_path, PathBuf::from("/keys"));
    assert_eq!(profile.key_name, "release-key");
    assert_eq!(profile.secret.expose(), PASSPHRASE);
    assert_eq!(profile.digest_algorithm, None);
    assert!(profile.enabled);
    assert!(!profile.strict_signing);
    assert_eq!(profile.timeouts, SessionTimeouts::default());
}

#[test]
fn test_tag_section_inherits_default() {
    let resolver = StaticPolicyResolver::from_toml(SAMPLE_CONFIG).unwrap();

    let profile = resolver.resolve("f40-candidate").unwrap();
    assert_eq!(profile.section, "f40-candidate");
    assert_eq!(profile.key_name, "f40-key");
    assert_eq!(profile.digest_algorithm.as_deref(), Some("sha256"));
    assert!(profile.strict_signing);
    assert_eq!(profile.tool_path, PathBuf::from("/usr/bin/rpm"));
    assert_eq!(profile.secret.expose(), PASSPHRASE);
}

#[test]
fn test_tag_section_overrides_secret_and_timeouts() {
    let resolver = StaticPolicyResolver::from_toml(SAMPLE_CONFIG).unwrap();

    let profile = resolver.resolve("epel9").unwrap();
    assert_eq!(profile.secret.expose(), "epel-pass");
    assert_eq!(profile.timeouts.prompt, Duration::from_secs(60));
    assert_eq!(profile.timeouts.verify, Duration::from_secs(10));
}

#[test]
fn test_disabled_tag() {
    let resolver = StaticPolicyResolver::from_toml(SAMPLE_CONFIG).unwrap();
    assert!(!resolver.resolve("scratch").unwrap().enabled);
}

#[test]
fn test_missing_required_field_without_default() {
    let resolver = StaticPolicyResolver::from_toml(
        r#"
[f40]
rpm = "/usr/bin/rpm"
gpgbin = "/usr/bin/gpg2"
gpg_path = "/keys"
gpg_pass = "secret123"
"#,
    )
    .unwrap();

    match resolver.resolve("f40").unwrap_err() {
        ConfigError::MissingField { section, field } => {
            assert_eq!(section, "f40");
            assert_eq!(field, "gpg_name");
        }
        other => panic!("expected MissingField, got {:?}", other),
    }
}

#[test]
fn test_no_section_and_no_default() {
    let resolver = StaticPolicyResolver::from_toml("[f40]\ngpg_name = \"k\"\n").unwrap();
    let err = resolver.resolve("rawhide").unwrap_err();
    assert!(matches!(err, ConfigError::NoSection { ref tag } if tag == "rawhide"));
}

#[test]
fn test_invalid_timeout_rejected() {
    let config = format!("{}\n[slow]\nprompt_timeout = 0\n", SAMPLE_CONFIG);
    let resolver = StaticPolicyResolver::from_toml(&config).unwrap();
    assert!(matches!(
        resolver.resolve("slow").unwrap_err(),
        ConfigError::Invalid { .. }
    ));
}

#[test]
fn test_errors_never_echo_secret() {
    let resolver = StaticPolicyResolver::from_toml(
        r#"
[DEFAULT]
rpm = "/usr/bin/rpm"
gpgbin = "/usr/bin/gpg2"
gpg_path = "/keys"
gpg_name = "release-key"
gpg_pass = 918273645
"#,
    )
    .unwrap();

    let err = resolver.resolve("rawhide").unwrap_err();
    assert!(!err.to_string().contains("918273645"));
    assert!(!format!("{:?}", err).contains("918273645"));
}

#[test]
fn test_file_resolver_rereads_on_every_call() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), SAMPLE_CONFIG);
    let resolver = FilePolicyResolver::new(&path);
    assert!(!resolver.resolve("rawhide").unwrap().strict_signing);

    let updated = SAMPLE_CONFIG.replace("[scratch]", "[rawhide]\nstrict_keys = true\n\n[scratch]");
    std::fs::write(&path, updated).unwrap();
    assert!(resolver.resolve("rawhide").unwrap().strict_signing);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = FilePolicyResolver::new(dir.path().join("absent.toml"));
    assert!(matches!(resolver.resolve("rawhide").unwrap_err(), ConfigError::Io { .. }));
}

#[test]
fn test_resolution_logs_config_digest() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), SAMPLE_CONFIG);
    let digest = ConfigDocument::from_file(&path).unwrap().digest().unwrap().to_string();
    let resolver = FilePolicyResolver::new(&path);

    let (profile, logs) = fixtures::with_captured_logs(|| resolver.resolve("rawhide"));
    profile.unwrap();
    assert!(logs.contains("resolved signing profile"));
    assert!(logs.contains(&digest));
    assert!(!logs.contains(PASSPHRASE));
}
