//! rpm-autosign CLI
//!
//! Entry point for the `rpm-autosign` command-line tool.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rpm_autosign::config::DEFAULT_CONFIG_PATH;
use rpm_autosign::hooks::should_mark_strict;
use rpm_autosign::timeout::SessionTimeouts;
use rpm_autosign::{
    ensure_all_signed, FilePolicyResolver, PolicyResolver, SignOutcome, SigningDriver, SigningProfile,
    Verifier,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default package tool used when `verify` is given no target.
const DEFAULT_RPM: &str = "/usr/bin/rpm";

#[derive(Parser)]
#[command(name = "rpm-autosign")]
#[command(about = "Sign RPM packages with a per-target gpg key", version)]
struct Cli {
    /// Signing policy file
    #[arg(long, short = 'c', env = "RPM_AUTOSIGN_CONFIG", default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign packages with the profile of a target tag
    Sign {
        /// Target tag selecting the signing profile
        #[arg(long, short = 't')]
        tag: String,

        /// Skip the post-signing signature check
        #[arg(long)]
        no_verify: bool,

        /// Packages to sign, source package first
        #[arg(required = true)]
        artifacts: Vec<PathBuf>,
    },

    /// Check that packages carry a signature
    Verify {
        /// Use the rpm binary and timeout of this target's profile
        #[arg(long, short = 't', conflicts_with = "rpm")]
        tag: Option<String>,

        /// rpm binary to inspect with
        #[arg(long)]
        rpm: Option<PathBuf>,

        #[arg(required = true)]
        artifacts: Vec<PathBuf>,
    },

    /// Print the resolved profile of a target tag as JSON (secret redacted)
    Profile {
        #[arg(long, short = 't')]
        tag: String,
    },

    /// Print whether a target tag requires strict signing
    Strict {
        #[arg(long, short = 't')]
        tag: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let resolver = FilePolicyResolver::new(&cli.config);

    match cli.command {
        Commands::Sign {
            tag,
            no_verify,
            artifacts,
        } => run_sign(&resolver, &tag, no_verify, &artifacts),
        Commands::Verify { tag, rpm, artifacts } => {
            let (tool, timeouts) = match tag {
                Some(tag) => {
                    let profile = resolve(&resolver, &tag)?;
                    (profile.tool_path, profile.timeouts)
                }
                None => (
                    rpm.unwrap_or_else(|| PathBuf::from(DEFAULT_RPM)),
                    SessionTimeouts::default(),
                ),
            };
            run_verify(tool, timeouts, &artifacts)
        }
        Commands::Profile { tag } => {
            let profile = resolve(&resolver, &tag)?;
            println!("{}", serde_json::to_string_pretty(&profile_json(&profile))?);
            Ok(())
        }
        Commands::Strict { tag } => {
            let profile = resolve(&resolver, &tag)?;
            println!("{}", should_mark_strict(&profile));
            Ok(())
        }
    }
}

fn resolve(resolver: &FilePolicyResolver, tag: &str) -> Result<SigningProfile> {
    resolver
        .resolve(tag)
        .with_context(|| format!("resolving signing profile for {:?}", tag))
}

fn run_sign(resolver: &FilePolicyResolver, tag: &str, no_verify: bool, artifacts: &[PathBuf]) -> Result<()> {
    let profile = resolve(resolver, tag)?;
    let driver = SigningDriver::new()?;
    let outcome = if no_verify {
        driver.sign(&profile, artifacts)?
    } else {
        driver.sign_and_verify(&profile, artifacts)?
    };

    match outcome {
        SignOutcome::Disabled => println!("signing disabled for {}", tag),
        SignOutcome::Signed { prompts_answered } => println!(
            "signed {} package(s) with {} ({} prompt(s))",
            artifacts.len(),
            profile.key_name,
            prompts_answered
        ),
    }
    Ok(())
}

fn run_verify(tool: PathBuf, timeouts: SessionTimeouts, artifacts: &[PathBuf]) -> Result<()> {
    let verifier = Verifier::new(timeouts.verify)?;
    let results = verifier.verify(&tool, artifacts);
    for result in &results {
        let state = if result.signed { "signed" } else { "NOT SIGNED" };
        println!("{}\t{}", state, result.artifact_path.display());
    }
    ensure_all_signed(&results)?;
    Ok(())
}

fn profile_json(profile: &SigningProfile) -> serde_json::Value {
    serde_json::json!({
        "section": profile.section,
        "gpg_name": profile.key_name,
        "rpm": profile.tool_path,
        "gpgbin": profile.gpg_binary_path,
        "gpg_path": profile.gpg_home_path,
        "gpg_pass": rpm_autosign::secret::REDACTION_PLACEHOLDER,
        "gpg_digest_algo": profile.digest_algorithm,
        "enabled": profile.enabled,
        "strict_keys": profile.strict_signing,
        "prompt_timeout": profile.timeouts.prompt.as_secs(),
        "verify_timeout": profile.timeouts.verify.as_secs(),
    })
}
