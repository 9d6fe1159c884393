//! obdresource CLI
//!
//! Packages, signs and verifies diagnostic resource archives.
//! Every failure ends with a single `error:` line on stderr and exit status 1.

use anyhow::Result;
use clap::{Parser, Subcommand};
use obdresource::{
    check_log, CheckOptions, SignRequest, VerifyRequest, DEFAULT_KEY_ID, DEFAULT_LOG_PATH,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "obdresource", version)]
#[command(about = "Package, sign and verify diagnostic resource archives")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a canonical archive from a working directory and sign it
    Sign {
        /// Working directory with manifest.json, data/ and licenses/
        #[arg(long)]
        input: PathBuf,

        /// Ed25519 private key (raw 32 bytes or PKCS#8 PEM)
        #[arg(long)]
        key: PathBuf,

        /// Destination .obdresource file
        #[arg(long)]
        output: PathBuf,

        /// Signature path [default: <output>.sig]
        #[arg(long)]
        signature_output: Option<PathBuf>,

        /// Overwrite existing archive and signature
        #[arg(long)]
        force: bool,

        /// Identifier of the signing key to embed in the manifest
        #[arg(long, default_value = DEFAULT_KEY_ID)]
        key_id: String,

        /// JSONL log receiving one entry per signing
        #[arg(long, default_value = DEFAULT_LOG_PATH)]
        log: PathBuf,
    },

    /// Verify a signed archive
    Verify {
        /// Path to the .obdresource archive
        #[arg(long)]
        input: PathBuf,

        /// Path to the detached signature
        #[arg(long)]
        signature: PathBuf,

        /// Ed25519 public key (raw 32 bytes or SPKI PEM)
        #[arg(long)]
        key: PathBuf,

        /// keyId the manifest must carry
        #[arg(long)]
        expected_key_id: Option<String>,
    },

    /// Validate the signing log
    CheckLog {
        #[arg(long, default_value = DEFAULT_LOG_PATH)]
        log: PathBuf,

        /// Allow duplicate packageId+version entries
        #[arg(long)]
        allow_duplicates: bool,

        /// Skip existence checks for archive/signature/manifest paths
        #[arg(long)]
        skip_path_checks: bool,
    },
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Sign {
            input,
            key,
            output,
            signature_output,
            force,
            key_id,
            log,
        } => {
            let mut request = SignRequest::new(input, key, output)
                .key_id(key_id)
                .force(force)
                .log_path(log);
            if let Some(path) = signature_output {
                request = request.signature_path(path);
            }

            let signed = request.sign()?;
            let manifest = &signed.manifest;
            println!("Archive: {}", signed.archive_path.display());
            println!("Signature: {}", signed.signature_path.display());
            println!("Package ID: {}", manifest.package_id().unwrap_or("<undefined>"));
            println!("Version: {}", manifest.version().unwrap_or("<undefined>"));
            println!("Records: {}", manifest.records.unwrap_or_default());
            println!("Checksum: {}", manifest.checksum.as_deref().unwrap_or_default());
        }

        Command::Verify {
            input,
            signature,
            key,
            expected_key_id,
        } => {
            let mut request = VerifyRequest::new(input, signature, key);
            if let Some(expected) = expected_key_id {
                request = request.expected_key_id(expected);
            }

            let report = request.verify()?;
            println!("Signature OK");
            println!("Checksum OK");
            println!("Record count OK");
            println!("Package ID: {}", report.package_id.as_deref().unwrap_or("<undefined>"));
            println!("Version: {}", report.version.as_deref().unwrap_or("<undefined>"));
            println!("Records: {}", report.records);
            println!("keyId: {}", report.key_id);
        }

        Command::CheckLog {
            log,
            allow_duplicates,
            skip_path_checks,
        } => {
            let options = CheckOptions {
                allow_duplicates,
                check_paths: !skip_path_checks,
            };
            let validated = check_log(&log, options)?;
            println!("Validated {} signing entries from {}", validated, log.display());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    debug!("{:?}", cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
