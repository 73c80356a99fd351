// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sealdrop operator tool.
//
// Entry point. Initialises logging, loads the store configuration, and runs
// one command. Failures print operator advice and exit non-zero.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sealdrop_core::advice::advise;
use sealdrop_core::error::Result;
use sealdrop_core::types::Seed;
use sealdrop_identity::{IdentityCodec, curate};

use services::context::{ServiceContext, load_config};

/// Source-protecting submission store.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to $SEALDROP_CONFIG, then the XDG config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify storage root, word lists, and recipient key; exit non-zero on
    /// any failure
    Check,
    /// Print the designation for a seed
    Designate { seed: String },
    /// Seal a local file into the store at FRAGMENT
    Seal { fragment: PathBuf, file: PathBuf },
    /// Print the sha256 checksum of a stored artifact
    Checksum { fragment: PathBuf },
    /// Append a line to the operator NOTES log
    Note { message: String },
    /// Move a submission or source directory to the shredder
    Delete { fragment: PathBuf },
    /// Destroy everything in the shredder
    Shred,
    /// Filter a word corpus through the configured word policy
    Curate { corpus: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let advice = advise(&e);
            tracing::error!(error = %e, class = ?advice.class, "command failed");
            eprintln!("error: {}", advice.summary);
            eprintln!("next step: {}", advice.action);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Check => {
            let ctx = ServiceContext::init(config)?;
            let report = serde_json::json!({
                "storage_root": ctx.store.root().as_path(),
                "shredder": ctx.store.shredder().path(),
                "key": ctx.store.custodian().status(),
                "engine": ctx.store.custodian().engine().name(),
                "designations": ctx.codec.combinations(),
                "word_policy": ctx.config.word_policy,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Designate { seed } => {
            config.validate()?;
            let codec = IdentityCodec::from_config(&config)?;
            println!("{}", codec.designate(&Seed::parse_lenient(&seed)));
        }
        Command::Seal { fragment, file } => {
            let ctx = ServiceContext::init(config)?;
            let plaintext = std::fs::read(&file)?;
            let path = ctx.store.write(&fragment, &plaintext)?;
            println!("{}", path.display());
        }
        Command::Checksum { fragment } => {
            let ctx = ServiceContext::maintenance(config)?;
            println!("{}", ctx.store.checksum(&fragment)?);
        }
        Command::Note { message } => {
            let ctx = ServiceContext::maintenance(config)?;
            ctx.store.append_log(&message)?;
        }
        Command::Delete { fragment } => {
            let ctx = ServiceContext::maintenance(config)?;
            ctx.store.move_to_shredder(&fragment)?;
        }
        Command::Shred => {
            let ctx = ServiceContext::maintenance(config)?;
            let report = ctx.store.shredder().clear()?;
            println!(
                "shredded {} files, {} links, {} directories ({} bytes wiped)",
                report.files, report.links, report.directories, report.bytes_wiped
            );
        }
        Command::Curate { corpus } => {
            let text = std::fs::read_to_string(&corpus)?;
            for word in curate(&text, &config.word_policy) {
                println!("{word}");
            }
        }
    }
    Ok(())
}
