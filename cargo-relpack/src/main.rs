use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

use cargo_relpack::builder::ReleaseBuilder;
use cargo_relpack::cli;
use cargo_relpack::error::RelpackError;

fn main() -> ExitCode {
    // Parse command line arguments - handle both cargo subcommand and direct invocation
    let parsed = match cli::parse_lenient(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(e) if is_informational(&e) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return exit_code(RelpackError::from(e).exit_code());
        }
    };

    // Initialize tracing; stdout is reserved for the archive path
    let default_level = if parsed.args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if parsed.args.verbose {
        tracing::info!("Running cargo-relpack with verbose output");
    }

    match run(parsed) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e
                .downcast_ref::<RelpackError>()
                .map(RelpackError::exit_code)
                .unwrap_or(1);
            tracing::error!("{:#}", e);
            exit_code(code)
        }
    }
}

/// `--help` and `--version` output, which clap exits 0 for.
fn is_informational(err: &clap::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    )
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn run(parsed: cli::ParsedArgs) -> Result<()> {
    let builder = ReleaseBuilder::new(parsed.args, &parsed.ignored)?;
    tracing::debug!("Release plan: {:?}", builder.plan());
    let output = builder.run()?;

    let archive = output
        .archive
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", output.archive.display()))?;
    tracing::info!("Checksum written to {}", output.checksum.display());
    println!("{}", archive.display());

    Ok(())
}
