//! olang-certify - resolver conformance certification
//!
//! Runs conformance suites against a resolver program and reports whether it
//! is certified:
//! - Structural suites parse a workflow through the resolver
//! - Metadata suites check a resolver declaration file
//! - Runtime suites invoke the resolver and check its behavior
//!
//! Exits 0 only when every suite passes.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod certify;
mod config;
mod error;
mod output;
mod process;

use certify::CertifyOptions;
use config::CliConfig;
use error::CliResult;

/// olang-certify application
#[derive(Parser)]
#[command(name = "olang-certify")]
#[command(about = "O-lang resolver conformance certification", long_about = None)]
#[command(version)]
struct Cli {
    /// Resolver program (relative paths resolve against the current directory)
    #[arg(short, long, env = "OLANG_RESOLVER")]
    resolver: Option<String>,

    /// Directory containing one subdirectory per suite
    #[arg(short = 'd', long)]
    suites_dir: Option<PathBuf>,

    /// Suite to run; repeat for several (default: the kernel suites)
    #[arg(short, long = "suite")]
    suites: Vec<String>,

    /// Print the JSON report and write conformance-report.json
    #[arg(long)]
    json: bool,

    /// Write badges/certified.svg
    #[arg(long)]
    badge: bool,

    /// Configuration file path
    #[arg(short, long, env = "OLANG_CONFORMANCE_CONFIG")]
    config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

async fn run(cli: Cli) -> CliResult<bool> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let options = CertifyOptions::merge(
        cli.resolver,
        cli.suites_dir,
        cli.suites,
        cli.json,
        cli.badge,
        &config,
    )?;
    certify::execute(options, &config).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            output::print_error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repeated_suites() {
        let cli = Cli::try_parse_from([
            "olang-certify",
            "--resolver",
            "./calc",
            "--suite",
            "R-001-allowlist",
            "-s",
            "R-011-determinism",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.resolver.as_deref(), Some("./calc"));
        assert_eq!(cli.suites, ["R-001-allowlist", "R-011-determinism"]);
        assert!(cli.json);
        assert!(!cli.badge);
    }
}
