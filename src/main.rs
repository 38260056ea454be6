use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use nrkcast::feed::{build_all, run_status, BuildError, BuildOutcome};
use nrkcast::{run_discovery, CatalogClient, Config, Registry, ShowKind};

#[derive(Parser, Debug)]
#[command(name = "nrkcast", about = "Generates podcast feeds from NRK's public catalog")]
struct Args {
    /// Path to the configuration file
    #[arg(long, value_name = "FILE", default_value = "nrkcast.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover untracked shows and append them to the registry
    Discover,
    /// Build feed documents for enabled registry entries
    Build {
        /// Which feed kinds to build
        #[arg(long, value_enum, default_value_t = BuildKind::All)]
        kind: BuildKind,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BuildKind {
    Audio,
    Video,
    All,
}

impl BuildKind {
    fn kinds(self) -> &'static [ShowKind] {
        match self {
            BuildKind::Audio => &[ShowKind::Audio],
            BuildKind::Video => &[ShowKind::Video],
            BuildKind::All => &[ShowKind::Audio, ShowKind::Video],
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config).context("Failed to load configuration")?;
    let client =
        CatalogClient::new(&config.api_base_url).context("Failed to create catalog client")?;

    match args.command {
        Command::Discover => {
            let report = run_discovery(&client, &config.registry_path, &config)
                .await
                .context("Discovery failed, registry left untouched")?;
            println!(
                "Discovery complete: {} shows listed, {} added, {} video shows skipped",
                report.listed, report.added, report.skipped_video
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Build { kind } => {
            let registry =
                Registry::load(&config.registry_path).context("Failed to load registry")?;

            let mut outcomes: Vec<BuildOutcome> = Vec::new();
            for &show_kind in kind.kinds() {
                let entries: Vec<_> = registry
                    .enabled(show_kind)
                    .into_iter()
                    .cloned()
                    .collect();
                if entries.is_empty() {
                    tracing::debug!(kind = %show_kind, "No enabled entries");
                    continue;
                }
                outcomes.extend(build_all(&client, &config, entries).await);
            }

            Ok(report_outcomes(&outcomes))
        }
    }
}

/// Prints the per-entry summary and maps the run verdict to an exit code:
/// 0 when every entry built or was skipped, 2 on partial failure, 1 when
/// nothing succeeded. Entries with nothing playable count as skips.
fn report_outcomes(outcomes: &[BuildOutcome]) -> ExitCode {
    let mut succeeded = 0;
    let mut skipped = 0;
    let mut failed = 0;

    for outcome in outcomes {
        match &outcome.result {
            Ok(built) => {
                succeeded += 1;
                println!(
                    "  ok   {} ({} episodes) -> {}",
                    outcome.show_id,
                    built.episodes,
                    built.path.display()
                );
            }
            Err(BuildError::NoEpisodes) => {
                skipped += 1;
                println!("  skip {} (no playable episodes)", outcome.show_id);
            }
            Err(e) => {
                failed += 1;
                println!("  FAIL {} ({})", outcome.show_id, e);
            }
        }
    }
    println!("Build complete: {succeeded} succeeded, {skipped} skipped, {failed} failed");

    ExitCode::from(run_status(outcomes).exit_code())
}
