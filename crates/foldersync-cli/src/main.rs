//! foldersync - one-way folder mirroring
//!
//! Keeps a replica folder identical to a source folder, either once or on a
//! fixed interval, logging every creation, update and deletion.

mod display;
mod logging;
mod prompt;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use foldersync_config::{Config, ConfigLoader, SyncConfig};
use foldersync_sync::{verify, PeriodicSync, SyncOptions, Synchronizer, TracingReporter};
use foldersync_types::DirectoryPolicy;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// foldersync - one-way folder mirroring
#[derive(Parser)]
#[command(
    name = "foldersync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Keep a replica folder identical to a source folder",
    long_about = "foldersync mirrors a source folder onto a replica folder.\n\
                  Content hashes decide what changed; every creation, update and\n\
                  deletion is logged to the console and optionally to a file."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Quiet mode - warnings and errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose mode - log every action
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also write log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror periodically until interrupted
    Run {
        /// Source folder (prompted for when omitted)
        source: Option<PathBuf>,
        /// Replica folder (prompted for when omitted)
        replica: Option<PathBuf>,
        /// Seconds between passes
        #[arg(short, long)]
        interval: Option<u64>,
        /// Dry run - show what would be done
        #[arg(long)]
        dry_run: bool,
        /// Replace changed directories wholesale instead of merging
        #[arg(long)]
        replace_dirs: bool,
        /// Reuse file fingerprints between passes
        #[arg(long)]
        cache: bool,
    },
    /// Run a single pass
    Once {
        /// Source folder
        source: PathBuf,
        /// Replica folder
        replica: PathBuf,
        /// Dry run - show what would be done
        #[arg(long)]
        dry_run: bool,
        /// Replace changed directories wholesale instead of merging
        #[arg(long)]
        replace_dirs: bool,
        /// Print the pass result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether a replica matches its source
    Verify {
        /// Source folder
        source: PathBuf,
        /// Replica folder
        replica: PathBuf,
    },
    /// Show or save configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
        /// Write the configuration to this file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config =
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(log_file) = &cli.log_file {
        config.logging.log_file = Some(log_file.clone());
    }

    match &cli.command {
        Commands::Run {
            source,
            replica,
            interval,
            dry_run,
            replace_dirs,
            cache,
        } => {
            apply_overrides(
                &mut config.sync,
                source.as_deref(),
                replica.as_deref(),
                *dry_run,
                *replace_dirs,
            );
            if let Some(interval) = interval {
                config.sync.interval_secs = *interval;
            }
            config.sync.cache_fingerprints |= *cache;

            if prompt::is_interactive() {
                let ask_log_file = config.logging.log_file.is_none();
                if let Some(log_file) =
                    prompt::fill_missing(&mut config.sync, interval.is_none(), ask_log_file)?
                {
                    config.logging.log_file = Some(log_file);
                }
            }
        }
        Commands::Once {
            source,
            replica,
            dry_run,
            replace_dirs,
            ..
        } => apply_overrides(
            &mut config.sync,
            Some(source.as_path()),
            Some(replica.as_path()),
            *dry_run,
            *replace_dirs,
        ),
        Commands::Verify { .. } | Commands::Config { .. } => {}
    }

    let level = logging::log_level(cli.debug, cli.verbose, cli.quiet, &config.logging.level);
    let _guard = logging::init_logging(
        level,
        config.logging.log_file.as_deref(),
        config.logging.colored_output,
    )?;

    info!("foldersync v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run { .. } => run_command(&config, cli.quiet).await,
        Commands::Once { json, .. } => once_command(&config, json, cli.quiet).await,
        Commands::Verify { source, replica } => verify_command(&source, &replica, cli.quiet).await,
        Commands::Config { default, output } => config_command(&config, default, output),
    }
}

fn apply_overrides(
    sync: &mut SyncConfig,
    source: Option<&Path>,
    replica: Option<&Path>,
    dry_run: bool,
    replace_dirs: bool,
) {
    if let Some(source) = source {
        sync.source = Some(source.to_path_buf());
    }
    if let Some(replica) = replica {
        sync.replica = Some(replica.to_path_buf());
    }
    sync.dry_run |= dry_run;
    if replace_dirs {
        sync.directory_policy = DirectoryPolicy::Replace;
    }
}

fn sync_options(sync: &SyncConfig) -> SyncOptions {
    SyncOptions {
        dry_run: sync.dry_run,
        directory_policy: sync.directory_policy,
        preserve_timestamps: sync.preserve_timestamps,
        cache_fingerprints: sync.cache_fingerprints,
    }
}

fn roots(sync: &SyncConfig) -> Result<(PathBuf, PathBuf)> {
    let source = sync
        .source
        .clone()
        .context("No source folder given; pass SOURCE or set sync.source")?;
    let replica = sync
        .replica
        .clone()
        .context("No replica folder given; pass REPLICA or set sync.replica")?;
    Ok((source, replica))
}

/// Cancel `token` on Ctrl-C or SIGTERM
fn cancel_on_shutdown(token: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown requested, stopping after the current entry");
        token.cancel();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

async fn run_command(config: &Config, quiet: bool) -> Result<ExitCode> {
    config.validate()?;
    let (source, replica) = roots(&config.sync)?;
    let interval = config.sync.interval()?;

    let scheduler = PeriodicSync::new(
        Synchronizer::with_options(sync_options(&config.sync)),
        &source,
        &replica,
        interval,
        Arc::new(TracingReporter),
    );
    cancel_on_shutdown(scheduler.cancellation_token());

    if !quiet {
        display::print_banner("⟲", "Mirroring", &source, &replica);
        println!(
            "{} Every {}s, press Ctrl-C to stop",
            style("ℹ").yellow(),
            interval.as_secs()
        );
        if config.sync.dry_run {
            println!(
                "{} Dry run mode - no changes will be made",
                style("ℹ").yellow()
            );
        }
    }

    let passes = scheduler.run().await;

    if !quiet {
        println!("{} Stopped after {} passes", style("✓").green(), passes);
    }
    Ok(ExitCode::SUCCESS)
}

async fn once_command(config: &Config, json: bool, quiet: bool) -> Result<ExitCode> {
    config.validate()?;
    let (source, replica) = roots(&config.sync)?;

    let cancel = CancellationToken::new();
    cancel_on_shutdown(cancel.clone());

    if !quiet && !json {
        display::print_banner("⟲", "Synchronizing", &source, &replica);
        if config.sync.dry_run {
            println!(
                "{} Dry run mode - no changes will be made",
                style("ℹ").yellow()
            );
        }
    }

    let mut synchronizer = Synchronizer::with_options(sync_options(&config.sync));
    let result = synchronizer
        .synchronize_until(&source, &replica, &TracingReporter, &cancel)
        .await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&display::PassReportJson::new(&result))?
        );
    } else if !quiet {
        display::print_sync_result(&result);
    }

    Ok(if display::pass_succeeded(&result) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn verify_command(source: &Path, replica: &Path, quiet: bool) -> Result<ExitCode> {
    if !quiet {
        display::print_banner("🔍", "Comparing", source, replica);
    }

    let spinner = display::create_spinner(quiet, "Fingerprinting both trees...");
    let report = verify(source, replica).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let report = report?;

    if !quiet {
        display::print_verify_report(&report);
    }

    Ok(if report.in_sync() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn config_command(config: &Config, default: bool, output: Option<PathBuf>) -> Result<ExitCode> {
    let config = if default {
        Config::default()
    } else {
        config.clone()
    };

    match output {
        Some(path) => {
            ConfigLoader::save_to_file(&config, &path)?;
            println!(
                "{} Configuration written to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
        None => {
            let label = if default { "Default" } else { "Current" };
            println!("{} {} configuration:", style("⚙").blue().bold(), label);
            print!("{}", ConfigLoader::render(&config, Path::new("config.yaml"))?);
        }
    }

    Ok(ExitCode::SUCCESS)
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
    fn test_parse_run_without_paths() {
        let cli = Cli::try_parse_from(["foldersync", "run", "--interval", "5", "--cache"]).unwrap();
        match cli.command {
            Commands::Run {
                source,
                replica,
                interval,
                cache,
                ..
            } => {
                assert!(source.is_none());
                assert!(replica.is_none());
                assert_eq!(interval, Some(5));
                assert!(cache);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_once_with_global_flags() {
        let cli = Cli::try_parse_from([
            "foldersync",
            "once",
            "src",
            "dst",
            "--json",
            "--quiet",
            "--log-file",
            "sync.log",
        ])
        .unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.log_file, Some(PathBuf::from("sync.log")));
        assert!(matches!(cli.command, Commands::Once { json: true, .. }));
    }

    #[test]
    fn test_once_requires_both_paths() {
        assert!(Cli::try_parse_from(["foldersync", "once", "src"]).is_err());
    }

    #[test]
    fn test_overrides_and_options() {
        let mut sync = SyncConfig::default();
        apply_overrides(
            &mut sync,
            Some(Path::new("/data/source")),
            None,
            true,
            true,
        );

        assert_eq!(sync.source, Some(PathBuf::from("/data/source")));
        assert_eq!(sync.replica, None);
        assert!(roots(&sync).is_err());

        let options = sync_options(&sync);
        assert!(options.dry_run);
        assert_eq!(options.directory_policy, DirectoryPolicy::Replace);
        assert!(options.preserve_timestamps);
    }
}
