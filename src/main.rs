use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use chrono::Utc;
use clap::Parser;
use cluster_manager::cli::Cli;
use cluster_manager::cli::Command;
use cluster_manager::cli::StartArgs;
use cluster_manager::cli::StopArgs;
use cluster_manager::report;
use cluster_manager::utils::file_io::open_file_for_write;
use cluster_manager::ClusterOrchestrator;
use cluster_manager::ClusterWorkspace;
use cluster_manager::Result;
use cluster_manager::Settings;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    // flushes the file log once main returns
    let mut log_guard: Option<WorkerGuard> = None;

    let result = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => match &cli.command {
            Command::Start(args) => start(&cli, args, settings, &mut log_guard).await,
            Command::Stop(args) => stop(&cli, args, settings, &mut log_guard).await,
        },
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // the file log may not be set up yet
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn start(
    cli: &Cli,
    args: &StartArgs,
    settings: Settings,
    log_guard: &mut Option<WorkerGuard>,
) -> Result<()> {
    let tic = Instant::now();
    let request = cli.start_request(args)?;

    let root = args
        .folder_path
        .clone()
        .unwrap_or_else(|| settings.paths.clusters_folder());
    let workspace = ClusterWorkspace::create(&root, &cli.workspace_prefix(args), Utc::now())?;

    // Initializing Logs
    let log_file = cli.log_file(workspace.path());
    *log_guard = Some(init_observability(&log_file, cli.log_level)?);
    println!("{}", report::log_file_record(&log_file));
    info!("{} Starting cluster in {}", Utc::now(), workspace.path().display());

    let mut orchestrator = ClusterOrchestrator::from_settings(settings).await?;
    let started = orchestrator.start(&workspace, &request).await?;

    info!("Created {} in {:?}", started.flavour(), tic.elapsed());
    println!("{}", report::servers_json_record(&started.nodes)?);
    println!("{}", report::cluster_folder_record(&started.workspace));
    println!("{}", report::cluster_nodes_record(&started.nodes));
    Ok(())
}

async fn stop(
    cli: &Cli,
    args: &StopArgs,
    settings: Settings,
    log_guard: &mut Option<WorkerGuard>,
) -> Result<()> {
    let tic = Instant::now();
    let request = cli.stop_request(args, &settings.paths.clusters_folder())?;

    let log_file = cli.log_file(request.target.log_folder());
    *log_guard = Some(init_observability(&log_file, cli.log_level)?);
    println!("{}", report::log_file_record(&log_file));
    info!("{} Stopping clusters of {:?}", Utc::now(), request.target);

    let mut orchestrator = ClusterOrchestrator::from_settings(settings).await?;
    let report = orchestrator.stop(&request).await?;

    for failure in &report.failures {
        warn!("{} was not stopped gracefully: {}", failure.address, failure.reason);
    }
    info!(
        "Stopped {} node(s) in {} folder(s) in {:?}",
        report.stopped.len(),
        report.removed_folders.len(),
        tic.elapsed()
    );
    Ok(())
}

/// File layer only: stdout is reserved for the machine readable records.
fn init_observability(
    log_file: &Path,
    level: Level,
) -> Result<WorkerGuard> {
    let file = open_file_for_write(log_file)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(filter);
    tracing_subscriber::registry().with(file_layer).init();

    Ok(guard)
}
