//! Service wiring: configuration, logging, instance clients and workers.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use seedferry_arr::ArrClient;
use seedferry_config::{InstanceConfig, SyncConfig};
use seedferry_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, build_sha};
use seedferry_torrent_core::{TorrentClient, UnavailableClient};
use seedferry_transmission::TransmissionClient;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::Cli;
use crate::error::{AppError, AppResult};
use crate::reconcile::{Reconciler, RunMode};
use crate::worker::{Schedule, run_worker};

/// Dependencies required to bootstrap the service.
#[derive(Debug)]
pub(crate) struct BootstrapDependencies {
    config: SyncConfig,
    cli: Cli,
}

impl BootstrapDependencies {
    /// Read flags from the command line and configuration from the environment.
    pub(crate) fn from_env() -> AppResult<Self> {
        let cli = Cli::parse();
        let config = SyncConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
        Ok(Self { config, cli })
    }
}

/// One worker the service will run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WorkerPlan {
    pub(crate) mode: RunMode,
    pub(crate) schedule: Schedule,
}

/// Workers requested by the flags and configuration.
///
/// The main worker always runs unless `--dry-run` asks for the read-only pass
/// alone; a configured dry-run interval adds the read-only worker alongside it.
pub(crate) fn plan_workers(config: &SyncConfig, cli: &Cli) -> Vec<WorkerPlan> {
    let override_interval = cli.interval.map(Duration::from_secs);
    let schedule = |interval: Duration| Schedule {
        interval,
        once: cli.once,
    };

    if cli.dry_run {
        let interval = override_interval
            .or(config.dry_run_interval)
            .unwrap_or(config.interval);
        return vec![WorkerPlan {
            mode: RunMode::DryRun,
            schedule: schedule(interval),
        }];
    }

    let mut workers = vec![WorkerPlan {
        mode: RunMode::Apply,
        schedule: schedule(override_interval.unwrap_or(config.interval)),
    }];
    if let Some(interval) = config.dry_run_interval {
        workers.push(WorkerPlan {
            mode: RunMode::DryRun,
            schedule: schedule(interval),
        });
    }
    workers
}

/// Entry point for the service boot sequence.
///
/// # Errors
///
/// Returns an error if configuration or logging cannot be set up, or a worker panics.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let BootstrapDependencies { config, cli } = dependencies;

    let logging = LoggingConfig {
        level: &config.log.level,
        format: LogFormat::parse(config.log.format.as_deref()),
        build_sha: build_sha(),
    };
    seedferry_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let process_mode = match (cli.dry_run, cli.once) {
        (true, _) => "dry-run",
        (false, true) => "once",
        (false, false) => "service",
    };
    let _context = GlobalContextGuard::new(process_mode);

    info!(
        remote = %config.remote.rpc_url(),
        local = %config.local.rpc_url(),
        remote_root = %config.remote_root.display(),
        local_root = %config.local_root.display(),
        queues = config.arr.len(),
        "seedferry starting"
    );

    let cancel = CancellationToken::new();
    let shutdown = spawn_shutdown_listener(cancel.clone());

    let mut workers = Vec::new();
    for plan in plan_workers(&config, &cli) {
        let reconciler = build_reconciler(plan.mode, &config).await;
        let handle: JoinHandle<u64> = tokio::spawn(run_worker(reconciler, plan.schedule, cancel.clone()));
        workers.push((plan.mode, handle));
    }

    let mut outcome = Ok(());
    for (mode, handle) in workers {
        if let Err(source) = handle.await {
            error!(mode = mode.as_str(), error = %source, "worker task failed");
            cancel.cancel();
            if outcome.is_ok() {
                outcome = Err(AppError::Worker {
                    worker: mode.as_str(),
                    source,
                });
            }
        }
    }
    shutdown.abort();
    info!("seedferry stopped");
    outcome
}

/// Build a reconciler with its own client handles.
async fn build_reconciler(mode: RunMode, config: &SyncConfig) -> Reconciler {
    let local = connect(&config.local, config.rpc_timeout).await;
    let remote = connect(&config.remote, config.rpc_timeout).await;
    let queues = config
        .arr
        .iter()
        .filter_map(|instance| match ArrClient::new(instance, config.rpc_timeout) {
            Ok(client) => Some(client),
            Err(err) => {
                error!(instance = %instance.name, error = %err, "failed to build queue client");
                None
            }
        })
        .collect();
    Reconciler::new(mode, config, local, remote).with_queues(queues)
}

/// Client for `instance`; construction and connectivity failures are logged and the
/// instance's calls then fail per call.
async fn connect(instance: &InstanceConfig, timeout: Duration) -> Arc<dyn TorrentClient> {
    let client: Arc<dyn TorrentClient> = match TransmissionClient::new(instance, timeout) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            error!(instance = %instance.label, error = %err, "failed to build instance client");
            return Arc::new(UnavailableClient::new(instance.label.clone()));
        }
    };
    match client.probe().await {
        Ok(()) => info!(instance = %instance.label, url = %instance.rpc_url(), "connected to instance"),
        Err(err) => error!(
            instance = %instance.label,
            url = %instance.rpc_url(),
            error = %err,
            "instance unreachable; calls will fail until it recovers"
        ),
    }
    client
}

fn spawn_shutdown_listener(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("shutdown requested");
        cancel.cancel();
    })
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(err) = result {
                        warn!(error = %err, "failed to listen for ctrl-c");
                        std::future::pending::<()>().await;
                    }
                }
                _ = terminate.recv() => {}
            }
        }
        Err(err) => {
            warn!(error = %err, "failed to install SIGTERM handler");
            wait_for_ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
