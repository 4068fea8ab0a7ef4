//! Forwarding Daemon Entry Point

use std::path::PathBuf;
use std::process::ExitCode;

use autofwdd::{DockerLister, ForwardMgr, ForwarderConfig, SshTunnelManager};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Forward every port published by remote docker containers over ssh
#[derive(Parser, Debug)]
#[command(name = "autofwdd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML); missing file means defaults
    #[arg(short = 'c', long, default_value = autofwdd::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Delay between reconciliation ticks in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Local address tunnels bind to
    #[arg(long)]
    bind_address: Option<String>,

    /// ssh destination running the docker daemon
    #[arg(long)]
    remote_host: Option<String>,
}

impl Args {
    /// Command line values override the config file
    fn apply_overrides(&self, config: &mut ForwarderConfig) {
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(addr) = &self.bind_address {
            config.bind_address = addr.clone();
        }
        if let Some(host) = &self.remote_host {
            config.remote_host = host.clone();
        }
    }
}

/// Initialize tracing/logging.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Cancel `token` on SIGINT or SIGTERM
fn setup_signal_handlers(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut term = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(term) => term,
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM handler");
                    if signal::ctrl_c().await.is_ok() {
                        info!("Received SIGINT");
                        token.cancel();
                    }
                    return;
                }
            };
            tokio::select! {
                res = signal::ctrl_c() => {
                    if res.is_ok() {
                        info!("Received SIGINT");
                    }
                }
                _ = term.recv() => info!("Received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            if signal::ctrl_c().await.is_ok() {
                info!("Received SIGINT");
            }
        }
        token.cancel();
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting autofwdd ---");

    let mut config = match ForwarderConfig::load_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    args.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return ExitCode::FAILURE;
    }

    info!(
        remote_host = %config.remote_host,
        bind_address = %config.bind_address,
        "Forwarding published container ports"
    );

    let mut mgr = ForwardMgr::new(
        DockerLister::from_config(&config),
        SshTunnelManager::from_config(&config),
    )
    .with_poll_interval(config.poll_interval())
    .with_default_host(config.default_host.clone());

    let cancel = CancellationToken::new();
    setup_signal_handlers(cancel.clone());

    match mgr.run(cancel).await {
        Ok(()) => {
            info!("autofwdd exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "autofwdd error");
            ExitCode::FAILURE
        }
    }
}
