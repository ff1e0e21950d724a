use anyhow::Result;
use ciao_config::SchedulerConfig;
use ciao_scheduler::service::{SchedulerService, SchedulerServiceConfig};
use ciao_ssntp::{AllControllersSink, FrameSink, SsntpFrame, SsntpResult};
use async_trait::async_trait;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ciao-scheduler-server")]
#[command(about = "ciao SSNTP Scheduler")]
struct Args {
    /// Stand-in for the SSNTP listen address (the transport itself is an
    /// out-of-scope collaborator; this is reported at startup only).
    #[arg(long)]
    bind_address: Option<String>,

    #[arg(long)]
    controller_broadcast_capacity: Option<usize>,
}

/// A `FrameSink` that logs rather than sends, for standalone runs without a
/// real SSNTP transport plugged in.
struct LoggingSink;

#[async_trait]
impl FrameSink for LoggingSink {
    async fn send(&self, to: &str, frame: SsntpFrame) -> SsntpResult<()> {
        tracing::debug!(to, frame = frame.frame_kind(), "would forward frame");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let args = Args::parse();
    let mut config = SchedulerConfig::from_env();
    if let Some(bind_address) = args.bind_address {
        config.bind_address = bind_address;
    }
    if let Some(capacity) = args.controller_broadcast_capacity {
        config.controller_broadcast_capacity = capacity;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.bind_address,
        controller_broadcast_capacity = config.controller_broadcast_capacity,
        "starting ciao scheduler"
    );

    let controller_sink = Arc::new(AllControllersSink::new(config.controller_broadcast_capacity));
    let service = Arc::new(SchedulerService::new(
        Arc::new(LoggingSink),
        controller_sink,
        SchedulerServiceConfig::default(),
    ));

    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
        tracing::info!("received shutdown signal");
    };

    service.run(shutdown).await;

    tracing::info!("ciao scheduler shutdown complete");
    Ok(())
}
