use anyhow::Context;
use beanstalk_client::BeanstalkClient;
use clap::Parser;
use std::path::PathBuf;
use tracing::Instrument;
use tube_common::{init_tracing, shutdown_signal};
use tube_worker::{Worker, WorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "tube-worker")]
#[command(about = "Consume and acknowledge jobs from a beanstalkd tube", long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Queue server host
    #[arg(long)]
    host: Option<String>,

    /// Queue server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Tube to consume from (defaults to $QUEUE)
    #[arg(short, long)]
    tube: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config =
        WorkerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Override with CLI args
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(tube) = args.tube {
        config.tube = Some(tube);
    }

    init_tracing(&config.logging);

    let settings = config.validate().context("Invalid configuration")?;
    let span = tracing::info_span!("worker", worker_id = %settings.worker_id);

    let client = BeanstalkClient::connect(settings.server_address.clone())
        .instrument(span.clone())
        .await
        .with_context(|| format!("Failed to connect to {}", settings.server_address))?;

    tracing::info!(parent: &span, "Connected to {}", settings.server_address);

    let worker = Worker::new(client, settings.tube, settings.jitter);

    let shutdown = worker.cancellation_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Received shutdown signal");
        shutdown.cancel();
    });

    let report = worker.run().instrument(span).await?;
    tracing::info!("Deleted {} jobs before shutdown", report.jobs_deleted);

    Ok(())
}
