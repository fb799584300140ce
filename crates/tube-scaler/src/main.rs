use anyhow::Context;
use beanstalk_client::BeanstalkClient;
use clap::Parser;
use std::path::PathBuf;
use tube_common::{init_tracing, shutdown_signal};
use tube_scaler::{LogSink, ScalerConfig, TubeMonitor};

#[derive(Parser, Debug)]
#[command(name = "tube-scaler")]
#[command(about = "Derive consumer replica counts from beanstalkd tube backlogs", long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Seconds between polls
    #[arg(short, long)]
    interval: Option<u64>,

    /// Poll once, print decisions and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config =
        ScalerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(interval) = args.interval {
        config.poll_interval_secs = interval;
    }

    init_tracing(&config.logging);
    config.validate().context("Invalid configuration")?;

    let address = config.server_address();
    let client = BeanstalkClient::connect(address.clone())
        .await
        .with_context(|| format!("Failed to connect to {}", address))?;
    tracing::info!("Connected to {}", address);

    let mut monitor = TubeMonitor::new(client, LogSink, config.policy(), config.poll_interval());

    if args.once {
        for decision in monitor.poll_once().await? {
            println!("{}\t{}\t{}", decision.deployment, decision.jobs_ready, decision.replicas);
        }
        return Ok(());
    }

    let shutdown = monitor.cancellation_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Received shutdown signal");
        shutdown.cancel();
    });

    monitor.run().await?;
    Ok(())
}
