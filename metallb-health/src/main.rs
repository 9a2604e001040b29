use anyhow::Context;
use clap::Parser;
use kube_health_bridge::{
    bridge::Bridge, config::Args, kubeconfig, logging, metrics::MetricsReader,
    writer::HealthWriter,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.log_format)?;
    tracing::info!(args = ?args, "parsed command-line arguments");

    let scheduler = args.scheduler()?;
    let reader = MetricsReader::new(args.metrics_url()?)
        .context("unable to create http client")?
        .require_success_status(args.require_success_status);

    let client = kubeconfig::connect(&args.cluster)
        .await
        .context("unable to create kubernetes client")?;
    let writer = HealthWriter::new(client, &args.namespace, &args.config_map);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(err) = shutdown_signal().await {
                tracing::error!(error = %err, "failed to listen for termination signals");
                return;
            }
            tracing::info!("Got termination signal, shutting down");
            cancel.cancel();
        }
    });

    tracing::info!(
        endpoint = %reader.endpoint(),
        namespace = args.namespace.as_str(),
        config_map = args.config_map.as_str(),
        interval_secs = scheduler.interval().as_secs(),
        "Starting health bridge"
    );
    let bridge = Bridge::new(reader, writer);
    scheduler.run(&bridge, cancel).await;
    Ok(())
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    #[cfg(unix)]
    let terminate = sigterm.recv();
    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        res = signal::ctrl_c() => res,
        _ = terminate => Ok(()),
    }
}
