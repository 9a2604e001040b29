//! Command-line and environment configuration

use crate::{
    kubeconfig::ClusterArgs,
    logging::LogFormat,
    metrics::DEFAULT_METRICS_ENDPOINT,
    scheduler::Scheduler,
    writer::{DEFAULT_CONFIG_MAP, DEFAULT_NAMESPACE},
};
use anyhow::Context as _;
use clap::Parser;
use reqwest::Url;
use std::time::Duration;

/// Publishes MetalLB configuration health into a config map.
///
/// Every flag can also be set with the environment variable shown in its
/// help; without any of them the defaults below are used.
#[derive(Parser, Debug)]
#[clap(version)]
pub struct Args {
    /// Prometheus endpoint exposing the speaker/controller metrics
    #[clap(long, env = "HEALTH_METRICS_ENDPOINT", default_value = DEFAULT_METRICS_ENDPOINT)]
    pub metrics_endpoint: String,
    /// Seconds between two cycles
    #[clap(long, env = "HEALTH_INTERVAL_SECS", default_value = "30")]
    pub interval_secs: u64,
    /// Seconds one cycle (scrape and write) may take
    #[clap(long, env = "HEALTH_TIMEOUT_SECS", default_value = "10")]
    pub timeout_secs: u64,
    /// Namespace of the health config map
    #[clap(long, env = "HEALTH_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,
    /// Name of the health config map
    #[clap(long, env = "HEALTH_CONFIG_MAP", default_value = DEFAULT_CONFIG_MAP)]
    pub config_map: String,
    /// Treat non-2xx answers of the metrics endpoint as errors
    #[clap(long, env = "HEALTH_REQUIRE_SUCCESS_STATUS")]
    pub require_success_status: bool,
    /// Log output format: `json` or `text`
    #[clap(long, env = "HEALTH_LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,
    #[clap(flatten)]
    pub cluster: ClusterArgs,
}

impl Args {
    pub fn metrics_url(&self) -> anyhow::Result<Url> {
        let url = Url::parse(&self.metrics_endpoint)
            .with_context(|| format!("invalid metrics endpoint {:?}", self.metrics_endpoint))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => anyhow::bail!("metrics endpoint must use http or https, got {:?}", other),
        }
    }

    pub fn scheduler(&self) -> anyhow::Result<Scheduler> {
        Scheduler::new(
            Duration::from_secs(self.interval_secs),
            Duration::from_secs(self.timeout_secs),
        )
    }
}
