//! One scrape-then-publish cycle

use crate::{metrics::HealthSource, scheduler::Job, writer::HealthSink};
use anyhow::Context as _;
use async_trait::async_trait;

/// Connects a health source to a health sink.
/// Each `run` reads one sample and writes it, or writes nothing at all.
pub struct Bridge<R, W> {
    source: R,
    sink: W,
}

impl<R: HealthSource, W: HealthSink> Bridge<R, W> {
    pub fn new(source: R, sink: W) -> Self {
        Bridge { source, sink }
    }
}

#[async_trait]
impl<R: HealthSource, W: HealthSink> Job for Bridge<R, W> {
    async fn run(&self) -> anyhow::Result<()> {
        let sample = self
            .source
            .read()
            .await
            .context("unable to get metrics")?;
        tracing::info!(
            stale = sample.config_stale,
            loaded = sample.config_loaded,
            "retrieved metrics"
        );

        let outcome = self
            .sink
            .write(&sample)
            .await
            .context("unable to write to health config map")?;
        tracing::info!(%outcome, "successfully wrote health to config map");
        Ok(())
    }
}
