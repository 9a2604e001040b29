//! Scraping health signals from the speaker's metrics endpoint.
//!
//! Only the two boolean gauges in [`crate::health`] are consulted: no labels,
//! no timestamps, no metric types.

use crate::health::{HealthSample, CONFIG_LOADED_METRIC, CONFIG_STALE_METRIC};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::collections::HashMap;

pub const DEFAULT_METRICS_ENDPOINT: &str = "http://localhost:7472/metrics";

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("error creating http request: {0}")]
    RequestBuild(#[source] reqwest::Error),
    #[error("error executing http request: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("error reading body of metrics endpoint: {0}")]
    BodyRead(#[source] reqwest::Error),
    #[error("metrics endpoint answered with status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("metrics not found in response: {0:?}")]
    MetricMissing(String),
    #[error("unable to parse bool value of metric {0:?}")]
    MetricUnparseable(String),
}

/// Anything that can produce a fresh health sample
#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn read(&self) -> Result<HealthSample, ReadError>;
}

/// Metric name to raw value token, as found in one exposition.
#[derive(Debug, Default)]
pub struct MetricLineIndex<'a> {
    lines: HashMap<&'a str, &'a str>,
}

impl<'a> MetricLineIndex<'a> {
    pub fn parse(body: &'a str) -> Self {
        let mut lines = HashMap::new();
        for line in body.split('\n') {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((name, value)) = line.split_once(' ') {
                lines.insert(name, value);
            }
        }
        MetricLineIndex { lines }
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.lines.get(name).copied()
    }

    pub fn read_bool(&self, name: &str) -> Result<bool, ReadError> {
        let raw = self
            .get(name)
            .ok_or_else(|| ReadError::MetricMissing(name.to_string()))?;
        parse_bool(raw.trim()).ok_or_else(|| ReadError::MetricUnparseable(name.to_string()))
    }

    /// Projects the index onto the two health gauges.
    /// The loaded metric is resolved first.
    pub fn health_sample(&self) -> Result<HealthSample, ReadError> {
        let config_loaded = self.read_bool(CONFIG_LOADED_METRIC)?;
        let config_stale = self.read_bool(CONFIG_STALE_METRIC)?;
        Ok(HealthSample {
            config_loaded,
            config_stale,
        })
    }
}

/// Accepts `1`, `0` and the usual spellings of `true`/`false`
pub fn parse_bool(token: &str) -> Option<bool> {
    match token {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Reads health signals over HTTP. The client is shared between cycles.
pub struct MetricsReader {
    client: reqwest::Client,
    endpoint: Url,
    require_success_status: bool,
}

impl MetricsReader {
    pub fn new(endpoint: Url) -> anyhow::Result<Self> {
        Ok(MetricsReader {
            client: reqwest::Client::builder().build()?,
            endpoint,
            require_success_status: false,
        })
    }

    /// Rejects non-2xx responses instead of parsing their bodies
    pub fn require_success_status(mut self, require: bool) -> Self {
        self.require_success_status = require;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn fetch(&self) -> Result<Vec<u8>, ReadError> {
        let request = self
            .client
            .get(self.endpoint.clone())
            .build()
            .map_err(ReadError::RequestBuild)?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(ReadError::Transport)?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), "metrics endpoint responded");
        if self.require_success_status && !status.is_success() {
            return Err(ReadError::UnexpectedStatus(status));
        }
        let body = response.bytes().await.map_err(ReadError::BodyRead)?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl HealthSource for MetricsReader {
    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn read(&self) -> Result<HealthSample, ReadError> {
        let raw = self.fetch().await?;
        let body = String::from_utf8_lossy(&raw);
        MetricLineIndex::parse(&body).health_sample()
    }
}
