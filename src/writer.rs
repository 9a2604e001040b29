//! Publishing health samples into the cluster

use crate::{
    create_or_update,
    errors::{classify_kube, ErrorClass},
    health::HealthSample,
    ObjectStore, UpsertOutcome,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, PostParams};
use std::collections::BTreeMap;

pub const DEFAULT_NAMESPACE: &str = "metallb-system";
pub const DEFAULT_CONFIG_MAP: &str = "health";

const FIELD_MANAGER: &str = "metallb-health";

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("cluster is unreachable: {0}")]
    ClusterUnreachable(#[source] kube::Error),
    #[error("not allowed to write health config map: {0}")]
    Forbidden(#[source] kube::Error),
    #[error("health config map was modified concurrently: {0}")]
    Conflict(#[source] kube::Error),
    #[error("unable to write health config map: {0}")]
    Unknown(#[source] kube::Error),
}

impl From<kube::Error> for WriteError {
    fn from(err: kube::Error) -> Self {
        match classify_kube(&err) {
            ErrorClass::Unreachable => WriteError::ClusterUnreachable(err),
            ErrorClass::Forbidden | ErrorClass::Unauthorized => WriteError::Forbidden(err),
            ErrorClass::Conflict | ErrorClass::AlreadyExists => WriteError::Conflict(err),
            _ => WriteError::Unknown(err),
        }
    }
}

/// Anything that can persist a health sample
#[async_trait]
pub trait HealthSink: Send + Sync {
    async fn write(&self, sample: &HealthSample) -> Result<UpsertOutcome, WriteError>;
}

/// Keeps `configLoaded`/`configStale` of one config map up to date
pub struct HealthWriter<S = Api<ConfigMap>> {
    store: S,
    namespace: String,
    name: String,
}

impl HealthWriter {
    pub fn new(client: kube::Client, namespace: &str, name: &str) -> Self {
        HealthWriter::with_store(Api::namespaced(client, namespace), namespace, name)
    }
}

impl<S: ObjectStore<ConfigMap>> HealthWriter<S> {
    pub fn with_store(store: S, namespace: &str, name: &str) -> Self {
        HealthWriter {
            store,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
impl<S> HealthWriter<S> {
    pub(crate) fn store(&self) -> &S {
        &self.store
    }
}

fn make_post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl<S: ObjectStore<ConfigMap>> HealthSink for HealthWriter<S> {
    #[tracing::instrument(skip(self, sample), fields(namespace = self.namespace.as_str(), name = self.name.as_str()))]
    async fn write(&self, sample: &HealthSample) -> Result<UpsertOutcome, WriteError> {
        let (_, outcome) = create_or_update(
            &self.store,
            Some(self.namespace.as_str()),
            &self.name,
            &make_post_params(),
            |cm: &mut ConfigMap| sample.apply_to(cm.data.get_or_insert_with(BTreeMap::new)),
        )
        .await?;
        tracing::debug!(%outcome, "upserted health config map");
        Ok(outcome)
    }
}
