pub mod bridge;
pub mod config;
pub mod errors;
pub mod health;
pub mod kubeconfig;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod writer;

use async_trait::async_trait;
use kube::{
    api::{ObjectMeta, PostParams},
    Api, Resource,
};
use std::fmt::Debug;

/// Minimal view of a namespaced object collection.
/// Implemented by `kube::Api`; tests substitute an in-memory map.
#[async_trait]
pub trait ObjectStore<K>: Send + Sync {
    async fn get_opt(&self, name: &str) -> kube::Result<Option<K>>;
    async fn create(&self, pp: &PostParams, object: &K) -> kube::Result<K>;
    async fn replace(&self, name: &str, pp: &PostParams, object: &K) -> kube::Result<K>;
}

#[async_trait]
impl<K> ObjectStore<K> for Api<K>
where
    K: Resource
        + Clone
        + Debug
        + serde::Serialize
        + serde::de::DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn get_opt(&self, name: &str) -> kube::Result<Option<K>> {
        Api::get_opt(self, name).await
    }

    async fn create(&self, pp: &PostParams, object: &K) -> kube::Result<K> {
        Api::create(self, pp, object).await
    }

    async fn replace(&self, name: &str, pp: &PostParams, object: &K) -> kube::Result<K> {
        Api::replace(self, name, pp, object).await
    }
}

/// What `create_or_update` ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum UpsertOutcome {
    Created,
    Updated,
    /// Mutation produced an identical object, nothing was sent
    Unchanged,
}

/// Fetches `name`, or starts from an empty object with that identity if it
/// does not exist, applies `mutate` and writes the result back.
///
/// The update carries the resourceVersion that was read, so a concurrent
/// writer surfaces as a `Conflict` error instead of being overwritten.
pub async fn create_or_update<K, S, F>(
    store: &S,
    namespace: Option<&str>,
    name: &str,
    pp: &PostParams,
    mutate: F,
) -> kube::Result<(K, UpsertOutcome)>
where
    K: Resource + Default + Clone + PartialEq + Send + Sync,
    S: ObjectStore<K> + ?Sized,
    F: FnOnce(&mut K) + Send,
{
    match store.get_opt(name).await? {
        Some(current) => {
            let mut new = current.clone();
            mutate(&mut new);
            if new == current {
                return Ok((current, UpsertOutcome::Unchanged));
            }
            new.meta_mut().resource_version = current.meta().resource_version.clone();
            let updated = store.replace(name, pp, &new).await?;
            Ok((updated, UpsertOutcome::Updated))
        }
        None => {
            let mut new = K::default();
            *new.meta_mut() = ObjectMeta {
                name: Some(name.to_string()),
                namespace: namespace.map(ToString::to_string),
                ..Default::default()
            };
            mutate(&mut new);
            let created = store.create(pp, &new).await?;
            Ok((created, UpsertOutcome::Created))
        }
    }
}
