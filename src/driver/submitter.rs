//! Idempotent Resource Submitter
//!
//! Creation is idempotent: a name+namespace conflict counts as success and
//! leaves the existing object untouched. Deletion is not: a missing object is
//! reported to the caller. Keep the two paths asymmetric.

use crate::domain::ports::{ClusterApiRef, Manifest, ResourceKey};
use crate::error::{Error, Result};
use tracing::{debug, error, info};

/// Outcome of a successful submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Created,
    AlreadyExisted,
}

/// Submits descriptors to the cluster API
#[derive(Clone)]
pub struct Submitter {
    api: ClusterApiRef,
}

impl Submitter {
    pub fn new(api: ClusterApiRef) -> Self {
        Self { api }
    }

    /// Create a resource, absorbing `ResourceExists`
    pub async fn submit(&self, manifest: impl Into<Manifest>) -> Result<Submission> {
        let manifest = manifest.into();
        let key = manifest.key();

        match self.api.create(&manifest).await {
            Ok(()) => {
                debug!("Created {}", key);
                Ok(Submission::Created)
            }
            Err(Error::ResourceExists { .. }) => {
                info!("{} already exists, leaving it as is", key);
                Ok(Submission::AlreadyExisted)
            }
            Err(e) => {
                error!("Failed to create {}: {}", key, e);
                Err(e)
            }
        }
    }

    /// Delete a resource; `ResourceNotFound` is returned to the caller
    pub async fn delete(&self, key: &ResourceKey) -> Result<()> {
        match self.api.delete(key).await {
            Ok(()) => {
                debug!("Deleted {}", key);
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete {}: {}", key, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{InMemoryClusterApi, Verb};
    use crate::domain::ports::ResourceKind;
    use k8s_openapi::api::core::v1::Service;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    fn service(name: &str, note: &str) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some("demo".into()),
                annotations: Some(BTreeMap::from([("note".to_string(), note.to_string())])),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_submit_twice_yields_one_resource() {
        let api = Arc::new(InMemoryClusterApi::new());
        let submitter = Submitter::new(api.clone());

        let first = assert_ok!(submitter.submit(service("swiftservice", "a")).await);
        let second = assert_ok!(submitter.submit(service("swiftservice", "a")).await);

        assert_eq!(first, Submission::Created);
        assert_eq!(second, Submission::AlreadyExisted);
        assert_eq!(api.keys_of(ResourceKind::Service).len(), 1);
    }

    #[tokio::test]
    async fn test_submit_does_not_modify_existing() {
        let api = Arc::new(InMemoryClusterApi::new());
        let submitter = Submitter::new(api.clone());

        assert_ok!(submitter.submit(service("swiftservice", "original")).await);
        assert_ok!(submitter.submit(service("swiftservice", "changed")).await);

        let stored = api.get(&ResourceKey::service("demo", "swiftservice")).unwrap();
        assert_eq!(stored, Manifest::from(service("swiftservice", "original")));
    }

    #[tokio::test]
    async fn test_submit_propagates_other_errors() {
        let api = Arc::new(InMemoryClusterApi::new());
        let key = ResourceKey::service("demo", "swiftservice");
        api.fail_on(Verb::Create, key, "forbidden");
        let submitter = Submitter::new(api.clone());

        let err = assert_err!(submitter.submit(service("swiftservice", "a")).await);
        assert!(matches!(err, Error::SubmitFailed { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_not_idempotent() {
        let api = Arc::new(InMemoryClusterApi::new());
        let submitter = Submitter::new(api.clone());
        let key = ResourceKey::service("demo", "swiftservice");

        assert_ok!(submitter.submit(service("swiftservice", "a")).await);
        assert_ok!(submitter.delete(&key).await);
        let err = assert_err!(submitter.delete(&key).await);

        assert!(err.is_not_found());
    }
}
