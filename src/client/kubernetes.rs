//! Kubernetes-backed Cluster API
//!
//! Thin adapter over `kube::Api` that turns API status codes into the
//! driver's typed errors.

use crate::domain::ports::{ClusterApi, Manifest, ResourceKey, ResourceKind};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use tracing::{debug, warn};

/// Cluster API talking to a real Kubernetes control plane
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient kubeconfig or in-cluster environment
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Map a client error onto the driver's error taxonomy
fn classify(err: kube::Error, key: &ResourceKey) -> Error {
    match err {
        kube::Error::Api(response) if response.code == 409 && response.reason == "AlreadyExists" => {
            Error::ResourceExists {
                kind: key.kind.to_string(),
                name: key.name.clone(),
            }
        }
        kube::Error::Api(response) if response.code == 404 => Error::ResourceNotFound {
            kind: key.kind.to_string(),
            name: key.name.clone(),
        },
        kube::Error::Api(response) => Error::SubmitFailed {
            kind: key.kind.to_string(),
            name: key.name.clone(),
            reason: format!("{} ({})", response.message, response.code),
        },
        other => Error::Kube(other),
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn create(&self, manifest: &Manifest) -> Result<()> {
        let key = manifest.key();
        let params = PostParams::default();
        debug!("Creating {}", key);

        let result = match manifest {
            Manifest::Workload(deployment) => self
                .deployments(&key.namespace)
                .create(&params, deployment)
                .await
                .map(|_| ()),
            Manifest::Endpoint(service) => self
                .services(&key.namespace)
                .create(&params, service)
                .await
                .map(|_| ()),
            Manifest::Config(config_map) => self
                .config_maps(&key.namespace)
                .create(&params, config_map)
                .await
                .map(|_| ()),
        };

        result.map_err(|e| classify(e, &key))
    }

    async fn delete(&self, key: &ResourceKey) -> Result<()> {
        debug!("Deleting {}", key);

        let result = match key.kind {
            // Background propagation so the ReplicaSets and Pods go too
            ResourceKind::Deployment => self
                .deployments(&key.namespace)
                .delete(&key.name, &DeleteParams::background())
                .await
                .map(|_| ()),
            ResourceKind::Service => self
                .services(&key.namespace)
                .delete(&key.name, &DeleteParams::default())
                .await
                .map(|_| ()),
            ResourceKind::ConfigMap => self
                .config_maps(&key.namespace)
                .delete(&key.name, &DeleteParams::default())
                .await
                .map(|_| ()),
        };

        result.map_err(|e| classify(e, key))
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap> {
        let key = ResourceKey::config_map(namespace, name);
        self.config_maps(namespace)
            .get(name)
            .await
            .map_err(|e| classify(e, &key))
    }

    async fn available_replicas(&self, namespace: &str, name: &str) -> Result<i32> {
        let key = ResourceKey::deployment(namespace, name);
        let deployment = self
            .deployments(namespace)
            .get(name)
            .await
            .map_err(|e| classify(e, &key))?;

        let available = deployment
            .status
            .and_then(|status| status.available_replicas)
            .unwrap_or(0);
        if available < 0 {
            warn!("{} reports negative available replicas", key);
            return Ok(0);
        }
        Ok(available)
    }

    fn api_name(&self) -> &str {
        "kubernetes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: format!("{} happened", reason),
            reason: reason.into(),
            code,
        })
    }

    #[test]
    fn test_classify_already_exists() {
        let key = ResourceKey::service("demo", "swiftservice");
        let err = classify(api_error(409, "AlreadyExists"), &key);
        assert_matches!(err, Error::ResourceExists { kind, name } => {
            assert_eq!(kind, "Service");
            assert_eq!(name, "swiftservice");
        });
    }

    #[test]
    fn test_classify_update_conflict_is_not_already_exists() {
        let key = ResourceKey::deployment("demo", "swift-proxy-deploy");
        let err = classify(api_error(409, "Conflict"), &key);
        assert_matches!(err, Error::SubmitFailed { .. });
    }

    #[test]
    fn test_classify_not_found() {
        let key = ResourceKey::config_map("demo", "swift-cluster-configmap");
        let err = classify(api_error(404, "NotFound"), &key);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_classify_forbidden() {
        let key = ResourceKey::deployment("demo", "swift-ring-master-deploy");
        let err = classify(api_error(403, "Forbidden"), &key);
        assert_matches!(err, Error::SubmitFailed { reason, .. } => {
            assert!(reason.contains("403"));
        });
    }
}
