//! Swift Lifecycle Orchestrator
//!
//! Implements the host framework's callbacks for OpenStack Swift.
//!
//! Bringing a cluster up is strictly ordered:
//!
//! ```text
//! topology ConfigMap ─▶ ring master Deployment ─▶ (ready) ─▶ ring master Service
//!                                                                  │
//!            proxy Service ◀─ (ready) ◀─ proxy Deployment ◀────────┘
//! ```
//!
//! The proxy reads its rings from the ring master at start-up, so the ring
//! master must be available first. Every create tolerates an existing object,
//! which makes a failed `add_cluster` safe to re-run. Nothing is rolled back.

use crate::config::DriverConfig;
use crate::crd::{StorageCluster, StorageNode, StorageTypeIdentifier};
use crate::domain::ports::{ClusterApiRef, ResourceKey, StorageDriver};
use crate::driver::builder::{self, object_identity};
use crate::driver::metrics::DriverMetrics;
use crate::driver::readiness::ReadinessWaiter;
use crate::driver::submitter::Submitter;
use crate::driver::topology::{topology_changed, TopologyPublisher};
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Resources `add_cluster` creates, in the order `delete_cluster` removes them
pub fn cluster_resources(namespace: &str) -> [ResourceKey; 5] {
    [
        ResourceKey::service(namespace, builder::PROXY_SERVICE),
        ResourceKey::service(namespace, builder::RING_MASTER_SERVICE),
        ResourceKey::deployment(namespace, builder::PROXY_DEPLOYMENT),
        ResourceKey::deployment(namespace, builder::RING_MASTER_DEPLOYMENT),
        TopologyPublisher::key(namespace),
    ]
}

/// Storage driver for OpenStack Swift clusters
pub struct SwiftDriver {
    config: DriverConfig,
    api: ClusterApiRef,
    submitter: Submitter,
    waiter: ReadinessWaiter,
    topology: TopologyPublisher,
    metrics: DriverMetrics,
    shutdown: CancellationToken,
}

impl SwiftDriver {
    /// Create a driver; the configuration is validated up front
    pub fn new(config: DriverConfig, api: ClusterApiRef) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            submitter: Submitter::new(api.clone()),
            waiter: ReadinessWaiter::new(api.clone(), &config),
            topology: TopologyPublisher::new(api.clone()),
            metrics: DriverMetrics::new()?,
            shutdown: CancellationToken::new(),
            config,
            api,
        })
    }

    /// Abort readiness waits when `token` fires
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn metrics(&self) -> &DriverMetrics {
        &self.metrics
    }

    pub fn topology(&self) -> &TopologyPublisher {
        &self.topology
    }

    /// Submit a Deployment and block until it is available
    async fn deploy_and_wait(&self, deployment: Deployment) -> Result<()> {
        let name = deployment.name_any();
        let namespace = deployment.namespace().unwrap_or_default();
        let desired = builder::desired_replicas(&deployment);

        self.submitter.submit(deployment).await?;
        let waited = self
            .waiter
            .wait_until_ready(&namespace, &name, desired, &self.shutdown)
            .await?;
        self.metrics.record_readiness_wait(&name, waited);

        Ok(())
    }

    /// Topology, ring master and its Service
    async fn create_rings(&self, cluster: &StorageCluster, namespace: &str) -> Result<()> {
        self.topology.publish(cluster).await?;

        self.deploy_and_wait(builder::ring_master_deployment(namespace, &self.config))
            .await?;
        self.submitter
            .submit(builder::ring_master_service(namespace, &self.config))
            .await?;

        debug!("Ring master deployed");
        Ok(())
    }

    /// Swift proxy and the Service exposing its API
    async fn deploy_proxy(&self, namespace: &str) -> Result<()> {
        self.deploy_and_wait(builder::proxy_deployment(namespace, &self.config))
            .await?;
        self.submitter.submit(builder::proxy_service(namespace)).await?;

        debug!("Swift proxy deployed");
        Ok(())
    }

    async fn add_cluster_inner(&self, cluster: &StorageCluster) -> Result<Option<StorageCluster>> {
        let (name, namespace) = object_identity(cluster, "StorageCluster")?;
        info!("Adding cluster {}/{}", namespace, name);

        self.create_rings(cluster, &namespace).await?;
        self.deploy_proxy(&namespace).await?;

        info!("Cluster {}/{} is serving", namespace, name);
        Ok(None)
    }

    async fn delete_cluster_inner(&self, cluster: &StorageCluster) -> Result<()> {
        let (name, namespace) = object_identity(cluster, "StorageCluster")?;
        info!("Deleting cluster {}/{}", namespace, name);

        for key in cluster_resources(&namespace) {
            self.submitter.delete(&key).await?;
        }

        info!("Cluster {}/{} removed", namespace, name);
        Ok(())
    }

    /// The topology ConfigMap is never republished
    async fn update_cluster_inner(&self, old: &StorageCluster, new: &StorageCluster) -> Result<()> {
        info!("Updating cluster {}", old.name_any());

        if topology_changed(old, new) {
            warn!(
                "Topology of cluster {} changed; republishing is not supported, existing resources are kept",
                new.name_any()
            );
        }
        Ok(())
    }

    async fn update_node_inner(&self, node: &StorageNode) -> Result<Option<StorageNode>> {
        info!("Updating storage node {}", node.name_any());
        Ok(None)
    }

    async fn add_node_inner(&self, node: &StorageNode) -> Result<Option<StorageNode>> {
        let service = builder::node_service(node)?;
        info!("Adding node {}", node.name_any());

        self.submitter.submit(service).await?;
        Ok(None)
    }

    async fn delete_node_inner(&self, node: &StorageNode) -> Result<()> {
        let (name, namespace) = object_identity(node, "StorageNode")?;
        info!("Deleting storage node {}", name);

        let key = ResourceKey::service(&namespace, &builder::node_service_name(&name));
        self.submitter.delete(&key).await
    }
}

#[async_trait]
impl StorageDriver for SwiftDriver {
    fn storage_type(&self) -> StorageTypeIdentifier {
        StorageTypeIdentifier::Swift
    }

    async fn init(&self) -> Result<()> {
        info!(
            "Swift driver initialized against the {} API",
            self.api.api_name()
        );
        Ok(())
    }

    async fn add_cluster(&self, cluster: &StorageCluster) -> Result<Option<StorageCluster>> {
        let span = info_span!("add_cluster", cluster = %cluster.name_any());
        let result = self.add_cluster_inner(cluster).instrument(span).await;
        self.metrics.record_callback("add_cluster", &result);
        result
    }

    async fn update_cluster(&self, old: &StorageCluster, new: &StorageCluster) -> Result<()> {
        let span = info_span!("update_cluster", cluster = %new.name_any());
        let result = self.update_cluster_inner(old, new).instrument(span).await;
        self.metrics.record_callback("update_cluster", &result);
        result
    }

    async fn delete_cluster(&self, cluster: &StorageCluster) -> Result<()> {
        let span = info_span!("delete_cluster", cluster = %cluster.name_any());
        let result = self.delete_cluster_inner(cluster).instrument(span).await;
        self.metrics.record_callback("delete_cluster", &result);
        result
    }

    fn make_deployment(
        &self,
        node: &StorageNode,
        previous: Option<&Deployment>,
    ) -> Result<Deployment> {
        debug!("Make deployment for node {}", node.name_any());

        let mut deployment = builder::node_deployment(node, &self.config)?;
        if let Some(previous) = previous {
            deployment.metadata.annotations = previous.metadata.annotations.clone();
        }
        Ok(deployment)
    }

    async fn add_node(&self, node: &StorageNode) -> Result<Option<StorageNode>> {
        let span = info_span!("add_node", node = %node.name_any());
        let result = self.add_node_inner(node).instrument(span).await;
        self.metrics.record_callback("add_node", &result);
        result
    }

    async fn update_node(&self, node: &StorageNode) -> Result<Option<StorageNode>> {
        let span = info_span!("update_node", node = %node.name_any());
        let result = self.update_node_inner(node).instrument(span).await;
        self.metrics.record_callback("update_node", &result);
        result
    }

    async fn delete_node(&self, node: &StorageNode) -> Result<()> {
        let span = info_span!("delete_node", node = %node.name_any());
        let result = self.delete_node_inner(node).instrument(span).await;
        self.metrics.record_callback("delete_node", &result);
        result
    }
}
