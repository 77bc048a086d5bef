//! Domain Ports - Core trait definitions for the driver
//!
//! `ClusterApi` is the boundary to the cluster-management API and
//! `StorageDriver` is the boundary to the host operator framework.
//! Adapters implement the former; `SwiftDriver` implements the latter.

use crate::crd::{StorageCluster, StorageNode, StorageTypeIdentifier};
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Resource Identity
// =============================================================================

/// Resource kinds the driver manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Deployment,
    Service,
    ConfigMap,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Deployment => write!(f, "Deployment"),
            ResourceKind::Service => write!(f, "Service"),
            ResourceKind::ConfigMap => write!(f, "ConfigMap"),
        }
    }
}

/// Address of a resource in the cluster-management API
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn deployment(namespace: &str, name: &str) -> Self {
        Self::new(ResourceKind::Deployment, namespace, name)
    }

    pub fn service(namespace: &str, name: &str) -> Self {
        Self::new(ResourceKind::Service, namespace, name)
    }

    pub fn config_map(namespace: &str, name: &str) -> Self {
        Self::new(ResourceKind::ConfigMap, namespace, name)
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

// =============================================================================
// Manifests
// =============================================================================

/// A desired-state description ready to be submitted
#[derive(Debug, Clone, PartialEq)]
pub enum Manifest {
    /// WorkloadDescriptor
    Workload(Deployment),
    /// EndpointDescriptor
    Endpoint(Service),
    /// TopologyConfig and other configuration objects
    Config(ConfigMap),
}

impl Manifest {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Manifest::Workload(_) => ResourceKind::Deployment,
            Manifest::Endpoint(_) => ResourceKind::Service,
            Manifest::Config(_) => ResourceKind::ConfigMap,
        }
    }

    fn metadata(&self) -> &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
        match self {
            Manifest::Workload(d) => &d.metadata,
            Manifest::Endpoint(s) => &s.metadata,
            Manifest::Config(c) => &c.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.metadata().namespace.as_deref().unwrap_or_default()
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.kind(), self.namespace(), self.name())
    }
}

impl From<Deployment> for Manifest {
    fn from(deployment: Deployment) -> Self {
        Manifest::Workload(deployment)
    }
}

impl From<Service> for Manifest {
    fn from(service: Service) -> Self {
        Manifest::Endpoint(service)
    }
}

impl From<ConfigMap> for Manifest {
    fn from(config_map: ConfigMap) -> Self {
        Manifest::Config(config_map)
    }
}

// =============================================================================
// Cluster API Port
// =============================================================================

/// Port for the cluster-management API.
///
/// Implementations must report a name+namespace conflict on create as
/// `Error::ResourceExists` and a missing object as `Error::ResourceNotFound`,
/// so callers never need to look at transport-specific error shapes.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Create a resource; never merges into an existing one
    async fn create(&self, manifest: &Manifest) -> Result<()>;

    /// Delete a resource
    async fn delete(&self, key: &ResourceKey) -> Result<()>;

    /// Fetch a ConfigMap
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap>;

    /// Observed available replicas of a Deployment
    async fn available_replicas(&self, namespace: &str, name: &str) -> Result<i32>;

    /// Adapter name, for logs
    fn api_name(&self) -> &str;
}

// =============================================================================
// Storage Driver Port
// =============================================================================

/// Lifecycle callbacks the host framework invokes.
///
/// Callbacks for one cluster or node are never invoked concurrently, but
/// callbacks for distinct objects may be. A returned `Some` object asks the
/// host framework to persist it; `None` means nothing changed.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Backend this driver implements
    fn storage_type(&self) -> StorageTypeIdentifier;

    /// One-time startup hook
    async fn init(&self) -> Result<()>;

    /// A new StorageCluster was submitted
    async fn add_cluster(&self, cluster: &StorageCluster) -> Result<Option<StorageCluster>>;

    /// A StorageCluster was modified
    async fn update_cluster(&self, old: &StorageCluster, new: &StorageCluster) -> Result<()>;

    /// A StorageCluster was deleted
    async fn delete_cluster(&self, cluster: &StorageCluster) -> Result<()>;

    /// Deployment that installs the storage software for a node
    fn make_deployment(
        &self,
        node: &StorageNode,
        previous: Option<&Deployment>,
    ) -> Result<Deployment>;

    /// A node's deployment is available and running
    async fn add_node(&self, node: &StorageNode) -> Result<Option<StorageNode>>;

    /// A StorageNode was modified
    async fn update_node(&self, node: &StorageNode) -> Result<Option<StorageNode>>;

    /// A StorageNode was deleted
    async fn delete_node(&self, node: &StorageNode) -> Result<()>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ClusterApiRef = Arc<dyn ClusterApi>;
pub type StorageDriverRef = Arc<dyn StorageDriver>;
