//! StorageCluster CRD
//!
//! Describes a whole storage cluster: which backend implements it and the
//! member node templates the host framework materializes as StorageNodes.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::storage_node::{StorageNodeSpec, StorageNodeStatus};

// =============================================================================
// Storage Type Identifier
// =============================================================================

/// Storage backends the host framework knows how to dispatch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StorageTypeIdentifier {
    Mock,
    Nfs,
    GlusterFs,
    Swift,
}

impl std::fmt::Display for StorageTypeIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageTypeIdentifier::Mock => write!(f, "mock"),
            StorageTypeIdentifier::Nfs => write!(f, "nfs"),
            StorageTypeIdentifier::GlusterFs => write!(f, "glusterfs"),
            StorageTypeIdentifier::Swift => write!(f, "swift"),
        }
    }
}

// =============================================================================
// StorageCluster CRD
// =============================================================================

/// StorageCluster is the desired topology of one storage service.
/// The host framework creates a StorageNode for every entry in `storageNodes`.
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "quartermaster.coreos.com",
    version = "v1alpha1",
    kind = "StorageCluster",
    plural = "storageclusters",
    shortname = "qmsc",
    status = "StorageClusterStatus",
    printcolumn = r#"{"name": "Type", "type": "string", "jsonPath": ".spec.type"}"#,
    printcolumn = r#"{"name": "Ready", "type": "boolean", "jsonPath": ".status.ready"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterSpec {
    /// Backend implementing this cluster
    #[serde(rename = "type")]
    pub storage_type: StorageTypeIdentifier,

    /// Image applied to nodes that do not set their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Member node templates
    #[serde(default)]
    pub storage_nodes: Vec<StorageNodeSpec>,

    /// Driver-specific settings, opaque to the host framework
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

/// Status of the StorageCluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterStatus {
    #[serde(default)]
    pub ready: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default)]
    pub node_statuses: Vec<StorageNodeStatus>,
}

impl StorageCluster {
    /// Number of member nodes declared by the cluster
    pub fn node_count(&self) -> usize {
        self.spec.storage_nodes.len()
    }

    /// Whether the host framework has marked the cluster ready
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().map(|s| s.ready).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::ResourceExt;

    #[test]
    fn test_storage_type_display() {
        assert_eq!(format!("{}", StorageTypeIdentifier::Swift), "swift");
        assert_eq!(format!("{}", StorageTypeIdentifier::GlusterFs), "glusterfs");
    }

    #[test]
    fn test_cluster_from_yaml() {
        let yaml = r#"
apiVersion: quartermaster.coreos.com/v1alpha1
kind: StorageCluster
metadata:
  name: demo
  namespace: swift
spec:
  type: swift
  storageNodes:
    - type: swift
      nodeName: worker-1
      storageNetwork:
        ips: ["10.96.0.10"]
"#;
        let cluster: StorageCluster = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(cluster.name_any(), "demo");
        assert_eq!(cluster.namespace().as_deref(), Some("swift"));
        assert_eq!(cluster.spec.storage_type, StorageTypeIdentifier::Swift);
        assert_eq!(cluster.node_count(), 1);
        assert_eq!(
            cluster.spec.storage_nodes[0].node_name.as_deref(),
            Some("worker-1")
        );
        assert!(!cluster.is_ready());
    }
}
