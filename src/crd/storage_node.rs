//! StorageNode CRD
//!
//! One member of a storage cluster: where it runs, which addresses it owns
//! and which image implements it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::storage_cluster::StorageTypeIdentifier;

// =============================================================================
// StorageNode CRD
// =============================================================================

/// StorageNode is a single storage daemon placement created by the host
/// framework from a StorageCluster template.
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "quartermaster.coreos.com",
    version = "v1alpha1",
    kind = "StorageNode",
    plural = "storagenodes",
    shortname = "qmsn",
    status = "StorageNodeStatus",
    printcolumn = r#"{"name": "Node", "type": "string", "jsonPath": ".spec.nodeName"}"#,
    printcolumn = r#"{"name": "Ready", "type": "boolean", "jsonPath": ".status.ready"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct StorageNodeSpec {
    /// Backend implementing this node
    #[serde(rename = "type")]
    pub storage_type: StorageTypeIdentifier,

    /// Container image for the storage daemon (driver default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Kubernetes node the daemon is pinned to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Node selector for scheduling
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Addresses assigned on the storage network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_network: Option<StorageNetwork>,

    /// Owning cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_ref: Option<ClusterReference>,

    /// Raw block devices handed to the daemon
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<String>,

    /// Host directories handed to the daemon
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directories: Vec<String>,
}

// =============================================================================
// Sub-Types
// =============================================================================

/// Storage network configuration for a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageNetwork {
    #[serde(default)]
    pub ips: Vec<String>,
}

/// Reference from a node back to its StorageCluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterReference {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Status of the StorageNode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageNodeStatus {
    #[serde(default)]
    pub ready: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// Implementations
// =============================================================================

impl StorageNodeSpec {
    /// Spec for a Swift node with nothing but its placement set
    pub fn swift() -> Self {
        Self {
            storage_type: StorageTypeIdentifier::Swift,
            image: None,
            node_name: None,
            node_selector: BTreeMap::new(),
            storage_network: None,
            cluster_ref: None,
            devices: Vec::new(),
            directories: Vec::new(),
        }
    }

    /// Requested image, ignoring empty strings
    pub fn requested_image(&self) -> Option<&str> {
        self.image.as_deref().filter(|image| !image.trim().is_empty())
    }

    /// First address on the storage network, if any
    pub fn storage_ip(&self) -> Option<&str> {
        self.storage_network
            .as_ref()
            .and_then(|net| net.ips.first())
            .map(String::as_str)
    }
}

impl StorageNode {
    /// Whether the host framework has marked the node ready
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().map(|s| s.ready).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_image_ignores_blank() {
        let mut spec = StorageNodeSpec::swift();
        assert_eq!(spec.requested_image(), None);

        spec.image = Some("  ".into());
        assert_eq!(spec.requested_image(), None);

        spec.image = Some("registry.local/swift-storage:2.30".into());
        assert_eq!(
            spec.requested_image(),
            Some("registry.local/swift-storage:2.30")
        );
    }

    #[test]
    fn test_storage_ip() {
        let mut spec = StorageNodeSpec::swift();
        assert_eq!(spec.storage_ip(), None);

        spec.storage_network = Some(StorageNetwork { ips: vec![] });
        assert_eq!(spec.storage_ip(), None);

        spec.storage_network = Some(StorageNetwork {
            ips: vec!["10.96.0.20".into(), "10.96.0.21".into()],
        });
        assert_eq!(spec.storage_ip(), Some("10.96.0.20"));
    }

    #[test]
    fn test_spec_serializes_camel_case() {
        let mut spec = StorageNodeSpec::swift();
        spec.node_name = Some("worker-2".into());
        let json = serde_json::to_value(&spec).unwrap();

        assert_eq!(json["type"], "swift");
        assert_eq!(json["nodeName"], "worker-2");
        assert!(json.get("nodeSelector").is_none());
    }
}
