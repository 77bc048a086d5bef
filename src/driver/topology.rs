//! Topology Publisher
//!
//! Stores a JSON snapshot of the StorageCluster in a ConfigMap the ring
//! master mounts as its topology file. Published once per cluster.

use crate::crd::StorageCluster;
use crate::domain::ports::{ClusterApiRef, ResourceKey};
use crate::driver::builder::{
    object_identity, DRIVER_LABEL, DRIVER_NAME, TOPOLOGY_CONFIG_MAP, TOPOLOGY_KEY,
};
use crate::driver::submitter::{Submission, Submitter};
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Build the topology ConfigMap for a cluster
pub fn topology_config_map(cluster: &StorageCluster) -> Result<ConfigMap> {
    let (_, namespace) = object_identity(cluster, "StorageCluster")?;

    let mut snapshot = cluster.clone();
    snapshot.metadata.managed_fields = None;
    let document = serde_json::to_string(&snapshot)?;

    Ok(ConfigMap {
        metadata: ObjectMeta {
            name: Some(TOPOLOGY_CONFIG_MAP.to_string()),
            namespace: Some(namespace),
            labels: Some(BTreeMap::from([(
                DRIVER_LABEL.to_string(),
                DRIVER_NAME.to_string(),
            )])),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(TOPOLOGY_KEY.to_string(), document)])),
        ..Default::default()
    })
}

/// Recover the cluster snapshot stored in a topology ConfigMap
pub fn decode_topology(config_map: &ConfigMap) -> Result<StorageCluster> {
    let document = config_map
        .data
        .as_ref()
        .and_then(|data| data.get(TOPOLOGY_KEY))
        .ok_or_else(|| Error::invalid("ConfigMap", format!("missing key {}", TOPOLOGY_KEY)))?;
    Ok(serde_json::from_str(document)?)
}

/// Whether two versions of a cluster describe different topologies
pub fn topology_changed(old: &StorageCluster, new: &StorageCluster) -> bool {
    old.spec != new.spec
}

/// Publishes and reads back cluster topology
#[derive(Clone)]
pub struct TopologyPublisher {
    api: ClusterApiRef,
    submitter: Submitter,
}

impl TopologyPublisher {
    pub fn new(api: ClusterApiRef) -> Self {
        Self {
            submitter: Submitter::new(api.clone()),
            api,
        }
    }

    /// Publish the cluster topology; an existing ConfigMap is left untouched
    pub async fn publish(&self, cluster: &StorageCluster) -> Result<Submission> {
        let config_map = topology_config_map(cluster)?;
        debug!(
            "Publishing topology for {} nodes",
            cluster.spec.storage_nodes.len()
        );

        let outcome = self.submitter.submit(config_map).await?;
        if outcome == Submission::Created {
            info!("Created topology config map");
        }
        Ok(outcome)
    }

    /// Read the published topology of a namespace
    pub async fn read(&self, namespace: &str) -> Result<StorageCluster> {
        let config_map = self
            .api
            .get_config_map(namespace, TOPOLOGY_CONFIG_MAP)
            .await?;
        decode_topology(&config_map)
    }

    /// Address of the topology ConfigMap in a namespace
    pub fn key(namespace: &str) -> ResourceKey {
        ResourceKey::config_map(namespace, TOPOLOGY_CONFIG_MAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryClusterApi;
    use crate::crd::{
        ClusterReference, StorageClusterSpec, StorageNetwork, StorageNodeSpec,
        StorageTypeIdentifier,
    };
    use std::sync::Arc;

    fn cluster() -> StorageCluster {
        let mut node = StorageNodeSpec::swift();
        node.node_name = Some("worker-1".into());
        node.image = Some("registry.local/swift-storage:2.30".into());
        node.node_selector.insert("swift/storage".into(), "true".into());
        node.storage_network = Some(StorageNetwork {
            ips: vec!["10.96.0.40".into()],
        });
        node.cluster_ref = Some(ClusterReference {
            name: "demo".into(),
            namespace: Some("swift".into()),
        });
        node.devices = vec!["/dev/vdb".into()];

        let mut cluster = StorageCluster::new(
            "demo",
            StorageClusterSpec {
                storage_type: StorageTypeIdentifier::Swift,
                image: None,
                storage_nodes: vec![node, StorageNodeSpec::swift()],
                parameters: BTreeMap::from([("replicas".to_string(), "3".to_string())]),
            },
        );
        cluster.metadata.namespace = Some("swift".into());
        cluster
            .metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert("tier".into(), "gold".into());
        cluster
    }

    #[tokio::test]
    async fn test_round_trip() {
        let api = Arc::new(InMemoryClusterApi::new());
        let publisher = TopologyPublisher::new(api.clone());
        let original = cluster();

        let outcome = publisher.publish(&original).await.unwrap();
        let restored = publisher.read("swift").await.unwrap();

        assert_eq!(outcome, Submission::Created);
        assert_eq!(restored.spec, original.spec);
        assert_eq!(restored, original);
    }

    #[tokio::test]
    async fn test_publish_is_not_repeated() {
        let api = Arc::new(InMemoryClusterApi::new());
        let publisher = TopologyPublisher::new(api.clone());
        let original = cluster();

        publisher.publish(&original).await.unwrap();
        let mut changed = original.clone();
        changed.spec.storage_nodes.clear();
        let outcome = publisher.publish(&changed).await.unwrap();

        assert_eq!(outcome, Submission::AlreadyExisted);
        assert_eq!(publisher.read("swift").await.unwrap(), original);
    }

    #[test]
    fn test_config_map_layout() {
        let config_map = topology_config_map(&cluster()).unwrap();

        assert_eq!(config_map.metadata.name.as_deref(), Some(TOPOLOGY_CONFIG_MAP));
        assert_eq!(config_map.metadata.namespace.as_deref(), Some("swift"));
        let data = config_map.data.unwrap();
        assert_eq!(data.len(), 1);
        let json: serde_json::Value = serde_json::from_str(&data[TOPOLOGY_KEY]).unwrap();
        assert_eq!(json["spec"]["type"], "swift");
        assert_eq!(json["metadata"]["name"], "demo");
    }

    #[test]
    fn test_decode_missing_key() {
        let err = decode_topology(&ConfigMap::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidResource { .. }));
    }

    #[test]
    fn test_topology_changed() {
        let old = cluster();
        let mut new = old.clone();
        new.metadata.resource_version = Some("42".into());
        assert!(!topology_changed(&old, &new));

        new.spec.storage_nodes.pop();
        assert!(topology_changed(&old, &new));
    }

    #[tokio::test]
    async fn test_read_before_publish() {
        let api = Arc::new(InMemoryClusterApi::new());
        let publisher = TopologyPublisher::new(api);

        let err = publisher.read("swift").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
