//! Resource Descriptor Builder
//!
//! Pure constructors for every Deployment and Service the Swift driver
//! submits. Nothing here performs I/O; the same inputs always produce the
//! same descriptors.
//!
//! Labeling contract: every pod template carries `DRIVER_LABEL` plus one
//! identity label, and the owning Deployment selects on exactly those two.
//! Cluster-wide workloads are identified by `ROLE_LABEL`, storage nodes by
//! `NODE_LABEL`; every Service selects on the identity label alone. The two
//! keys never overlap, whatever a node is called.

use crate::config::DriverConfig;
use crate::crd::StorageNode;
use crate::error::{Error, Result};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, HostPathVolumeSource, KeyToPath, PodSpec,
    PodTemplateSpec, Service, ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use std::collections::BTreeMap;

// =============================================================================
// Labels
// =============================================================================

/// Driver identity label, present on everything the driver creates
pub const DRIVER_LABEL: &str = "swift.storage/driver";
pub const DRIVER_NAME: &str = "swift";

/// Role identity label; Services bind to workloads through it
pub const ROLE_LABEL: &str = "swift.storage/role";
pub const PROXY_ROLE: &str = "swift-proxy";
pub const RING_MASTER_ROLE: &str = "swift-ring-master";

/// Storage node identity label; its value is the StorageNode name
pub const NODE_LABEL: &str = "swift.storage/node";

/// Longest value Kubernetes accepts for a label or a Service name
pub const MAX_NAME_LENGTH: usize = 63;

// =============================================================================
// Resource Names
// =============================================================================

pub const PROXY_DEPLOYMENT: &str = "swift-proxy-deploy";
pub const PROXY_SERVICE: &str = "swiftservice";
pub const RING_MASTER_DEPLOYMENT: &str = "swift-ring-master-deploy";
pub const RING_MASTER_SERVICE: &str = "swift-ring-master-svc";
pub const TOPOLOGY_CONFIG_MAP: &str = "swift-cluster-configmap";

/// ConfigMap key holding the serialized cluster
pub const TOPOLOGY_KEY: &str = "cluster.json";
/// File name the ring master reads the topology from
pub const TOPOLOGY_FILE: &str = "cluster_topology.json";

// =============================================================================
// Ports
// =============================================================================

pub const OBJECT_PORT: i32 = 6200;
pub const CONTAINER_PORT: i32 = 6201;
pub const ACCOUNT_PORT: i32 = 6202;
pub const PROXY_PORT: i32 = 8080;
pub const RING_MASTER_PORT: i32 = 8090;

const STORAGE_PORTS: [(&str, i32); 3] = [
    ("object", OBJECT_PORT),
    ("container", CONTAINER_PORT),
    ("account", ACCOUNT_PORT),
];

// =============================================================================
// Volumes
// =============================================================================

const SWIFT_ETC: &str = "/etc/swift";
const STORAGE_ETC_VOLUME: &str = "swift-storage-etc";
const STORAGE_ETC_HOST_PATH: &str = "/var/lib/swift_storage/etc";
const PROXY_ETC_VOLUME: &str = "swift-proxy-etc";
const PROXY_ETC_HOST_PATH: &str = "/var/lib/swift_proxy/etc";
const TOPOLOGY_VOLUME: &str = "config-swift-cluster";
const TOPOLOGY_MOUNT_PATH: &str = "/etc/swift_config";

const RING_MINION_CONTAINER: &str = "swift-ring-minion";
const PULL_IF_NOT_PRESENT: &str = "IfNotPresent";

/// Replica count of every workload the driver creates
pub const SINGLETON_REPLICAS: i32 = 1;

// =============================================================================
// Identity
// =============================================================================

/// Name and namespace of a host-framework object, both required
pub fn object_identity<K: ResourceExt>(obj: &K, kind: &str) -> Result<(String, String)> {
    let name = obj
        .meta()
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::invalid(kind, "metadata.name is not set"))?;
    let namespace = obj
        .namespace()
        .filter(|ns| !ns.is_empty())
        .ok_or_else(|| Error::invalid(kind, format!("{} has no namespace", name)))?;
    Ok((name, namespace))
}

/// Name and namespace of a StorageNode, checked against the limits of the
/// label value and Service name derived from it
pub fn node_identity(node: &StorageNode) -> Result<(String, String)> {
    let (name, namespace) = object_identity(node, "StorageNode")?;
    let service_name = node_service_name(&name);
    if service_name.len() > MAX_NAME_LENGTH {
        return Err(Error::invalid(
            "StorageNode",
            format!(
                "name {} is too long: {} would exceed {} characters",
                name, service_name, MAX_NAME_LENGTH
            ),
        ));
    }
    Ok((name, namespace))
}

/// Labels carried by the pod template of a role
pub fn pod_labels(role: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (DRIVER_LABEL.to_string(), DRIVER_NAME.to_string()),
        (ROLE_LABEL.to_string(), role.to_string()),
    ])
}

/// Selector a Service uses to reach the pods of a role
pub fn role_selector(role: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(ROLE_LABEL.to_string(), role.to_string())])
}

/// Labels carried by the pod template of a storage node
pub fn node_pod_labels(node_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (DRIVER_LABEL.to_string(), DRIVER_NAME.to_string()),
        (NODE_LABEL.to_string(), node_name.to_string()),
    ])
}

/// Selector a node Service uses to reach its storage pods
pub fn node_selector(node_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(NODE_LABEL.to_string(), node_name.to_string())])
}

fn driver_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(DRIVER_LABEL.to_string(), DRIVER_NAME.to_string())])
}

fn description(text: &str) -> Option<BTreeMap<String, String>> {
    Some(BTreeMap::from([("description".to_string(), text.to_string())]))
}

pub fn node_service_name(node_name: &str) -> String {
    format!("{}-svc", node_name)
}

// =============================================================================
// Small Builders
// =============================================================================

fn container(
    name: &str,
    image: &str,
    ports: &[(&str, i32)],
    mounts: Vec<VolumeMount>,
) -> Container {
    let ports: Vec<ContainerPort> = ports
        .iter()
        .map(|(port_name, port)| ContainerPort {
            name: Some(port_name.to_string()),
            container_port: *port,
            ..Default::default()
        })
        .collect();

    Container {
        name: name.to_string(),
        image: Some(image.to_string()),
        image_pull_policy: Some(PULL_IF_NOT_PRESENT.to_string()),
        ports: if ports.is_empty() { None } else { Some(ports) },
        volume_mounts: Some(mounts),
        ..Default::default()
    }
}

fn ring_minion(config: &DriverConfig, mounts: Vec<VolumeMount>) -> Container {
    container(RING_MINION_CONTAINER, &config.ring_minion_image, &[], mounts)
}

fn host_path_volume(name: &str, path: &str) -> Volume {
    Volume {
        name: name.to_string(),
        host_path: Some(HostPathVolumeSource {
            path: path.to_string(),
            type_: None,
        }),
        ..Default::default()
    }
}

fn mount(volume: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: volume.to_string(),
        mount_path: path.to_string(),
        ..Default::default()
    }
}

fn service_port(name: &str, port: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port,
        target_port: Some(IntOrString::Int(port)),
        ..Default::default()
    }
}

fn singleton_deployment(
    metadata: ObjectMeta,
    labels: BTreeMap<String, String>,
    pod_spec: PodSpec,
) -> Deployment {
    Deployment {
        metadata,
        spec: Some(DeploymentSpec {
            replicas: Some(SINGLETON_REPLICAS),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(pod_spec),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

// =============================================================================
// Storage Nodes
// =============================================================================

/// Image a node runs: its own request, else the configured default
pub fn node_image<'a>(node: &'a StorageNode, config: &'a DriverConfig) -> &'a str {
    node.spec
        .requested_image()
        .unwrap_or(config.storage_image.as_str())
}

/// Deployment running the object, container and account servers of one node
pub fn node_deployment(node: &StorageNode, config: &DriverConfig) -> Result<Deployment> {
    let (name, namespace) = node_identity(node)?;

    let mut labels = node.labels().clone();
    labels.extend(driver_labels());
    let annotations = node.annotations().clone();

    let mounts = vec![mount(STORAGE_ETC_VOLUME, SWIFT_ETC)];
    let pod_spec = PodSpec {
        node_name: node.spec.node_name.clone(),
        node_selector: if node.spec.node_selector.is_empty() {
            None
        } else {
            Some(node.spec.node_selector.clone())
        },
        containers: vec![
            container(&name, node_image(node, config), &STORAGE_PORTS, mounts.clone()),
            ring_minion(config, mounts),
        ],
        volumes: Some(vec![host_path_volume(
            STORAGE_ETC_VOLUME,
            STORAGE_ETC_HOST_PATH,
        )]),
        ..Default::default()
    };

    let metadata = ObjectMeta {
        name: Some(name.clone()),
        namespace: Some(namespace),
        labels: Some(labels),
        annotations: if annotations.is_empty() {
            None
        } else {
            Some(annotations)
        },
        ..Default::default()
    };

    Ok(singleton_deployment(metadata, node_pod_labels(&name), pod_spec))
}

/// Internal Service exposing one node's storage servers
pub fn node_service(node: &StorageNode) -> Result<Service> {
    let (name, namespace) = node_identity(node)?;

    Ok(Service {
        metadata: ObjectMeta {
            name: Some(node_service_name(&name)),
            namespace: Some(namespace),
            labels: Some(driver_labels()),
            annotations: description("Exposes Swift Storage Service"),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(node_selector(&name)),
            cluster_ip: node.spec.storage_ip().map(str::to_string),
            type_: Some("ClusterIP".to_string()),
            ports: Some(
                STORAGE_PORTS
                    .iter()
                    .map(|(port_name, port)| service_port(port_name, *port))
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    })
}

// =============================================================================
// Ring Master
// =============================================================================

/// Ring master Deployment; reads the topology ConfigMap as a file
pub fn ring_master_deployment(namespace: &str, config: &DriverConfig) -> Deployment {
    let topology_volume = Volume {
        name: TOPOLOGY_VOLUME.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: Some(TOPOLOGY_CONFIG_MAP.to_string()),
            items: Some(vec![KeyToPath {
                key: TOPOLOGY_KEY.to_string(),
                path: TOPOLOGY_FILE.to_string(),
                mode: None,
            }]),
            ..Default::default()
        }),
        ..Default::default()
    };

    let pod_spec = PodSpec {
        containers: vec![container(
            RING_MASTER_ROLE,
            &config.ring_master_image,
            &[("ring-master", RING_MASTER_PORT)],
            vec![mount(TOPOLOGY_VOLUME, TOPOLOGY_MOUNT_PATH)],
        )],
        volumes: Some(vec![topology_volume]),
        ..Default::default()
    };

    let metadata = ObjectMeta {
        name: Some(RING_MASTER_DEPLOYMENT.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(pod_labels(RING_MASTER_ROLE)),
        annotations: description("Deployment spec for Swift Ring Master"),
        ..Default::default()
    };

    singleton_deployment(metadata, pod_labels(RING_MASTER_ROLE), pod_spec)
}

/// Internal Service the ring minions reach the ring master through
pub fn ring_master_service(namespace: &str, config: &DriverConfig) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(RING_MASTER_SERVICE.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(driver_labels()),
            annotations: description("Exposes Swift Ring Master Service"),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(role_selector(RING_MASTER_ROLE)),
            cluster_ip: config.ring_master_cluster_ip.clone(),
            type_: Some("ClusterIP".to_string()),
            ports: Some(vec![service_port("ring-master", RING_MASTER_PORT)]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

// =============================================================================
// Proxy
// =============================================================================

/// Swift proxy Deployment with its ring minion sidecar
pub fn proxy_deployment(namespace: &str, config: &DriverConfig) -> Deployment {
    let mounts = vec![mount(PROXY_ETC_VOLUME, SWIFT_ETC)];
    let pod_spec = PodSpec {
        containers: vec![
            container(
                PROXY_ROLE,
                &config.proxy_image,
                &[("proxy", PROXY_PORT)],
                mounts.clone(),
            ),
            ring_minion(config, mounts),
        ],
        volumes: Some(vec![host_path_volume(PROXY_ETC_VOLUME, PROXY_ETC_HOST_PATH)]),
        ..Default::default()
    };

    let metadata = ObjectMeta {
        name: Some(PROXY_DEPLOYMENT.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(pod_labels(PROXY_ROLE)),
        annotations: description("Deployment spec for Swift proxy"),
        ..Default::default()
    };

    singleton_deployment(metadata, pod_labels(PROXY_ROLE), pod_spec)
}

/// Externally reachable Service for the Swift API
pub fn proxy_service(namespace: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(PROXY_SERVICE.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(driver_labels()),
            annotations: description("Exposes Swift Proxy Service"),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(role_selector(PROXY_ROLE)),
            type_: Some("NodePort".to_string()),
            ports: Some(vec![service_port("proxy", PROXY_PORT)]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Desired replica count of a Deployment descriptor
pub fn desired_replicas(deployment: &Deployment) -> i32 {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(SINGLETON_REPLICAS)
}
