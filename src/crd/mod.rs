//! Custom Resource Definitions consumed by the driver
//!
//! The host framework owns these objects; the driver only reads them:
//! - StorageCluster: desired cluster topology
//! - StorageNode: a single member placement

pub mod storage_cluster;
pub mod storage_node;

pub use storage_cluster::*;
pub use storage_node::*;
