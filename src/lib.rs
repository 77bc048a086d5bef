//! Swift Storage Driver
//!
//! Lifecycle driver that deploys an OpenStack Swift cluster onto Kubernetes
//! when a storage orchestration framework asks it to.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                  Host Framework (StorageCluster / StorageNode)               │
//! └──────────────────────────────────────┬──────────────────────────────────────┘
//!                                        │ StorageDriver callbacks
//! ┌──────────────────────────────────────┴──────────────────────────────────────┐
//! │                              SwiftDriver                                     │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────────┐  │
//! │  │   Descriptor    │  │    Topology     │  │      Readiness              │  │
//! │  │   Builder       │  │    Publisher    │  │      Waiter                 │  │
//! │  └────────┬────────┘  └────────┬────────┘  └─────────────┬───────────────┘  │
//! │           │                    │                         │                   │
//! │           └────────────────────┼─────────────────────────┘                   │
//! │                                │                                             │
//! │                    ┌───────────┴───────────┐                                │
//! │                    │  Idempotent Submitter │                                │
//! │                    └───────────┬───────────┘                                │
//! ├────────────────────────────────┼────────────────────────────────────────────┤
//! │                          ClusterApi port                                     │
//! │  ┌─────────────────────────────┐  ┌─────────────────────────────────────┐   │
//! │  │      KubeClusterApi         │  │        InMemoryClusterApi           │   │
//! │  │   (kube client)             │  │   (tests, dry runs)                 │   │
//! │  └─────────────────────────────┘  └─────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`driver`]: Swift lifecycle callbacks and their building blocks
//! - [`client`]: Cluster API adapters
//! - [`config`]: Driver configuration
//! - [`crd`]: Custom Resource Definitions
//! - [`domain`]: Core domain types and traits
//! - [`error`]: Error types and handling

pub mod client;
pub mod config;
pub mod crd;
pub mod domain;
pub mod driver;
pub mod error;

// Re-export commonly used types
pub use client::{InMemoryClusterApi, KubeClusterApi};

pub use config::DriverConfig;

pub use crd::{
    StorageCluster, StorageClusterSpec, StorageClusterStatus,
    StorageNode, StorageNodeSpec, StorageNodeStatus,
    StorageTypeIdentifier,
};

pub use domain::ports::{
    ClusterApi, ClusterApiRef, Manifest, ResourceKey, ResourceKind,
    StorageDriver, StorageDriverRef,
};

pub use driver::{DriverMetrics, SwiftDriver};

pub use error::{Error, ErrorAction, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
