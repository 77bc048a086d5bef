//! Cluster API adapters
//!
//! - Kubernetes: the real control plane via `kube`
//! - In-memory: process-local store for tests and dry runs

pub mod kubernetes;
pub mod memory;

pub use kubernetes::*;
pub use memory::*;
