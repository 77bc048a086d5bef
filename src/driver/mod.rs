//! Swift storage driver
//!
//! - builder: pure descriptor construction
//! - submitter: idempotent create, strict delete
//! - readiness: bounded wait on Deployment availability
//! - topology: cluster snapshot published for the ring master
//! - swift: the lifecycle callbacks tying the above together

pub mod builder;
pub mod metrics;
pub mod readiness;
pub mod submitter;
pub mod swift;
pub mod topology;

pub use metrics::DriverMetrics;
pub use readiness::ReadinessWaiter;
pub use submitter::{Submission, Submitter};
pub use swift::{cluster_resources, SwiftDriver};
pub use topology::{decode_topology, topology_changed, topology_config_map, TopologyPublisher};
