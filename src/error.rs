//! Error types for the Swift storage driver
//!
//! Every component returns the same typed error so the lifecycle callbacks
//! can classify failures by variant instead of inspecting remote API shapes.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the driver
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid {kind}: {reason}")]
    InvalidResource { kind: String, reason: String },

    // =========================================================================
    // Cluster API Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("Resource already exists: {kind}/{name}")]
    ResourceExists { kind: String, name: String },

    #[error("Failed to submit {kind}/{name}: {reason}")]
    SubmitFailed {
        kind: String,
        name: String,
        reason: String,
    },

    // =========================================================================
    // Readiness Errors
    // =========================================================================
    #[error(
        "Dependency {namespace}/{name} not ready after {timeout:?}: {ready}/{desired} replicas available"
    )]
    DependencyUnready {
        name: String,
        namespace: String,
        ready: i32,
        desired: i32,
        timeout: Duration,
    },

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // Metrics Errors
    // =========================================================================
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Action the host framework should take when a callback fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Requeue after specific duration
    RequeueAfter(Duration),
    /// Don't requeue, wait for changes
    NoRequeue,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Transient remote failures - retry with backoff
            Error::Kube(_) | Error::SubmitFailed { .. } | Error::Cancelled { .. } => {
                ErrorAction::RequeueWithBackoff
            }

            // Workloads still rolling out - give them time
            Error::DependencyUnready { .. } => ErrorAction::RequeueAfter(Duration::from_secs(30)),

            // Deletes are not idempotent, a missing resource needs a human
            Error::ResourceNotFound { .. } | Error::ResourceExists { .. } => {
                ErrorAction::NoRequeue
            }

            // Configuration/validation errors - don't retry automatically
            Error::Configuration(_)
            | Error::InvalidResource { .. }
            | Error::JsonParse(_)
            | Error::YamlParse(_) => ErrorAction::NoRequeue,

            // All other errors - retry with backoff
            _ => ErrorAction::RequeueWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }

    /// Check if this error reports a missing resource
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ResourceNotFound { .. })
    }

    /// Check if this error reports a create conflict
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::ResourceExists { .. })
    }

    pub(crate) fn invalid(kind: &str, reason: impl Into<String>) -> Self {
        Error::InvalidResource {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for the driver
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_actions() {
        let err = Error::DependencyUnready {
            name: "swift-proxy-deploy".into(),
            namespace: "demo".into(),
            ready: 0,
            desired: 1,
            timeout: Duration::from_secs(600),
        };
        assert_eq!(
            err.action(),
            ErrorAction::RequeueAfter(Duration::from_secs(30))
        );

        let err = Error::Configuration("bad config".into());
        assert_eq!(err.action(), ErrorAction::NoRequeue);

        let err = Error::SubmitFailed {
            kind: "Service".into(),
            name: "swiftservice".into(),
            reason: "forbidden".into(),
        };
        assert_eq!(err.action(), ErrorAction::RequeueWithBackoff);
    }

    #[test]
    fn test_delete_not_found_is_not_retryable() {
        let err = Error::ResourceNotFound {
            kind: "ConfigMap".into(),
            name: "swift-cluster-configmap".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_already_exists());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_dependency_unready_message() {
        let err = Error::DependencyUnready {
            name: "swift-ring-master-deploy".into(),
            namespace: "demo".into(),
            ready: 0,
            desired: 1,
            timeout: Duration::from_millis(50),
        };
        let msg = err.to_string();
        assert!(msg.contains("demo/swift-ring-master-deploy"));
        assert!(msg.contains("0/1"));
    }
}
