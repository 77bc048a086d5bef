//! In-memory Cluster API
//!
//! Keeps objects in a map keyed by kind/namespace/name and records every
//! create and delete it receives. Used by the test suite and by the CLI's
//! dry-run mode.

use crate::domain::ports::{ClusterApi, Manifest, ResourceKey, ResourceKind};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Mutating verbs recorded in the journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Create,
    Delete,
}

/// One recorded call against the in-memory API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub verb: Verb,
    pub key: ResourceKey,
    pub succeeded: bool,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<ResourceKey, Manifest>,
    journal: Vec<ApiCall>,
    /// Deployments pinned to a given available count
    availability: BTreeMap<ResourceKey, i32>,
    /// Injected failures, consumed on every matching call
    failures: BTreeMap<(Verb, ResourceKey), String>,
    polls: BTreeMap<ResourceKey, u32>,
}

/// Cluster API backed by process memory
#[derive(Default)]
pub struct InMemoryClusterApi {
    state: Mutex<State>,
}

impl InMemoryClusterApi {
    /// Empty API where every created Deployment is immediately available
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording it in the journal
    pub fn insert(&self, manifest: Manifest) {
        let key = manifest.key();
        self.state.lock().objects.insert(key, manifest);
    }

    /// Drop an object without recording it in the journal
    pub fn remove(&self, key: &ResourceKey) -> Option<Manifest> {
        self.state.lock().objects.remove(key)
    }

    /// Current copy of an object
    pub fn get(&self, key: &ResourceKey) -> Option<Manifest> {
        self.state.lock().objects.get(key).cloned()
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.state.lock().objects.contains_key(key)
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of all stored objects of one kind
    pub fn keys_of(&self, kind: ResourceKind) -> Vec<ResourceKey> {
        self.state
            .lock()
            .objects
            .keys()
            .filter(|key| key.kind == kind)
            .cloned()
            .collect()
    }

    /// Pin the available replica count a Deployment reports
    pub fn set_available(&self, namespace: &str, name: &str, available: i32) {
        self.state
            .lock()
            .availability
            .insert(ResourceKey::deployment(namespace, name), available);
    }

    /// Make a Deployment report zero available replicas forever
    pub fn never_ready(&self, namespace: &str, name: &str) {
        self.set_available(namespace, name, 0);
    }

    /// Make every matching call fail with `Error::SubmitFailed`
    pub fn fail_on(&self, verb: Verb, key: ResourceKey, reason: impl Into<String>) {
        self.state.lock().failures.insert((verb, key), reason.into());
    }

    /// Every create/delete received, in order
    pub fn journal(&self) -> Vec<ApiCall> {
        self.state.lock().journal.clone()
    }

    /// Keys of successful creates, in order
    pub fn created(&self) -> Vec<ResourceKey> {
        self.calls_matching(Verb::Create, true)
    }

    /// Keys of successful deletes, in order
    pub fn deleted(&self) -> Vec<ResourceKey> {
        self.calls_matching(Verb::Delete, true)
    }

    /// Keys of every delete attempted, successful or not
    pub fn delete_attempts(&self) -> Vec<ResourceKey> {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|call| call.verb == Verb::Delete)
            .map(|call| call.key.clone())
            .collect()
    }

    /// How many times a Deployment's readiness was queried
    pub fn polls(&self, namespace: &str, name: &str) -> u32 {
        self.state
            .lock()
            .polls
            .get(&ResourceKey::deployment(namespace, name))
            .copied()
            .unwrap_or(0)
    }

    fn calls_matching(&self, verb: Verb, succeeded: bool) -> Vec<ResourceKey> {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|call| call.verb == verb && call.succeeded == succeeded)
            .map(|call| call.key.clone())
            .collect()
    }
}

impl State {
    fn record(&mut self, verb: Verb, key: &ResourceKey, succeeded: bool) {
        self.journal.push(ApiCall {
            verb,
            key: key.clone(),
            succeeded,
        });
    }

    fn injected(&self, verb: Verb, key: &ResourceKey) -> Option<Error> {
        self.failures
            .get(&(verb, key.clone()))
            .map(|reason| Error::SubmitFailed {
                kind: key.kind.to_string(),
                name: key.name.clone(),
                reason: reason.clone(),
            })
    }
}

fn not_found(key: &ResourceKey) -> Error {
    Error::ResourceNotFound {
        kind: key.kind.to_string(),
        name: key.name.clone(),
    }
}

#[async_trait]
impl ClusterApi for InMemoryClusterApi {
    async fn create(&self, manifest: &Manifest) -> Result<()> {
        let key = manifest.key();
        let mut state = self.state.lock();

        if let Some(err) = state.injected(Verb::Create, &key) {
            state.record(Verb::Create, &key, false);
            return Err(err);
        }

        if state.objects.contains_key(&key) {
            state.record(Verb::Create, &key, false);
            return Err(Error::ResourceExists {
                kind: key.kind.to_string(),
                name: key.name.clone(),
            });
        }

        debug!("in-memory create {}", key);
        state.objects.insert(key.clone(), manifest.clone());
        state.record(Verb::Create, &key, true);
        Ok(())
    }

    async fn delete(&self, key: &ResourceKey) -> Result<()> {
        let mut state = self.state.lock();

        if let Some(err) = state.injected(Verb::Delete, key) {
            state.record(Verb::Delete, key, false);
            return Err(err);
        }

        if state.objects.remove(key).is_none() {
            state.record(Verb::Delete, key, false);
            return Err(not_found(key));
        }

        debug!("in-memory delete {}", key);
        state.record(Verb::Delete, key, true);
        Ok(())
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap> {
        let key = ResourceKey::config_map(namespace, name);
        match self.state.lock().objects.get(&key) {
            Some(Manifest::Config(config_map)) => Ok(config_map.clone()),
            _ => Err(not_found(&key)),
        }
    }

    async fn available_replicas(&self, namespace: &str, name: &str) -> Result<i32> {
        let key = ResourceKey::deployment(namespace, name);
        let mut state = self.state.lock();
        *state.polls.entry(key.clone()).or_insert(0) += 1;

        let desired = match state.objects.get(&key) {
            Some(Manifest::Workload(deployment)) => deployment
                .spec
                .as_ref()
                .and_then(|spec| spec.replicas)
                .unwrap_or(1),
            _ => return Err(not_found(&key)),
        };

        Ok(state.availability.get(&key).copied().unwrap_or(desired))
    }

    fn api_name(&self) -> &str {
        "in-memory"
    }
}
