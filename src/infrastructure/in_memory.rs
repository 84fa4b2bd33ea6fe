use crate::domain::ports::{CallOutcome, RpcArg, RpcTransport};
use crate::domain::service::DOMAIN_CONFIG_REPOSITORY;
use crate::error::{OpsError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct RepositoryState {
    version: u64,
    objects: Vec<Value>,
    /// Remaining forced rejections, keyed by object ref.
    rejections: HashMap<String, u32>,
    fail_checkout: bool,
    checkouts: u32,
    commits: u32,
    committed_versions: Vec<u64>,
}

/// A thread-safe in-memory stand-in for the domain config `Repository` service.
///
/// Implements the same transport port as the woorl gateway. Commits are only
/// accepted against the current version, and individual objects can be made
/// to reject a number of removals to simulate concurrent writers.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRepository {
    state: Arc<Mutex<RepositoryState>>,
}

impl InMemoryRepository {
    /// A repository at `version` holding `objects`, each a tagged value such as
    /// `{"category": {"ref": {"id": 1}, "data": {}}}`.
    pub fn new(version: u64, objects: Vec<Value>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RepositoryState {
                version,
                objects,
                ..Default::default()
            })),
        }
    }

    /// Makes the next `times` removals of the object with `reference` fail.
    pub fn reject(&self, reference: Value, times: u32) -> &Self {
        self.lock().rejections.insert(reference.to_string(), times);
        self
    }

    pub fn fail_checkout(&self) -> &Self {
        self.lock().fail_checkout = true;
        self
    }

    pub fn version(&self) -> u64 {
        self.lock().version
    }

    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().objects.is_empty()
    }

    pub fn checkouts(&self) -> u32 {
        self.lock().checkouts
    }

    /// Commit calls received, accepted or not.
    pub fn commits(&self) -> u32 {
        self.lock().commits
    }

    /// Versions of the accepted commits, in order.
    pub fn committed_versions(&self) -> Vec<u64> {
        self.lock().committed_versions.clone()
    }

    fn lock(&self) -> MutexGuard<'_, RepositoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Only head and the current version can be checked out; no history is kept.
    fn checkout(&self, args: &[RpcArg]) -> CallOutcome {
        let mut state = self.lock();
        state.checkouts += 1;
        if state.fail_checkout {
            return CallOutcome::Failed;
        }
        let selected = match args {
            [RpcArg::Json(selector)] if selector.get("head").is_some() => true,
            [RpcArg::Json(selector)] => {
                selector.get("version").and_then(Value::as_u64) == Some(state.version)
            }
            _ => false,
        };
        if !selected {
            return CallOutcome::Failed;
        }
        let domain: Vec<Value> = state
            .objects
            .iter()
            .map(|object| json!({"key": object_key(object), "value": object}))
            .collect();
        CallOutcome::Completed(json!({"version": state.version, "domain": domain}).to_string())
    }

    fn commit(&self, args: &[RpcArg]) -> Result<CallOutcome> {
        let mut state = self.lock();
        state.commits += 1;

        let (version, commit) = match args {
            [RpcArg::Raw(version), RpcArg::Json(commit)] => (version, commit),
            _ => return Ok(CallOutcome::Failed),
        };
        let Ok(version) = version.parse::<u64>() else {
            return Ok(CallOutcome::Failed);
        };
        if version != state.version {
            return Ok(CallOutcome::Failed);
        }

        let removed: Vec<&Value> = commit["ops"]
            .as_array()
            .map(|ops| ops.iter().filter_map(|op| op.pointer("/remove/object")).collect())
            .unwrap_or_default();
        if removed.is_empty() {
            return Ok(CallOutcome::Failed);
        }

        for object in &removed {
            let reference = object_ref(object).to_string();
            if let Some(remaining) = state.rejections.get_mut(&reference)
                && *remaining > 0
            {
                *remaining -= 1;
                return Ok(CallOutcome::Failed);
            }
            if !state.objects.contains(object) {
                return Ok(CallOutcome::Failed);
            }
        }

        state.objects.retain(|object| !removed.contains(&object));
        state.version += 1;
        state.committed_versions.push(version);
        Ok(CallOutcome::Completed(
            json!({"version": state.version}).to_string(),
        ))
    }

    fn dispatch(&self, service: &str, function: &str, args: &[RpcArg]) -> Result<CallOutcome> {
        if service != DOMAIN_CONFIG_REPOSITORY {
            return Err(OpsError::UnknownService(service.to_string()));
        }
        match function {
            "Checkout" => Ok(self.checkout(args)),
            "Commit" => self.commit(args),
            _ => Ok(CallOutcome::Failed),
        }
    }
}

fn object_tag(object: &Value) -> Option<(&String, &Value)> {
    object.as_object().and_then(|map| map.iter().next())
}

fn object_ref(object: &Value) -> Value {
    object_tag(object)
        .and_then(|(_, payload)| payload.get("ref").cloned())
        .unwrap_or(Value::Null)
}

fn object_key(object: &Value) -> Value {
    match object_tag(object) {
        Some((tag, _)) => {
            let mut key = Map::new();
            key.insert(tag.clone(), object_ref(object));
            Value::Object(key)
        }
        None => Value::Null,
    }
}

#[async_trait]
impl RpcTransport for InMemoryRepository {
    async fn call(&self, service: &str, function: &str, args: &[RpcArg]) -> Result<String> {
        match self.dispatch(service, function, args)? {
            CallOutcome::Completed(output) => Ok(output),
            CallOutcome::Failed => Err(OpsError::CallFailed {
                service: service.to_string(),
                function: function.to_string(),
                status: 1,
                output: String::new(),
            }),
        }
    }

    async fn call_tolerant(
        &self,
        service: &str,
        function: &str,
        args: &[RpcArg],
    ) -> Result<CallOutcome> {
        self.dispatch(service, function, args)
    }
}
