use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use daisychain_core::{OwnerId, StepTarget, TargetHandle};
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::WiringError;

/// Named step targets and appendix owners available to configurations.
///
/// Provides two lookup mechanisms for targets:
/// - **By name** (`target`): the name a configuration refers to
/// - **By type** (`get::<S>`): the concrete instance, for callers that
///   need it outside a chain
///
/// Registration order is kept for listings.
pub struct TargetRegistry {
    by_name: DashMap<String, TargetHandle>,
    by_type: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    owners: DashMap<String, OwnerId>,
    order: RwLock<Vec<String>>,
}

impl TargetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_name: DashMap::new(),
            by_type: DashMap::new(),
            owners: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Registers `target` under `name`, replacing an earlier registration of
    /// the same name.
    pub fn register_target<S: StepTarget>(&self, name: impl Into<String>, target: Arc<S>) {
        let name = name.into();
        let handle = TargetHandle::new(Arc::clone(&target));
        debug!(name = %name, step_target = handle.name(), "registered step target");
        if self.by_name.insert(name.clone(), handle).is_none() {
            self.order.write().push(name);
        }
        self.by_type.insert(TypeId::of::<S>(), target);
    }

    /// Registers an appendix owner under `name`.
    pub fn register_owner(&self, name: impl Into<String>, owner: OwnerId) {
        self.owners.insert(name.into(), owner);
    }

    #[must_use]
    pub fn target(&self, name: &str) -> Option<TargetHandle> {
        self.by_name.get(name).map(|entry| entry.value().clone())
    }

    /// The last registered instance of type `S`.
    #[must_use]
    pub fn get<S: StepTarget>(&self) -> Option<Arc<S>> {
        self.by_type
            .get(&TypeId::of::<S>())
            .and_then(|entry| entry.value().clone().downcast::<S>().ok())
    }

    #[must_use]
    pub fn owner(&self, name: &str) -> Option<OwnerId> {
        self.owners.get(name).map(|entry| *entry.value())
    }

    /// Resolves a registered owner name, or parses `name` as a UUID.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::UnknownOwner`] if neither works.
    pub fn resolve_owner(&self, name: &str) -> Result<OwnerId, WiringError> {
        self.owner(name)
            .or_else(|| Uuid::parse_str(name).ok().map(OwnerId::from))
            .ok_or_else(|| WiringError::UnknownOwner {
                name: name.to_string(),
            })
    }

    /// Registered target names, in registration order.
    #[must_use]
    pub fn target_names(&self) -> Vec<String> {
        self.order.read().clone()
    }
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
