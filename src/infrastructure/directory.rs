use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{domain::models::Role, services::errors::EngineError};

/// An actor's current role and permission set, resolved at decision time.
/// Nothing here is cached on the request, so a permission revoked between
/// submission and decision takes effect immediately.
#[derive(Debug, Clone)]
pub struct ActorProfile {
    pub actor_id: Uuid,
    pub role: Role,
    pub permissions: HashSet<String>,
}

impl ActorProfile {
    pub fn new(actor_id: Uuid, role: Role) -> Self {
        Self {
            actor_id,
            role,
            permissions: HashSet::new(),
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Lookup seam to the identity system owning roles and permissions.
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    async fn resolve(&self, actor_id: Uuid) -> Result<ActorProfile, EngineError>;
}

/// Fixed in-memory directory for embedding callers and tests.
#[derive(Default)]
pub struct StaticDirectory {
    actors: RwLock<HashMap<Uuid, ActorProfile>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, profile: ActorProfile) {
        self.actors.write().insert(profile.actor_id, profile);
    }
}

#[async_trait]
impl ActorDirectory for StaticDirectory {
    async fn resolve(&self, actor_id: Uuid) -> Result<ActorProfile, EngineError> {
        self.actors
            .read()
            .get(&actor_id)
            .cloned()
            .ok_or(EngineError::NotFound)
    }
}
