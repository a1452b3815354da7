use std::sync::Arc;

use crate::infrastructure::{
    config::GovernanceConfig,
    directory::{ActorDirectory, StaticDirectory},
    store::{ApprovalStore, MemoryStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GovernanceConfig>,
    pub store: Arc<dyn ApprovalStore>,
    pub directory: Arc<dyn ActorDirectory>,
}

impl AppState {
    pub fn new(
        config: Arc<GovernanceConfig>,
        store: Arc<dyn ApprovalStore>,
        directory: Arc<dyn ActorDirectory>,
    ) -> Self {
        Self {
            config,
            store,
            directory,
        }
    }

    /// Fully in-memory state for embedding callers and tests.
    pub fn in_memory(config: GovernanceConfig, directory: Arc<StaticDirectory>) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(MemoryStore::new()),
            directory,
        }
    }
}
