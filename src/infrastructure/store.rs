use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{
    domain::models::{ActionKind, ApprovalRequest, EntityKind, Policy, RequestStatus},
    services::errors::EngineError,
};

/// Listing filters for approval requests; `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RequestFilters {
    pub company_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub entity: Option<EntityKind>,
    pub action: Option<ActionKind>,
    pub status: Option<RequestStatus>,
}

/// Storage seam for the policy and request aggregates.
///
/// `update_request` is a compare-and-swap on the request's `version`: the
/// write succeeds only when the stored version still equals
/// `expected_version`, and the stored copy gets `expected_version + 1`.
/// Concurrent writers therefore serialize — exactly one wins, the rest see
/// `EngineError::Conflict`. A SQL-backed implementation may substitute a
/// row lock inside a transaction for the same guarantee.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn insert_policy(&self, policy: Policy) -> Result<(), EngineError>;
    async fn fetch_policy(&self, id: Uuid) -> Result<Policy, EngineError>;
    async fn update_policy(&self, policy: Policy) -> Result<(), EngineError>;
    /// All policies for a company/entity/action, including disabled and
    /// soft-deleted rows; matching filters those out itself.
    async fn policies_for(
        &self,
        company_id: Uuid,
        entity: EntityKind,
        action: ActionKind,
    ) -> Result<Vec<Policy>, EngineError>;

    async fn insert_request(&self, request: ApprovalRequest) -> Result<(), EngineError>;
    async fn fetch_request(&self, id: Uuid) -> Result<ApprovalRequest, EngineError>;
    async fn update_request(
        &self,
        request: ApprovalRequest,
        expected_version: i32,
    ) -> Result<ApprovalRequest, EngineError>;
    async fn list_requests(
        &self,
        filters: &RequestFilters,
    ) -> Result<Vec<ApprovalRequest>, EngineError>;
}

/// In-memory store used by embedding callers and the test suites.
#[derive(Default)]
pub struct MemoryStore {
    policies: RwLock<HashMap<Uuid, Policy>>,
    requests: RwLock<HashMap<Uuid, ApprovalRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApprovalStore for MemoryStore {
    async fn insert_policy(&self, policy: Policy) -> Result<(), EngineError> {
        let mut policies = self.policies.write();
        if policies.contains_key(&policy.id) {
            return Err(EngineError::Conflict);
        }
        policies.insert(policy.id, policy);
        Ok(())
    }

    async fn fetch_policy(&self, id: Uuid) -> Result<Policy, EngineError> {
        self.policies
            .read()
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound)
    }

    async fn update_policy(&self, policy: Policy) -> Result<(), EngineError> {
        let mut policies = self.policies.write();
        if !policies.contains_key(&policy.id) {
            return Err(EngineError::NotFound);
        }
        policies.insert(policy.id, policy);
        Ok(())
    }

    async fn policies_for(
        &self,
        company_id: Uuid,
        entity: EntityKind,
        action: ActionKind,
    ) -> Result<Vec<Policy>, EngineError> {
        let mut hits: Vec<Policy> = self
            .policies
            .read()
            .values()
            .filter(|policy| {
                policy.company_id == company_id
                    && policy.entity == entity
                    && policy.action == action
            })
            .cloned()
            .collect();
        hits.sort_by_key(|policy| (policy.created_at, policy.id));
        Ok(hits)
    }

    async fn insert_request(&self, request: ApprovalRequest) -> Result<(), EngineError> {
        let mut requests = self.requests.write();
        if requests.contains_key(&request.id) {
            return Err(EngineError::Conflict);
        }
        requests.insert(request.id, request);
        Ok(())
    }

    async fn fetch_request(&self, id: Uuid) -> Result<ApprovalRequest, EngineError> {
        self.requests
            .read()
            .get(&id)
            .cloned()
            .ok_or(EngineError::NotFound)
    }

    async fn update_request(
        &self,
        mut request: ApprovalRequest,
        expected_version: i32,
    ) -> Result<ApprovalRequest, EngineError> {
        let mut requests = self.requests.write();
        let current = requests.get(&request.id).ok_or(EngineError::NotFound)?;
        if current.version != expected_version {
            return Err(EngineError::Conflict);
        }
        request.version = expected_version + 1;
        requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn list_requests(
        &self,
        filters: &RequestFilters,
    ) -> Result<Vec<ApprovalRequest>, EngineError> {
        let mut hits: Vec<ApprovalRequest> = self
            .requests
            .read()
            .values()
            .filter(|request| {
                filters
                    .company_id
                    .map_or(true, |company| request.company_id == company)
                    && filters
                        .branch_id
                        .map_or(true, |branch| request.branch_id == Some(branch))
                    && filters.entity.map_or(true, |entity| request.entity == entity)
                    && filters.action.map_or(true, |action| request.action == action)
                    && filters.status.map_or(true, |status| request.status == status)
            })
            .cloned()
            .collect();
        hits.sort_by_key(|request| (request.requested_at, request.id));
        Ok(hits)
    }
}
