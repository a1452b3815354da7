//! Policy configuration and matching.
//!
//! Policies are written by back-office configurators and read by the
//! request/decision services. Creation validates the step chain up front so
//! an undecidable step never reaches a live request; matching is
//! deterministic for a fixed configuration.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::{
        models::{ActionKind, EntityKind, Policy, PolicyStep},
        policy::select_policy,
        seed,
    },
    infrastructure::state::AppState,
    validation::rules,
};

use super::errors::EngineError;

/// Configurator payload for a new policy.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PolicyDraft {
    pub company_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub entity: EntityKind,
    pub action: ActionKind,
    #[validate(range(min = 0))]
    pub threshold_amount_cents: Option<i64>,
    #[validate(range(min = 0.0))]
    pub threshold_pct: Option<f64>,
    #[validate(length(min = 1, message = "policy must define at least one approval step"))]
    pub steps: Vec<PolicyStep>,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Rejects drafts that would produce undecidable or ambiguous chains.
/// Shared by the service and the `policy_lint` binary.
pub fn validate_draft(draft: &PolicyDraft) -> Result<(), EngineError> {
    draft
        .validate()
        .map_err(|err| EngineError::invalid_policy(err.to_string()))?;

    let mut violations = rules::step_chain_violations(&draft.steps);
    violations.extend(rules::threshold_violations(
        draft.threshold_amount_cents,
        draft.threshold_pct,
    ));
    if violations.is_empty() {
        Ok(())
    } else {
        Err(EngineError::invalid_policy(violations.join("; ")))
    }
}

pub struct PolicyService {
    pub state: Arc<AppState>,
}

impl PolicyService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Validates and persists a new policy.
    pub async fn create_policy(&self, draft: PolicyDraft) -> Result<Policy, EngineError> {
        validate_draft(&draft)?;

        let policy = Policy {
            id: Uuid::new_v4(),
            company_id: draft.company_id,
            branch_id: draft.branch_id,
            entity: draft.entity,
            action: draft.action,
            threshold_amount_cents: draft.threshold_amount_cents,
            threshold_pct: draft.threshold_pct,
            steps: sorted_steps(draft.steps),
            is_enabled: draft.is_enabled,
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.state.store.insert_policy(policy.clone()).await?;
        info!(
            policy_id = %policy.id,
            entity = policy.entity.as_str(),
            action = policy.action.as_str(),
            "policy created"
        );
        Ok(policy)
    }

    pub async fn disable_policy(&self, policy_id: Uuid) -> Result<Policy, EngineError> {
        let mut policy = self.state.store.fetch_policy(policy_id).await?;
        policy.is_enabled = false;
        self.state.store.update_policy(policy.clone()).await?;
        info!(policy_id = %policy.id, "policy disabled");
        Ok(policy)
    }

    /// Soft delete. Historical requests keep their frozen snapshot, so the
    /// row only stops matching; it is never removed.
    pub async fn remove_policy(&self, policy_id: Uuid) -> Result<Policy, EngineError> {
        let mut policy = self.state.store.fetch_policy(policy_id).await?;
        policy.deleted_at = Some(Utc::now());
        self.state.store.update_policy(policy.clone()).await?;
        info!(policy_id = %policy.id, "policy removed");
        Ok(policy)
    }

    /// Finds the most specific enabled policy for an attempted action, or
    /// `None` when the action proceeds ungated.
    pub async fn match_policy(
        &self,
        company_id: Uuid,
        branch_id: Option<Uuid>,
        entity: EntityKind,
        action: ActionKind,
    ) -> Result<Option<Policy>, EngineError> {
        let mut candidates = self
            .state
            .store
            .policies_for(company_id, entity, action)
            .await?;

        if branch_id.is_some() && !self.state.config.matching.allow_global_fallback {
            candidates.retain(|policy| policy.branch_id.is_some());
        }

        Ok(select_policy(&candidates, branch_id).cloned())
    }

    /// Installs the default governance pack for a company, honoring the
    /// `seed.install_defaults` configuration toggle.
    pub async fn install_seed_policies(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<Policy>, EngineError> {
        if !self.state.config.seed.install_defaults {
            return Ok(Vec::new());
        }
        let policies = seed::default_policies(company_id);
        for policy in &policies {
            self.state.store.insert_policy(policy.clone()).await?;
        }
        info!(company_id = %company_id, count = policies.len(), "seed policies installed");
        Ok(policies)
    }
}

fn sorted_steps(mut steps: Vec<PolicyStep>) -> Vec<PolicyStep> {
    steps.sort_by_key(|step| step.step_order);
    steps
}
