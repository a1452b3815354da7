//! Approval request lifecycle: gate-or-pass entry point, draft/submit/cancel
//! transitions, and read views with overdue flags computed at read time.
//!
//! A request freezes the matched policy's step templates at creation. Every
//! mutation is written back as one compare-and-swap of the whole aggregate,
//! so a lost race surfaces as `EngineError::Conflict` rather than partial
//! state.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::{
        models::{
            ActionKind, ApprovalRequest, ApprovalStep, EntityKind, Policy, RequestStatus,
            StepStatus,
        },
        policy::{should_gate, GateContext},
        sla,
    },
    infrastructure::{state::AppState, store::RequestFilters},
    validation::rules,
};

use super::{errors::EngineError, policies::PolicyService};

/// Caller payload describing the attempted business action.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequestInput {
    pub company_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub entity: EntityKind,
    pub entity_id: Uuid,
    pub action: ActionKind,
    pub requested_by: Uuid,
    pub reason: Option<String>,
    #[serde(default)]
    pub context: GateContext,
}

/// Result of the composite entry point: either the action passes ungated and
/// the caller commits immediately, or a draft request now guards it.
#[derive(Debug)]
pub enum GateOutcome {
    Ungated,
    Gated(ApprovalRequest),
}

impl GateOutcome {
    pub fn into_request(self) -> Option<ApprovalRequest> {
        match self {
            GateOutcome::Ungated => None,
            GateOutcome::Gated(request) => Some(request),
        }
    }
}

pub struct RequestService {
    pub state: Arc<AppState>,
}

impl RequestService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// The entry point business-action code calls before committing a
    /// sensitive action: match a policy, evaluate its thresholds, and
    /// allocate a draft request only when the action is gated.
    pub async fn open_request(&self, input: CreateRequestInput) -> Result<GateOutcome, EngineError> {
        let policies = PolicyService::new(Arc::clone(&self.state));
        let Some(policy) = policies
            .match_policy(input.company_id, input.branch_id, input.entity, input.action)
            .await?
        else {
            return Ok(GateOutcome::Ungated);
        };

        if !should_gate(&policy, &input.context) {
            info!(
                policy_id = %policy.id,
                entity = input.entity.as_str(),
                action = input.action.as_str(),
                "action below policy thresholds, proceeding ungated"
            );
            return Ok(GateOutcome::Ungated);
        }

        let request = self.create_for_policy(input, &policy).await?;
        Ok(GateOutcome::Gated(request))
    }

    /// Materializes a draft request from an explicit policy. Steps are a
    /// frozen copy of the templates; later policy edits never reach them.
    pub async fn create_for_policy(
        &self,
        input: CreateRequestInput,
        policy: &Policy,
    ) -> Result<ApprovalRequest, EngineError> {
        // Defense in depth: a malformed chain should have been rejected at
        // policy creation, but never materialize one.
        let violations = rules::step_chain_violations(&policy.steps);
        if !violations.is_empty() {
            return Err(EngineError::invalid_policy(violations.join("; ")));
        }

        let request_id = Uuid::new_v4();
        let now = Utc::now();
        let mut templates = policy.steps.clone();
        templates.sort_by_key(|step| step.step_order);
        let steps = templates
            .into_iter()
            .map(|template| ApprovalStep {
                id: Uuid::new_v4(),
                request_id,
                step_order: template.step_order,
                required_role: template.required_role,
                required_permission: template.required_permission,
                due_hours: template.due_hours,
                allow_self_approval: template.allow_self_approval,
                status: StepStatus::Pending,
                decided_by: None,
                decided_at: None,
                decision_reason: None,
                due_at: None,
            })
            .collect::<Vec<_>>();

        let request = ApprovalRequest {
            id: request_id,
            company_id: input.company_id,
            branch_id: input.branch_id,
            entity: input.entity,
            entity_id: input.entity_id,
            action: input.action,
            status: RequestStatus::Draft,
            requested_by: input.requested_by,
            requested_at: now,
            reason: input.reason,
            meta: json!({
                "policyId": policy.id,
                "thresholdAmountCents": policy.threshold_amount_cents,
                "thresholdPct": policy.threshold_pct,
                "context": input.context,
                "steps": policy.steps,
            }),
            steps,
            version: 1,
        };
        self.state.store.insert_request(request.clone()).await?;
        info!(
            request_id = %request.id,
            policy_id = %policy.id,
            entity = request.entity.as_str(),
            action = request.action.as_str(),
            "approval request created"
        );
        Ok(request)
    }

    /// Moves a draft to `submitted` and starts the first step's SLA clock.
    /// Only the requester may submit, and only once.
    pub async fn submit(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
    ) -> Result<ApprovalRequest, EngineError> {
        let mut request = self.state.store.fetch_request(request_id).await?;
        if request.status != RequestStatus::Draft {
            return Err(EngineError::invalid_transition(format!(
                "cannot submit a {} request",
                request.status.as_str()
            )));
        }
        if request.requested_by != actor_id {
            return Err(EngineError::invalid_transition(
                "only the requester may submit their draft",
            ));
        }

        let expected_version = request.version;
        let now = Utc::now();
        request.status = RequestStatus::Submitted;
        let default_due_hours = self.state.config.engine.default_due_hours;
        if let Some(step) = request.active_step_mut() {
            activate_step(step, now, default_due_hours);
        }

        let updated = self
            .state
            .store
            .update_request(request, expected_version)
            .await?;
        info!(request_id = %updated.id, "approval request submitted");
        Ok(updated)
    }

    /// Cancels a request that has consumed no approver effort yet: drafts,
    /// or submitted requests with zero approved steps. The requester may
    /// always cancel their own; anyone else needs the `approvals:cancel`
    /// permission.
    pub async fn cancel(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
    ) -> Result<ApprovalRequest, EngineError> {
        let mut request = self.state.store.fetch_request(request_id).await?;

        let cancellable = match request.status {
            RequestStatus::Draft => true,
            RequestStatus::Submitted => request.approved_step_count() == 0,
            _ => false,
        };
        if !cancellable {
            return Err(EngineError::invalid_transition(format!(
                "cannot cancel a {} request with {} approved step(s)",
                request.status.as_str(),
                request.approved_step_count()
            )));
        }

        if actor_id != request.requested_by {
            let profile = self.state.directory.resolve(actor_id).await?;
            if !profile.has_permission("approvals:cancel") {
                return Err(EngineError::Unauthorized);
            }
        }

        let expected_version = request.version;
        let now = Utc::now();
        let mut reason = reason;
        let mut first_pending = true;
        for step in &mut request.steps {
            if step.status == StepStatus::Pending {
                step.status = StepStatus::Skipped;
                // The cancellation note lands on the step that was active.
                if first_pending {
                    step.decided_by = Some(actor_id);
                    step.decided_at = Some(now);
                    step.decision_reason = reason.take();
                    first_pending = false;
                }
            }
        }
        request.status = RequestStatus::Cancelled;

        let updated = self
            .state
            .store
            .update_request(request, expected_version)
            .await?;
        info!(request_id = %updated.id, "approval request cancelled");
        Ok(updated)
    }

    pub async fn get(&self, request_id: Uuid) -> Result<RequestView, EngineError> {
        let request = self.state.store.fetch_request(request_id).await?;
        Ok(RequestView::from_request(request, Utc::now()))
    }

    pub async fn list(&self, filters: &RequestFilters) -> Result<Vec<RequestView>, EngineError> {
        let now = Utc::now();
        let requests = self.state.store.list_requests(filters).await?;
        Ok(requests
            .into_iter()
            .map(|request| RequestView::from_request(request, now))
            .collect())
    }
}

/// Starts a step's SLA clock. The due time is anchored to the moment the
/// step becomes actionable, not to request creation; steps without their own
/// `due_hours` fall back to the configured default when one is set.
///
/// Step windows are bounded at validation time, but `default_due_hours`
/// comes straight from configuration, so the arithmetic is checked: a
/// window that cannot be represented leaves the step without a deadline
/// instead of panicking.
pub(crate) fn activate_step(
    step: &mut ApprovalStep,
    now: DateTime<Utc>,
    default_due_hours: Option<i64>,
) {
    let hours = step.due_hours.or(default_due_hours);
    step.due_at = hours
        .and_then(Duration::try_hours)
        .and_then(|window| now.checked_add_signed(window));
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    pub id: Uuid,
    pub company_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub entity: EntityKind,
    pub entity_id: Uuid,
    pub action: ActionKind,
    pub status: RequestStatus,
    pub requested_by: Uuid,
    pub requested_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub meta: serde_json::Value,
    pub steps: Vec<StepView>,
    pub is_overdue: bool,
    pub version: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub id: Uuid,
    pub step_order: i32,
    pub required_role: Option<crate::domain::models::Role>,
    pub required_permission: Option<String>,
    pub allow_self_approval: bool,
    pub status: StepStatus,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_reason: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub is_overdue: bool,
}

impl RequestView {
    fn from_request(request: ApprovalRequest, now: DateTime<Utc>) -> Self {
        let is_overdue = sla::request_overdue(&request, now);
        let steps = request
            .steps
            .iter()
            .map(|step| StepView {
                id: step.id,
                step_order: step.step_order,
                required_role: step.required_role,
                required_permission: step.required_permission.clone(),
                allow_self_approval: step.allow_self_approval,
                status: step.status,
                decided_by: step.decided_by,
                decided_at: step.decided_at,
                decision_reason: step.decision_reason.clone(),
                due_at: step.due_at,
                is_overdue: sla::is_overdue(step, now),
            })
            .collect();
        Self {
            id: request.id,
            company_id: request.company_id,
            branch_id: request.branch_id,
            entity: request.entity,
            entity_id: request.entity_id,
            action: request.action,
            status: request.status,
            requested_by: request.requested_by,
            requested_at: request.requested_at,
            reason: request.reason,
            meta: request.meta,
            steps,
            is_overdue,
            version: request.version,
        }
    }
}
