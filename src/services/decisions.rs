//! Applies approver decisions to the active step of a submitted request and
//! advances or terminates the request accordingly.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::models::{ApprovalRequest, ApprovalStep, Decision, RequestStatus, StepStatus},
    infrastructure::{directory::ActorProfile, state::AppState},
};

use super::{errors::EngineError, requests::activate_step};

/// Approver payload for `decide`.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
    pub reason: Option<String>,
}

/// Service coordinating step decisions and request state transitions.
pub struct DecisionService {
    pub state: Arc<AppState>,
}

impl DecisionService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Records an approve/reject on the active step of a submitted request.
    ///
    /// * `request_id` — request whose active step is being decided.
    /// * `actor_id` — resolved through the actor directory at decision time;
    ///   the request never caches roles or permissions.
    /// * `payload` — the decision plus an optional audit note.
    ///
    /// Preconditions, in order:
    /// * request must be `submitted` (`InvalidTransition` otherwise, which
    ///   also covers terminal requests);
    /// * an active pending step must exist (`NoActiveStep`);
    /// * the actor must satisfy the step's gate — permission AND role when
    ///   both are set (`Unauthorized`);
    /// * the requester may not decide their own step unless the step allows
    ///   self-approval (`SelfApprovalForbidden`).
    ///
    /// On approval the next step is activated, or the request finishes
    /// `approved` and the caller may commit the gated business action. On
    /// rejection every remaining pending step is skipped and the request
    /// finishes `rejected`. The aggregate is written once, under a
    /// compare-and-swap on its version; a concurrent decision on the same
    /// step leaves exactly one winner and fails the rest with `Conflict`.
    pub async fn decide(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        payload: DecisionRequest,
    ) -> Result<ApprovalRequest, EngineError> {
        let mut request = self.state.store.fetch_request(request_id).await?;
        if request.status != RequestStatus::Submitted {
            return Err(EngineError::invalid_transition(format!(
                "cannot decide a {} request",
                request.status.as_str()
            )));
        }

        let profile = self.state.directory.resolve(actor_id).await?;

        {
            let Some(active) = request.active_step() else {
                return Err(EngineError::NoActiveStep);
            };
            ensure_gate(&profile, active)?;
            if actor_id == request.requested_by && !active.allow_self_approval {
                return Err(EngineError::SelfApprovalForbidden);
            }
        }

        let expected_version = request.version;
        let now = Utc::now();
        let decided_order;
        {
            // Checked above; the aggregate is untouched in between.
            let active = request
                .active_step_mut()
                .ok_or(EngineError::NoActiveStep)?;
            decided_order = active.step_order;
            active.decided_by = Some(actor_id);
            active.decided_at = Some(now);
            active.decision_reason = payload.reason;
            active.status = match payload.decision {
                Decision::Approve => StepStatus::Approved,
                Decision::Reject => StepStatus::Rejected,
            };
        }

        match payload.decision {
            Decision::Approve => {
                let next_index = request
                    .steps
                    .iter()
                    .enumerate()
                    .filter(|(_, step)| step.status == StepStatus::Pending)
                    .min_by_key(|(_, step)| step.step_order)
                    .map(|(index, _)| index);
                match next_index {
                    Some(index) => activate_step(
                        &mut request.steps[index],
                        now,
                        self.state.config.engine.default_due_hours,
                    ),
                    None => request.status = RequestStatus::Approved,
                }
            }
            Decision::Reject => {
                for step in &mut request.steps {
                    if step.status == StepStatus::Pending {
                        step.status = StepStatus::Skipped;
                    }
                }
                request.status = RequestStatus::Rejected;
            }
        }

        let updated = self
            .state
            .store
            .update_request(request, expected_version)
            .await?;
        info!(
            request_id = %updated.id,
            step_order = decided_order,
            decision = ?payload.decision,
            status = updated.status.as_str(),
            "approval step decided"
        );
        Ok(updated)
    }
}

/// Permission AND role when both are configured. A step with neither is
/// undecidable by anyone; policy validation rejects such chains, so hitting
/// this branch means a snapshot predating that rule, and it stays closed.
fn ensure_gate(profile: &ActorProfile, step: &ApprovalStep) -> Result<(), EngineError> {
    if step.required_role.is_none() && step.required_permission.is_none() {
        return Err(EngineError::Unauthorized);
    }
    if let Some(permission) = &step.required_permission {
        if !profile.has_permission(permission) {
            return Err(EngineError::Unauthorized);
        }
    }
    if let Some(role) = step.required_role {
        if profile.role != role {
            return Err(EngineError::Unauthorized);
        }
    }
    Ok(())
}
