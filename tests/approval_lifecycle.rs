use anyhow::Result;
use station_governance::{
    domain::{
        models::{ActionKind, EntityKind, RequestStatus, Role, StepStatus},
        policy::GateContext,
    },
    infrastructure::store::RequestFilters,
    services::{
        decisions::DecisionRequest,
        errors::EngineError,
        requests::{CreateRequestInput, GateOutcome},
    },
};
use station_governance::domain::models::Decision;
use uuid::Uuid;


use test_harness::{two_step_expense_draft, Harness};

fn expense_input(harness: &Harness, requested_by: Uuid, amount_cents: i64) -> CreateRequestInput {
    CreateRequestInput {
        company_id: harness.company_id,
        branch_id: None,
        entity: EntityKind::ExpenseEntry,
        entity_id: Uuid::new_v4(),
        action: ActionKind::Approve,
        requested_by,
        reason: Some("fuel pump maintenance invoice".to_string()),
        context: GateContext::amount(amount_cents),
    }
}

async fn gated_request(harness: &Harness, requested_by: Uuid, amount_cents: i64) -> Result<Uuid> {
    harness
        .policies()
        .create_policy(two_step_expense_draft(harness.company_id))
        .await?;
    let outcome = harness
        .requests()
        .open_request(expense_input(harness, requested_by, amount_cents))
        .await?;
    let request = outcome.into_request().expect("expected a gated request");
    assert_eq!(request.status, RequestStatus::Draft);
    Ok(request.id)
}

#[tokio::test]
async fn two_step_chain_approves_end_to_end() -> Result<()> {
    let harness = Harness::new();
    let requester = harness.register_actor(Role::Cashier, &[]);
    let first_approver = harness.register_actor(Role::Supervisor, &["expenses:write"]);
    let second_approver = harness.register_actor(Role::Accountant, &["setup:write"]);

    let request_id = gated_request(&harness, requester, 150_000).await?;

    let submitted = harness.requests().submit(request_id, requester).await?;
    assert_eq!(submitted.status, RequestStatus::Submitted);
    let first = submitted.active_step().expect("first step active");
    assert_eq!(first.step_order, 1);
    assert!(first.due_at.is_some());
    // second step's clock has not started yet
    assert!(submitted.steps[1].due_at.is_none());

    let after_first = harness
        .decisions()
        .decide(
            request_id,
            first_approver,
            DecisionRequest {
                decision: Decision::Approve,
                reason: Some("receipts attached".to_string()),
            },
        )
        .await?;
    assert_eq!(after_first.status, RequestStatus::Submitted);
    assert_eq!(after_first.steps[0].status, StepStatus::Approved);
    assert_eq!(after_first.steps[0].decided_by, Some(first_approver));
    let second = after_first.active_step().expect("second step active");
    assert_eq!(second.step_order, 2);
    assert!(second.due_at.is_some());

    let finished = harness
        .decisions()
        .decide(
            request_id,
            second_approver,
            DecisionRequest {
                decision: Decision::Approve,
                reason: None,
            },
        )
        .await?;
    assert_eq!(finished.status, RequestStatus::Approved);
    assert!(finished.active_step().is_none());
    Ok(())
}

#[tokio::test]
async fn rejection_skips_every_remaining_step() -> Result<()> {
    let harness = Harness::new();
    let requester = harness.register_actor(Role::Cashier, &[]);
    let approver = harness.register_actor(Role::Supervisor, &["expenses:write"]);

    let request_id = gated_request(&harness, requester, 200_000).await?;
    harness.requests().submit(request_id, requester).await?;

    let rejected = harness
        .decisions()
        .decide(
            request_id,
            approver,
            DecisionRequest {
                decision: Decision::Reject,
                reason: Some("no supporting documents".to_string()),
            },
        )
        .await?;
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.steps[0].status, StepStatus::Rejected);
    assert_eq!(rejected.steps[1].status, StepStatus::Skipped);
    assert!(rejected.steps[1].decided_by.is_none());
    Ok(())
}

#[tokio::test]
async fn requester_cannot_decide_their_own_step() -> Result<()> {
    let harness = Harness::new();
    // Requester holds the very permission the first step requires.
    let requester = harness.register_actor(Role::Supervisor, &["expenses:write"]);

    let request_id = gated_request(&harness, requester, 150_000).await?;
    harness.requests().submit(request_id, requester).await?;

    let err = harness
        .decisions()
        .decide(
            request_id,
            requester,
            DecisionRequest {
                decision: Decision::Approve,
                reason: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SelfApprovalForbidden));

    let view = harness.requests().get(request_id).await?;
    assert_eq!(view.status, RequestStatus::Submitted);
    assert_eq!(view.steps[0].status, StepStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn actor_without_step_permission_is_rejected() -> Result<()> {
    let harness = Harness::new();
    let requester = harness.register_actor(Role::Cashier, &[]);
    let bystander = harness.register_actor(Role::Supervisor, &["pos:void"]);

    let request_id = gated_request(&harness, requester, 150_000).await?;
    harness.requests().submit(request_id, requester).await?;

    let err = harness
        .decisions()
        .decide(
            request_id,
            bystander,
            DecisionRequest {
                decision: Decision::Approve,
                reason: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized));
    Ok(())
}

#[tokio::test]
async fn submit_is_requester_only_and_single_shot() -> Result<()> {
    let harness = Harness::new();
    let requester = harness.register_actor(Role::Cashier, &[]);
    let other = harness.register_actor(Role::Supervisor, &["expenses:write"]);

    let request_id = gated_request(&harness, requester, 150_000).await?;

    let err = harness.requests().submit(request_id, other).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));

    harness.requests().submit(request_id, requester).await?;
    let err = harness
        .requests()
        .submit(request_id, requester)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
    Ok(())
}

#[tokio::test]
async fn cancel_allowed_until_first_approval() -> Result<()> {
    let harness = Harness::new();
    let requester = harness.register_actor(Role::Cashier, &[]);
    let approver = harness.register_actor(Role::Supervisor, &["expenses:write"]);

    // Draft cancels cleanly, with the note landing on the skipped step.
    let draft_id = gated_request(&harness, requester, 150_000).await?;
    let cancelled = harness
        .requests()
        .cancel(draft_id, requester, Some("duplicate entry".to_string()))
        .await?;
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    assert!(cancelled
        .steps
        .iter()
        .all(|step| step.status == StepStatus::Skipped));
    assert_eq!(
        cancelled.steps[0].decision_reason.as_deref(),
        Some("duplicate entry")
    );

    // Submitted but undecided still cancels.
    let submitted_id = gated_request(&harness, requester, 150_000).await?;
    harness.requests().submit(submitted_id, requester).await?;
    let cancelled = harness
        .requests()
        .cancel(submitted_id, requester, None)
        .await?;
    assert_eq!(cancelled.status, RequestStatus::Cancelled);

    // One approval in, the chain can no longer be abandoned.
    let progressed_id = gated_request(&harness, requester, 150_000).await?;
    harness.requests().submit(progressed_id, requester).await?;
    harness
        .decisions()
        .decide(
            progressed_id,
            approver,
            DecisionRequest {
                decision: Decision::Approve,
                reason: None,
            },
        )
        .await?;
    let err = harness
        .requests()
        .cancel(progressed_id, requester, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
    Ok(())
}

#[tokio::test]
async fn cancel_by_non_requester_needs_permission() -> Result<()> {
    let harness = Harness::new();
    let requester = harness.register_actor(Role::Cashier, &[]);
    let plain = harness.register_actor(Role::Supervisor, &[]);
    let manager = harness.register_actor(Role::StationManager, &["approvals:cancel"]);

    let request_id = gated_request(&harness, requester, 150_000).await?;

    let err = harness
        .requests()
        .cancel(request_id, plain, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized));

    let cancelled = harness.requests().cancel(request_id, manager, None).await?;
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    Ok(())
}

#[tokio::test]
async fn terminal_requests_reject_every_further_operation() -> Result<()> {
    let harness = Harness::new();
    let requester = harness.register_actor(Role::Cashier, &[]);
    let approver = harness.register_actor(Role::Supervisor, &["expenses:write"]);

    let request_id = gated_request(&harness, requester, 150_000).await?;
    harness.requests().submit(request_id, requester).await?;
    let rejected = harness
        .decisions()
        .decide(
            request_id,
            approver,
            DecisionRequest {
                decision: Decision::Reject,
                reason: None,
            },
        )
        .await?;
    let version_before = rejected.version;

    for err in [
        harness
            .decisions()
            .decide(
                request_id,
                approver,
                DecisionRequest {
                    decision: Decision::Approve,
                    reason: None,
                },
            )
            .await
            .unwrap_err(),
        harness
            .requests()
            .submit(request_id, requester)
            .await
            .unwrap_err(),
        harness
            .requests()
            .cancel(request_id, requester, None)
            .await
            .unwrap_err(),
    ] {
        assert!(matches!(err, EngineError::InvalidTransition(_)));
    }

    let view = harness.requests().get(request_id).await?;
    assert_eq!(view.status, RequestStatus::Rejected);
    assert_eq!(view.version, version_before);
    Ok(())
}

#[tokio::test]
async fn concurrent_decisions_serialize_on_the_version() -> Result<()> {
    let harness = Harness::new();
    let requester = harness.register_actor(Role::Cashier, &[]);
    let approver = harness.register_actor(Role::Supervisor, &["expenses:write"]);

    let request_id = gated_request(&harness, requester, 150_000).await?;
    harness.requests().submit(request_id, requester).await?;

    // A second decider's stale read loses the compare-and-swap.
    let stale = harness.state.store.fetch_request(request_id).await?;
    harness
        .decisions()
        .decide(
            request_id,
            approver,
            DecisionRequest {
                decision: Decision::Approve,
                reason: None,
            },
        )
        .await?;
    let err = harness
        .state
        .store
        .update_request(stale.clone(), stale.version)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict));
    Ok(())
}

#[tokio::test]
async fn in_flight_requests_keep_their_policy_snapshot() -> Result<()> {
    let harness = Harness::new();
    let requester = harness.register_actor(Role::Cashier, &[]);
    let first_approver = harness.register_actor(Role::Supervisor, &["expenses:write"]);
    let second_approver = harness.register_actor(Role::Accountant, &["setup:write"]);

    let policy = harness
        .policies()
        .create_policy(two_step_expense_draft(harness.company_id))
        .await?;
    let outcome = harness
        .requests()
        .open_request(expense_input(&harness, requester, 150_000))
        .await?;
    let request_id = outcome.into_request().expect("gated").id;

    // Retiring the policy must not alter the in-flight chain.
    harness.policies().remove_policy(policy.id).await?;

    harness.requests().submit(request_id, requester).await?;
    harness
        .decisions()
        .decide(
            request_id,
            first_approver,
            DecisionRequest {
                decision: Decision::Approve,
                reason: None,
            },
        )
        .await?;
    let finished = harness
        .decisions()
        .decide(
            request_id,
            second_approver,
            DecisionRequest {
                decision: Decision::Approve,
                reason: None,
            },
        )
        .await?;
    assert_eq!(finished.status, RequestStatus::Approved);

    // But a fresh attempt no longer matches any policy.
    let outcome = harness
        .requests()
        .open_request(expense_input(&harness, requester, 150_000))
        .await?;
    assert!(matches!(outcome, GateOutcome::Ungated));
    Ok(())
}

#[tokio::test]
async fn listing_filters_by_status_and_entity() -> Result<()> {
    let harness = Harness::new();
    let requester = harness.register_actor(Role::Cashier, &[]);

    let first = gated_request(&harness, requester, 150_000).await?;
    let second = gated_request(&harness, requester, 175_000).await?;
    harness.requests().submit(second, requester).await?;

    let drafts = harness
        .requests()
        .list(&RequestFilters {
            company_id: Some(harness.company_id),
            status: Some(RequestStatus::Draft),
            ..RequestFilters::default()
        })
        .await?;
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id, first);

    let none = harness
        .requests()
        .list(&RequestFilters {
            entity: Some(EntityKind::Shift),
            ..RequestFilters::default()
        })
        .await?;
    assert!(none.is_empty());
    Ok(())
}
