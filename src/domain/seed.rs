use chrono::Utc;
use uuid::Uuid;

use crate::domain::models::{ActionKind, EntityKind, Policy, PolicyStep, Role};

/// Default governance pack installed for a new station company. All
/// policies are company-global; branch overrides are configured per site.
pub fn default_policies(company_id: Uuid) -> Vec<Policy> {
    vec![
        // Expenses above 1,000.00 need supervisor then accountant sign-off.
        policy(
            company_id,
            EntityKind::ExpenseEntry,
            ActionKind::Approve,
            Some(100_000),
            None,
            vec![
                step(1, Some(Role::Supervisor), Some("expenses:approve"), Some(24)),
                step(2, Some(Role::Accountant), Some("expenses:finalize"), Some(48)),
            ],
        ),
        // Tank/stock adjustments beyond a 10% variance.
        policy(
            company_id,
            EntityKind::StockAdjustment,
            ActionKind::Adjust,
            None,
            Some(0.10),
            vec![step(
                1,
                Some(Role::StationManager),
                Some("inventory:adjust"),
                Some(24),
            )],
        ),
        // Sale voids always go through the station manager.
        policy(
            company_id,
            EntityKind::SaleTransaction,
            ActionKind::Void,
            None,
            None,
            vec![step(1, Some(Role::StationManager), Some("pos:void"), Some(12))],
        ),
        // Discount overrides above 5%.
        policy(
            company_id,
            EntityKind::SaleTransaction,
            ActionKind::DiscountOverride,
            None,
            Some(0.05),
            vec![step(
                1,
                Some(Role::Supervisor),
                Some("pos:discount_override"),
                Some(12),
            )],
        ),
        // Shift-close variance above 50.00 or 2% of takings.
        policy(
            company_id,
            EntityKind::Shift,
            ActionKind::CloseVariance,
            Some(5_000),
            Some(0.02),
            vec![
                step(1, Some(Role::Supervisor), Some("shifts:close"), Some(8)),
                step(2, Some(Role::Accountant), Some("shifts:reconcile"), Some(24)),
            ],
        ),
    ]
}

fn policy(
    company_id: Uuid,
    entity: EntityKind,
    action: ActionKind,
    threshold_amount_cents: Option<i64>,
    threshold_pct: Option<f64>,
    steps: Vec<PolicyStep>,
) -> Policy {
    Policy {
        id: Uuid::new_v4(),
        company_id,
        branch_id: None,
        entity,
        action,
        threshold_amount_cents,
        threshold_pct,
        steps,
        is_enabled: true,
        created_at: Utc::now(),
        deleted_at: None,
    }
}

fn step(
    order: i32,
    required_role: Option<Role>,
    required_permission: Option<&str>,
    due_hours: Option<i64>,
) -> PolicyStep {
    PolicyStep {
        step_order: order,
        required_role,
        required_permission: required_permission.map(str::to_owned),
        due_hours,
        allow_self_approval: false,
    }
}
