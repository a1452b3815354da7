use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::Policy;

/// Metrics of the attempted action, as supplied by the caller. Both fields
/// are optional: an expense approval carries an amount, a shift close
/// variance may carry both, a sale void may carry neither.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GateContext {
    pub amount_cents: Option<i64>,
    pub percentage: Option<f64>,
}

impl GateContext {
    pub fn amount(cents: i64) -> Self {
        Self {
            amount_cents: Some(cents),
            percentage: None,
        }
    }

    pub fn percentage(ratio: f64) -> Self {
        Self {
            amount_cents: None,
            percentage: Some(ratio),
        }
    }
}

/// Decides whether a matched policy gates the action described by `ctx`.
///
/// A policy with no thresholds always gates. With thresholds, the action is
/// gated when it meets or exceeds any configured threshold (OR semantics);
/// a threshold whose metric is absent from the context does not apply. A
/// supplied percentage that is not a finite number gates whenever a
/// percentage threshold exists — a corrupted metric must not slip under the
/// gate.
pub fn should_gate(policy: &Policy, ctx: &GateContext) -> bool {
    if policy.threshold_amount_cents.is_none() && policy.threshold_pct.is_none() {
        return true;
    }

    let amount_met = match (policy.threshold_amount_cents, ctx.amount_cents) {
        (Some(threshold), Some(amount)) => amount >= threshold,
        _ => false,
    };
    let pct_met = match (policy.threshold_pct, ctx.percentage) {
        (Some(_), Some(pct)) if !pct.is_finite() => true,
        (Some(threshold), Some(pct)) => pct >= threshold,
        _ => false,
    };

    amount_met || pct_met
}

/// Picks the most specific policy for an action from the enabled candidates.
///
/// Branch-scoped policies beat company-global ones. Candidates scoped to a
/// different branch never match. Ties at equal specificity resolve to the
/// newest `created_at`, then the larger id, so repeated calls with the same
/// configuration always return the same policy.
pub fn select_policy(candidates: &[Policy], branch_id: Option<Uuid>) -> Option<&Policy> {
    candidates
        .iter()
        .filter(|policy| policy.is_active())
        .filter(|policy| match policy.branch_id {
            Some(scoped) => branch_id == Some(scoped),
            None => true,
        })
        .max_by_key(|policy| (policy.branch_id.is_some(), policy.created_at, policy.id))
}
