use std::collections::HashSet;

use crate::domain::models::PolicyStep;

/// Upper bound on a step's SLA window. Keeps due-time arithmetic inside
/// `chrono`'s representable range; no real chain waits longer than a year.
pub const MAX_DUE_HOURS: i64 = 24 * 365;

/// Structural checks on a policy's step chain, applied at creation time and
/// again when a request materializes its snapshot. Returns every violation
/// found rather than stopping at the first.
pub fn step_chain_violations(steps: &[PolicyStep]) -> Vec<String> {
    let mut violations = Vec::new();

    if steps.is_empty() {
        violations.push("policy must define at least one approval step".to_string());
        return violations;
    }

    let mut seen_orders = HashSet::new();
    for step in steps {
        if step.step_order <= 0 {
            violations.push(format!(
                "step order {} must be a positive integer",
                step.step_order
            ));
        }
        if !seen_orders.insert(step.step_order) {
            violations.push(format!("duplicate step order {}", step.step_order));
        }
        if step.required_role.is_none() && step.required_permission.is_none() {
            // A gate nobody can satisfy; rejected here instead of surfacing
            // as a permanently undecidable step at runtime.
            violations.push(format!(
                "step {} must require a role or a permission",
                step.step_order
            ));
        }
        if let Some(hours) = step.due_hours {
            if !(1..=MAX_DUE_HOURS).contains(&hours) {
                violations.push(format!(
                    "step {} due_hours must be between 1 and {} when set",
                    step.step_order, MAX_DUE_HOURS
                ));
            }
        }
        if let Some(permission) = &step.required_permission {
            if permission.trim().is_empty() {
                violations.push(format!(
                    "step {} required_permission must not be blank",
                    step.step_order
                ));
            }
        }
    }

    violations
}

pub fn threshold_violations(amount_cents: Option<i64>, pct: Option<f64>) -> Vec<String> {
    let mut violations = Vec::new();
    if let Some(amount) = amount_cents {
        if amount < 0 {
            violations.push("threshold_amount_cents must not be negative".to_string());
        }
    }
    if let Some(pct) = pct {
        if !pct.is_finite() || pct < 0.0 {
            violations.push("threshold_pct must be a non-negative ratio".to_string());
        }
    }
    violations
}
