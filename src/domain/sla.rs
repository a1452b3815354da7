use chrono::{DateTime, Utc};

use crate::domain::models::{ApprovalRequest, ApprovalStep, StepStatus};

/// A step is overdue while it is still pending and its due time has passed.
/// Overdue-ness is informational only and recomputed at read time; nothing
/// auto-rejects or escalates.
pub fn is_overdue(step: &ApprovalStep, now: DateTime<Utc>) -> bool {
    step.status == StepStatus::Pending && step.due_at.is_some_and(|due| now > due)
}

/// Request-level overdue flag for list views. Checks every pending step, not
/// just the active one, so a variant with parallel steps would still report
/// correctly.
pub fn request_overdue(request: &ApprovalRequest, now: DateTime<Utc>) -> bool {
    request.steps.iter().any(|step| is_overdue(step, now))
}
