use thiserror::Error;

/// Typed failures returned to business-action callers. Every engine
/// operation either applies fully or returns one of these with state
/// untouched.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found")]
    NotFound,
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error("no active step to decide")]
    NoActiveStep,
    #[error("actor does not satisfy the step gate")]
    Unauthorized,
    #[error("self-approval is not allowed for this step")]
    SelfApprovalForbidden,
    #[error("conflicting concurrent update")]
    Conflict,
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn invalid_transition(detail: impl Into<String>) -> Self {
        EngineError::InvalidTransition(detail.into())
    }

    pub fn invalid_policy(detail: impl Into<String>) -> Self {
        EngineError::InvalidPolicy(detail.into())
    }
}
