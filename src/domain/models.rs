use std::{convert::TryFrom, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Cashier,
    Supervisor,
    StationManager,
    Accountant,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Cashier => "cashier",
            Role::Supervisor => "supervisor",
            Role::StationManager => "station_manager",
            Role::Accountant => "accountant",
            Role::Owner => "owner",
        }
    }

    fn parse_normalized(value: &str) -> Result<Self, EnumParseError> {
        match value {
            "cashier" => Ok(Role::Cashier),
            "supervisor" => Ok(Role::Supervisor),
            "station_manager" => Ok(Role::StationManager),
            "accountant" => Ok(Role::Accountant),
            "owner" => Ok(Role::Owner),
            _ => Err(EnumParseError::new("role", value)),
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = EnumParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Role::parse_normalized(&normalized)
    }
}

/// Business record types whose mutations may be gated by a policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    ExpenseEntry,
    StockAdjustment,
    SaleTransaction,
    Shift,
    FuelDelivery,
    CreditInvoice,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::ExpenseEntry => "expense_entry",
            EntityKind::StockAdjustment => "stock_adjustment",
            EntityKind::SaleTransaction => "sale_transaction",
            EntityKind::Shift => "shift",
            EntityKind::FuelDelivery => "fuel_delivery",
            EntityKind::CreditInvoice => "credit_invoice",
        }
    }
}

impl TryFrom<&str> for EntityKind {
    type Error = EnumParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "expense_entry" => Ok(EntityKind::ExpenseEntry),
            "stock_adjustment" => Ok(EntityKind::StockAdjustment),
            "sale_transaction" => Ok(EntityKind::SaleTransaction),
            "shift" => Ok(EntityKind::Shift),
            "fuel_delivery" => Ok(EntityKind::FuelDelivery),
            "credit_invoice" => Ok(EntityKind::CreditInvoice),
            other => Err(EnumParseError::new("entity kind", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Approve,
    Void,
    DiscountOverride,
    CloseVariance,
    Adjust,
    WriteOff,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Approve => "approve",
            ActionKind::Void => "void",
            ActionKind::DiscountOverride => "discount_override",
            ActionKind::CloseVariance => "close_variance",
            ActionKind::Adjust => "adjust",
            ActionKind::WriteOff => "write_off",
        }
    }
}

impl TryFrom<&str> for ActionKind {
    type Error = EnumParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(ActionKind::Approve),
            "void" => Ok(ActionKind::Void),
            "discount_override" => Ok(ActionKind::DiscountOverride),
            "close_variance" => Ok(ActionKind::CloseVariance),
            "adjust" => Ok(ActionKind::Adjust),
            "write_off" => Ok(ActionKind::WriteOff),
            other => Err(EnumParseError::new("action kind", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnumParseError {
    kind: &'static str,
    value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported {} value: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Draft => "draft",
            RequestStatus::Submitted => "submitted",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Approved | RequestStatus::Rejected | RequestStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Approved,
    Rejected,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Approved => "approved",
            StepStatus::Rejected => "rejected",
            StepStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

/// One link of a policy's approval chain, as configured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyStep {
    pub step_order: i32,
    pub required_role: Option<Role>,
    pub required_permission: Option<String>,
    pub due_hours: Option<i64>,
    #[serde(default)]
    pub allow_self_approval: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: Uuid,
    pub company_id: Uuid,
    /// `None` applies the policy to every branch of the company.
    pub branch_id: Option<Uuid>,
    pub entity: EntityKind,
    pub action: ActionKind,
    pub threshold_amount_cents: Option<i64>,
    pub threshold_pct: Option<f64>,
    pub steps: Vec<PolicyStep>,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Policy {
    pub fn is_active(&self) -> bool {
        self.is_enabled && self.deleted_at.is_none()
    }
}

/// A frozen copy of one policy step, owned by its request. Policy edits after
/// request creation never reach these rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub id: Uuid,
    pub request_id: Uuid,
    pub step_order: i32,
    pub required_role: Option<Role>,
    pub required_permission: Option<String>,
    pub due_hours: Option<i64>,
    pub allow_self_approval: bool,
    pub status: StepStatus,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_reason: Option<String>,
    /// Set when the step becomes the active pending step; the SLA clock does
    /// not start at request creation.
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
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
    /// Audit snapshot of the matched policy and gate context, frozen at
    /// creation time.
    pub meta: serde_json::Value,
    pub steps: Vec<ApprovalStep>,
    pub version: i32,
}

impl ApprovalRequest {
    /// The single decidable step: minimal `step_order` among pending steps.
    /// Recomputed from the rows every time rather than tracked in a separate
    /// pointer that could drift.
    pub fn active_step(&self) -> Option<&ApprovalStep> {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Pending)
            .min_by_key(|step| step.step_order)
    }

    pub fn active_step_mut(&mut self) -> Option<&mut ApprovalStep> {
        self.steps
            .iter_mut()
            .filter(|step| step.status == StepStatus::Pending)
            .min_by_key(|step| step.step_order)
    }

    pub fn approved_step_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Approved)
            .count()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
