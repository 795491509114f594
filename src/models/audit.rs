use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Actor recorded for events not tied to a data subject.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GdprAction {
    DataAccessRequest,
    DataRectification,
    DataErasure,
    DataRestriction,
    DataPortability,
    DataObjection,
    ConsentUpdate,
    ConsentWithdrawal,
    DataBreachDetected,
}

impl GdprAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataAccessRequest => "DATA_ACCESS_REQUEST",
            Self::DataRectification => "DATA_RECTIFICATION",
            Self::DataErasure => "DATA_ERASURE",
            Self::DataRestriction => "DATA_RESTRICTION",
            Self::DataPortability => "DATA_PORTABILITY",
            Self::DataObjection => "DATA_OBJECTION",
            Self::ConsentUpdate => "CONSENT_UPDATE",
            Self::ConsentWithdrawal => "CONSENT_WITHDRAWAL",
            Self::DataBreachDetected => "DATA_BREACH_DETECTED",
        }
    }
}

/// One append-only audit trail record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub action: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub details: Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
