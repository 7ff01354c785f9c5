// core/src/payout_types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::money::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
    pub id: Uuid,
    pub idempotency_key: String,
    pub amount: Amount,
    pub currency: String,
    pub recipient_account: String,
    pub recipient_name: String,
    pub description: String,
    pub status: PayoutStatus,
    pub ledger_transaction_id: Option<String>,
    pub external_payout_id: Option<String>,
    pub external_reference: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub metadata: Value,
}

impl Payout {
    /// Deterministic ledger transaction id for this payout — never random,
    /// so a crashed-and-retried worker collides with (rather than
    /// duplicates) the transaction it already posted.
    pub fn ledger_transaction_key(&self) -> String {
        format!("payout_{}", self.idempotency_key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutEventType {
    Created,
    ProcessingStarted,
    LedgerEntryCreated,
    ExternalPayoutInitiated,
    ExternalPayoutCompleted,
    ExternalPayoutFailed,
    Completed,
    Failed,
    Cancelled,
    Retry,
}

impl PayoutEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::ProcessingStarted => "PROCESSING_STARTED",
            Self::LedgerEntryCreated => "LEDGER_ENTRY_CREATED",
            Self::ExternalPayoutInitiated => "EXTERNAL_PAYOUT_INITIATED",
            Self::ExternalPayoutCompleted => "EXTERNAL_PAYOUT_COMPLETED",
            Self::ExternalPayoutFailed => "EXTERNAL_PAYOUT_FAILED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Retry => "RETRY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutEvent {
    pub id: Uuid,
    pub payout_id: Uuid,
    pub event_type: PayoutEventType,
    pub event_data: Value,
    pub created_at: DateTime<Utc>,
}

/// Caller input to `PayoutEngine::admit`, pre-validation.
#[derive(Debug, Clone)]
pub struct NewPayout {
    pub idempotency_key: String,
    pub amount: Amount,
    pub currency: String,
    pub recipient_account: String,
    pub recipient_name: String,
    pub description: String,
    pub metadata: Value,
}
