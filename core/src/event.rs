// core/src/event.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    LedgerTransactionCreated,
    PayoutCreated,
    PayoutProcessing,
    PayoutCompleted,
    PayoutFailed,
    AccountBalanceUpdated,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LedgerTransactionCreated => "LEDGER_TRANSACTION_CREATED",
            Self::PayoutCreated => "PAYOUT_CREATED",
            Self::PayoutProcessing => "PAYOUT_PROCESSING",
            Self::PayoutCompleted => "PAYOUT_COMPLETED",
            Self::PayoutFailed => "PAYOUT_FAILED",
            Self::AccountBalanceUpdated => "ACCOUNT_BALANCE_UPDATED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "LEDGER_TRANSACTION_CREATED" => Some(Self::LedgerTransactionCreated),
            "PAYOUT_CREATED" => Some(Self::PayoutCreated),
            "PAYOUT_PROCESSING" => Some(Self::PayoutProcessing),
            "PAYOUT_COMPLETED" => Some(Self::PayoutCompleted),
            "PAYOUT_FAILED" => Some(Self::PayoutFailed),
            "ACCOUNT_BALANCE_UPDATED" => Some(Self::AccountBalanceUpdated),
            _ => None,
        }
    }
}

/// A single append-only row in the global event log. `sequence_number` is
/// the only thing callers should sort or compare on; `event_id` exists
/// purely for idempotent re-append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: uuid::Uuid,
    pub event_id: String,
    pub event_type: EventType,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_data: Value,
    pub metadata: Value,
    pub sequence_number: i64,
    pub created_at: DateTime<Utc>,
}
