// core/src/projections.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger_types::TransactionStatus;
use crate::money::Amount;
use crate::payout_types::PayoutStatus;

/// Current running balance of a single account, maintained incrementally by
/// the projector and reconstructible from the event log at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account_code: String,
    pub balance: Amount,
    pub last_updated_at: DateTime<Utc>,
    pub last_event_sequence: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutSummary {
    pub payout_id: uuid::Uuid,
    pub idempotency_key: String,
    pub amount: Amount,
    pub status: PayoutStatus,
    pub recipient_name: String,
    pub last_updated_at: DateTime<Utc>,
    pub last_event_sequence: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransactionSummary {
    pub transaction_id: String,
    pub description: String,
    pub status: TransactionStatus,
    pub entry_count: i64,
    pub last_updated_at: DateTime<Utc>,
    pub last_event_sequence: i64,
}
