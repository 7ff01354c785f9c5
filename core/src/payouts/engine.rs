// core/src/payouts/engine.rs
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::account::AccountType;
use crate::backend::Backend;
use crate::error::EngineError;
use crate::event::EventType;
use crate::event_log::EventLog;
use crate::ledger::Ledger;
use crate::ledger_types::{EntryType, NewEntry};
use crate::payout_types::{NewPayout, Payout, PayoutEventType};
use crate::projector::Projector;

/// Well-known accounts a payout is booked against. A real deployment would
/// let these vary per currency or business unit; this engine keeps one of
/// each, seeded once at bootstrap.
pub const CASH_ACCOUNT_CODE: &str = "CASH_001";
pub const PAYOUT_LIABILITY_ACCOUNT_CODE: &str = "PAYOUT_LIABILITY_001";

/// Drives a payout through PENDING -> PROCESSING -> COMPLETED/FAILED/CANCELLED.
/// Every transition is admitted or applied through the backend's
/// idempotent primitives, then mirrored into the event log, the payout's
/// own audit trail, and the read-model projections — in that order, and
/// only when the transition actually happened on this call.
pub struct PayoutEngine {
    backend: Arc<dyn Backend>,
    event_log: Arc<EventLog>,
    ledger: Arc<Ledger>,
    projector: Arc<Projector>,
}

impl PayoutEngine {
    pub fn new(
        backend: Arc<dyn Backend>,
        event_log: Arc<EventLog>,
        ledger: Arc<Ledger>,
        projector: Arc<Projector>,
    ) -> Self {
        Self {
            backend,
            event_log,
            ledger,
            projector,
        }
    }

    pub async fn admit(&self, mut new_payout: NewPayout) -> Result<Payout, EngineError> {
        if !new_payout.amount.is_positive() {
            return Err(EngineError::Validation(
                "payout amount must be positive".into(),
            ));
        }
        if new_payout.idempotency_key.trim().is_empty() {
            return Err(EngineError::Validation(
                "idempotency_key must not be empty".into(),
            ));
        }
        if new_payout.idempotency_key.len() > 255 {
            return Err(EngineError::Validation(
                "idempotency_key must be at most 255 characters".into(),
            ));
        }
        if new_payout.recipient_account.trim().is_empty() {
            return Err(EngineError::Validation(
                "recipient_account must not be empty".into(),
            ));
        }
        if new_payout.currency.trim().is_empty() {
            new_payout.currency = "USD".to_string();
        } else {
            new_payout.currency = new_payout.currency.trim().to_uppercase();
        }
        if new_payout.currency.len() != 3 || !new_payout.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(EngineError::Validation(format!(
                "currency must be a 3-letter ISO-like code, got {}",
                new_payout.currency
            )));
        }

        let existing = self
            .backend
            .get_payout_by_idempotency_key(&new_payout.idempotency_key)
            .await?;
        let payout = self.backend.admit_payout(new_payout).await?;

        if existing.is_none() {
            let event_id = format!("payout_created:{}", payout.idempotency_key);
            let event = self
                .event_log
                .append(
                    &event_id,
                    EventType::PayoutCreated,
                    "payout",
                    &payout.id.to_string(),
                    serde_json::json!({
                        "payout_id": payout.id,
                        "amount": payout.amount,
                        "recipient_account": payout.recipient_account,
                    }),
                    Value::Null,
                )
                .await?;
            self.backend
                .append_payout_event(payout.id, PayoutEventType::Created, Value::Null)
                .await?;
            self.projector
                .apply_payout(&payout, event.sequence_number)
                .await?;
        }

        Ok(payout)
    }

    pub async fn get(&self, payout_id: Uuid) -> Result<Option<Payout>, EngineError> {
        self.backend.get_payout(payout_id).await
    }

    pub async fn get_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<Payout>, EngineError> {
        self.backend.get_payout_by_idempotency_key(idempotency_key).await
    }

    pub async fn start_processing(&self, payout_id: Uuid) -> Result<Payout, EngineError> {
        let (payout, transitioned) = self.backend.start_processing(payout_id).await?;
        if transitioned {
            let event_id = format!("payout_processing:{}", payout.idempotency_key);
            let event = self
                .event_log
                .append(
                    &event_id,
                    EventType::PayoutProcessing,
                    "payout",
                    &payout.id.to_string(),
                    serde_json::json!({ "payout_id": payout.id }),
                    Value::Null,
                )
                .await?;
            self.backend
                .append_payout_event(payout.id, PayoutEventType::ProcessingStarted, Value::Null)
                .await?;
            self.projector
                .apply_payout(&payout, event.sequence_number)
                .await?;
        }
        Ok(payout)
    }

    /// Post the CASH / PAYOUT_LIABILITY entries for a payout and attach
    /// the resulting transaction id. Idempotent: re-running against a
    /// payout that already has a `ledger_transaction_id` just re-posts
    /// (and gets back) the same transaction, since the ledger transaction
    /// id is derived deterministically from the payout's idempotency key.
    pub async fn post_ledger_entries(&self, payout_id: Uuid) -> Result<Payout, EngineError> {
        let payout = self
            .backend
            .get_payout(payout_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;

        self.backend
            .get_or_create_account(CASH_ACCOUNT_CODE, "Cash", AccountType::Asset)
            .await?;
        self.backend
            .get_or_create_account(
                PAYOUT_LIABILITY_ACCOUNT_CODE,
                "Payout Liability",
                AccountType::Liability,
            )
            .await?;

        let transaction_id = payout.ledger_transaction_key();
        let entries = vec![
            NewEntry {
                account_code: PAYOUT_LIABILITY_ACCOUNT_CODE.to_string(),
                amount: payout.amount,
                entry_type: EntryType::Debit,
                description: format!("payout {} liability settlement", payout.idempotency_key),
            },
            NewEntry {
                account_code: CASH_ACCOUNT_CODE.to_string(),
                amount: payout.amount.negate(),
                entry_type: EntryType::Debit,
                description: format!("payout {} cash disbursement", payout.idempotency_key),
            },
        ];

        let transaction = self
            .ledger
            .post_transaction(
                &transaction_id,
                &format!("payout to {}", payout.recipient_name),
                entries,
                serde_json::json!({ "payout_id": payout.id }),
            )
            .await?;

        let event_id = format!("ledger_transaction_created:{transaction_id}");
        let event = self
            .event_log
            .append(
                &event_id,
                EventType::LedgerTransactionCreated,
                "ledger_transaction",
                &transaction_id,
                serde_json::json!({ "transaction_id": transaction_id }),
                Value::Null,
            )
            .await?;
        self.projector
            .apply_transaction(&transaction, event.sequence_number)
            .await?;

        let payout = self
            .backend
            .attach_ledger_transaction(payout_id, &transaction_id)
            .await?;
        self.backend
            .append_payout_event(
                payout_id,
                PayoutEventType::LedgerEntryCreated,
                serde_json::json!({ "transaction_id": transaction_id }),
            )
            .await?;

        Ok(payout)
    }

    pub async fn attach_external_payout(
        &self,
        payout_id: Uuid,
        external_payout_id: &str,
        external_reference: Option<&str>,
    ) -> Result<Payout, EngineError> {
        let payout = self
            .backend
            .attach_external_payout(payout_id, external_payout_id, external_reference)
            .await?;
        self.backend
            .append_payout_event(
                payout_id,
                PayoutEventType::ExternalPayoutInitiated,
                serde_json::json!({ "external_payout_id": external_payout_id }),
            )
            .await?;
        Ok(payout)
    }

    pub async fn complete(&self, payout_id: Uuid) -> Result<Payout, EngineError> {
        let payout = self.backend.complete_payout(payout_id).await?;
        let event_id = format!("payout_completed:{}", payout.idempotency_key);
        let event = self
            .event_log
            .append(
                &event_id,
                EventType::PayoutCompleted,
                "payout",
                &payout.id.to_string(),
                serde_json::json!({ "payout_id": payout.id }),
                Value::Null,
            )
            .await?;
        self.backend
            .append_payout_event(payout.id, PayoutEventType::Completed, Value::Null)
            .await?;
        self.projector
            .apply_payout(&payout, event.sequence_number)
            .await?;
        Ok(payout)
    }

    pub async fn fail(&self, payout_id: Uuid, error_message: &str) -> Result<Payout, EngineError> {
        let payout = self.backend.fail_payout(payout_id, error_message).await?;
        let event_id = format!(
            "payout_failed:{}:{}",
            payout.idempotency_key, payout.retry_count
        );
        let event = self
            .event_log
            .append(
                &event_id,
                EventType::PayoutFailed,
                "payout",
                &payout.id.to_string(),
                serde_json::json!({ "payout_id": payout.id, "error": error_message }),
                Value::Null,
            )
            .await?;
        self.backend
            .append_payout_event(
                payout.id,
                PayoutEventType::Failed,
                serde_json::json!({ "error": error_message }),
            )
            .await?;
        self.projector
            .apply_payout(&payout, event.sequence_number)
            .await?;
        Ok(payout)
    }

    pub async fn cancel(&self, payout_id: Uuid) -> Result<Payout, EngineError> {
        let payout = self.backend.cancel_payout(payout_id).await?;
        self.backend
            .append_payout_event(payout.id, PayoutEventType::Cancelled, Value::Null)
            .await?;
        Ok(payout)
    }

    pub async fn record_retry(&self, payout_id: Uuid) -> Result<Payout, EngineError> {
        let payout = self.backend.increment_retry_count(payout_id).await?;
        self.backend
            .append_payout_event(
                payout.id,
                PayoutEventType::Retry,
                serde_json::json!({ "retry_count": payout.retry_count }),
            )
            .await?;
        Ok(payout)
    }
}
