// core/src/backend.rs
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::account::{Account, AccountType};
use crate::error::EngineError;
use crate::event::{Event, EventType};
use crate::ledger_types::{LedgerEntry, NewEntry, Transaction};
use crate::payout_types::{NewPayout, Payout, PayoutEvent, PayoutEventType};
use crate::projections::{AccountBalance, LedgerTransactionSummary, PayoutSummary};

/// Everything the engine needs from durable storage, expressed as one
/// atomic operation per method. Every method that mutates state is
/// idempotent under retry: callers may call it twice with the same
/// natural key (event_id, transaction_id, idempotency_key) and observe
/// the first call's result both times.
///
/// Implementations: `adapters::postgres::PostgresBackend` for production,
/// `adapters::memory::MemoryBackend` for tests and the in-process demo.
#[async_trait]
pub trait Backend: Send + Sync {
    // ── accounts ────────────────────────────────────────────────────────
    async fn get_or_create_account(
        &self,
        account_code: &str,
        name: &str,
        account_type: AccountType,
    ) -> Result<Account, EngineError>;

    async fn get_account(&self, account_code: &str) -> Result<Option<Account>, EngineError>;

    // ── event log ───────────────────────────────────────────────────────
    /// Append one event. If `event_id` already exists, returns the
    /// previously stored event instead of inserting a duplicate.
    async fn append_event(
        &self,
        event_id: &str,
        event_type: EventType,
        aggregate_type: &str,
        aggregate_id: &str,
        event_data: Value,
        metadata: Value,
    ) -> Result<Event, EngineError>;

    async fn read_events_after(
        &self,
        sequence_number: i64,
        limit: i64,
    ) -> Result<Vec<Event>, EngineError>;

    // ── ledger ──────────────────────────────────────────────────────────
    /// Post a balanced transaction. If `transaction_id` already exists,
    /// returns the previously posted transaction rather than re-inserting
    /// or re-validating the entries.
    async fn post_transaction(
        &self,
        transaction_id: &str,
        description: &str,
        entries: Vec<NewEntry>,
        metadata: Value,
    ) -> Result<Transaction, EngineError>;

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, EngineError>;

    async fn get_entries_for_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Vec<LedgerEntry>, EngineError>;

    async fn get_entries_for_account(
        &self,
        account_code: &str,
    ) -> Result<Vec<LedgerEntry>, EngineError>;

    // ── payouts ─────────────────────────────────────────────────────────
    /// Admit a new payout. If `idempotency_key` already exists, returns
    /// the existing payout unchanged — the caller cannot tell from the
    /// return value alone whether this call created it.
    async fn admit_payout(&self, new_payout: NewPayout) -> Result<Payout, EngineError>;

    async fn get_payout(&self, payout_id: Uuid) -> Result<Option<Payout>, EngineError>;

    async fn get_payout_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<Payout>, EngineError>;

    /// Transition PENDING -> PROCESSING. No-op (returns the payout
    /// unchanged) if it is already PROCESSING or any terminal state. The
    /// returned bool is `true` only for the caller whose call actually
    /// performed the transition, so callers can tell a fresh admission
    /// apart from a retry racing a concurrent one.
    async fn start_processing(&self, payout_id: Uuid) -> Result<(Payout, bool), EngineError>;

    async fn attach_ledger_transaction(
        &self,
        payout_id: Uuid,
        transaction_id: &str,
    ) -> Result<Payout, EngineError>;

    async fn attach_external_payout(
        &self,
        payout_id: Uuid,
        external_payout_id: &str,
        external_reference: Option<&str>,
    ) -> Result<Payout, EngineError>;

    async fn complete_payout(&self, payout_id: Uuid) -> Result<Payout, EngineError>;

    async fn fail_payout(&self, payout_id: Uuid, error_message: &str) -> Result<Payout, EngineError>;

    async fn cancel_payout(&self, payout_id: Uuid) -> Result<Payout, EngineError>;

    async fn increment_retry_count(&self, payout_id: Uuid) -> Result<Payout, EngineError>;

    async fn append_payout_event(
        &self,
        payout_id: Uuid,
        event_type: PayoutEventType,
        event_data: Value,
    ) -> Result<PayoutEvent, EngineError>;

    // ── read models ─────────────────────────────────────────────────────
    async fn get_account_balance(
        &self,
        account_code: &str,
    ) -> Result<Option<AccountBalance>, EngineError>;

    async fn upsert_account_balance(
        &self,
        balance: AccountBalance,
    ) -> Result<(), EngineError>;

    async fn get_payout_summary(
        &self,
        payout_id: Uuid,
    ) -> Result<Option<PayoutSummary>, EngineError>;

    async fn upsert_payout_summary(&self, summary: PayoutSummary) -> Result<(), EngineError>;

    async fn get_ledger_transaction_summary(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LedgerTransactionSummary>, EngineError>;

    async fn upsert_ledger_transaction_summary(
        &self,
        summary: LedgerTransactionSummary,
    ) -> Result<(), EngineError>;
}
