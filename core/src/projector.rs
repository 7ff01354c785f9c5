// core/src/projector.rs
use std::sync::Arc;

use chrono::Utc;

use crate::backend::Backend;
use crate::error::EngineError;
use crate::ledger_types::{EntryType, Transaction};
use crate::money::Amount;
use crate::payout_types::Payout;
use crate::projections::{AccountBalance, LedgerTransactionSummary, PayoutSummary};

/// Maintains the three read models. Every update is monotone on
/// `last_event_sequence` — an update carrying an older sequence number
/// than what's stored is silently dropped, so replaying or re-delivering
/// the same event twice (or out of order) never moves a projection
/// backwards.
pub struct Projector {
    backend: Arc<dyn Backend>,
}

impl Projector {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Incrementally fold one posted transaction's entries into
    /// `account_balances`. Called in-line by the ledger right after
    /// `post_transaction` commits.
    pub async fn apply_transaction(
        &self,
        transaction: &Transaction,
        sequence_number: i64,
    ) -> Result<(), EngineError> {
        let entries = self
            .backend
            .get_entries_for_transaction(&transaction.transaction_id)
            .await?;

        for entry in &entries {
            let account = self
                .backend
                .get_account(&entry.account_code)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("account {}", entry.account_code)))?;

            let signed = match entry.entry_type {
                EntryType::Debit => entry.amount,
                EntryType::Credit => entry.amount.negate(),
            };
            let contribution = if account.account_type.debit_increases() {
                signed
            } else {
                signed.negate()
            };

            let current = self
                .backend
                .get_account_balance(&entry.account_code)
                .await?;
            let running = current
                .as_ref()
                .map(|b| b.balance)
                .unwrap_or_else(Amount::zero);

            self.backend
                .upsert_account_balance(AccountBalance {
                    account_code: entry.account_code.clone(),
                    balance: running + contribution,
                    last_updated_at: Utc::now(),
                    last_event_sequence: sequence_number,
                })
                .await?;
        }

        self.backend
            .upsert_ledger_transaction_summary(LedgerTransactionSummary {
                transaction_id: transaction.transaction_id.clone(),
                description: transaction.description.clone(),
                status: transaction.status,
                entry_count: entries.len() as i64,
                last_updated_at: Utc::now(),
                last_event_sequence: sequence_number,
            })
            .await
    }

    pub async fn apply_payout(
        &self,
        payout: &Payout,
        sequence_number: i64,
    ) -> Result<(), EngineError> {
        self.backend
            .upsert_payout_summary(PayoutSummary {
                payout_id: payout.id,
                idempotency_key: payout.idempotency_key.clone(),
                amount: payout.amount,
                status: payout.status,
                recipient_name: payout.recipient_name.clone(),
                last_updated_at: Utc::now(),
                last_event_sequence: sequence_number,
            })
            .await
    }

    pub async fn get_account_balance(
        &self,
        account_code: &str,
    ) -> Result<Option<AccountBalance>, EngineError> {
        self.backend.get_account_balance(account_code).await
    }

    pub async fn get_payout_summary(
        &self,
        payout_id: uuid::Uuid,
    ) -> Result<Option<PayoutSummary>, EngineError> {
        self.backend.get_payout_summary(payout_id).await
    }

    pub async fn get_ledger_transaction_summary(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LedgerTransactionSummary>, EngineError> {
        self.backend
            .get_ledger_transaction_summary(transaction_id)
            .await
    }

    /// Recompute `account_balances` for one account from scratch by
    /// replaying its entries, ignoring whatever is currently stored.
    /// Safe to run against a live system: it only ever overwrites with a
    /// freshly-derived value, never partially.
    pub async fn rebuild_account_balance(
        &self,
        account_code: &str,
        as_of_sequence: i64,
    ) -> Result<AccountBalance, EngineError> {
        let account = self
            .backend
            .get_account(account_code)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("account {account_code}")))?;
        let entries = self.backend.get_entries_for_account(account_code).await?;

        let mut balance = Amount::zero();
        for entry in &entries {
            let signed = match entry.entry_type {
                EntryType::Debit => entry.amount,
                EntryType::Credit => entry.amount.negate(),
            };
            let contribution = if account.account_type.debit_increases() {
                signed
            } else {
                signed.negate()
            };
            balance = balance + contribution;
        }

        let rebuilt = AccountBalance {
            account_code: account_code.to_string(),
            balance,
            last_updated_at: Utc::now(),
            last_event_sequence: as_of_sequence,
        };
        self.backend.upsert_account_balance(rebuilt.clone()).await?;
        Ok(rebuilt)
    }
}
