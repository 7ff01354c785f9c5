// core/src/ledger.rs
use std::sync::Arc;

use serde_json::Value;

use crate::backend::Backend;
use crate::error::EngineError;
use crate::ledger_types::{LedgerEntry, NewEntry, Transaction};
use crate::money::Amount;

/// The double-entry core. `post_transaction` is the only way entries ever
/// reach storage, and it refuses anything that doesn't sum to zero —
/// callers cannot construct an unbalanced transaction through this API.
pub struct Ledger {
    backend: Arc<dyn Backend>,
}

impl Ledger {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn post_transaction(
        &self,
        transaction_id: &str,
        description: &str,
        entries: Vec<NewEntry>,
        metadata: Value,
    ) -> Result<Transaction, EngineError> {
        self.backend
            .post_transaction(transaction_id, description, entries, metadata)
            .await
    }

    pub async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, EngineError> {
        self.backend.get_transaction(transaction_id).await
    }

    pub async fn get_entries_for_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        self.backend.get_entries_for_transaction(transaction_id).await
    }

    /// Recompute an account's balance directly from its entries, bypassing
    /// the `account_balances` read model entirely. Used by the projector's
    /// rebuild path and by tests asserting the read model hasn't drifted.
    pub async fn account_balance_from_entries(&self, account_code: &str) -> Result<Amount, EngineError> {
        let account = self
            .backend
            .get_account(account_code)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("account {account_code}")))?;
        let entries = self.backend.get_entries_for_account(account_code).await?;

        let mut balance = Amount::zero();
        for entry in entries {
            let signed = match entry.entry_type {
                crate::ledger_types::EntryType::Debit => entry.amount,
                crate::ledger_types::EntryType::Credit => entry.amount.negate(),
            };
            let contribution = if account.account_type.debit_increases() {
                signed
            } else {
                signed.negate()
            };
            balance = balance + contribution;
        }
        Ok(balance)
    }

    /// Asserts the zero-sum invariant for one already-posted transaction —
    /// `sum(entries(transaction_id).amount) == 0`. Expected to always be
    /// true if `post_transaction`'s own checks held; this is a read-only
    /// re-check for callers that want to verify a transaction after the
    /// fact rather than trust it was posted correctly.
    pub async fn verify_balance(&self, transaction_id: &str) -> Result<bool, EngineError> {
        let entries = self.backend.get_entries_for_transaction(transaction_id).await?;
        let mut sum = Amount::zero();
        for entry in &entries {
            sum = sum + entry.amount;
        }
        Ok(sum.is_zero())
    }
}
