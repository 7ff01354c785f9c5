// core/src/adapters/memory.rs
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::account::{Account, AccountType};
use crate::backend::Backend;
use crate::error::EngineError;
use crate::event::{Event, EventType};
use crate::ledger_types::{LedgerEntry, NewEntry, Transaction, TransactionStatus};
use crate::payout_types::{NewPayout, Payout, PayoutEvent, PayoutEventType, PayoutStatus};
use crate::projections::{AccountBalance, LedgerTransactionSummary, PayoutSummary};

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    transactions: HashMap<String, Transaction>,
    entries_by_transaction: HashMap<String, Vec<LedgerEntry>>,
    events: Vec<Event>,
    events_by_id: HashMap<String, usize>,
    next_sequence: i64,
    payouts: HashMap<Uuid, Payout>,
    payouts_by_key: HashMap<String, Uuid>,
    payout_events: Vec<PayoutEvent>,
    account_balances: HashMap<String, AccountBalance>,
    payout_summaries: HashMap<Uuid, PayoutSummary>,
    ledger_transaction_summaries: HashMap<String, LedgerTransactionSummary>,
}

/// In-memory `Backend`, used by the test suite and the in-process demo
/// server. One mutex guards every field — held for the whole duration of
/// each method, the same way the Postgres adapter holds one transaction
/// per method.
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_sequence: 1,
                ..Default::default()
            }),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_or_create_account(
        &self,
        account_code: &str,
        name: &str,
        account_type: AccountType,
    ) -> Result<Account, EngineError> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.accounts.get(account_code) {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let account = Account {
            id: Uuid::now_v7(),
            account_code: account_code.to_string(),
            name: name.to_string(),
            account_type,
            created_at: now,
            updated_at: now,
        };
        state
            .accounts
            .insert(account_code.to_string(), account.clone());
        Ok(account)
    }

    async fn get_account(&self, account_code: &str) -> Result<Option<Account>, EngineError> {
        Ok(self.state.lock().unwrap().accounts.get(account_code).cloned())
    }

    async fn append_event(
        &self,
        event_id: &str,
        event_type: EventType,
        aggregate_type: &str,
        aggregate_id: &str,
        event_data: Value,
        metadata: Value,
    ) -> Result<Event, EngineError> {
        let mut state = self.state.lock().unwrap();
        if let Some(&idx) = state.events_by_id.get(event_id) {
            return Ok(state.events[idx].clone());
        }
        let sequence_number = state.next_sequence;
        state.next_sequence += 1;
        let event = Event {
            id: Uuid::now_v7(),
            event_id: event_id.to_string(),
            event_type,
            aggregate_type: aggregate_type.to_string(),
            aggregate_id: aggregate_id.to_string(),
            event_data,
            metadata,
            sequence_number,
            created_at: Utc::now(),
        };
        state.events.push(event.clone());
        let idx = state.events.len() - 1;
        state.events_by_id.insert(event_id.to_string(), idx);
        Ok(event)
    }

    async fn read_events_after(
        &self,
        sequence_number: i64,
        limit: i64,
    ) -> Result<Vec<Event>, EngineError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .events
            .iter()
            .filter(|e| e.sequence_number > sequence_number)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn post_transaction(
        &self,
        transaction_id: &str,
        description: &str,
        entries: Vec<NewEntry>,
        metadata: Value,
    ) -> Result<Transaction, EngineError> {
        if entries.len() != 2 {
            return Err(EngineError::Validation(format!(
                "a transaction needs exactly two entries, got {}",
                entries.len()
            )));
        }
        let sum = entries
            .iter()
            .map(|e| e.amount.inner())
            .fold(Decimal::ZERO, |acc, v| acc + v);
        if sum != Decimal::ZERO {
            return Err(EngineError::InvariantViolation(format!(
                "transaction {transaction_id} does not balance: signed sum {sum} != 0"
            )));
        }

        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.transactions.get(transaction_id) {
            return Ok(existing.clone());
        }

        for entry in &entries {
            if !state.accounts.contains_key(&entry.account_code) {
                return Err(EngineError::UnknownAccount(entry.account_code.clone()));
            }
        }

        let now = Utc::now();
        let transaction = Transaction {
            id: Uuid::now_v7(),
            transaction_id: transaction_id.to_string(),
            description: description.to_string(),
            status: TransactionStatus::Completed,
            metadata,
            created_at: now,
        };

        let persisted_entries: Vec<LedgerEntry> = entries
            .into_iter()
            .map(|e| LedgerEntry {
                id: Uuid::now_v7(),
                transaction_id: transaction_id.to_string(),
                account_code: e.account_code,
                amount: e.amount,
                entry_type: e.entry_type,
                description: e.description,
                created_at: now,
            })
            .collect();

        state
            .transactions
            .insert(transaction_id.to_string(), transaction.clone());
        state
            .entries_by_transaction
            .insert(transaction_id.to_string(), persisted_entries);

        let sequence_number = state.next_sequence;
        state.next_sequence += 1;
        let event_id = format!("ledger_transaction_created:{transaction_id}");
        let event = Event {
            id: Uuid::now_v7(),
            event_id: event_id.clone(),
            event_type: EventType::LedgerTransactionCreated,
            aggregate_type: "ledger_transaction".to_string(),
            aggregate_id: transaction_id.to_string(),
            event_data: serde_json::json!({ "transaction_id": transaction_id }),
            metadata: Value::Null,
            sequence_number,
            created_at: now,
        };
        state.events.push(event);
        let idx = state.events.len() - 1;
        state.events_by_id.insert(event_id, idx);

        Ok(transaction)
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, EngineError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .transactions
            .get(transaction_id)
            .cloned())
    }

    async fn get_entries_for_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .entries_by_transaction
            .get(transaction_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_entries_for_account(
        &self,
        account_code: &str,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<LedgerEntry> = state
            .entries_by_transaction
            .values()
            .flatten()
            .filter(|e| e.account_code == account_code)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    async fn admit_payout(&self, new_payout: NewPayout) -> Result<Payout, EngineError> {
        let mut state = self.state.lock().unwrap();
        if let Some(&id) = state.payouts_by_key.get(&new_payout.idempotency_key) {
            return Ok(state.payouts[&id].clone());
        }
        let now = Utc::now();
        let id = Uuid::now_v7();
        let payout = Payout {
            id,
            idempotency_key: new_payout.idempotency_key.clone(),
            amount: new_payout.amount,
            currency: new_payout.currency,
            recipient_account: new_payout.recipient_account,
            recipient_name: new_payout.recipient_name,
            description: new_payout.description,
            status: PayoutStatus::Pending,
            ledger_transaction_id: None,
            external_payout_id: None,
            external_reference: None,
            error_message: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
            processed_at: None,
            metadata: new_payout.metadata,
        };
        state.payouts.insert(id, payout.clone());
        state
            .payouts_by_key
            .insert(new_payout.idempotency_key, id);
        Ok(payout)
    }

    async fn get_payout(&self, payout_id: Uuid) -> Result<Option<Payout>, EngineError> {
        Ok(self.state.lock().unwrap().payouts.get(&payout_id).cloned())
    }

    async fn get_payout_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<Payout>, EngineError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .payouts_by_key
            .get(idempotency_key)
            .and_then(|id| state.payouts.get(id))
            .cloned())
    }

    async fn start_processing(&self, payout_id: Uuid) -> Result<(Payout, bool), EngineError> {
        let mut state = self.state.lock().unwrap();
        let payout = state
            .payouts
            .get_mut(&payout_id)
            .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        if payout.status != PayoutStatus::Pending {
            return Ok((payout.clone(), false));
        }
        payout.status = PayoutStatus::Processing;
        payout.updated_at = Utc::now();
        Ok((payout.clone(), true))
    }

    async fn attach_ledger_transaction(
        &self,
        payout_id: Uuid,
        transaction_id: &str,
    ) -> Result<Payout, EngineError> {
        let mut state = self.state.lock().unwrap();
        let payout = state
            .payouts
            .get_mut(&payout_id)
            .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        payout.ledger_transaction_id = Some(transaction_id.to_string());
        payout.updated_at = Utc::now();
        Ok(payout.clone())
    }

    async fn attach_external_payout(
        &self,
        payout_id: Uuid,
        external_payout_id: &str,
        external_reference: Option<&str>,
    ) -> Result<Payout, EngineError> {
        let mut state = self.state.lock().unwrap();
        let payout = state
            .payouts
            .get_mut(&payout_id)
            .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        payout.external_payout_id = Some(external_payout_id.to_string());
        payout.external_reference = external_reference.map(|s| s.to_string());
        payout.updated_at = Utc::now();
        Ok(payout.clone())
    }

    async fn complete_payout(&self, payout_id: Uuid) -> Result<Payout, EngineError> {
        let mut state = self.state.lock().unwrap();
        let payout = state
            .payouts
            .get_mut(&payout_id)
            .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        payout.status = PayoutStatus::Completed;
        let now = Utc::now();
        payout.processed_at = Some(now);
        payout.updated_at = now;
        Ok(payout.clone())
    }

    async fn fail_payout(&self, payout_id: Uuid, error_message: &str) -> Result<Payout, EngineError> {
        let mut state = self.state.lock().unwrap();
        let payout = state
            .payouts
            .get_mut(&payout_id)
            .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        payout.status = PayoutStatus::Failed;
        payout.error_message = Some(error_message.to_string());
        payout.retry_count += 1;
        let now = Utc::now();
        payout.processed_at = Some(now);
        payout.updated_at = now;
        Ok(payout.clone())
    }

    async fn cancel_payout(&self, payout_id: Uuid) -> Result<Payout, EngineError> {
        let mut state = self.state.lock().unwrap();
        let payout = state
            .payouts
            .get_mut(&payout_id)
            .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        if payout.ledger_transaction_id.is_some() {
            return Err(EngineError::Conflict(payout.id));
        }
        payout.status = PayoutStatus::Cancelled;
        payout.updated_at = Utc::now();
        Ok(payout.clone())
    }

    async fn increment_retry_count(&self, payout_id: Uuid) -> Result<Payout, EngineError> {
        let mut state = self.state.lock().unwrap();
        let payout = state
            .payouts
            .get_mut(&payout_id)
            .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        payout.retry_count += 1;
        payout.updated_at = Utc::now();
        Ok(payout.clone())
    }

    async fn append_payout_event(
        &self,
        payout_id: Uuid,
        event_type: PayoutEventType,
        event_data: Value,
    ) -> Result<PayoutEvent, EngineError> {
        let mut state = self.state.lock().unwrap();
        let event = PayoutEvent {
            id: Uuid::now_v7(),
            payout_id,
            event_type,
            event_data,
            created_at: Utc::now(),
        };
        state.payout_events.push(event.clone());
        Ok(event)
    }

    async fn get_account_balance(
        &self,
        account_code: &str,
    ) -> Result<Option<AccountBalance>, EngineError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .account_balances
            .get(account_code)
            .cloned())
    }

    async fn upsert_account_balance(&self, balance: AccountBalance) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        let should_write = state
            .account_balances
            .get(&balance.account_code)
            .map(|existing| existing.last_event_sequence < balance.last_event_sequence)
            .unwrap_or(true);
        if should_write {
            state
                .account_balances
                .insert(balance.account_code.clone(), balance);
        }
        Ok(())
    }

    async fn get_payout_summary(
        &self,
        payout_id: Uuid,
    ) -> Result<Option<PayoutSummary>, EngineError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .payout_summaries
            .get(&payout_id)
            .cloned())
    }

    async fn upsert_payout_summary(&self, summary: PayoutSummary) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        let should_write = state
            .payout_summaries
            .get(&summary.payout_id)
            .map(|existing| existing.last_event_sequence < summary.last_event_sequence)
            .unwrap_or(true);
        if should_write {
            state.payout_summaries.insert(summary.payout_id, summary);
        }
        Ok(())
    }

    async fn get_ledger_transaction_summary(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LedgerTransactionSummary>, EngineError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .ledger_transaction_summaries
            .get(transaction_id)
            .cloned())
    }

    async fn upsert_ledger_transaction_summary(
        &self,
        summary: LedgerTransactionSummary,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        let should_write = state
            .ledger_transaction_summaries
            .get(&summary.transaction_id)
            .map(|existing| existing.last_event_sequence < summary.last_event_sequence)
            .unwrap_or(true);
        if should_write {
            state
                .ledger_transaction_summaries
                .insert(summary.transaction_id.clone(), summary);
        }
        Ok(())
    }
}
