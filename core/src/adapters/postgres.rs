// core/src/adapters/postgres.rs
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use crate::account::{Account, AccountType};
use crate::backend::Backend;
use crate::error::EngineError;
use crate::event::{Event, EventType};
use crate::ledger_types::{EntryType, LedgerEntry, NewEntry, Transaction, TransactionStatus};
use crate::money::Amount;
use crate::payout_types::{NewPayout, Payout, PayoutEvent, PayoutEventType, PayoutStatus};
use crate::projections::{AccountBalance, LedgerTransactionSummary, PayoutSummary};
use crate::store::PgStore;

fn storage_err<E: std::fmt::Display>(e: E) -> EngineError {
    EngineError::Storage(e.to_string())
}

fn row_to_account(row: &sqlx::postgres::PgRow) -> Result<Account, EngineError> {
    let type_raw: String = row.try_get("account_type").map_err(storage_err)?;
    Ok(Account {
        id: row.try_get("id").map_err(storage_err)?,
        account_code: row.try_get("account_code").map_err(storage_err)?,
        name: row.try_get("name").map_err(storage_err)?,
        account_type: AccountType::parse(&type_raw)
            .ok_or_else(|| EngineError::Storage(format!("unknown account_type {type_raw}")))?,
        created_at: row.try_get("created_at").map_err(storage_err)?,
        updated_at: row.try_get("updated_at").map_err(storage_err)?,
    })
}

fn row_to_transaction(row: &sqlx::postgres::PgRow) -> Result<Transaction, EngineError> {
    let status_raw: String = row.try_get("status").map_err(storage_err)?;
    Ok(Transaction {
        id: row.try_get("id").map_err(storage_err)?,
        transaction_id: row.try_get("transaction_id").map_err(storage_err)?,
        description: row.try_get("description").map_err(storage_err)?,
        status: TransactionStatus::parse(&status_raw)
            .ok_or_else(|| EngineError::Storage(format!("unknown status {status_raw}")))?,
        metadata: row.try_get("metadata").map_err(storage_err)?,
        created_at: row.try_get("created_at").map_err(storage_err)?,
    })
}

fn row_to_entry(row: &sqlx::postgres::PgRow) -> Result<LedgerEntry, EngineError> {
    let entry_type_raw: String = row.try_get("entry_type").map_err(storage_err)?;
    let amount: Decimal = row.try_get("amount").map_err(storage_err)?;
    Ok(LedgerEntry {
        id: row.try_get("id").map_err(storage_err)?,
        transaction_id: row.try_get("transaction_id").map_err(storage_err)?,
        account_code: row.try_get("account_code").map_err(storage_err)?,
        amount: Amount::new(amount)?,
        entry_type: EntryType::parse(&entry_type_raw)
            .ok_or_else(|| EngineError::Storage(format!("unknown entry_type {entry_type_raw}")))?,
        description: row.try_get("description").map_err(storage_err)?,
        created_at: row.try_get("created_at").map_err(storage_err)?,
    })
}

fn row_to_payout(row: &sqlx::postgres::PgRow) -> Result<Payout, EngineError> {
    let status_raw: String = row.try_get("status").map_err(storage_err)?;
    let amount: Decimal = row.try_get("amount").map_err(storage_err)?;
    Ok(Payout {
        id: row.try_get("id").map_err(storage_err)?,
        idempotency_key: row.try_get("idempotency_key").map_err(storage_err)?,
        amount: Amount::new(amount)?,
        currency: row.try_get("currency").map_err(storage_err)?,
        recipient_account: row.try_get("recipient_account").map_err(storage_err)?,
        recipient_name: row.try_get("recipient_name").map_err(storage_err)?,
        description: row.try_get("description").map_err(storage_err)?,
        status: PayoutStatus::parse(&status_raw)
            .ok_or_else(|| EngineError::Storage(format!("unknown payout status {status_raw}")))?,
        ledger_transaction_id: row.try_get("ledger_transaction_id").map_err(storage_err)?,
        external_payout_id: row.try_get("external_payout_id").map_err(storage_err)?,
        external_reference: row.try_get("external_reference").map_err(storage_err)?,
        error_message: row.try_get("error_message").map_err(storage_err)?,
        retry_count: row.try_get("retry_count").map_err(storage_err)?,
        created_at: row.try_get("created_at").map_err(storage_err)?,
        updated_at: row.try_get("updated_at").map_err(storage_err)?,
        processed_at: row.try_get("processed_at").map_err(storage_err)?,
        metadata: row.try_get("metadata").map_err(storage_err)?,
    })
}

pub struct PostgresBackend {
    store: PgStore,
}

impl PostgresBackend {
    pub fn new(store: PgStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    async fn get_or_create_account(
        &self,
        account_code: &str,
        name: &str,
        account_type: AccountType,
    ) -> Result<Account, EngineError> {
        let id = Uuid::now_v7();
        let row = sqlx::query(
            r#"
            INSERT INTO ledger_accounts (id, account_code, name, account_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            ON CONFLICT (account_code) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(account_code)
        .bind(name)
        .bind(account_type.as_str())
        .fetch_optional(self.store.pool())
        .await
        .map_err(storage_err)?;

        match row {
            Some(row) => row_to_account(&row),
            None => self
                .get_account(account_code)
                .await?
                .ok_or_else(|| EngineError::Storage("account vanished after conflict".into())),
        }
    }

    async fn get_account(&self, account_code: &str) -> Result<Option<Account>, EngineError> {
        let row = sqlx::query("SELECT * FROM ledger_accounts WHERE account_code = $1")
            .bind(account_code)
            .fetch_optional(self.store.pool())
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_account).transpose()
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
        let mut tx = self.store.pool().begin().await.map_err(storage_err)?;

        let existing = sqlx::query("SELECT * FROM event_log WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage_err)?;

        if let Some(row) = existing {
            tx.commit().await.map_err(storage_err)?;
            return row_to_event(&row);
        }

        let sequence_number = PgStore::next_sequence_number(&mut tx).await?;
        let id = Uuid::now_v7();

        let row = sqlx::query(
            r#"
            INSERT INTO event_log
                (id, event_id, event_type, aggregate_type, aggregate_id, event_data, metadata, sequence_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(event_id)
        .bind(event_type.as_str())
        .bind(aggregate_type)
        .bind(aggregate_id)
        .bind(&event_data)
        .bind(&metadata)
        .bind(sequence_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;
        row_to_event(&row)
    }

    async fn read_events_after(
        &self,
        sequence_number: i64,
        limit: i64,
    ) -> Result<Vec<Event>, EngineError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM event_log
            WHERE sequence_number > $1
            ORDER BY sequence_number ASC
            LIMIT $2
            "#,
        )
        .bind(sequence_number)
        .bind(limit)
        .fetch_all(self.store.pool())
        .await
        .map_err(storage_err)?;

        rows.iter().map(row_to_event).collect()
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

        let mut tx = self.store.pool().begin().await.map_err(storage_err)?;

        for entry in &entries {
            let exists = sqlx::query("SELECT 1 FROM ledger_accounts WHERE account_code = $1")
                .bind(&entry.account_code)
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage_err)?
                .is_some();
            if !exists {
                return Err(EngineError::UnknownAccount(entry.account_code.clone()));
            }
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO ledger_transactions (id, transaction_id, description, status, metadata, created_at)
            VALUES ($1, $2, $3, 'COMPLETED', $4, NOW())
            ON CONFLICT (transaction_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(transaction_id)
        .bind(description)
        .bind(&metadata)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_err)?;

        let transaction = match inserted {
            None => {
                // Already posted by a previous attempt; return it as-is.
                let row = sqlx::query("SELECT * FROM ledger_transactions WHERE transaction_id = $1")
                    .bind(transaction_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(storage_err)?;
                tx.commit().await.map_err(storage_err)?;
                return row_to_transaction(&row);
            }
            Some(row) => row_to_transaction(&row)?,
        };

        for entry in &entries {
            sqlx::query(
                r#"
                INSERT INTO ledger_entries
                    (id, transaction_id, account_code, amount, entry_type, description, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, NOW())
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(transaction_id)
            .bind(&entry.account_code)
            .bind(entry.amount.inner())
            .bind(entry.entry_type.as_str())
            .bind(&entry.description)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }

        let persisted_sum: Decimal = sqlx::query(
            "SELECT COALESCE(SUM(amount), 0) AS total FROM ledger_entries WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_err)?
        .try_get("total")
        .map_err(storage_err)?;
        if persisted_sum != Decimal::ZERO {
            return Err(EngineError::InvariantViolation(format!(
                "transaction {transaction_id} does not balance after insert: signed sum {persisted_sum} != 0"
            )));
        }

        let sequence_number = PgStore::next_sequence_number(&mut tx).await?;
        sqlx::query(
            r#"
            INSERT INTO event_log
                (id, event_id, event_type, aggregate_type, aggregate_id, event_data, metadata, sequence_number, created_at)
            VALUES ($1, $2, $3, 'ledger_transaction', $4, $5, '{}', $6, NOW())
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(format!("ledger_transaction_created:{transaction_id}"))
        .bind(EventType::LedgerTransactionCreated.as_str())
        .bind(transaction_id)
        .bind(serde_json::json!({ "transaction_id": transaction_id }))
        .bind(sequence_number)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;
        Ok(transaction)
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, EngineError> {
        let row = sqlx::query("SELECT * FROM ledger_transactions WHERE transaction_id = $1")
            .bind(transaction_id)
            .fetch_optional(self.store.pool())
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_transaction).transpose()
    }

    async fn get_entries_for_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        let rows = sqlx::query(
            "SELECT * FROM ledger_entries WHERE transaction_id = $1 ORDER BY created_at ASC",
        )
        .bind(transaction_id)
        .fetch_all(self.store.pool())
        .await
        .map_err(storage_err)?;
        rows.iter().map(row_to_entry).collect()
    }

    async fn get_entries_for_account(
        &self,
        account_code: &str,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        let rows = sqlx::query(
            "SELECT * FROM ledger_entries WHERE account_code = $1 ORDER BY created_at ASC",
        )
        .bind(account_code)
        .fetch_all(self.store.pool())
        .await
        .map_err(storage_err)?;
        rows.iter().map(row_to_entry).collect()
    }

    async fn admit_payout(&self, new_payout: NewPayout) -> Result<Payout, EngineError> {
        let id = Uuid::now_v7();
        let row = sqlx::query(
            r#"
            INSERT INTO payouts
                (id, idempotency_key, amount, currency, recipient_account, recipient_name,
                 description, status, retry_count, created_at, updated_at, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'PENDING', 0, NOW(), NOW(), $8)
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&new_payout.idempotency_key)
        .bind(new_payout.amount.inner())
        .bind(&new_payout.currency)
        .bind(&new_payout.recipient_account)
        .bind(&new_payout.recipient_name)
        .bind(&new_payout.description)
        .bind(&new_payout.metadata)
        .fetch_optional(self.store.pool())
        .await
        .map_err(storage_err)?;

        match row {
            Some(row) => row_to_payout(&row),
            None => self
                .get_payout_by_idempotency_key(&new_payout.idempotency_key)
                .await?
                .ok_or_else(|| EngineError::Storage("payout vanished after conflict".into())),
        }
    }

    async fn get_payout(&self, payout_id: Uuid) -> Result<Option<Payout>, EngineError> {
        let row = sqlx::query("SELECT * FROM payouts WHERE id = $1")
            .bind(payout_id)
            .fetch_optional(self.store.pool())
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_payout).transpose()
    }

    async fn get_payout_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<Payout>, EngineError> {
        let row = sqlx::query("SELECT * FROM payouts WHERE idempotency_key = $1")
            .bind(idempotency_key)
            .fetch_optional(self.store.pool())
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_payout).transpose()
    }

    async fn start_processing(&self, payout_id: Uuid) -> Result<(Payout, bool), EngineError> {
        let mut tx = self.store.pool().begin().await.map_err(storage_err)?;

        let row = sqlx::query("SELECT * FROM payouts WHERE id = $1 FOR UPDATE")
            .bind(payout_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage_err)?
            .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        let current = row_to_payout(&row)?;

        if current.status != PayoutStatus::Pending {
            tx.commit().await.map_err(storage_err)?;
            return Ok((current, false));
        }

        let row = sqlx::query(
            r#"
            UPDATE payouts SET status = 'PROCESSING', updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(payout_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;
        Ok((row_to_payout(&row)?, true))
    }

    async fn attach_ledger_transaction(
        &self,
        payout_id: Uuid,
        transaction_id: &str,
    ) -> Result<Payout, EngineError> {
        let row = sqlx::query(
            r#"
            UPDATE payouts SET ledger_transaction_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(payout_id)
        .bind(transaction_id)
        .fetch_optional(self.store.pool())
        .await
        .map_err(storage_err)?
        .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        row_to_payout(&row)
    }

    async fn attach_external_payout(
        &self,
        payout_id: Uuid,
        external_payout_id: &str,
        external_reference: Option<&str>,
    ) -> Result<Payout, EngineError> {
        let row = sqlx::query(
            r#"
            UPDATE payouts
            SET external_payout_id = $2, external_reference = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(payout_id)
        .bind(external_payout_id)
        .bind(external_reference)
        .fetch_optional(self.store.pool())
        .await
        .map_err(storage_err)?
        .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        row_to_payout(&row)
    }

    async fn complete_payout(&self, payout_id: Uuid) -> Result<Payout, EngineError> {
        let row = sqlx::query(
            r#"
            UPDATE payouts
            SET status = 'COMPLETED', processed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(payout_id)
        .fetch_optional(self.store.pool())
        .await
        .map_err(storage_err)?
        .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        row_to_payout(&row)
    }

    async fn fail_payout(&self, payout_id: Uuid, error_message: &str) -> Result<Payout, EngineError> {
        let row = sqlx::query(
            r#"
            UPDATE payouts
            SET status = 'FAILED', error_message = $2, retry_count = retry_count + 1,
                processed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(payout_id)
        .bind(error_message)
        .fetch_optional(self.store.pool())
        .await
        .map_err(storage_err)?
        .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        row_to_payout(&row)
    }

    async fn cancel_payout(&self, payout_id: Uuid) -> Result<Payout, EngineError> {
        let row = sqlx::query(
            r#"
            UPDATE payouts
            SET status = 'CANCELLED', updated_at = NOW()
            WHERE id = $1 AND ledger_transaction_id IS NULL
            RETURNING *
            "#,
        )
        .bind(payout_id)
        .fetch_optional(self.store.pool())
        .await
        .map_err(storage_err)?;

        match row {
            Some(row) => row_to_payout(&row),
            None => {
                let existing = sqlx::query("SELECT * FROM payouts WHERE id = $1")
                    .bind(payout_id)
                    .fetch_optional(self.store.pool())
                    .await
                    .map_err(storage_err)?
                    .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
                let payout = row_to_payout(&existing)?;
                Err(EngineError::Conflict(payout.id))
            }
        }
    }

    async fn increment_retry_count(&self, payout_id: Uuid) -> Result<Payout, EngineError> {
        let row = sqlx::query(
            r#"
            UPDATE payouts SET retry_count = retry_count + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(payout_id)
        .fetch_optional(self.store.pool())
        .await
        .map_err(storage_err)?
        .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        row_to_payout(&row)
    }

    async fn append_payout_event(
        &self,
        payout_id: Uuid,
        event_type: PayoutEventType,
        event_data: Value,
    ) -> Result<PayoutEvent, EngineError> {
        let row = sqlx::query(
            r#"
            INSERT INTO payout_events (id, payout_id, event_type, event_data, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(payout_id)
        .bind(event_type.as_str())
        .bind(&event_data)
        .fetch_one(self.store.pool())
        .await
        .map_err(storage_err)?;

        Ok(PayoutEvent {
            id: row.try_get("id").map_err(storage_err)?,
            payout_id: row.try_get("payout_id").map_err(storage_err)?,
            event_type,
            event_data: row.try_get("event_data").map_err(storage_err)?,
            created_at: row.try_get("created_at").map_err(storage_err)?,
        })
    }

    async fn get_account_balance(
        &self,
        account_code: &str,
    ) -> Result<Option<AccountBalance>, EngineError> {
        let row = sqlx::query("SELECT * FROM account_balances WHERE account_code = $1")
            .bind(account_code)
            .fetch_optional(self.store.pool())
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_account_balance).transpose()
    }

    async fn upsert_account_balance(&self, balance: AccountBalance) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO account_balances (account_code, balance, last_updated_at, last_event_sequence)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (account_code) DO UPDATE
            SET balance = $2, last_updated_at = $3, last_event_sequence = $4
            WHERE account_balances.last_event_sequence < $4
            "#,
        )
        .bind(&balance.account_code)
        .bind(balance.balance.inner())
        .bind(balance.last_updated_at)
        .bind(balance.last_event_sequence)
        .execute(self.store.pool())
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_payout_summary(
        &self,
        payout_id: Uuid,
    ) -> Result<Option<PayoutSummary>, EngineError> {
        let row = sqlx::query("SELECT * FROM payout_summaries WHERE payout_id = $1")
            .bind(payout_id)
            .fetch_optional(self.store.pool())
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_payout_summary).transpose()
    }

    async fn upsert_payout_summary(&self, summary: PayoutSummary) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO payout_summaries
                (payout_id, idempotency_key, amount, status, recipient_name, last_updated_at, last_event_sequence)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (payout_id) DO UPDATE
            SET status = $4, amount = $3, recipient_name = $5, last_updated_at = $6, last_event_sequence = $7
            WHERE payout_summaries.last_event_sequence < $7
            "#,
        )
        .bind(summary.payout_id)
        .bind(&summary.idempotency_key)
        .bind(summary.amount.inner())
        .bind(summary.status.as_str())
        .bind(&summary.recipient_name)
        .bind(summary.last_updated_at)
        .bind(summary.last_event_sequence)
        .execute(self.store.pool())
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_ledger_transaction_summary(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LedgerTransactionSummary>, EngineError> {
        let row = sqlx::query("SELECT * FROM ledger_transaction_summaries WHERE transaction_id = $1")
            .bind(transaction_id)
            .fetch_optional(self.store.pool())
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_transaction_summary).transpose()
    }

    async fn upsert_ledger_transaction_summary(
        &self,
        summary: LedgerTransactionSummary,
    ) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_transaction_summaries
                (transaction_id, description, status, entry_count, last_updated_at, last_event_sequence)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (transaction_id) DO UPDATE
            SET status = $3, entry_count = $4, last_updated_at = $5, last_event_sequence = $6
            WHERE ledger_transaction_summaries.last_event_sequence < $6
            "#,
        )
        .bind(&summary.transaction_id)
        .bind(&summary.description)
        .bind(summary.status.as_str())
        .bind(summary.entry_count)
        .bind(summary.last_updated_at)
        .bind(summary.last_event_sequence)
        .execute(self.store.pool())
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<Event, EngineError> {
    let type_raw: String = row.try_get("event_type").map_err(storage_err)?;
    Ok(Event {
        id: row.try_get("id").map_err(storage_err)?,
        event_id: row.try_get("event_id").map_err(storage_err)?,
        event_type: EventType::parse(&type_raw)
            .ok_or_else(|| EngineError::Storage(format!("unknown event_type {type_raw}")))?,
        aggregate_type: row.try_get("aggregate_type").map_err(storage_err)?,
        aggregate_id: row.try_get("aggregate_id").map_err(storage_err)?,
        event_data: row.try_get("event_data").map_err(storage_err)?,
        metadata: row.try_get("metadata").map_err(storage_err)?,
        sequence_number: row.try_get("sequence_number").map_err(storage_err)?,
        created_at: row.try_get("created_at").map_err(storage_err)?,
    })
}

fn row_to_account_balance(row: &sqlx::postgres::PgRow) -> Result<AccountBalance, EngineError> {
    let balance: Decimal = row.try_get("balance").map_err(storage_err)?;
    Ok(AccountBalance {
        account_code: row.try_get("account_code").map_err(storage_err)?,
        balance: Amount::new(balance)?,
        last_updated_at: row.try_get("last_updated_at").map_err(storage_err)?,
        last_event_sequence: row.try_get("last_event_sequence").map_err(storage_err)?,
    })
}

fn row_to_payout_summary(row: &sqlx::postgres::PgRow) -> Result<PayoutSummary, EngineError> {
    let status_raw: String = row.try_get("status").map_err(storage_err)?;
    let amount: Decimal = row.try_get("amount").map_err(storage_err)?;
    Ok(PayoutSummary {
        payout_id: row.try_get("payout_id").map_err(storage_err)?,
        idempotency_key: row.try_get("idempotency_key").map_err(storage_err)?,
        amount: Amount::new(amount)?,
        status: PayoutStatus::parse(&status_raw)
            .ok_or_else(|| EngineError::Storage(format!("unknown payout status {status_raw}")))?,
        recipient_name: row.try_get("recipient_name").map_err(storage_err)?,
        last_updated_at: row.try_get("last_updated_at").map_err(storage_err)?,
        last_event_sequence: row.try_get("last_event_sequence").map_err(storage_err)?,
    })
}

fn row_to_transaction_summary(
    row: &sqlx::postgres::PgRow,
) -> Result<LedgerTransactionSummary, EngineError> {
    let status_raw: String = row.try_get("status").map_err(storage_err)?;
    Ok(LedgerTransactionSummary {
        transaction_id: row.try_get("transaction_id").map_err(storage_err)?,
        description: row.try_get("description").map_err(storage_err)?,
        status: TransactionStatus::parse(&status_raw)
            .ok_or_else(|| EngineError::Storage(format!("unknown status {status_raw}")))?,
        entry_count: row.try_get("entry_count").map_err(storage_err)?,
        last_updated_at: row.try_get("last_updated_at").map_err(storage_err)?,
        last_event_sequence: row.try_get("last_event_sequence").map_err(storage_err)?,
    })
}
