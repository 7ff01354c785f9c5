// core/src/store.rs
use sqlx::PgPool;

use crate::error::EngineError;

/// Thin wrapper over a connection pool. `adapters::postgres::PostgresBackend`
/// holds one of these; `init_schema` is idempotent and safe to call on every
/// process start.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, EngineError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn init_schema(&self) -> Result<(), EngineError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_accounts (
                id UUID PRIMARY KEY,
                account_code TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                account_type TEXT NOT NULL CHECK (
                    account_type IN ('ASSET', 'LIABILITY', 'EQUITY', 'REVENUE', 'EXPENSE')
                ),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_transactions (
                id UUID PRIMARY KEY,
                transaction_id TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('PENDING', 'COMPLETED', 'FAILED')),
                metadata JSONB NOT NULL DEFAULT '{}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_entries (
                id UUID PRIMARY KEY,
                transaction_id TEXT NOT NULL REFERENCES ledger_transactions(transaction_id),
                account_code TEXT NOT NULL REFERENCES ledger_accounts(account_code),
                amount NUMERIC(20, 2) NOT NULL,
                entry_type TEXT NOT NULL CHECK (entry_type IN ('DEBIT', 'CREDIT')),
                description TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_ledger_entries_account_code
            ON ledger_entries(account_code, created_at ASC)
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS event_log (
                id UUID PRIMARY KEY,
                event_id TEXT NOT NULL UNIQUE,
                event_type TEXT NOT NULL,
                aggregate_type TEXT NOT NULL,
                aggregate_id TEXT NOT NULL,
                event_data JSONB NOT NULL DEFAULT '{}',
                metadata JSONB NOT NULL DEFAULT '{}',
                sequence_number BIGINT NOT NULL UNIQUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        // Single-row sequence anchor. A real sequence object would work too,
        // but an anchor row locked with `FOR UPDATE` lets us hand back the
        // exact assigned value inside the same transaction that appends the
        // event, with no separate round trip to a sequence.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS event_sequence_anchor (
                id SMALLINT PRIMARY KEY DEFAULT 1,
                next_value BIGINT NOT NULL,
                CHECK (id = 1)
            )
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO event_sequence_anchor (id, next_value)
            VALUES (1, 1)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS payouts (
                id UUID PRIMARY KEY,
                idempotency_key TEXT NOT NULL UNIQUE,
                amount NUMERIC(20, 2) NOT NULL,
                currency TEXT NOT NULL,
                recipient_account TEXT NOT NULL,
                recipient_name TEXT NOT NULL,
                description TEXT NOT NULL,
                status TEXT NOT NULL CHECK (
                    status IN ('PENDING', 'PROCESSING', 'COMPLETED', 'FAILED', 'CANCELLED')
                ),
                ledger_transaction_id TEXT,
                external_payout_id TEXT,
                external_reference TEXT,
                error_message TEXT,
                retry_count INT NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                processed_at TIMESTAMPTZ,
                metadata JSONB NOT NULL DEFAULT '{}'
            )
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS payout_events (
                id UUID PRIMARY KEY,
                payout_id UUID NOT NULL REFERENCES payouts(id),
                event_type TEXT NOT NULL,
                event_data JSONB NOT NULL DEFAULT '{}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS account_balances (
                account_code TEXT PRIMARY KEY REFERENCES ledger_accounts(account_code),
                balance NUMERIC(20, 2) NOT NULL,
                last_updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                last_event_sequence BIGINT NOT NULL
            )
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS payout_summaries (
                payout_id UUID PRIMARY KEY REFERENCES payouts(id),
                idempotency_key TEXT NOT NULL,
                amount NUMERIC(20, 2) NOT NULL,
                status TEXT NOT NULL,
                recipient_name TEXT NOT NULL,
                last_updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                last_event_sequence BIGINT NOT NULL
            )
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_transaction_summaries (
                transaction_id TEXT PRIMARY KEY REFERENCES ledger_transactions(transaction_id),
                description TEXT NOT NULL,
                status TEXT NOT NULL,
                entry_count BIGINT NOT NULL,
                last_updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                last_event_sequence BIGINT NOT NULL
            )
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Claim the next global sequence number inside an already-open
    /// transaction. Must be called before the transaction commits so the
    /// event row and the anchor advance atomically together.
    pub(crate) async fn next_sequence_number(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<i64, EngineError> {
        let row = sqlx::query(
            r#"
            UPDATE event_sequence_anchor
            SET next_value = next_value + 1
            WHERE id = 1
            RETURNING next_value - 1
            "#,
        )
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        use sqlx::Row;
        row.try_get::<i64, _>(0)
            .map_err(|e| EngineError::Storage(e.to_string()))
    }
}
