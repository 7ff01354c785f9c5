// core/src/bootstrap.rs
use std::sync::Arc;

use tracing::info;

use crate::account::AccountType;
use crate::backend::Backend;
use crate::error::EngineError;
use crate::payouts::engine::{CASH_ACCOUNT_CODE, PAYOUT_LIABILITY_ACCOUNT_CODE};

/// Idempotently seed the two well-known accounts every deployment needs.
/// Safe to call on every process start: `get_or_create_account` is a
/// no-op once the row exists.
pub async fn seed_accounts(backend: &Arc<dyn Backend>) -> Result<(), EngineError> {
    backend
        .get_or_create_account(CASH_ACCOUNT_CODE, "Cash", AccountType::Asset)
        .await?;
    backend
        .get_or_create_account(
            PAYOUT_LIABILITY_ACCOUNT_CODE,
            "Payout Liability",
            AccountType::Liability,
        )
        .await?;
    info!("seeded ledger accounts");
    Ok(())
}
