// core/src/external.rs
use async_trait::async_trait;

use crate::error::EngineError;
use crate::money::Amount;

/// Outcome of asking the external payment rail to send money.
#[derive(Debug, Clone)]
pub struct ExternalPayoutResult {
    pub external_payout_id: String,
    pub external_reference: Option<String>,
}

/// The boundary to whatever actually moves money outside this system —
/// a bank transfer API, a card network, a crypto rail. Implementations
/// must be safe to call twice with the same `idempotency_key`: the real
/// rail is expected to de-duplicate on it the same way this engine does.
#[async_trait]
pub trait ExternalPayoutProvider: Send + Sync {
    async fn initiate(
        &self,
        idempotency_key: &str,
        amount: Amount,
        recipient_account: &str,
    ) -> Result<ExternalPayoutResult, EngineError>;

    async fn check_status(&self, external_payout_id: &str) -> Result<ExternalPayoutStatus, EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalPayoutStatus {
    Pending,
    Completed,
    Failed,
}

/// Deterministic in-process stand-in for the real payment rail, used in
/// tests and the demo server. Recipient accounts ending in `FAIL` are
/// treated as a rail-side rejection so failure handling has something to
/// exercise without a flaky external dependency.
pub struct SimulatedPayoutProvider;

impl SimulatedPayoutProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SimulatedPayoutProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExternalPayoutProvider for SimulatedPayoutProvider {
    async fn initiate(
        &self,
        idempotency_key: &str,
        _amount: Amount,
        recipient_account: &str,
    ) -> Result<ExternalPayoutResult, EngineError> {
        if recipient_account.ends_with("FAIL") {
            return Err(EngineError::Transient(format!(
                "simulated rail rejected payout for {recipient_account}"
            )));
        }
        Ok(ExternalPayoutResult {
            external_payout_id: format!("sim_{idempotency_key}"),
            external_reference: Some(format!("ref_{idempotency_key}")),
        })
    }

    async fn check_status(&self, _external_payout_id: &str) -> Result<ExternalPayoutStatus, EngineError> {
        Ok(ExternalPayoutStatus::Completed)
    }
}
