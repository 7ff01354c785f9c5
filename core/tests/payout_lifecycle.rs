// core/tests/payout_lifecycle.rs
use std::sync::Arc;

use ledger_engine_core::adapters::memory::MemoryBackend;
use ledger_engine_core::external::SimulatedPayoutProvider;
use ledger_engine_core::task_runner::{InMemoryJobQueue, Job, JobKind, JobQueue, TaskRunner};
use ledger_engine_core::{Amount, Backend, EventLog, Ledger, NewPayout, PayoutEngine, PayoutStatus, Projector};

struct Harness {
    backend: Arc<dyn Backend>,
    engine: Arc<PayoutEngine>,
    queue: Arc<InMemoryJobQueue>,
    runner: TaskRunner,
}

fn setup() -> Harness {
    let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
    let event_log = Arc::new(EventLog::new(backend.clone()));
    let ledger = Arc::new(Ledger::new(backend.clone()));
    let projector = Arc::new(Projector::new(backend.clone()));
    let engine = Arc::new(PayoutEngine::new(
        backend.clone(),
        event_log,
        ledger,
        projector,
    ));
    let queue: Arc<InMemoryJobQueue> = Arc::new(InMemoryJobQueue::new());
    let provider = Arc::new(SimulatedPayoutProvider::new());
    let runner = TaskRunner::new(queue.clone(), engine.clone(), provider);

    Harness {
        backend,
        engine,
        queue,
        runner,
    }
}

fn new_payout(key: &str, amount: &str, recipient: &str) -> NewPayout {
    NewPayout {
        idempotency_key: key.to_string(),
        amount: Amount::parse(amount).unwrap(),
        currency: "USD".to_string(),
        recipient_account: recipient.to_string(),
        recipient_name: "Jane Creator".to_string(),
        description: "creator payout".to_string(),
        metadata: serde_json::json!({}),
    }
}

/// S1: a payout moves through the whole happy path and the cash /
/// liability accounts end up with the signed balances double-entry
/// bookkeeping requires — both negative, summing with the payout amount
/// to zero.
#[tokio::test]
async fn happy_path_payout_moves_cash_and_liability_in_lockstep() {
    let h = setup();

    let payout = h.engine.admit(new_payout("key-1", "100.00", "acct-1")).await.unwrap();
    assert_eq!(payout.status, PayoutStatus::Pending);

    h.queue
        .enqueue(Job::new(payout.id, JobKind::ProcessPayout))
        .await
        .unwrap();

    // process_payout -> initiate_external_payout -> complete_external_payout
    for _ in 0..3 {
        h.runner.run_once().await.unwrap();
    }

    let final_payout = h.engine.get(payout.id).await.unwrap().unwrap();
    assert_eq!(final_payout.status, PayoutStatus::Completed);
    assert!(final_payout.ledger_transaction_id.is_some());
    assert!(final_payout.external_payout_id.is_some());

    let ledger = Ledger::new(h.backend.clone());
    let cash_balance = ledger.account_balance_from_entries("CASH_001").await.unwrap();
    let liability_balance = ledger
        .account_balance_from_entries("PAYOUT_LIABILITY_001")
        .await
        .unwrap();

    assert_eq!(cash_balance, Amount::parse("-100.00").unwrap());
    assert_eq!(liability_balance, Amount::parse("-100.00").unwrap());

    assert!(ledger
        .verify_balance(&final_payout.ledger_transaction_id.clone().unwrap())
        .await
        .unwrap());
}

/// S2: admitting the same idempotency key twice returns the original
/// payout and never creates a second one.
#[tokio::test]
async fn duplicate_admission_is_idempotent() {
    let h = setup();

    let first = h.engine.admit(new_payout("key-dup", "50.00", "acct-2")).await.unwrap();
    let second = h.engine.admit(new_payout("key-dup", "50.00", "acct-2")).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at);
}

/// A blank currency defaults to USD rather than being stored as-is.
#[tokio::test]
async fn blank_currency_defaults_to_usd() {
    let h = setup();
    let mut request = new_payout("key-currency-default", "10.00", "acct-8");
    request.currency = "".to_string();

    let payout = h.engine.admit(request).await.unwrap();
    assert_eq!(payout.currency, "USD");
}

/// A currency that isn't a 3-letter alphabetic code is rejected.
#[tokio::test]
async fn malformed_currency_is_rejected() {
    let h = setup();
    let mut request = new_payout("key-currency-bad", "10.00", "acct-9");
    request.currency = "US1".to_string();

    let err = h.engine.admit(request).await.unwrap_err();
    assert!(matches!(err, ledger_engine_core::EngineError::Validation(_)));
}

/// S3: admitting a non-positive amount is rejected before it ever
/// reaches storage.
#[tokio::test]
async fn zero_amount_payout_is_rejected() {
    let h = setup();
    let err = h
        .engine
        .admit(new_payout("key-zero", "0.00", "acct-3"))
        .await
        .unwrap_err();
    assert!(matches!(err, ledger_engine_core::EngineError::Validation(_)));
}

/// S4: re-running `post_ledger_entries` for a payout that already has a
/// transaction posted returns the same transaction rather than
/// double-booking the entries — the worker crash-and-retry case.
#[tokio::test]
async fn reposting_ledger_entries_is_idempotent() {
    let h = setup();
    let payout = h.engine.admit(new_payout("key-4", "75.00", "acct-4")).await.unwrap();
    h.engine.start_processing(payout.id).await.unwrap();

    let first = h.engine.post_ledger_entries(payout.id).await.unwrap();
    let second = h.engine.post_ledger_entries(payout.id).await.unwrap();

    assert_eq!(first.ledger_transaction_id, second.ledger_transaction_id);

    let ledger = Ledger::new(h.backend.clone());
    let transaction_id = first.ledger_transaction_id.unwrap();
    let entries = ledger.get_entries_for_transaction(&transaction_id).await.unwrap();
    assert_eq!(entries.len(), 2);
}

/// A `JobQueue` that ignores `not_before` entirely. The production queue
/// schedules retries against wall-clock time, which a test has no cheap
/// way to fast-forward; swapping it for a queue that redelivers
/// immediately lets the retry-exhaustion path be exercised without
/// actually sleeping through the backoff windows.
struct ImmediateJobQueue {
    jobs: std::sync::Mutex<std::collections::VecDeque<Job>>,
}

impl ImmediateJobQueue {
    fn new() -> Self {
        Self {
            jobs: std::sync::Mutex::new(std::collections::VecDeque::new()),
        }
    }
}

#[async_trait::async_trait]
impl JobQueue for ImmediateJobQueue {
    async fn enqueue(&self, job: Job) -> Result<(), ledger_engine_core::EngineError> {
        self.jobs.lock().unwrap().push_back(job);
        Ok(())
    }

    async fn poll(&self) -> Result<Option<Job>, ledger_engine_core::EngineError> {
        Ok(self.jobs.lock().unwrap().pop_front())
    }

    async fn ack(&self, _job_id: uuid::Uuid) -> Result<(), ledger_engine_core::EngineError> {
        Ok(())
    }

    async fn nack_with_backoff(
        &self,
        mut job: Job,
        _delay: std::time::Duration,
    ) -> Result<(), ledger_engine_core::EngineError> {
        job.attempt += 1;
        self.jobs.lock().unwrap().push_back(job);
        Ok(())
    }
}

/// S5: a rail that rejects the payout (simulated via a `FAIL`-suffixed
/// recipient account) eventually lands the payout in FAILED after
/// exhausting the initiate-phase retry budget, instead of retrying
/// forever.
#[tokio::test]
async fn rail_rejection_fails_the_payout_after_retries_exhausted() {
    let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
    let event_log = Arc::new(EventLog::new(backend.clone()));
    let ledger = Arc::new(Ledger::new(backend.clone()));
    let projector = Arc::new(Projector::new(backend.clone()));
    let engine = Arc::new(PayoutEngine::new(backend.clone(), event_log, ledger, projector));
    let queue: Arc<ImmediateJobQueue> = Arc::new(ImmediateJobQueue::new());
    let provider = Arc::new(SimulatedPayoutProvider::new());
    let runner = TaskRunner::new(queue.clone(), engine.clone(), provider);

    let payout = engine
        .admit(new_payout("key-5", "20.00", "acct-FAIL"))
        .await
        .unwrap();

    queue
        .enqueue(Job::new(payout.id, JobKind::ProcessPayout))
        .await
        .unwrap();

    // process_payout once, then initiate_external_payout retries up to
    // its max (5) before the runner gives up and fails the payout.
    for _ in 0..8 {
        runner.run_once().await.unwrap();
    }

    let final_payout = engine.get(payout.id).await.unwrap().unwrap();
    assert_eq!(final_payout.status, PayoutStatus::Failed);
    assert!(final_payout.error_message.is_some());
}

/// S6: starting processing twice only emits the transition once — the
/// second call is a no-op that returns the already-PROCESSING payout.
#[tokio::test]
async fn start_processing_twice_is_a_noop_on_the_second_call() {
    let h = setup();
    let payout = h.engine.admit(new_payout("key-6", "10.00", "acct-6")).await.unwrap();

    let first = h.engine.start_processing(payout.id).await.unwrap();
    let second = h.engine.start_processing(payout.id).await.unwrap();

    assert_eq!(first.status, PayoutStatus::Processing);
    assert_eq!(second.status, PayoutStatus::Processing);
    assert_eq!(first.updated_at, second.updated_at);
}

/// The account_balances read model must agree with a from-scratch
/// replay of the entries at all times.
#[tokio::test]
async fn projection_matches_rebuild_from_entries() {
    let h = setup();
    let payout = h.engine.admit(new_payout("key-7", "30.00", "acct-7")).await.unwrap();
    h.engine.start_processing(payout.id).await.unwrap();
    h.engine.post_ledger_entries(payout.id).await.unwrap();

    let projector = Projector::new(h.backend.clone());
    let projected = projector
        .get_account_balance("CASH_001")
        .await
        .unwrap()
        .unwrap();

    let rebuilt = projector
        .rebuild_account_balance("CASH_001", projected.last_event_sequence)
        .await
        .unwrap();

    assert_eq!(projected.balance, rebuilt.balance);
}
