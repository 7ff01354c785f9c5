// core/src/task_runner.rs
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::external::{ExternalPayoutProvider, ExternalPayoutStatus};
use crate::payouts::PayoutEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    ProcessPayout,
    InitiateExternalPayout,
    CompleteExternalPayout,
}

impl JobKind {
    fn base_delay(&self) -> Duration {
        match self {
            Self::ProcessPayout => Duration::from_secs(60),
            Self::InitiateExternalPayout => Duration::from_secs(30),
            Self::CompleteExternalPayout => Duration::from_secs(10),
        }
    }

    fn max_retries(&self) -> u32 {
        match self {
            Self::ProcessPayout => 3,
            Self::InitiateExternalPayout => 5,
            Self::CompleteExternalPayout => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub payout_id: Uuid,
    pub kind: JobKind,
    pub attempt: u32,
    pub not_before: DateTime<Utc>,
}

impl Job {
    pub fn new(payout_id: Uuid, kind: JobKind) -> Self {
        Self {
            id: Uuid::now_v7(),
            payout_id,
            kind,
            attempt: 0,
            not_before: Utc::now(),
        }
    }
}

/// At-least-once delivery: `poll` hands a job to exactly one caller at a
/// time but does not remove it until `ack`. A crashed worker that never
/// acks leaves the job to be redelivered by whatever mechanism calls
/// `poll` next — this in-memory queue relies on `nack_with_backoff`
/// being called explicitly by the runner instead, since there's no
/// visibility-timeout clock here.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: Job) -> Result<(), EngineError>;
    async fn poll(&self) -> Result<Option<Job>, EngineError>;
    async fn ack(&self, job_id: Uuid) -> Result<(), EngineError>;
    async fn nack_with_backoff(&self, job: Job, delay: Duration) -> Result<(), EngineError>;
}

pub struct InMemoryJobQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
        }
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: Job) -> Result<(), EngineError> {
        self.jobs.lock().unwrap().push_back(job);
        Ok(())
    }

    async fn poll(&self) -> Result<Option<Job>, EngineError> {
        let mut jobs = self.jobs.lock().unwrap();
        let now = Utc::now();
        let pos = jobs.iter().position(|j| j.not_before <= now);
        Ok(pos.map(|i| jobs.remove(i).unwrap()))
    }

    async fn ack(&self, _job_id: Uuid) -> Result<(), EngineError> {
        Ok(())
    }

    async fn nack_with_backoff(&self, mut job: Job, delay: Duration) -> Result<(), EngineError> {
        job.attempt += 1;
        job.not_before = Utc::now()
            + chrono::Duration::from_std(delay)
                .map_err(|e| EngineError::Transient(e.to_string()))?;
        self.jobs.lock().unwrap().push_back(job);
        Ok(())
    }
}

/// Pulls jobs off a `JobQueue` and dispatches them to the payout state
/// machine. Each handler is idempotent on its own — re-running
/// `process_payout` for a payout that already has ledger entries just
/// re-attaches the same transaction id, for instance — so at-least-once
/// delivery never double-books a payout.
pub struct TaskRunner {
    queue: Arc<dyn JobQueue>,
    engine: Arc<PayoutEngine>,
    provider: Arc<dyn ExternalPayoutProvider>,
}

impl TaskRunner {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        engine: Arc<PayoutEngine>,
        provider: Arc<dyn ExternalPayoutProvider>,
    ) -> Self {
        Self {
            queue,
            engine,
            provider,
        }
    }

    /// Drain every job currently eligible to run. Returns the number
    /// processed; callers (tests, or the demo server's background loop)
    /// call this in a loop with a sleep between iterations.
    pub async fn run_once(&self) -> Result<usize, EngineError> {
        let mut processed = 0;
        while let Some(job) = self.queue.poll().await? {
            self.dispatch(job).await;
            processed += 1;
        }
        Ok(processed)
    }

    async fn dispatch(&self, job: Job) {
        let result = match job.kind {
            JobKind::ProcessPayout => self.process_payout(job.payout_id).await,
            JobKind::InitiateExternalPayout => self.initiate_external_payout(job.payout_id).await,
            JobKind::CompleteExternalPayout => self.complete_external_payout(job.payout_id).await,
        };

        match result {
            Ok(Some(next_job)) => {
                if let Err(e) = self.queue.ack(job.id).await {
                    warn!(error = %e, "failed to ack job");
                }
                if let Err(e) = self.queue.enqueue(next_job).await {
                    warn!(error = %e, "failed to enqueue follow-up job");
                }
            }
            Ok(None) => {
                if let Err(e) = self.queue.ack(job.id).await {
                    warn!(error = %e, "failed to ack job");
                }
            }
            Err(e) if e.is_retryable() && job.attempt < job.kind.max_retries() => {
                warn!(
                    payout_id = %job.payout_id,
                    kind = ?job.kind,
                    attempt = job.attempt,
                    error = %e,
                    "job failed, scheduling retry"
                );
                if let Err(e) = self.engine.record_retry(job.payout_id).await {
                    warn!(error = %e, "failed to record retry");
                }
                let delay = job.kind.base_delay();
                if let Err(e) = self.queue.nack_with_backoff(job, delay).await {
                    warn!(error = %e, "failed to reschedule job");
                }
            }
            Err(e) => {
                warn!(
                    payout_id = %job.payout_id,
                    kind = ?job.kind,
                    error = %e,
                    "job exhausted retries or failed permanently, failing payout"
                );
                if let Err(fail_err) = self
                    .engine
                    .fail(job.payout_id, &format!("{:?} failed: {e}", job.kind))
                    .await
                {
                    warn!(error = %fail_err, "failed to mark payout as failed");
                }
                if let Err(e) = self.queue.ack(job.id).await {
                    warn!(error = %e, "failed to ack exhausted job");
                }
            }
        }
    }

    /// Returns the next job to enqueue, if any.
    async fn process_payout(&self, payout_id: Uuid) -> Result<Option<Job>, EngineError> {
        self.engine.start_processing(payout_id).await?;
        self.engine.post_ledger_entries(payout_id).await?;
        info!(%payout_id, "posted ledger entries for payout");
        Ok(Some(Job::new(payout_id, JobKind::InitiateExternalPayout)))
    }

    async fn initiate_external_payout(&self, payout_id: Uuid) -> Result<Option<Job>, EngineError> {
        let payout = self
            .engine
            .get(payout_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;

        if payout.external_payout_id.is_some() {
            return Ok(Some(Job::new(payout_id, JobKind::CompleteExternalPayout)));
        }

        let result = self
            .provider
            .initiate(&payout.idempotency_key, payout.amount, &payout.recipient_account)
            .await?;

        self.engine
            .attach_external_payout(
                payout_id,
                &result.external_payout_id,
                result.external_reference.as_deref(),
            )
            .await?;

        Ok(Some(Job::new(payout_id, JobKind::CompleteExternalPayout)))
    }

    async fn complete_external_payout(&self, payout_id: Uuid) -> Result<Option<Job>, EngineError> {
        let payout = self
            .engine
            .get(payout_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("payout {payout_id}")))?;
        let external_payout_id = payout.external_payout_id.ok_or_else(|| {
            EngineError::InvariantViolation(format!(
                "payout {payout_id} has no external_payout_id to check"
            ))
        })?;

        match self.provider.check_status(&external_payout_id).await? {
            ExternalPayoutStatus::Completed => {
                self.engine.complete(payout_id).await?;
                Ok(None)
            }
            ExternalPayoutStatus::Failed => {
                self.engine
                    .fail(payout_id, "external rail reported failure")
                    .await?;
                Ok(None)
            }
            ExternalPayoutStatus::Pending => Err(EngineError::Transient(format!(
                "external payout {external_payout_id} still pending"
            ))),
        }
    }
}
