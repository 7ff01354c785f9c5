// core/tests/ledger_invariants.rs
use std::sync::Arc;

use ledger_engine_core::adapters::memory::MemoryBackend;
use ledger_engine_core::{Amount, Backend, EntryType, EventLog, Ledger, NewEntry};

fn backend() -> Arc<dyn Backend> {
    Arc::new(MemoryBackend::new())
}

async fn seed_accounts(backend: &Arc<dyn Backend>) {
    backend
        .get_or_create_account("CASH_001", "Cash", ledger_engine_core::AccountType::Asset)
        .await
        .unwrap();
    backend
        .get_or_create_account(
            "PAYOUT_LIABILITY_001",
            "Payout Liability",
            ledger_engine_core::AccountType::Liability,
        )
        .await
        .unwrap();
}

/// Invariant 1 + 2: an unbalanced transaction, or one with fewer than two
/// entries, is rejected before anything is written.
#[tokio::test]
async fn unbalanced_transaction_is_rejected() {
    let backend = backend();
    seed_accounts(&backend).await;
    let ledger = Ledger::new(backend.clone());

    let entries = vec![
        NewEntry {
            account_code: "CASH_001".to_string(),
            amount: Amount::parse("10.00").unwrap(),
            entry_type: EntryType::Debit,
            description: "bad".to_string(),
        },
        NewEntry {
            account_code: "PAYOUT_LIABILITY_001".to_string(),
            amount: Amount::parse("5.00").unwrap(),
            entry_type: EntryType::Debit,
            description: "bad".to_string(),
        },
    ];

    let err = ledger
        .post_transaction("tx-bad-1", "unbalanced", entries, serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ledger_engine_core::EngineError::InvariantViolation(_)
    ));
    assert!(ledger.get_transaction("tx-bad-1").await.unwrap().is_none());
}

#[tokio::test]
async fn single_entry_transaction_is_rejected() {
    let backend = backend();
    seed_accounts(&backend).await;
    let ledger = Ledger::new(backend.clone());

    let entries = vec![NewEntry {
        account_code: "CASH_001".to_string(),
        amount: Amount::parse("10.00").unwrap(),
        entry_type: EntryType::Debit,
        description: "lonely entry".to_string(),
    }];

    let err = ledger
        .post_transaction("tx-bad-2", "single entry", entries, serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ledger_engine_core::EngineError::Validation(_)));
}

/// A balanced transaction with three entries is still rejected: the
/// cardinality invariant is exactly two, not "at least two".
#[tokio::test]
async fn three_entry_transaction_is_rejected_even_when_balanced() {
    let backend = backend();
    seed_accounts(&backend).await;
    let ledger = Ledger::new(backend.clone());

    let entries = vec![
        NewEntry {
            account_code: "CASH_001".to_string(),
            amount: Amount::parse("-10.00").unwrap(),
            entry_type: EntryType::Debit,
            description: "cash".to_string(),
        },
        NewEntry {
            account_code: "PAYOUT_LIABILITY_001".to_string(),
            amount: Amount::parse("5.00").unwrap(),
            entry_type: EntryType::Debit,
            description: "liability part one".to_string(),
        },
        NewEntry {
            account_code: "PAYOUT_LIABILITY_001".to_string(),
            amount: Amount::parse("5.00").unwrap(),
            entry_type: EntryType::Debit,
            description: "liability part two".to_string(),
        },
    ];

    let err = ledger
        .post_transaction("tx-bad-3", "three entries", entries, serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ledger_engine_core::EngineError::Validation(_)));
    assert!(ledger.get_transaction("tx-bad-3").await.unwrap().is_none());
}

/// Posting against an account_code that was never created is rejected
/// rather than silently inserting an entry with no backing account.
#[tokio::test]
async fn posting_against_unknown_account_is_rejected() {
    let backend = backend();
    seed_accounts(&backend).await;
    let ledger = Ledger::new(backend.clone());

    let entries = vec![
        NewEntry {
            account_code: "CASH_001".to_string(),
            amount: Amount::parse("-10.00").unwrap(),
            entry_type: EntryType::Debit,
            description: "cash".to_string(),
        },
        NewEntry {
            account_code: "DOES_NOT_EXIST".to_string(),
            amount: Amount::parse("10.00").unwrap(),
            entry_type: EntryType::Debit,
            description: "nowhere".to_string(),
        },
    ];

    let err = ledger
        .post_transaction("tx-bad-4", "unknown account", entries, serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ledger_engine_core::EngineError::UnknownAccount(_)
    ));
    assert!(ledger.get_transaction("tx-bad-4").await.unwrap().is_none());
}

/// The spec's own named per-transaction zero-sum assertion.
#[tokio::test]
async fn verify_balance_asserts_zero_sum_for_a_transaction() {
    let backend = backend();
    seed_accounts(&backend).await;
    let ledger = Ledger::new(backend.clone());

    let entries = vec![
        NewEntry {
            account_code: "PAYOUT_LIABILITY_001".to_string(),
            amount: Amount::parse("12.00").unwrap(),
            entry_type: EntryType::Debit,
            description: "liability".to_string(),
        },
        NewEntry {
            account_code: "CASH_001".to_string(),
            amount: Amount::parse("-12.00").unwrap(),
            entry_type: EntryType::Debit,
            description: "cash".to_string(),
        },
    ];

    ledger
        .post_transaction("tx-ok-verify", "balanced", entries, serde_json::json!({}))
        .await
        .unwrap();

    assert!(ledger.verify_balance("tx-ok-verify").await.unwrap());
}

/// Invariant 4: appending the same event_id twice yields one row and the
/// same return value both times.
#[tokio::test]
async fn event_append_is_idempotent() {
    let backend = backend();
    let event_log = EventLog::new(backend.clone());

    let first = event_log
        .append(
            "evt-1",
            ledger_engine_core::EventType::PayoutCreated,
            "payout",
            "some-id",
            serde_json::json!({ "n": 1 }),
            serde_json::json!({}),
        )
        .await
        .unwrap();

    let second = event_log
        .append(
            "evt-1",
            ledger_engine_core::EventType::PayoutCreated,
            "payout",
            "some-id",
            serde_json::json!({ "n": 2 }), // different payload, ignored on replay
            serde_json::json!({}),
        )
        .await
        .unwrap();

    assert_eq!(first.sequence_number, second.sequence_number);
    assert_eq!(first.event_data, second.event_data);
}

/// Invariant 6: sequence numbers assigned by successive commits strictly
/// increase.
#[tokio::test]
async fn sequence_numbers_are_monotonic() {
    let backend = backend();
    let event_log = EventLog::new(backend.clone());

    let mut last = 0i64;
    for i in 0..10 {
        let event = event_log
            .append(
                &format!("evt-seq-{i}"),
                ledger_engine_core::EventType::AccountBalanceUpdated,
                "account",
                "CASH_001",
                serde_json::json!({}),
                serde_json::json!({}),
            )
            .await
            .unwrap();
        assert!(event.sequence_number > last);
        last = event.sequence_number;
    }
}

/// Balanced entries post cleanly and the transaction is retrievable by id.
#[tokio::test]
async fn balanced_transaction_posts_and_is_retrievable() {
    let backend = backend();
    seed_accounts(&backend).await;
    let ledger = Ledger::new(backend.clone());

    let entries = vec![
        NewEntry {
            account_code: "PAYOUT_LIABILITY_001".to_string(),
            amount: Amount::parse("42.50").unwrap(),
            entry_type: EntryType::Debit,
            description: "liability".to_string(),
        },
        NewEntry {
            account_code: "CASH_001".to_string(),
            amount: Amount::parse("-42.50").unwrap(),
            entry_type: EntryType::Debit,
            description: "cash".to_string(),
        },
    ];

    let transaction = ledger
        .post_transaction("tx-ok-1", "balanced", entries, serde_json::json!({}))
        .await
        .unwrap();

    let fetched = ledger.get_transaction("tx-ok-1").await.unwrap().unwrap();
    assert_eq!(fetched.transaction_id, transaction.transaction_id);

    let entries = ledger.get_entries_for_transaction("tx-ok-1").await.unwrap();
    assert_eq!(entries.len(), 2);
}
