// core/src/lib.rs
pub mod account;
pub mod adapters;
pub mod backend;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod event;
pub mod event_log;
pub mod external;
pub mod ledger;
pub mod ledger_types;
pub mod money;
pub mod payout_types;
pub mod payouts;
pub mod projections;
pub mod projector;
pub mod store;
pub mod task_runner;

pub use account::{Account, AccountType};
pub use backend::Backend;
pub use error::EngineError;
pub use event::{Event, EventType};
pub use event_log::EventLog;
pub use ledger::Ledger;
pub use ledger_types::{EntryType, LedgerEntry, NewEntry, Transaction, TransactionStatus};
pub use money::Amount;
pub use payout_types::{NewPayout, Payout, PayoutEvent, PayoutEventType, PayoutStatus};
pub use payouts::PayoutEngine;
pub use projections::{AccountBalance, LedgerTransactionSummary, PayoutSummary};
pub use projector::Projector;
