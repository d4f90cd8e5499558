//! Billing Period Runtime
//!
//! In-process host for billing period processes. It plays the part of a
//! durable-execution runtime for the billing domain:
//!
//! - one tokio task per period, handling one event at a time
//! - signals and queries on a single ordered channel
//! - a deadline timer per period, cancelled by an explicit close
//! - an event journal and recovery by replay
//! - an explicit [`ProcessDirectory`] instead of ambient global state
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_runtime::{BillingRuntime, RuntimeConfig};
//!
//! let runtime = BillingRuntime::new(RuntimeConfig::default());
//! let handle = runtime.start(input).await?;
//! handle.signal(BillingSignal::CreateBill(create)).await?;
//! let bills = handle.query(BillingQuery::ListBills { status: None }).await?;
//! ```

pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod host;
pub mod journal;
pub mod runtime;

pub use clock::TokioClock;
pub use config::RuntimeConfig;
pub use directory::ProcessDirectory;
pub use error::RuntimeError;
pub use host::ProcessHandle;
pub use journal::{EventJournal, InMemoryJournal, JournalEntry};
pub use runtime::BillingRuntime;
