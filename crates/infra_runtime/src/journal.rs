//! Event journal
//!
//! Every event a process handles is appended here, with its logical time,
//! before the process steps. Replaying the journal through
//! [`BillingPeriodProcess::replay`](domain_billing::BillingPeriodProcess::replay)
//! rebuilds the process state after a restart.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use domain_billing::{BillingPeriodInput, ProcessKey, RecordedEvent};

use crate::error::RuntimeError;

/// Everything needed to rebuild one process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub input: BillingPeriodInput,
    pub events: Vec<RecordedEvent>,
}

/// Durable record of process inputs and handled events
#[async_trait]
pub trait EventJournal: Send + Sync {
    /// Records the start of a process, discarding any earlier history under the same key
    async fn begin(&self, input: &BillingPeriodInput) -> Result<(), RuntimeError>;

    /// Appends a handled event
    async fn append(&self, key: &ProcessKey, event: RecordedEvent) -> Result<(), RuntimeError>;

    /// Loads the input and events of a process
    async fn load(&self, key: &ProcessKey) -> Result<JournalEntry, RuntimeError>;

    /// Keys of every journaled process
    async fn keys(&self) -> Vec<ProcessKey>;

    /// Drops the history of a process that will not be recovered again
    async fn forget(&self, key: &ProcessKey);
}

/// Journal held in memory
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    entries: RwLock<HashMap<ProcessKey, JournalEntry>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventJournal for InMemoryJournal {
    async fn begin(&self, input: &BillingPeriodInput) -> Result<(), RuntimeError> {
        let entry = JournalEntry {
            input: input.clone(),
            events: Vec::new(),
        };
        self.entries.write().await.insert(input.key(), entry);
        Ok(())
    }

    async fn append(&self, key: &ProcessKey, event: RecordedEvent) -> Result<(), RuntimeError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| RuntimeError::HistoryNotFound(key.clone()))?;
        entry.events.push(event);
        Ok(())
    }

    async fn load(&self, key: &ProcessKey) -> Result<JournalEntry, RuntimeError> {
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| RuntimeError::HistoryNotFound(key.clone()))
    }

    async fn keys(&self) -> Vec<ProcessKey> {
        let mut keys: Vec<ProcessKey> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    async fn forget(&self, key: &ProcessKey) {
        self.entries.write().await.remove(key);
    }
}
