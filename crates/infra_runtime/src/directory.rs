//! Process directory
//!
//! Maps process keys to running processes. The directory is an ordinary
//! value owned by the runtime and shared through an `Arc`; entries are added
//! when a period starts and removed explicitly once the caller is done with
//! the period.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, info};

use core_kernel::CustomerId;
use domain_billing::ProcessKey;

use crate::error::RuntimeError;
use crate::host::ProcessHandle;

/// Directory of hosted billing period processes
#[derive(Debug, Default)]
pub struct ProcessDirectory {
    entries: RwLock<HashMap<ProcessKey, ProcessHandle>>,
}

impl ProcessDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails if the customer's latest period is still Active
    pub async fn ensure_available(&self, key: &ProcessKey) -> Result<(), RuntimeError> {
        let entries = self.entries.read().await;
        Self::check_available(&entries, key)
    }

    /// Registers a process
    ///
    /// A Closed process under the same key is replaced. The check and the
    /// insert happen under one write lock.
    pub async fn register(&self, handle: ProcessHandle) -> Result<(), RuntimeError> {
        let mut entries = self.entries.write().await;
        Self::check_available(&entries, handle.key())?;
        info!(key = %handle.key(), "Billing period registered");
        entries.insert(handle.key().clone(), handle);
        Ok(())
    }

    pub async fn get(&self, key: &ProcessKey) -> Option<ProcessHandle> {
        self.entries.read().await.get(key).cloned()
    }

    /// The most recently started process of a customer
    pub async fn find_for_customer(&self, customer_id: &CustomerId) -> Option<ProcessHandle> {
        let entries = self.entries.read().await;
        Self::latest(&entries, customer_id).cloned()
    }

    pub async fn remove(&self, key: &ProcessKey) -> Option<ProcessHandle> {
        let removed = self.entries.write().await.remove(key);
        if removed.is_some() {
            debug!(key = %key, "Billing period removed from directory");
        }
        removed
    }

    /// Removes the entry for `key` only if it still belongs to `instance`
    ///
    /// A process recovered or restarted under the same key in the meantime
    /// is left alone.
    pub async fn remove_instance(&self, key: &ProcessKey, instance: u64) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(handle) if handle.instance() == instance => {
                entries.remove(key);
                debug!(key = %key, "Stopped billing period removed from directory");
                true
            }
            _ => false,
        }
    }

    /// Drops every other entry of the customer that is no longer active,
    /// returning the evicted keys
    pub async fn evict_inactive(&self, customer_id: &CustomerId, keep: &ProcessKey) -> Vec<ProcessKey> {
        let mut entries = self.entries.write().await;
        let stale: Vec<ProcessKey> = entries
            .iter()
            .filter(|(key, handle)| {
                &key.customer_id == customer_id && *key != keep && !handle.is_active()
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.remove(key);
            debug!(key = %key, "Inactive billing period evicted");
        }
        stale
    }

    /// Removes the customer's most recent process
    pub async fn remove_customer(&self, customer_id: &CustomerId) -> Option<ProcessHandle> {
        let mut entries = self.entries.write().await;
        let key = Self::latest(&entries, customer_id)?.key().clone();
        debug!(key = %key, "Billing period removed from directory");
        entries.remove(&key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn latest<'a>(
        entries: &'a HashMap<ProcessKey, ProcessHandle>,
        customer_id: &CustomerId,
    ) -> Option<&'a ProcessHandle> {
        entries
            .iter()
            .filter(|(key, _)| &key.customer_id == customer_id)
            .max_by_key(|(key, _)| key.period_start)
            .map(|(_, handle)| handle)
    }

    fn check_available(
        entries: &HashMap<ProcessKey, ProcessHandle>,
        key: &ProcessKey,
    ) -> Result<(), RuntimeError> {
        if let Some(current) = Self::latest(entries, &key.customer_id) {
            if current.is_active() {
                return Err(RuntimeError::AlreadyActive(current.key().clone()));
            }
        }
        if let Some(existing) = entries.get(key) {
            if existing.is_active() {
                return Err(RuntimeError::AlreadyActive(key.clone()));
            }
        }
        Ok(())
    }
}
