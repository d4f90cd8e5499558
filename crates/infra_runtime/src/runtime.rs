//! Billing runtime
//!
//! [`BillingRuntime`] is the process-runtime adapter behind
//! [`BillingPeriodPort`]: it validates start requests, spawns one host task per
//! period, journals events and routes customer calls through the
//! [`ProcessDirectory`].
//!
//! Every host task is watched by a small supervisor. A task that dies
//! without closing its period is dropped from the directory so the customer
//! can start again. Inactive periods are evicted, together with their
//! journal history, when the customer starts the next one.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use core_kernel::{Clock, CustomerId, PortError};
use domain_billing::{
    BillingPeriodInput, BillingPeriodPort, BillingPeriodProcess, BillingQuery, BillingRules,
    BillingSignal, PeriodSummary, ProcessKey, QueryResponse,
};

use crate::clock::TokioClock;
use crate::config::RuntimeConfig;
use crate::directory::ProcessDirectory;
use crate::error::RuntimeError;
use crate::host::{spawn_process, HostContext, ProcessHandle};
use crate::journal::{EventJournal, InMemoryJournal};

/// Hosts billing period processes in the current tokio runtime
pub struct BillingRuntime {
    config: RuntimeConfig,
    directory: Arc<ProcessDirectory>,
    journal: Arc<dyn EventJournal>,
    clock: Arc<dyn Clock>,
    rules: BillingRules,
}

impl BillingRuntime {
    /// Creates a runtime with an in-memory journal and a tokio-driven clock
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            directory: Arc::new(ProcessDirectory::new()),
            journal: Arc::new(InMemoryJournal::new()),
            clock: Arc::new(TokioClock::new()),
            rules: BillingRules::default(),
        }
    }

    pub fn with_journal(mut self, journal: Arc<dyn EventJournal>) -> Self {
        self.journal = journal;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_rules(mut self, rules: BillingRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_directory(mut self, directory: Arc<ProcessDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn directory(&self) -> &Arc<ProcessDirectory> {
        &self.directory
    }

    pub fn journal(&self) -> &Arc<dyn EventJournal> {
        &self.journal
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Starts and registers a new process
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn start(&self, input: BillingPeriodInput) -> Result<ProcessHandle, RuntimeError> {
        let process = BillingPeriodProcess::start(&input)?.with_rules(self.rules.clone());
        self.directory.ensure_available(&process.key()).await?;
        self.journal.begin(&input).await?;

        let (handle, task) = spawn_process(process, 1, self.host_context());
        self.directory.register(handle.clone()).await?;
        self.supervise(&handle, task);

        let key = handle.key();
        for stale in self.directory.evict_inactive(&key.customer_id, key).await {
            self.journal.forget(&stale).await;
        }
        Ok(handle)
    }

    /// Rebuilds a process from the journal and registers it
    ///
    /// A deadline that passed while the process was down fires as soon as
    /// the recovered task starts.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn recover(&self, key: &ProcessKey) -> Result<ProcessHandle, RuntimeError> {
        let entry = self.journal.load(key).await?;
        let process =
            BillingPeriodProcess::replay(&entry.input, self.rules.clone(), &entry.events)?;
        let next_sequence = entry.events.len() as u64 + 1;
        info!(events = entry.events.len(), status = ?process.period().status(), "Billing period recovered");

        self.directory.remove(key).await;
        let (handle, task) = spawn_process(process, next_sequence, self.host_context());
        self.directory.register(handle.clone()).await?;
        self.supervise(&handle, task);
        Ok(handle)
    }

    /// Recovers every journaled process, returning how many were restored
    pub async fn recover_all(&self) -> Result<usize, RuntimeError> {
        let keys = self.journal.keys().await;
        for key in &keys {
            self.recover(key).await?;
        }
        Ok(keys.len())
    }

    /// The customer's current process
    pub async fn handle_for(&self, customer_id: &CustomerId) -> Result<ProcessHandle, RuntimeError> {
        self.directory
            .find_for_customer(customer_id)
            .await
            .ok_or_else(|| RuntimeError::PeriodNotFound(customer_id.clone()))
    }

    /// Drops the directory entry of a task that ends abnormally
    ///
    /// Only the key and instance are kept here; holding the handle would keep
    /// the command channel open and the task alive.
    fn supervise(&self, handle: &ProcessHandle, task: JoinHandle<()>) {
        let directory = Arc::clone(&self.directory);
        let key = handle.key().clone();
        let instance = handle.instance();
        tokio::spawn(async move {
            match task.await {
                Ok(()) => debug!(key = %key, "Billing period task finished"),
                Err(e) if e.is_panic() => {
                    error!(key = %key, error = %e, "Billing period task crashed");
                    directory.remove_instance(&key, instance).await;
                }
                Err(e) => {
                    debug!(key = %key, error = %e, "Billing period task cancelled");
                    directory.remove_instance(&key, instance).await;
                }
            }
        });
    }

    fn host_context(&self) -> HostContext {
        HostContext {
            journal: Arc::clone(&self.journal),
            clock: Arc::clone(&self.clock),
            command_buffer: self.config.command_buffer,
            query_timeout: self.config.query_timeout,
        }
    }
}

impl Default for BillingRuntime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

#[async_trait]
impl BillingPeriodPort for BillingRuntime {
    async fn start_period(&self, input: BillingPeriodInput) -> Result<ProcessKey, PortError> {
        let handle = self.start(input).await?;
        Ok(handle.key().clone())
    }

    async fn current_period(&self, customer_id: &CustomerId) -> Result<ProcessKey, PortError> {
        let handle = self.handle_for(customer_id).await?;
        Ok(handle.key().clone())
    }

    async fn signal(&self, customer_id: &CustomerId, signal: BillingSignal) -> Result<(), PortError> {
        let handle = self.handle_for(customer_id).await?;
        handle.signal(signal).await?;
        Ok(())
    }

    async fn query(
        &self,
        customer_id: &CustomerId,
        query: BillingQuery,
    ) -> Result<QueryResponse, PortError> {
        let handle = self.handle_for(customer_id).await?;
        Ok(handle.query(query).await?)
    }

    async fn close_period(&self, customer_id: &CustomerId) -> Result<PeriodSummary, PortError> {
        let handle = self.handle_for(customer_id).await?;
        handle.signal(BillingSignal::CloseBillingPeriod).await?;
        let summary = handle.summary().await?;
        self.directory.remove(handle.key()).await;
        self.journal.forget(handle.key()).await;
        Ok(summary)
    }

    async fn release(&self, customer_id: &CustomerId) -> Result<(), PortError> {
        self.directory
            .remove_customer(customer_id)
            .await
            .map(|_| ())
            .ok_or_else(|| RuntimeError::PeriodNotFound(customer_id.clone()).into())
    }
}
