//! Process host
//!
//! Each billing period runs as its own tokio task. The task owns the
//! [`BillingPeriodProcess`] outright and is the only thing that touches it,
//! so events are handled one at a time with no locking. Signals and queries
//! share a single ordered channel, which means a query observes every signal
//! sent before it.
//!
//! ```text
//!   ProcessHandle ──mpsc──► ┌──────────────────────────────┐
//!                           │ select! { biased;            │
//!                           │   deadline sleep  → TimerFired│
//!                           │   command channel → Signal    │──► EventJournal
//!                           │                   → Query     │
//!                           │ }                             │
//!                           └──────────────────────────────┘
//! ```
//!
//! The timer is polled first so that once the deadline has passed no further
//! signal is applied ahead of it. After the period closes the task keeps
//! answering queries until every handle is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use core_kernel::Clock;
use domain_billing::{
    BillingError, BillingPeriodProcess, BillingQuery, BillingSignal, PeriodStatus, PeriodSummary,
    ProcessEvent, ProcessKey, QueryResponse, RecordedEvent, StepOutcome,
};

use crate::error::RuntimeError;
use crate::journal::EventJournal;

/// Commands accepted by a process task
#[derive(Debug)]
enum ProcessCommand {
    Signal(BillingSignal),
    Query {
        query: BillingQuery,
        reply: oneshot::Sender<QueryResponse>,
    },
    Summary {
        reply: oneshot::Sender<Result<PeriodSummary, BillingError>>,
    },
}

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Cloneable handle to a running process
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    key: ProcessKey,
    instance: u64,
    commands: mpsc::Sender<ProcessCommand>,
    status: watch::Receiver<PeriodStatus>,
    query_timeout: Duration,
}

impl ProcessHandle {
    pub fn key(&self) -> &ProcessKey {
        &self.key
    }

    /// Last status published by the process
    pub fn status(&self) -> PeriodStatus {
        *self.status.borrow()
    }

    /// True while the period is Active and its task is still taking commands
    pub fn is_active(&self) -> bool {
        self.status() == PeriodStatus::Active && self.is_running()
    }

    /// False once the task has exited, whether it finished or crashed
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Identifies the task behind this handle; a recovered or restarted
    /// process under the same key gets a new instance
    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Queues a signal; returns once the process has accepted it into its channel
    pub async fn signal(&self, signal: BillingSignal) -> Result<(), RuntimeError> {
        debug!(key = %self.key, signal = signal.name(), "Sending signal");
        self.commands
            .send(ProcessCommand::Signal(signal))
            .await
            .map_err(|_| RuntimeError::ProcessStopped(self.key.clone()))
    }

    /// Runs a query after every command already queued
    pub async fn query(&self, query: BillingQuery) -> Result<QueryResponse, RuntimeError> {
        let (reply, answer) = oneshot::channel();
        self.request(ProcessCommand::Query { query, reply }, answer, "query")
            .await
    }

    /// Settlement view of the period
    pub async fn summary(&self) -> Result<PeriodSummary, RuntimeError> {
        let (reply, answer) = oneshot::channel();
        self.request(ProcessCommand::Summary { reply }, answer, "summary")
            .await?
            .map_err(|source| RuntimeError::Settlement {
                key: self.key.clone(),
                source,
            })
    }

    /// Waits until the process reports Closed
    pub async fn closed(&self) -> Result<(), RuntimeError> {
        let mut status = self.status.clone();
        status
            .wait_for(|s| *s == PeriodStatus::Closed)
            .await
            .map(|_| ())
            .map_err(|_| RuntimeError::ProcessStopped(self.key.clone()))
    }

    async fn request<T>(
        &self,
        command: ProcessCommand,
        answer: oneshot::Receiver<T>,
        operation: &'static str,
    ) -> Result<T, RuntimeError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RuntimeError::ProcessStopped(self.key.clone()))?;

        match tokio::time::timeout(self.query_timeout, answer).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(RuntimeError::ProcessStopped(self.key.clone())),
            Err(_) => Err(RuntimeError::Timeout {
                key: self.key.clone(),
                operation,
                timeout: self.query_timeout,
            }),
        }
    }
}

/// Settings a process task is spawned with
pub(crate) struct HostContext {
    pub journal: Arc<dyn EventJournal>,
    pub clock: Arc<dyn Clock>,
    pub command_buffer: usize,
    pub query_timeout: Duration,
}

/// Spawns the task hosting `process`
///
/// `next_sequence` is the journal sequence number the next handled event gets;
/// it is 1 for a fresh process and `history.len() + 1` after recovery.
pub(crate) fn spawn_process(
    process: BillingPeriodProcess,
    next_sequence: u64,
    ctx: HostContext,
) -> (ProcessHandle, JoinHandle<()>) {
    let key = process.key();
    let (commands, receiver) = mpsc::channel(ctx.command_buffer);
    let (status_tx, status) = watch::channel(process.period().status());

    let handle = ProcessHandle {
        key: key.clone(),
        instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
        commands,
        status,
        query_timeout: ctx.query_timeout,
    };

    let host = ProcessHost {
        process,
        sequence: next_sequence,
        journal: ctx.journal,
        clock: ctx.clock,
        status: status_tx,
    };
    let task = tokio::spawn(host.run(receiver));
    (handle, task)
}

struct ProcessHost {
    process: BillingPeriodProcess,
    sequence: u64,
    journal: Arc<dyn EventJournal>,
    clock: Arc<dyn Clock>,
    status: watch::Sender<PeriodStatus>,
}

impl ProcessHost {
    async fn run(mut self, mut commands: mpsc::Receiver<ProcessCommand>) {
        let key = self.process.key();
        let remaining = self
            .process
            .period()
            .window()
            .remaining(self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let timer = tokio::time::sleep(remaining);
        tokio::pin!(timer);

        info!(key = %key, deadline = %self.process.deadline(), "Billing period process running");

        loop {
            tokio::select! {
                biased;

                () = &mut timer, if !self.process.is_terminated() => {
                    self.handle(ProcessEvent::TimerFired).await;
                }
                command = commands.recv() => match command {
                    Some(ProcessCommand::Signal(signal)) => {
                        self.handle(ProcessEvent::Signal(signal)).await;
                    }
                    Some(ProcessCommand::Query { query, reply }) => {
                        if reply.send(self.process.query(&query)).is_err() {
                            debug!(key = %key, query = query.name(), "Query caller went away");
                        }
                    }
                    Some(ProcessCommand::Summary { reply }) => {
                        if reply.send(self.process.summary()).is_err() {
                            debug!(key = %key, "Summary caller went away");
                        }
                    }
                    None => break,
                },
            }
        }

        info!(key = %key, status = ?self.process.period().status(), "Billing period process stopped");
    }

    async fn handle(&mut self, event: ProcessEvent) {
        let key = self.process.key();
        if self.process.is_terminated() {
            warn!(key = %key, event = event.name(), "Event after billing period closed, ignoring");
            return;
        }

        let now = self.clock.now();
        let recorded = RecordedEvent::new(self.sequence, now, event);
        if let Err(e) = self.journal.append(&key, recorded.clone()).await {
            error!(key = %key, sequence = self.sequence, error = %e, "Failed to journal event");
        }
        self.sequence += 1;

        if let StepOutcome::Closed { bills_closed } = self.process.step(&recorded.event, now) {
            info!(key = %key, bills_closed, "Billing period terminated");
            self.status.send_replace(PeriodStatus::Closed);
        }
    }
}
