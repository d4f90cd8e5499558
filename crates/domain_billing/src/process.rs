//! The billing period state machine
//!
//! [`BillingPeriodProcess`] folds a sequence of [`ProcessEvent`]s over a
//! [`BillingPeriod`]. It owns no channels and no timers: the host decides
//! which event is next and at what logical time, and calls [`step`]. Feeding
//! the same events with the same timestamps always yields the same state,
//! which is what [`replay`] relies on.
//!
//! ```text
//!             signal (create/add/close bill)
//!            ┌──────┐
//!            ▼      │
//!        ┌────────┐ │   close-billing-period | timer
//!  start │ Active ├─┴──────────────────────────────► Closed
//!        └────────┘
//! ```
//!
//! [`step`]: BillingPeriodProcess::step
//! [`replay`]: BillingPeriodProcess::replay

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::accrual::BillingRules;
use crate::error::BillingError;
use crate::period::{BillingPeriod, BillingPeriodInput, PeriodSummary, ProcessKey};
use crate::queries::{BillingQuery, QueryResponse};
use crate::signals::{BillingSignal, SignalOutcome};

/// An event the process reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ProcessEvent {
    Signal(BillingSignal),
    TimerFired,
}

impl ProcessEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessEvent::Signal(signal) => signal.name(),
            ProcessEvent::TimerFired => "timer-fired",
        }
    }

    /// Returns true for the events that end the period
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessEvent::TimerFired | ProcessEvent::Signal(BillingSignal::CloseBillingPeriod)
        )
    }
}

impl From<BillingSignal> for ProcessEvent {
    fn from(signal: BillingSignal) -> Self {
        ProcessEvent::Signal(signal)
    }
}

/// A handled event together with the logical time it was handled at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub sequence: u64,
    pub at: DateTime<Utc>,
    pub event: ProcessEvent,
}

impl RecordedEvent {
    pub fn new(sequence: u64, at: DateTime<Utc>, event: ProcessEvent) -> Self {
        Self {
            sequence,
            at,
            event,
        }
    }
}

/// Result of one [`BillingPeriodProcess::step`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The process is still Active after handling a signal
    Active(SignalOutcome),
    /// The event ended the period
    Closed { bills_closed: usize },
    /// The period had already ended; the event was dropped
    AlreadyClosed,
}

impl StepOutcome {
    /// Returns true when the process has terminated
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepOutcome::Active(_))
    }
}

/// A billing period and the rules it prices charges with
#[derive(Debug, Clone)]
pub struct BillingPeriodProcess {
    period: BillingPeriod,
    rules: BillingRules,
    handled: u64,
}

impl BillingPeriodProcess {
    /// Starts a process in the Active state with the standard rules
    pub fn start(input: &BillingPeriodInput) -> Result<Self, BillingError> {
        let period = BillingPeriod::new(input)?;
        info!(
            key = %period.key(),
            customer_id = %input.customer_id,
            currency = %input.currency,
            days = input.billing_period_days,
            "Billing period started"
        );
        Ok(Self {
            period,
            rules: BillingRules::default(),
            handled: 0,
        })
    }

    /// Replaces the pricing rules
    pub fn with_rules(mut self, rules: BillingRules) -> Self {
        self.rules = rules;
        self
    }

    /// Handles one event at logical time `now`
    ///
    /// A terminal event closes every open bill and moves the period to
    /// Closed. Any event after that is dropped.
    #[instrument(skip(self, event), fields(key = %self.period.key(), event = event.name()))]
    pub fn step(&mut self, event: &ProcessEvent, now: DateTime<Utc>) -> StepOutcome {
        if self.is_terminated() {
            debug!("Event after termination dropped");
            return StepOutcome::AlreadyClosed;
        }
        self.handled += 1;

        match event {
            ProcessEvent::TimerFired => {
                info!(deadline = %self.deadline(), "Billing period deadline reached");
                let bills_closed = self.period.close_period(now);
                StepOutcome::Closed { bills_closed }
            }
            ProcessEvent::Signal(BillingSignal::CloseBillingPeriod) => {
                let bills_closed = self.period.close_period(now);
                StepOutcome::Closed { bills_closed }
            }
            ProcessEvent::Signal(signal) => {
                StepOutcome::Active(self.period.handle_signal(signal, now, &self.rules))
            }
        }
    }

    /// Rebuilds a process by stepping through a recorded history
    pub fn replay(
        input: &BillingPeriodInput,
        rules: BillingRules,
        history: &[RecordedEvent],
    ) -> Result<Self, BillingError> {
        let mut process = Self::start(input)?.with_rules(rules);
        for recorded in history {
            process.step(&recorded.event, recorded.at);
        }
        debug!(key = %process.key(), events = history.len(), "Billing period replayed");
        Ok(process)
    }

    /// Answers a query against the current state
    pub fn query(&self, query: &BillingQuery) -> QueryResponse {
        self.period.answer(query)
    }

    pub fn period(&self) -> &BillingPeriod {
        &self.period
    }

    pub fn rules(&self) -> &BillingRules {
        &self.rules
    }

    pub fn key(&self) -> ProcessKey {
        self.period.key()
    }

    /// The instant the deadline timer should fire
    pub fn deadline(&self) -> DateTime<Utc> {
        self.period.window().deadline()
    }

    /// Number of events handled while Active
    pub fn events_handled(&self) -> u64 {
        self.handled
    }

    pub fn is_terminated(&self) -> bool {
        !self.period.is_active()
    }

    pub fn summary(&self) -> Result<PeriodSummary, BillingError> {
        self.period.summary(&self.rules.converter)
    }
}
