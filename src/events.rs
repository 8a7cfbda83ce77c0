use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{Initiator, PaymentId, PaymentMethod, SettlementStatus, StudentId};

/// financial notifications emitted by the ledger engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    PaymentRecorded {
        student_id: StudentId,
        payment_id: PaymentId,
        amount: Money,
        method: PaymentMethod,
        initiated_by: Initiator,
        timestamp: DateTime<Utc>,
    },
    PaymentConfirmed {
        student_id: StudentId,
        payment_id: PaymentId,
        timestamp: DateTime<Utc>,
    },
    BalanceChanged {
        student_id: StudentId,
        balance: Money,
        payment_progress_percent: u8,
        payment_status: SettlementStatus,
        exam_card_eligible: bool,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

#[derive(Debug, Error)]
#[error("notifier failed: {0}")]
pub struct NotifierError(pub String);

/// downstream notification channel (sms, email, dashboard)
///
/// strictly best-effort: the engine logs failures and moves on, a broken
/// notifier never rolls back a committed payment
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &Event) -> Result<(), NotifierError>;
}

/// notifier that only writes to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &Event) -> Result<(), NotifierError> {
        tracing::info!(?event, "ledger notification");
        Ok(())
    }
}

/// notifier that discards everything, for tests and embedding callers
/// that poll the statement instead
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &Event) -> Result<(), NotifierError> {
        Ok(())
    }
}
