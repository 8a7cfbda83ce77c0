use std::collections::HashMap;
use std::sync::Arc;

use hourglass_rs::SafeTimeProvider;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::allocation;
use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore, Notifier};
use crate::records::Payment;
use crate::store::{LedgerStore, StudentDirectory};
use crate::student::StudentRef;
use crate::summary::{FinancialSummary, StudentStatement};
use crate::types::{AppliedPortion, Initiator, PaymentId, PaymentMethod, StudentId};

/// one incoming payment, as the transport layer hands it over
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub student: StudentRef,
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub initiated_by: Initiator,
}

/// result of a recorded payment, enough for a receipt and an audit line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment_id: PaymentId,
    pub financial_summary: FinancialSummary,
    pub applied_to: Vec<AppliedPortion>,
    /// leftover the waterfall could not place; zero in normal operation,
    /// non-zero only when a concurrent payment raced the balance guard
    pub unapplied_remainder: Money,
}

/// per-student serialization points
///
/// two payments for the same student must not interleave their
/// read-allocate-write; different students stay fully parallel
#[derive(Debug, Default)]
struct StudentLocks {
    inner: Mutex<HashMap<StudentId, Arc<Mutex<()>>>>,
}

impl StudentLocks {
    fn for_student(&self, student_id: StudentId) -> Arc<Mutex<()>> {
        let mut locks = self.inner.lock();
        // entries nobody holds anymore are evicted on the next acquisition,
        // keeping the map bounded by the number of in-flight payments
        locks.retain(|id, lock| *id == student_id || Arc::strong_count(lock) > 1);
        locks
            .entry(student_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// the ledger engine: validates a payment, waterfalls it across fee
/// records, commits the result atomically and reports the new position
pub struct LedgerEngine<S> {
    store: Arc<S>,
    config: LedgerConfig,
    notifier: Arc<dyn Notifier>,
    locks: StudentLocks,
}

impl<S> LedgerEngine<S>
where
    S: LedgerStore + StudentDirectory,
{
    pub fn new(store: Arc<S>, config: LedgerConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            config,
            notifier,
            locks: StudentLocks::default(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// record one payment against a student's outstanding fee records
    pub fn record_payment(
        &self,
        request: PaymentRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentReceipt> {
        let student = self.store.resolve(&request.student)?;
        if !student.is_active() {
            return Err(LedgerError::InactiveStudent {
                student_id: student.id,
            });
        }

        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: request.amount,
            });
        }
        if request.amount > self.config.max_payment_amount {
            return Err(LedgerError::AmountAboveCap {
                amount: request.amount,
                cap: self.config.max_payment_amount,
            });
        }

        // serialize read-allocate-write per student
        let lock = self.locks.for_student(student.id);
        let guard = lock.lock();

        // pre-check only; the commit re-enforces uniqueness atomically
        if let Some(reference) = &request.reference_number {
            if self.store.reference_exists(reference)? {
                return Err(LedgerError::DuplicateReference {
                    reference: reference.clone(),
                });
            }
        } else {
            warn!(
                student_id = %student.id,
                method = %request.method,
                "payment without reference number has no duplicate protection"
            );
        }

        let mut records = self.store.fee_records(student.id)?;
        // aggregate difference, the same formula as the summary balance, so
        // the guard and the balance shown to the student always agree
        let total_billed: Money = records.iter().map(|r| r.total_billed).sum();
        let total_paid: Money = records.iter().map(|r| r.total_paid).sum();
        let outstanding = (total_billed - total_paid).max(Money::ZERO);
        if request.amount > outstanding {
            return Err(LedgerError::Overpayment {
                amount: request.amount,
                outstanding,
            });
        }

        let outcome = allocation::allocate(&mut records, request.amount);
        if !outcome.fully_applied() {
            warn!(
                student_id = %student.id,
                unapplied = %outcome.unapplied,
                "payment remainder found no open fee record"
            );
        }

        let now = time_provider.now();
        let payment = Payment::record(
            student.id,
            request.amount,
            request.method,
            request.reference_number,
            request.notes,
            now,
            request.initiated_by,
        );

        let touched: Vec<_> = records
            .iter()
            .filter(|r| outcome.applied.iter().any(|p| p.fee_record_id == r.id))
            .cloned()
            .collect();
        self.store.commit(&payment, &touched)?;

        let summary = FinancialSummary::derive(&records, self.config.exam_card_threshold);
        info!(
            student_id = %student.id,
            payment_id = %payment.id,
            amount = %payment.amount,
            balance = %summary.balance,
            "payment recorded"
        );

        let mut events = EventStore::new();
        events.emit(Event::PaymentRecorded {
            student_id: student.id,
            payment_id: payment.id,
            amount: payment.amount,
            method: payment.method,
            initiated_by: payment.initiated_by,
            timestamp: now,
        });
        events.emit(Event::BalanceChanged {
            student_id: student.id,
            balance: summary.balance,
            payment_progress_percent: summary.payment_progress_percent,
            payment_status: summary.payment_status,
            exam_card_eligible: summary.exam_card_eligible,
            timestamp: now,
        });

        // release the student before notifying; the receipt must not wait
        // on downstream channels
        drop(guard);
        self.dispatch(events);

        Ok(PaymentReceipt {
            payment_id: payment.id,
            financial_summary: summary,
            applied_to: outcome.applied,
            unapplied_remainder: outcome.unapplied,
        })
    }

    /// staff confirmation of a pending student-initiated payment
    pub fn confirm_payment(
        &self,
        payment_id: PaymentId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Payment> {
        let payment = self.store.confirm_payment(payment_id)?;

        let mut events = EventStore::new();
        events.emit(Event::PaymentConfirmed {
            student_id: payment.student_id,
            payment_id: payment.id,
            timestamp: time_provider.now(),
        });
        self.dispatch(events);
        Ok(payment)
    }

    /// read-only financial position plus full fee and payment history
    pub fn financial_summary(&self, student: &StudentRef) -> Result<StudentStatement> {
        let student = self.store.resolve(student)?;
        let records = self.store.fee_records(student.id)?;
        let payments = self.store.payments(student.id)?;
        Ok(StudentStatement {
            financial_summary: FinancialSummary::derive(
                &records,
                self.config.exam_card_threshold,
            ),
            fee_history: records,
            payment_history: payments,
        })
    }

    /// hand collected events to the notifier on a detached thread
    ///
    /// fire-and-forget: the caller never waits on the notifier and a
    /// failure is logged, never raised
    fn dispatch(&self, mut events: EventStore) {
        let events = events.take_events();
        if events.is_empty() {
            return;
        }
        let notifier = Arc::clone(&self.notifier);
        std::thread::spawn(move || {
            for event in &events {
                if let Err(err) = notifier.notify(event) {
                    warn!(%err, "notifier failed, event dropped");
                }
            }
        });
    }

    #[cfg(test)]
    fn tracked_students(&self) -> usize {
        self.locks.inner.lock().len()
    }
}
