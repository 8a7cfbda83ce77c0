use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{progress_percent, Money};
use crate::types::{FeeRecordId, Initiator, PaymentId, PaymentMethod, PaymentStatus, StudentId};

/// one billing-period obligation for a student
///
/// `total_paid`, `balance` and `progress_percent` only ever move together,
/// through `apply`, so the three cannot drift apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRecord {
    pub id: FeeRecordId,
    pub student_id: StudentId,
    /// billing order; allocation clears the oldest record first
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub total_billed: Money,
    pub total_paid: Money,
    /// display balance, floored at zero
    pub balance: Money,
    pub progress_percent: u8,
}

impl FeeRecord {
    /// open a new billing-period record with nothing paid
    pub fn open(
        student_id: StudentId,
        description: impl Into<String>,
        total_billed: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            created_at,
            description: description.into(),
            total_billed,
            total_paid: Money::ZERO,
            balance: total_billed.max(Money::ZERO),
            progress_percent: progress_percent(Money::ZERO, total_billed),
        }
    }

    /// amount still owed on this record, floored at zero
    pub fn outstanding(&self) -> Money {
        (self.total_billed - self.total_paid).max(Money::ZERO)
    }

    /// credit part of a payment against this record
    ///
    /// recomputes balance and progress in the same step
    pub fn apply(&mut self, amount: Money) {
        self.total_paid += amount;
        self.balance = (self.total_billed - self.total_paid).max(Money::ZERO);
        self.progress_percent = progress_percent(self.total_paid, self.total_billed);
    }

    pub fn is_settled(&self) -> bool {
        self.outstanding().is_zero()
    }
}

/// one recorded money transfer from or for a student
///
/// append-only: nothing changes after creation except the
/// pending-to-confirmed status transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub student_id: StudentId,
    pub amount: Money,
    pub method: PaymentMethod,
    /// external rail reference (bank slip, m-pesa code); globally unique when present
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub payment_date: DateTime<Utc>,
    pub status: PaymentStatus,
    pub initiated_by: Initiator,
}

impl Payment {
    /// record a new payment; staff submissions are trusted and confirm immediately
    pub fn record(
        student_id: StudentId,
        amount: Money,
        method: PaymentMethod,
        reference_number: Option<String>,
        notes: Option<String>,
        payment_date: DateTime<Utc>,
        initiated_by: Initiator,
    ) -> Self {
        let status = match initiated_by {
            Initiator::Staff => PaymentStatus::Confirmed,
            Initiator::Student => PaymentStatus::Pending,
        };
        Self {
            id: Uuid::new_v4(),
            student_id,
            amount,
            method,
            reference_number,
            notes,
            payment_date,
            status,
            initiated_by,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == PaymentStatus::Confirmed
    }
}
