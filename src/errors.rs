use thiserror::Error;

use crate::decimal::Money;
use crate::types::{PaymentId, StudentId};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("student not found: {reference}")]
    StudentNotFound {
        reference: String,
    },

    #[error("student {student_id} is not active and cannot make payments")]
    InactiveStudent {
        student_id: StudentId,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("payment amount {amount} exceeds the maximum accepted {cap}")]
    AmountAboveCap {
        amount: Money,
        cap: Money,
    },

    #[error("payment of {amount} exceeds outstanding balance of {outstanding}")]
    Overpayment {
        amount: Money,
        outstanding: Money,
    },

    #[error("a payment with reference {reference} may already be recorded")]
    DuplicateReference {
        reference: String,
    },

    #[error("payment not found: {payment_id}")]
    PaymentNotFound {
        payment_id: PaymentId,
    },

    #[error("payment {payment_id} is already confirmed")]
    AlreadyConfirmed {
        payment_id: PaymentId,
    },

    #[error("ledger storage failed, retry with the same reference: {message}")]
    Storage {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
