use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a student
pub type StudentId = Uuid;

/// unique identifier for a fee record
pub type FeeRecordId = Uuid;

/// unique identifier for a payment
pub type PaymentId = Uuid;

/// payment channels accepted by the bursary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Mpesa,
    Card,
    Cheque,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Mpesa => "mpesa",
            PaymentMethod::Card => "card",
            PaymentMethod::Cheque => "cheque",
        };
        f.write_str(s)
    }
}

/// payment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// recorded but awaiting staff confirmation
    Pending,
    /// confirmed and counted toward the ledger
    Confirmed,
}

/// who submitted the payment; drives the initial status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initiator {
    Student,
    Staff,
}

/// student-facing label derived from the balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Unpaid,
    Partial,
    Paid,
}

/// one slice of a payment applied to a single fee record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedPortion {
    pub fee_record_id: FeeRecordId,
    pub amount_applied: Money,
    pub new_balance: Money,
}
