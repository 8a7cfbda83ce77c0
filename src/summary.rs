use serde::{Deserialize, Serialize};

use crate::decimal::{progress_percent, Money};
use crate::eligibility;
use crate::records::{FeeRecord, Payment};
use crate::types::SettlementStatus;

/// student-facing financial position, recomputed on every query
///
/// never persisted; the fee records written by the ledger engine are the
/// single source of truth and this is a projection of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_billed: Money,
    pub total_paid: Money,
    pub balance: Money,
    pub payment_progress_percent: u8,
    pub payment_status: SettlementStatus,
    pub exam_card_eligible: bool,
}

impl FinancialSummary {
    /// aggregate a student's fee records into their current position
    pub fn derive(records: &[FeeRecord], exam_card_threshold: u8) -> Self {
        let total_billed: Money = records.iter().map(|r| r.total_billed).sum();
        let total_paid: Money = records.iter().map(|r| r.total_paid).sum();
        let balance = (total_billed - total_paid).max(Money::ZERO);
        let progress = progress_percent(total_paid, total_billed);
        let eligibility =
            eligibility::evaluate(total_paid, balance, progress, exam_card_threshold);

        Self {
            total_billed,
            total_paid,
            balance,
            payment_progress_percent: progress,
            payment_status: eligibility.payment_status,
            exam_card_eligible: eligibility.exam_card_eligible,
        }
    }
}

/// full statement returned to reporting collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentStatement {
    pub financial_summary: FinancialSummary,
    /// fee records ordered oldest first
    pub fee_history: Vec<FeeRecord>,
    /// payments ordered oldest first
    pub payment_history: Vec<Payment>,
}
