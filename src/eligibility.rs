use crate::decimal::Money;
use crate::types::SettlementStatus;

/// outcome of the eligibility rules for one student
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub payment_status: SettlementStatus,
    pub exam_card_eligible: bool,
}

/// derive payment status and exam-card access from the financial position
///
/// pure over its inputs; the threshold comes from `LedgerConfig`
pub fn evaluate(total_paid: Money, balance: Money, progress_percent: u8, threshold: u8) -> Eligibility {
    let payment_status = if !balance.is_positive() {
        SettlementStatus::Paid
    } else if total_paid.is_positive() {
        SettlementStatus::Partial
    } else {
        SettlementStatus::Unpaid
    };

    Eligibility {
        payment_status,
        exam_card_eligible: progress_percent >= threshold,
    }
}
