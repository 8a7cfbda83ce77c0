use serde::{Deserialize, Serialize};

use crate::decimal::Money;

/// ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// largest single payment accepted; a fraud guard, not a business rule
    pub max_payment_amount: Money,
    /// payment progress percent at which the exam card is released
    pub exam_card_threshold: u8,
}

impl LedgerConfig {
    /// institutional defaults: 1M cap, exam card at 60% paid
    pub fn standard() -> Self {
        Self {
            max_payment_amount: Money::from_major(1_000_000),
            exam_card_threshold: 60,
        }
    }

    /// override the eligibility threshold
    pub fn with_exam_card_threshold(mut self, threshold: u8) -> Self {
        self.exam_card_threshold = threshold;
        self
    }

    /// override the single-payment cap
    pub fn with_max_payment(mut self, cap: Money) -> Self {
        self.max_payment_amount = cap;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::standard()
    }
}
