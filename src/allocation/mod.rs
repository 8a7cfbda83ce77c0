pub mod waterfall;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::AppliedPortion;

pub use waterfall::allocate;

/// how a single payment landed across a student's fee records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AllocationOutcome {
    /// per-record slices in the order they were applied
    pub applied: Vec<AppliedPortion>,
    /// leftover that found no open record; a detectable inconsistency,
    /// reported rather than dropped
    pub unapplied: Money,
}

impl AllocationOutcome {
    pub fn total_applied(&self) -> Money {
        self.applied.iter().map(|p| p.amount_applied).sum()
    }

    pub fn fully_applied(&self) -> bool {
        self.unapplied.is_zero()
    }
}
