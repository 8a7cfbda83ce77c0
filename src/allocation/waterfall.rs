use crate::decimal::Money;
use crate::records::FeeRecord;
use crate::types::AppliedPortion;

use super::AllocationOutcome;

/// distribute one payment across fee records, oldest debt first
///
/// mutates each touched record through `FeeRecord::apply` so paid, balance
/// and progress stay in lockstep; whatever cannot be placed comes back as
/// `unapplied` instead of being silently dropped
pub fn allocate(records: &mut [FeeRecord], amount: Money) -> AllocationOutcome {
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let mut remaining = amount;
    let mut applied = Vec::new();

    for record in records.iter_mut() {
        if remaining.is_zero() {
            break;
        }
        let due = record.outstanding();
        if due.is_zero() {
            continue;
        }
        let portion = remaining.min(due);
        record.apply(portion);
        remaining -= portion;
        applied.push(AppliedPortion {
            fee_record_id: record.id,
            amount_applied: portion,
            new_balance: record.balance,
        });
    }

    AllocationOutcome {
        applied,
        unapplied: remaining,
    }
}
