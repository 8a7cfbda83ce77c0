pub mod memory;

use crate::errors::Result;
use crate::records::{FeeRecord, Payment};
use crate::student::{Student, StudentRef};
use crate::types::{PaymentId, StudentId};

pub use memory::InMemoryLedger;

/// student registry surface the ledger consumes
///
/// identity is owned elsewhere; the engine only resolves references
pub trait StudentDirectory: Send + Sync {
    /// resolve an internal id or registration number to exactly one student
    fn resolve(&self, student: &StudentRef) -> Result<Student>;
}

/// durable home of fee records and the payment log
pub trait LedgerStore: Send + Sync {
    /// a student's fee records, oldest billing period first
    fn fee_records(&self, student_id: StudentId) -> Result<Vec<FeeRecord>>;

    /// a student's payment log, oldest first
    fn payments(&self, student_id: StudentId) -> Result<Vec<Payment>>;

    /// whether any payment already carries this reference, across all students
    fn reference_exists(&self, reference: &str) -> Result<bool>;

    /// persist a payment and every touched fee record as one unit
    ///
    /// all-or-nothing: a partial write must never become visible. the
    /// reference-number uniqueness check happens inside this commit, not
    /// only as a pre-check, so a concurrent duplicate loses here.
    fn commit(&self, payment: &Payment, updated_records: &[FeeRecord]) -> Result<()>;

    /// flip a pending payment to confirmed
    fn confirm_payment(&self, payment_id: PaymentId) -> Result<Payment>;
}
