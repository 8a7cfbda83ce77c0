use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::records::{FeeRecord, Payment};
use crate::student::{Student, StudentRef, StudentStatus};
use crate::types::{PaymentId, PaymentStatus, StudentId};

use super::{LedgerStore, StudentDirectory};

#[derive(Debug, Default)]
struct Inner {
    students: HashMap<StudentId, Student>,
    registration_index: HashMap<String, StudentId>,
    fee_records: HashMap<StudentId, Vec<FeeRecord>>,
    payments: HashMap<StudentId, Vec<Payment>>,
    payment_owner: HashMap<PaymentId, StudentId>,
    references: HashSet<String>,
}

/// in-memory ledger store, the reference implementation of the storage
/// contracts and the double every test runs against
///
/// one `RwLock` over the whole state makes each commit naturally atomic
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    inner: RwLock<Inner>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// register a student with the embedded directory
    pub fn register_student(
        &self,
        registration_number: impl Into<String>,
        status: StudentStatus,
    ) -> Student {
        let student = Student {
            id: Uuid::new_v4(),
            registration_number: registration_number.into(),
            status,
        };
        let mut inner = self.inner.write();
        inner
            .registration_index
            .insert(student.registration_number.clone(), student.id);
        inner.students.insert(student.id, student.clone());
        student
    }

    /// open a fee record for a new billing period
    ///
    /// billing itself is external to the engine; the store carries this
    /// entry point for embedding callers and tests
    pub fn bill(
        &self,
        student_id: StudentId,
        description: impl Into<String>,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Result<FeeRecord> {
        let mut inner = self.inner.write();
        if !inner.students.contains_key(&student_id) {
            return Err(LedgerError::StudentNotFound {
                reference: student_id.to_string(),
            });
        }
        let record = FeeRecord::open(student_id, description, amount, created_at);
        inner
            .fee_records
            .entry(student_id)
            .or_default()
            .push(record.clone());
        Ok(record)
    }
}

impl StudentDirectory for InMemoryLedger {
    fn resolve(&self, student: &StudentRef) -> Result<Student> {
        let inner = self.inner.read();
        let id = match student {
            StudentRef::Id(id) => Some(*id),
            StudentRef::RegistrationNumber(reg) => inner.registration_index.get(reg).copied(),
        };
        id.and_then(|id| inner.students.get(&id).cloned())
            .ok_or_else(|| LedgerError::StudentNotFound {
                reference: student.to_string(),
            })
    }
}

impl LedgerStore for InMemoryLedger {
    fn fee_records(&self, student_id: StudentId) -> Result<Vec<FeeRecord>> {
        let inner = self.inner.read();
        let mut records = inner
            .fee_records
            .get(&student_id)
            .cloned()
            .unwrap_or_default();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    fn payments(&self, student_id: StudentId) -> Result<Vec<Payment>> {
        let inner = self.inner.read();
        let mut payments = inner
            .payments
            .get(&student_id)
            .cloned()
            .unwrap_or_default();
        payments.sort_by(|a, b| a.payment_date.cmp(&b.payment_date));
        Ok(payments)
    }

    fn reference_exists(&self, reference: &str) -> Result<bool> {
        Ok(self.inner.read().references.contains(reference))
    }

    fn commit(&self, payment: &Payment, updated_records: &[FeeRecord]) -> Result<()> {
        let mut inner = self.inner.write();

        // uniqueness is enforced here, under the same lock as the insert
        if let Some(reference) = &payment.reference_number {
            if inner.references.contains(reference) {
                return Err(LedgerError::DuplicateReference {
                    reference: reference.clone(),
                });
            }
        }

        // verify every record slot exists before mutating anything
        let records = inner
            .fee_records
            .get(&payment.student_id)
            .ok_or_else(|| LedgerError::Storage {
                message: format!("no fee records for student {}", payment.student_id),
            })?;
        for updated in updated_records {
            if !records.iter().any(|r| r.id == updated.id) {
                return Err(LedgerError::Storage {
                    message: format!("fee record {} vanished during allocation", updated.id),
                });
            }
        }

        if let Some(records) = inner.fee_records.get_mut(&payment.student_id) {
            for updated in updated_records {
                if let Some(slot) = records.iter_mut().find(|r| r.id == updated.id) {
                    *slot = updated.clone();
                }
            }
        }
        if let Some(reference) = &payment.reference_number {
            inner.references.insert(reference.clone());
        }
        inner.payment_owner.insert(payment.id, payment.student_id);
        inner
            .payments
            .entry(payment.student_id)
            .or_default()
            .push(payment.clone());
        Ok(())
    }

    fn confirm_payment(&self, payment_id: PaymentId) -> Result<Payment> {
        let mut inner = self.inner.write();
        let student_id = *inner.payment_owner.get(&payment_id).ok_or(
            LedgerError::PaymentNotFound { payment_id },
        )?;
        let payment = inner
            .payments
            .get_mut(&student_id)
            .and_then(|ps| ps.iter_mut().find(|p| p.id == payment_id))
            .ok_or(LedgerError::PaymentNotFound { payment_id })?;
        if payment.status == PaymentStatus::Confirmed {
            return Err(LedgerError::AlreadyConfirmed { payment_id });
        }
        payment.status = PaymentStatus::Confirmed;
        Ok(payment.clone())
    }
}
