use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::StudentId;

/// student enrollment status as the registry reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Active,
    Inactive,
}

/// the slice of a student the ledger needs; the registry owns the rest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub registration_number: String,
    pub status: StudentStatus,
}

impl Student {
    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Active
    }
}

/// how callers identify a student
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentRef {
    Id(StudentId),
    RegistrationNumber(String),
}

impl fmt::Display for StudentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudentRef::Id(id) => write!(f, "{id}"),
            StudentRef::RegistrationNumber(reg) => f.write_str(reg),
        }
    }
}

impl From<StudentId> for StudentRef {
    fn from(id: StudentId) -> Self {
        StudentRef::Id(id)
    }
}

impl From<&str> for StudentRef {
    fn from(reg: &str) -> Self {
        StudentRef::RegistrationNumber(reg.to_string())
    }
}
