pub mod allocation;
pub mod config;
pub mod decimal;
pub mod eligibility;
pub mod engine;
pub mod errors;
pub mod events;
pub mod records;
pub mod store;
pub mod student;
pub mod summary;
pub mod types;

// re-export key types
pub use config::LedgerConfig;
pub use decimal::Money;
pub use engine::{LedgerEngine, PaymentReceipt, PaymentRequest};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore, LogNotifier, Notifier, NotifierError, NullNotifier};
pub use records::{FeeRecord, Payment};
pub use store::{InMemoryLedger, LedgerStore, StudentDirectory};
pub use student::{Student, StudentRef, StudentStatus};
pub use summary::{FinancialSummary, StudentStatement};
pub use types::{
    AppliedPortion, FeeRecordId, Initiator, PaymentId, PaymentMethod, PaymentStatus,
    SettlementStatus, StudentId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
