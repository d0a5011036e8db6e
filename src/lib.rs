//! Installment loans for a bank's front office: origination with simple interest,
//! calendar-month repayment schedules, and a payment ledger that draws each loan
//! down to completion.

pub mod calendar;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod loan;
pub mod parties;
pub mod payments;
pub mod portfolio;
pub mod repository;
pub mod service;
pub mod telemetry;
pub mod types;
pub mod views;

// re-export key types
pub use config::LoanConfig;
pub use decimal::{Money, Rate};
pub use errors::{LoanError, Result};
pub use events::{EventStore, LoanEvent};
pub use loan::{Loan, LoanApplication};
pub use parties::{Capability, Customer, CustomerRef, Employee, EmployeeUpdate, NewCustomer, NewEmployee};
pub use payments::{LoanLedger, LoanTerms, PaymentOutcome, PaymentReceipt, PaymentResult, ScheduleEntry};
pub use portfolio::DashboardSummary;
pub use repository::{InMemoryRepository, LoanRepository};
pub use service::LoanService;
pub use types::{CustomerId, EmployeeId, EntryId, LoanId, LoanStatus};
pub use views::{LoanDetailView, LoanView, ScheduleEntryView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;

/// install tracing and log that the crate is up
pub fn init() {
    telemetry::init_tracing();
}
