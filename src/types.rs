use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a payment schedule entry
pub type EntryId = Uuid;

/// unique identifier for a customer
pub type CustomerId = Uuid;

/// unique identifier for an employee
pub type EmployeeId = Uuid;

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// loan issued and being repaid
    Active,
    /// remaining amount reached zero
    Completed,
    /// a due date passed unpaid; assigned from outside the ledger
    Overdue,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Completed => "completed",
            LoanStatus::Overdue => "overdue",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
