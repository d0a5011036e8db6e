use thiserror::Error;
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::types::LoanStatus;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("invalid term: {months} months, term must be at least one month")]
    InvalidTerm {
        months: u32,
    },

    #[error("invalid loan amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: Rate,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: Uuid,
    },

    #[error("schedule entry for month {month_number} already exists on loan {loan_id}")]
    DuplicateScheduleEntry {
        loan_id: Uuid,
        month_number: u32,
    },

    #[error("username already taken: {username}")]
    DuplicateUsername {
        username: String,
    },

    #[error("permission denied: {reason}")]
    PermissionDenied {
        reason: String,
    },

    #[error("invalid state: current {current}, expected {expected}")]
    InvalidState {
        current: String,
        expected: String,
    },

    #[error("loan is {status:?}, expected {expected:?}")]
    UnexpectedStatus {
        status: LoanStatus,
        expected: LoanStatus,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("balance mismatch on loan {loan_id}: recorded {recorded}, derived {derived}")]
    BalanceMismatch {
        loan_id: Uuid,
        recorded: Money,
        derived: Money,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LoanError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        LoanError::NotFound { entity, id }
    }

    /// validation failures are shown to the user as-is
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LoanError::InvalidTerm { .. }
                | LoanError::InvalidAmount { .. }
                | LoanError::InvalidInterestRate { .. }
                | LoanError::DuplicateUsername { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LoanError::InvalidTerm { months: 0 };
        assert_eq!(err.to_string(), "invalid term: 0 months, term must be at least one month");
        assert!(err.is_validation());

        let id = Uuid::nil();
        let err = LoanError::not_found("loan", id);
        assert_eq!(err.to_string(), format!("loan not found: {}", id));
        assert!(!err.is_validation());
    }
}
