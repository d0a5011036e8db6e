pub mod amortization;
pub mod ledger;
pub mod schedule;

use serde::{Deserialize, Serialize};

use crate::loan::Loan;

pub use amortization::{compute_terms, LoanTerms};
pub use ledger::{
    outstanding_from_entries, paid_count, progress_percent, LoanLedger, PaymentOutcome,
    PaymentReceipt,
};
pub use schedule::{build_schedule, scheduled_total, ScheduleEntry};

/// loan as stored after a payment attempt, with what the attempt did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub loan: Loan,
    pub outcome: PaymentOutcome,
}

impl PaymentResult {
    pub fn is_applied(&self) -> bool {
        self.outcome.is_applied()
    }

    pub fn loan_completed(&self) -> bool {
        self.outcome.receipt().is_some_and(|receipt| receipt.loan_completed)
    }
}
