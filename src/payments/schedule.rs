use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::add_calendar_months;
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::loan::Loan;
use crate::types::{EntryId, LoanId};

/// one month's due payment within a loan's repayment plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: EntryId,
    pub loan_id: LoanId,
    pub month_number: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub is_paid: bool,
    pub paid_date: Option<DateTime<Utc>>,
    pub paid_amount: Option<Money>,
}

impl ScheduleEntry {
    pub fn new(loan_id: LoanId, month_number: u32, due_date: NaiveDate, amount: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            month_number,
            due_date,
            amount,
            is_paid: false,
            paid_date: None,
            paid_amount: None,
        }
    }

    /// unpaid and due before the given day
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        !self.is_paid && self.due_date < today
    }
}

/// build the full repayment schedule for a loan
///
/// Entries are numbered from 1 and fall due on the start date plus that many
/// calendar months. Every entry carries the loan's monthly payment; any rounding
/// overshoot is absorbed by the ledger clamping the remaining amount at zero.
pub fn build_schedule(loan: &Loan) -> Result<Vec<ScheduleEntry>> {
    if loan.months == 0 {
        return Err(LoanError::InvalidTerm { months: loan.months });
    }

    (1..=loan.months)
        .map(|month_number| {
            let due_date = add_calendar_months(loan.start_date, month_number)?;
            Ok(ScheduleEntry::new(loan.id, month_number, due_date, loan.monthly_payment))
        })
        .collect()
}

/// sum of all scheduled installments
pub fn scheduled_total(entries: &[ScheduleEntry]) -> Money {
    entries.iter().map(|e| e.amount).sum()
}
