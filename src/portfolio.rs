use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::Result;
use crate::loan::Loan;
use crate::payments::progress_percent;
use crate::types::{CustomerId, EmployeeId, LoanId, LoanStatus};

/// one line of the dashboard's recent loans list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentLoan {
    pub loan_id: LoanId,
    pub customer_id: CustomerId,
    pub total_amount: Money,
    pub remaining_amount: Money,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub progress_percent: Decimal,
}

impl RecentLoan {
    pub fn new(loan: &Loan, paid_count: usize) -> Self {
        Self {
            loan_id: loan.id,
            customer_id: loan.customer_id,
            total_amount: loan.total_amount,
            remaining_amount: loan.remaining_amount,
            status: loan.status,
            created_at: loan.created_at,
            progress_percent: progress_percent(loan.months, paid_count),
        }
    }
}

/// what an employee sees on landing: their book of customers and active loans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub employee_id: EmployeeId,
    pub customers_count: usize,
    pub active_loans_count: usize,
    /// principal handed out on active loans
    pub total_given: Money,
    /// still owed on active loans
    pub total_remaining: Money,
    pub recent_loans: Vec<RecentLoan>,
}

impl DashboardSummary {
    /// aggregate an employee's loans; only active loans count towards the totals
    pub fn build(
        employee_id: EmployeeId,
        customers_count: usize,
        loans: &[Loan],
        recent_loans: Vec<RecentLoan>,
    ) -> Self {
        let active: Vec<&Loan> = loans
            .iter()
            .filter(|l| l.employee_id == employee_id && l.is_active())
            .collect();

        Self {
            employee_id,
            customers_count,
            active_loans_count: active.len(),
            total_given: active.iter().map(|l| l.total_amount).sum(),
            total_remaining: active.iter().map(|l| l.remaining_amount).sum(),
            recent_loans,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
