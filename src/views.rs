/// serializable read models of loans and their schedules
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::loan::Loan;
use crate::parties::Customer;
use crate::payments::{paid_count, progress_percent, ScheduleEntry};
use crate::types::{CustomerId, EmployeeId, EntryId, LoanId, LoanStatus};

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub customer_id: CustomerId,
    pub employee_id: EmployeeId,
    pub status: LoanStatus,
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub financial: FinancialView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinancialView {
    pub total_amount: Money,
    pub interest_rate: Rate,
    pub months: u32,
    pub monthly_payment: Money,
    pub total_with_interest: Money,
    pub remaining_amount: Money,
    pub paid_to_date: Money,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleEntryView {
    pub id: EntryId,
    pub month_number: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub is_paid: bool,
    pub paid_date: Option<DateTime<Utc>>,
    pub paid_amount: Option<Money>,
}

/// loan page: the loan, who borrowed it and how far repayment has come
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanDetailView {
    pub loan: LoanView,
    pub customer_name: String,
    pub paid_count: usize,
    pub remaining_count: usize,
    pub progress_percent: Decimal,
    pub schedule: Vec<ScheduleEntryView>,
}

impl LoanView {
    pub fn from_loan(loan: &Loan) -> Self {
        LoanView {
            id: loan.id,
            customer_id: loan.customer_id,
            employee_id: loan.employee_id,
            status: loan.status,
            start_date: loan.start_date,
            created_at: loan.created_at,
            financial: FinancialView {
                total_amount: loan.total_amount,
                interest_rate: loan.interest_rate,
                months: loan.months,
                monthly_payment: loan.monthly_payment,
                total_with_interest: loan.total_with_interest,
                remaining_amount: loan.remaining_amount,
                paid_to_date: loan.paid_to_date(),
            },
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<&ScheduleEntry> for ScheduleEntryView {
    fn from(entry: &ScheduleEntry) -> Self {
        ScheduleEntryView {
            id: entry.id,
            month_number: entry.month_number,
            due_date: entry.due_date,
            amount: entry.amount,
            is_paid: entry.is_paid,
            paid_date: entry.paid_date,
            paid_amount: entry.paid_amount,
        }
    }
}

impl LoanDetailView {
    pub fn new(loan: &Loan, customer: &Customer, entries: &[ScheduleEntry]) -> Self {
        let paid = paid_count(entries);
        LoanDetailView {
            loan: LoanView::from_loan(loan),
            customer_name: customer.full_name.clone(),
            paid_count: paid,
            remaining_count: entries.len() - paid,
            progress_percent: progress_percent(loan.months, paid),
            schedule: entries.iter().map(ScheduleEntryView::from).collect(),
        }
    }

    /// entries still to be paid, in month order
    pub fn unpaid(&self) -> impl Iterator<Item = &ScheduleEntryView> {
        self.schedule.iter().filter(|e| !e.is_paid)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoanConfig;
    use crate::events::EventStore;
    use crate::loan::LoanApplication;
    use crate::parties::NewCustomer;
    use crate::payments::{build_schedule, LoanLedger};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn fixture() -> (Loan, Customer, Vec<ScheduleEntry>) {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let employee_id = Uuid::new_v4();
        let customer = Customer::register(
            NewCustomer {
                full_name: "Aizada Bekova".to_string(),
                phone: "+996 700 000 000".to_string(),
                passport_number: "ID1234567".to_string(),
                address: "Bishkek".to_string(),
            },
            employee_id,
            created_at,
        );
        let loan = Loan::originate(
            &LoanApplication::new(Money::from_major(4_000))
                .rate(Rate::from_percentage(0))
                .months(4),
            customer.id,
            employee_id,
            &LoanConfig::default(),
            created_at,
        )
        .unwrap();
        let schedule = build_schedule(&loan).unwrap();
        (loan, customer, schedule)
    }

    #[test]
    fn test_detail_view_progress() {
        let (mut loan, customer, mut schedule) = fixture();
        let mut events = EventStore::new();
        let paid_at = Utc.with_ymd_and_hms(2024, 2, 15, 12, 0, 0).unwrap();
        LoanLedger::apply_payment(&mut loan, &mut schedule[0], paid_at, &mut events).unwrap();

        let view = LoanDetailView::new(&loan, &customer, &schedule);
        assert_eq!(view.paid_count, 1);
        assert_eq!(view.remaining_count, 3);
        assert_eq!(view.progress_percent, dec!(25));
        assert_eq!(view.customer_name, "Aizada Bekova");
        assert_eq!(view.loan.financial.remaining_amount, Money::from_major(3_000));
        assert_eq!(view.loan.financial.paid_to_date, Money::from_major(1_000));
        assert_eq!(view.unpaid().map(|e| e.month_number).collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_detail_view_json() {
        let (loan, customer, schedule) = fixture();
        let json = LoanDetailView::new(&loan, &customer, &schedule).to_json_pretty().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["loan"]["status"], "active");
        assert_eq!(value["schedule"].as_array().unwrap().len(), 4);
        assert_eq!(value["schedule"][0]["due_date"], "2024-02-15");
        assert_eq!(value["remaining_count"], 4);
    }
}
