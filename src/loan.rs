use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LoanConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::payments::amortization::compute_terms;
use crate::types::{CustomerId, EmployeeId, LoanId, LoanStatus};

/// raw inputs an employee submits to originate a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub principal: Money,
    /// falls back to the configured default rate
    pub interest_rate: Option<Rate>,
    /// falls back to the configured default term
    pub months: Option<u32>,
    /// falls back to the origination day
    pub start_date: Option<NaiveDate>,
}

impl LoanApplication {
    pub fn new(principal: Money) -> Self {
        Self {
            principal,
            interest_rate: None,
            months: None,
            start_date: None,
        }
    }

    pub fn rate(mut self, rate: Rate) -> Self {
        self.interest_rate = Some(rate);
        self
    }

    pub fn months(mut self, months: u32) -> Self {
        self.months = Some(months);
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }
}

/// an installment loan and its running balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub customer_id: CustomerId,
    pub employee_id: EmployeeId,

    // terms
    pub total_amount: Money,
    pub interest_rate: Rate,
    pub months: u32,

    // derived once at origination
    pub monthly_payment: Money,
    pub total_with_interest: Money,

    // running balance
    pub remaining_amount: Money,
    pub status: LoanStatus,

    // dates
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub last_status_change: DateTime<Utc>,
}

impl Loan {
    /// create a loan from an application, computing its derived terms
    pub fn originate(
        application: &LoanApplication,
        customer_id: CustomerId,
        employee_id: EmployeeId,
        config: &LoanConfig,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        config.validate_application(application)?;

        let mut loan = Self {
            id: Uuid::new_v4(),
            customer_id,
            employee_id,
            total_amount: application.principal.round_dp(config.rounding.decimal_places),
            interest_rate: application.interest_rate.unwrap_or(config.defaults.interest_rate),
            months: application.months.unwrap_or(config.defaults.months),
            monthly_payment: Money::ZERO,
            total_with_interest: Money::ZERO,
            remaining_amount: Money::ZERO,
            status: LoanStatus::Active,
            start_date: application.start_date.unwrap_or_else(|| created_at.date_naive()),
            created_at,
            last_status_change: created_at,
        };
        loan.apply_terms(config.rounding.decimal_places)?;

        Ok(loan)
    }

    /// fill in monthly payment, total with interest and the opening balance
    ///
    /// Runs once: a loan whose monthly payment is already set is left untouched and
    /// `Ok(false)` is returned.
    pub fn apply_terms(&mut self, decimal_places: u32) -> Result<bool> {
        if self.has_terms() {
            return Ok(false);
        }

        let terms = compute_terms(self.total_amount, self.interest_rate, self.months)?
            .persisted(decimal_places);

        self.monthly_payment = terms.monthly_payment;
        self.total_with_interest = terms.total_with_interest;
        self.remaining_amount = terms.total_with_interest;
        Ok(true)
    }

    pub fn has_terms(&self) -> bool {
        !self.monthly_payment.is_zero() || !self.total_with_interest.is_zero()
    }

    /// amount repaid so far
    pub fn paid_to_date(&self) -> Money {
        (self.total_with_interest - self.remaining_amount).max(Money::ZERO)
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    pub fn update_status(&mut self, new_status: LoanStatus, timestamp: DateTime<Utc>) {
        self.status = new_status;
        self.last_status_change = timestamp;
    }

    /// flag an active loan as overdue; the caller decides when a due date was missed
    pub fn mark_overdue(&mut self, timestamp: DateTime<Utc>) -> Result<()> {
        match self.status {
            LoanStatus::Overdue => Ok(()),
            LoanStatus::Active => {
                self.update_status(LoanStatus::Overdue, timestamp);
                Ok(())
            }
            LoanStatus::Completed => Err(LoanError::UnexpectedStatus {
                status: self.status,
                expected: LoanStatus::Active,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 14, 0, 0).unwrap()
    }

    fn originate(application: LoanApplication) -> Result<Loan> {
        Loan::originate(&application, Uuid::new_v4(), Uuid::new_v4(), &LoanConfig::default(), created_at())
    }

    #[test]
    fn test_originate_computes_terms() {
        let loan = originate(
            LoanApplication::new(Money::from_major(10_000))
                .rate(Rate::from_percentage(10))
                .months(10),
        )
        .unwrap();

        assert_eq!(loan.total_with_interest, Money::from_major(11_000));
        assert_eq!(loan.monthly_payment, Money::from_major(1_100));
        assert_eq!(loan.remaining_amount, Money::from_major(11_000));
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.paid_to_date(), Money::ZERO);
    }

    #[test]
    fn test_originate_uses_defaults() {
        let loan = originate(LoanApplication::new(Money::from_major(5_000))).unwrap();

        assert_eq!(loan.interest_rate, Rate::from_percentage(10));
        assert_eq!(loan.months, 10);
        assert_eq!(loan.start_date, NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
        assert_eq!(loan.monthly_payment, Money::from_major(550));
    }

    #[test]
    fn test_originate_rounds_to_persisted_scale() {
        let loan = originate(
            LoanApplication::new(Money::from_decimal(dec!(1000.005)))
                .rate(Rate::from_percent(dec!(12.5)))
                .months(7),
        )
        .unwrap();

        assert_eq!(loan.total_amount, Money::from_decimal(dec!(1000.00)));
        assert_eq!(loan.total_with_interest, Money::from_decimal(dec!(1125.00)));
        // 1125 / 7 = 160.714285...
        assert_eq!(loan.monthly_payment, Money::from_decimal(dec!(160.71)));
    }

    #[test]
    fn test_originate_rejects_invalid_inputs() {
        assert!(matches!(
            originate(LoanApplication::new(Money::from_major(1_000)).months(0)),
            Err(LoanError::InvalidTerm { months: 0 })
        ));
        assert!(matches!(
            originate(LoanApplication::new(Money::ZERO)),
            Err(LoanError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_terms_are_not_recomputed() {
        let mut loan = originate(LoanApplication::new(Money::from_major(10_000)).months(10)).unwrap();
        let before = loan.clone();

        // edits after origination must not ripple into the derived fields
        loan.total_amount = Money::from_major(50_000);
        loan.interest_rate = Rate::from_percentage(30);
        assert!(!loan.apply_terms(2).unwrap());

        assert_eq!(loan.monthly_payment, before.monthly_payment);
        assert_eq!(loan.total_with_interest, before.total_with_interest);
        assert_eq!(loan.remaining_amount, before.remaining_amount);
    }

    #[test]
    fn test_mark_overdue() {
        let mut loan = originate(LoanApplication::new(Money::from_major(1_000))).unwrap();
        let later = created_at() + chrono::Duration::days(40);

        loan.mark_overdue(later).unwrap();
        assert_eq!(loan.status, LoanStatus::Overdue);
        assert_eq!(loan.last_status_change, later);

        // marking twice is harmless
        loan.mark_overdue(later).unwrap();

        loan.update_status(LoanStatus::Completed, later);
        assert!(matches!(
            loan.mark_overdue(later),
            Err(LoanError::UnexpectedStatus { status: LoanStatus::Completed, .. })
        ));
    }
}
