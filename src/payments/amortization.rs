use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};

/// derived terms of a simple-interest installment loan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub interest_amount: Money,
    pub total_with_interest: Money,
    pub monthly_payment: Money,
    pub months: u32,
}

impl LoanTerms {
    /// round derived amounts to the persisted scale
    ///
    /// The monthly payment is rounded independently of the total; the ledger clamps
    /// the remaining amount at zero when the installments overshoot.
    pub fn persisted(&self, decimal_places: u32) -> Self {
        Self {
            principal: self.principal.round_dp(decimal_places),
            interest_amount: self.interest_amount.round_dp(decimal_places),
            total_with_interest: self.total_with_interest.round_dp(decimal_places),
            monthly_payment: self.monthly_payment.round_dp(decimal_places),
            months: self.months,
        }
    }

    /// difference between the installments and the total, zero up to rounding
    pub fn rounding_gap(&self) -> Money {
        (self.monthly_payment * Decimal::from(self.months) - self.total_with_interest).abs()
    }
}

/// compute total-with-interest and the fixed monthly payment
///
/// Interest is simple and charged once over the whole term:
/// `total = principal + principal * rate`, `monthly = total / months`.
/// Negative rates pass through unchanged; origination policy decides whether
/// to accept them.
pub fn compute_terms(principal: Money, annual_rate: Rate, months: u32) -> Result<LoanTerms> {
    if months == 0 {
        return Err(LoanError::InvalidTerm { months });
    }
    if !principal.is_positive() {
        return Err(LoanError::InvalidAmount { amount: principal });
    }

    let interest_amount = principal.apply_rate(annual_rate);
    let total_with_interest = principal + interest_amount;
    let monthly_payment = total_with_interest / Decimal::from(months);

    Ok(LoanTerms {
        principal,
        interest_amount,
        total_with_interest,
        monthly_payment,
        months,
    })
}
