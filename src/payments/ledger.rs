use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::{EventStore, LoanEvent};
use crate::loan::Loan;
use crate::payments::schedule::ScheduleEntry;
use crate::types::{EntryId, LoanId, LoanStatus};

/// record of a payment the ledger applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub loan_id: LoanId,
    pub entry_id: EntryId,
    pub month_number: u32,
    pub amount: Money,
    pub paid_date: DateTime<Utc>,
    pub remaining_amount: Money,
    pub loan_completed: bool,
}

/// result of asking the ledger to pay an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PaymentOutcome {
    Applied(PaymentReceipt),
    /// entry was paid before; nothing changed
    AlreadyPaid {
        entry_id: EntryId,
        month_number: u32,
        paid_date: Option<DateTime<Utc>>,
    },
}

impl PaymentOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PaymentOutcome::Applied(_))
    }

    pub fn receipt(&self) -> Option<&PaymentReceipt> {
        match self {
            PaymentOutcome::Applied(receipt) => Some(receipt),
            PaymentOutcome::AlreadyPaid { .. } => None,
        }
    }
}

/// owns the payment state machine of a loan and its schedule entries
pub struct LoanLedger;

impl LoanLedger {
    /// mark an entry paid and draw the loan's remaining amount down by its amount
    ///
    /// Both records are only touched once every check has passed, so the pair is
    /// either fully updated or left as it was.
    pub fn apply_payment(
        loan: &mut Loan,
        entry: &mut ScheduleEntry,
        paid_at: DateTime<Utc>,
        events: &mut EventStore,
    ) -> Result<PaymentOutcome> {
        if entry.loan_id != loan.id {
            return Err(LoanError::InvalidState {
                current: format!("entry {} belongs to loan {}", entry.id, entry.loan_id),
                expected: format!("entry of loan {}", loan.id),
            });
        }

        if entry.is_paid {
            warn!(
                loan_id = %loan.id,
                entry_id = %entry.id,
                month = entry.month_number,
                "schedule entry already paid"
            );
            events.emit(LoanEvent::PaymentAlreadyApplied {
                loan_id: loan.id,
                entry_id: entry.id,
                month_number: entry.month_number,
                paid_date: entry.paid_date,
            });
            return Ok(PaymentOutcome::AlreadyPaid {
                entry_id: entry.id,
                month_number: entry.month_number,
                paid_date: entry.paid_date,
            });
        }

        entry.is_paid = true;
        entry.paid_date = Some(paid_at);
        entry.paid_amount = Some(entry.amount);

        loan.remaining_amount = (loan.remaining_amount - entry.amount).max(Money::ZERO);

        events.emit(LoanEvent::PaymentApplied {
            loan_id: loan.id,
            entry_id: entry.id,
            month_number: entry.month_number,
            amount: entry.amount,
            remaining_amount: loan.remaining_amount,
            timestamp: paid_at,
        });
        info!(
            loan_id = %loan.id,
            month = entry.month_number,
            amount = %entry.amount,
            remaining = %loan.remaining_amount,
            "payment applied"
        );

        let loan_completed = loan.remaining_amount.is_zero();
        if loan_completed && loan.status != LoanStatus::Completed {
            let old_status = loan.status;
            loan.update_status(LoanStatus::Completed, paid_at);

            events.emit(LoanEvent::StatusChanged {
                loan_id: loan.id,
                old_status,
                new_status: LoanStatus::Completed,
                reason: "remaining amount paid off".to_string(),
                timestamp: paid_at,
            });
            events.emit(LoanEvent::LoanCompleted {
                loan_id: loan.id,
                final_payment: entry.amount,
                timestamp: paid_at,
            });
            info!(loan_id = %loan.id, "loan completed");
        }

        Ok(PaymentOutcome::Applied(PaymentReceipt {
            loan_id: loan.id,
            entry_id: entry.id,
            month_number: entry.month_number,
            amount: entry.amount,
            paid_date: paid_at,
            remaining_amount: loan.remaining_amount,
            loan_completed,
        }))
    }

    /// compare the incrementally maintained balance with the one derived from entries
    pub fn reconcile(loan: &Loan, entries: &[ScheduleEntry]) -> Result<()> {
        let derived = outstanding_from_entries(loan, entries);
        if derived != loan.remaining_amount {
            return Err(LoanError::BalanceMismatch {
                loan_id: loan.id,
                recorded: loan.remaining_amount,
                derived,
            });
        }
        Ok(())
    }
}

/// share of the term already paid, as a percentage; zero for a zero-month term
pub fn progress_percent(months: u32, paid_count: usize) -> Decimal {
    if months == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(paid_count as u64) / Decimal::from(months) * Decimal::ONE_HUNDRED
}

/// number of paid entries
pub fn paid_count(entries: &[ScheduleEntry]) -> usize {
    entries.iter().filter(|e| e.is_paid).count()
}

/// remaining amount derived from the loan total and the paid entries
pub fn outstanding_from_entries(loan: &Loan, entries: &[ScheduleEntry]) -> Money {
    let paid: Money = entries
        .iter()
        .filter(|e| e.loan_id == loan.id)
        .filter_map(|e| e.paid_amount)
        .sum();
    (loan.total_with_interest - paid).max(Money::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoanConfig;
    use crate::decimal::Rate;
    use crate::loan::LoanApplication;
    use crate::payments::schedule::build_schedule;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 10, 30, 0).unwrap()
    }

    fn loan(principal: i64, rate: u32, months: u32) -> (Loan, Vec<ScheduleEntry>) {
        let application = LoanApplication {
            principal: Money::from_major(principal),
            interest_rate: Some(Rate::from_percentage(rate)),
            months: Some(months),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        };
        let loan = Loan::originate(
            &application,
            Uuid::new_v4(),
            Uuid::new_v4(),
            &LoanConfig::default(),
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        )
        .unwrap();
        let schedule = build_schedule(&loan).unwrap();
        (loan, schedule)
    }

    #[test]
    fn test_single_payment_completes_loan() {
        let (mut loan, mut schedule) = loan(1_000, 0, 1);
        assert_eq!(loan.remaining_amount, Money::from_major(1_000));
        assert_eq!(schedule[0].amount, Money::from_major(1_000));

        let mut events = EventStore::new();
        let outcome = LoanLedger::apply_payment(&mut loan, &mut schedule[0], now(), &mut events).unwrap();

        let receipt = outcome.receipt().unwrap();
        assert!(receipt.loan_completed);
        assert_eq!(loan.status, LoanStatus::Completed);
        assert_eq!(loan.remaining_amount, Money::ZERO);
        assert!(schedule[0].is_paid);
        assert_eq!(schedule[0].paid_date, Some(now()));
        assert_eq!(schedule[0].paid_amount, Some(Money::from_major(1_000)));

        assert!(events.events().iter().any(|e| matches!(e, LoanEvent::LoanCompleted { .. })));
    }

    #[test]
    fn test_second_payment_is_a_no_op() {
        let (mut loan, mut schedule) = loan(10_000, 10, 10);
        let mut events = EventStore::new();

        let first = LoanLedger::apply_payment(&mut loan, &mut schedule[0], now(), &mut events).unwrap();
        assert!(first.is_applied());
        let remaining = loan.remaining_amount;
        assert_eq!(remaining, Money::from_major(9_900));

        let later = now() + chrono::Duration::days(3);
        let second = LoanLedger::apply_payment(&mut loan, &mut schedule[0], later, &mut events).unwrap();

        assert_eq!(
            second,
            PaymentOutcome::AlreadyPaid {
                entry_id: schedule[0].id,
                month_number: 1,
                paid_date: Some(now()),
            }
        );
        assert_eq!(loan.remaining_amount, remaining);
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(schedule[0].paid_date, Some(now()));
    }

    #[test]
    fn test_remaining_amount_clamps_at_zero() {
        let (mut loan, mut schedule) = loan(1_000, 0, 2);
        // balance drifted below the installment
        loan.remaining_amount = Money::from_major(300);

        let mut events = EventStore::new();
        LoanLedger::apply_payment(&mut loan, &mut schedule[0], now(), &mut events).unwrap();

        assert_eq!(loan.remaining_amount, Money::ZERO);
        assert_eq!(loan.status, LoanStatus::Completed);
    }

    #[test]
    fn test_overdue_loan_completes_when_paid_off() {
        let (mut loan, mut schedule) = loan(500, 0, 1);
        loan.mark_overdue(now()).unwrap();

        let mut events = EventStore::new();
        LoanLedger::apply_payment(&mut loan, &mut schedule[0], now(), &mut events).unwrap();

        assert_eq!(loan.status, LoanStatus::Completed);
        assert!(events.events().iter().any(|e| matches!(
            e,
            LoanEvent::StatusChanged { old_status: LoanStatus::Overdue, new_status: LoanStatus::Completed, .. }
        )));
    }

    #[test]
    fn test_entry_from_another_loan_is_rejected() {
        let (mut loan_a, _) = loan(1_000, 10, 2);
        let (_, mut schedule_b) = loan(1_000, 10, 2);

        let mut events = EventStore::new();
        let result = LoanLedger::apply_payment(&mut loan_a, &mut schedule_b[0], now(), &mut events);

        assert!(matches!(result, Err(LoanError::InvalidState { .. })));
        assert!(!schedule_b[0].is_paid);
        assert_eq!(loan_a.remaining_amount, loan_a.total_with_interest);
        assert!(events.is_empty());
    }

    #[test]
    fn test_incremental_balance_matches_derived_balance() {
        let (mut loan, mut schedule) = loan(10_000, 10, 3);
        let mut events = EventStore::new();

        LoanLedger::reconcile(&loan, &schedule).unwrap();
        for i in 0..schedule.len() {
            LoanLedger::apply_payment(&mut loan, &mut schedule[i], now(), &mut events).unwrap();
            assert_eq!(loan.remaining_amount, outstanding_from_entries(&loan, &schedule));
            LoanLedger::reconcile(&loan, &schedule).unwrap();
        }

        assert_eq!(loan.remaining_amount, Money::ZERO);
        assert_eq!(loan.status, LoanStatus::Completed);
    }

    #[test]
    fn test_reconcile_detects_drift() {
        let (mut loan, schedule) = loan(1_000, 10, 2);
        loan.remaining_amount = Money::from_major(1);

        assert!(matches!(
            LoanLedger::reconcile(&loan, &schedule),
            Err(LoanError::BalanceMismatch { .. })
        ));
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(10, 0), Decimal::ZERO);
        assert_eq!(progress_percent(10, 3), dec!(30));
        assert_eq!(progress_percent(10, 10), dec!(100));
        assert_eq!(progress_percent(4, 1), dec!(25));
    }

    #[test]
    fn test_progress_percent_zero_term() {
        assert_eq!(progress_percent(0, 0), Decimal::ZERO);
        assert_eq!(progress_percent(0, 5), Decimal::ZERO);
    }

    #[test]
    fn test_end_to_end_ledger() {
        let (mut loan, mut schedule) = loan(10_000, 10, 10);
        assert_eq!(loan.total_with_interest, Money::from_major(11_000));
        assert_eq!(loan.monthly_payment, Money::from_major(1_100));

        let mut events = EventStore::new();
        for entry in schedule.iter_mut() {
            LoanLedger::apply_payment(&mut loan, entry, now(), &mut events).unwrap();
        }

        assert_eq!(loan.remaining_amount, Money::ZERO);
        assert_eq!(loan.status, LoanStatus::Completed);
        assert_eq!(progress_percent(loan.months, paid_count(&schedule)), dec!(100));
    }
}
