//! Calendar-month arithmetic used for every due date in the crate.

use chrono::{Months, NaiveDate};

use crate::errors::{LoanError, Result};

/// add whole calendar months, clamping the day to the end of the target month
///
/// Jan 31 + 1 month is Feb 29 in a leap year and Feb 28 otherwise; the result never
/// spills over into the following month.
pub fn add_calendar_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LoanError::InvalidDate {
            message: format!("{} + {} months is out of range", date, months),
        })
}
