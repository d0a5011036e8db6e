pub mod memory;

use crate::errors::Result;
use crate::loan::Loan;
use crate::parties::{Customer, Employee};
use crate::payments::ScheduleEntry;
use crate::types::{CustomerId, EmployeeId, EntryId, LoanId};

pub use memory::InMemoryRepository;

/// Persistence boundary for the loan book.
///
/// Lookups of absent records fail with `LoanError::NotFound`; callers pass that
/// error through unchanged.
pub trait LoanRepository: Send + Sync {
    fn insert_customer(&self, customer: &Customer) -> Result<()>;
    fn find_customer(&self, id: CustomerId) -> Result<Customer>;
    /// customers registered by an employee
    fn customers_by_employee(&self, employee_id: EmployeeId) -> Result<Vec<Customer>>;

    /// fails with `DuplicateUsername` when the username is taken
    fn insert_employee(&self, employee: &Employee) -> Result<()>;
    fn update_employee(&self, employee: &Employee) -> Result<()>;
    fn find_employee(&self, id: EmployeeId) -> Result<Employee>;
    fn find_employee_by_username(&self, username: &str) -> Result<Option<Employee>>;
    fn list_employees(&self) -> Result<Vec<Employee>>;

    fn insert_loan(&self, loan: &Loan) -> Result<()>;
    fn update_loan(&self, loan: &Loan) -> Result<()>;
    fn find_loan(&self, id: LoanId) -> Result<Loan>;
    /// loans issued by an employee, newest first
    fn loans_by_employee(&self, employee_id: EmployeeId) -> Result<Vec<Loan>>;

    /// store a batch of entries; `(loan_id, month_number)` is unique and a batch
    /// containing a duplicate stores nothing
    fn insert_entries(&self, entries: &[ScheduleEntry]) -> Result<()>;
    /// store a newly originated loan with its schedule, and its customer when new;
    /// every record is written or none is
    fn insert_origination(
        &self,
        customer: Option<&Customer>,
        loan: &Loan,
        entries: &[ScheduleEntry],
    ) -> Result<()>;
    fn find_entry(&self, id: EntryId) -> Result<ScheduleEntry>;
    /// entries of a loan ordered by month number
    fn entries_for_loan(&self, loan_id: LoanId) -> Result<Vec<ScheduleEntry>>;

    /// Write a paid entry together with its updated loan.
    ///
    /// Both records are written or neither is. The write only happens while the
    /// stored entry is still unpaid; otherwise `LoanError::InvalidState` is returned.
    fn commit_payment(&self, loan: &Loan, entry: &ScheduleEntry) -> Result<()>;

    fn entries_by_paid_status(&self, loan_id: LoanId, is_paid: bool) -> Result<Vec<ScheduleEntry>> {
        Ok(self
            .entries_for_loan(loan_id)?
            .into_iter()
            .filter(|e| e.is_paid == is_paid)
            .collect())
    }

    fn has_entries(&self, loan_id: LoanId) -> Result<bool> {
        Ok(!self.entries_for_loan(loan_id)?.is_empty())
    }

    fn count_paid(&self, loan_id: LoanId) -> Result<usize> {
        Ok(self.entries_by_paid_status(loan_id, true)?.len())
    }
}
