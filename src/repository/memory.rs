use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::errors::{LoanError, Result};
use crate::loan::Loan;
use crate::parties::{Customer, Employee};
use crate::payments::ScheduleEntry;
use crate::repository::LoanRepository;
use crate::types::{CustomerId, EmployeeId, EntryId, LoanId};

#[derive(Debug, Default)]
struct Store {
    customers: HashMap<CustomerId, Customer>,
    employees: HashMap<EmployeeId, Employee>,
    loans: HashMap<LoanId, Loan>,
    entries: HashMap<EntryId, ScheduleEntry>,
    months_by_loan: HashMap<LoanId, HashSet<u32>>,
}

impl Store {
    /// check a batch of entries before any of it is written; `pending_loan` is a
    /// loan written in the same batch
    fn check_entries(&self, entries: &[ScheduleEntry], pending_loan: Option<LoanId>) -> Result<()> {
        let mut batch: HashSet<(LoanId, u32)> = HashSet::new();
        for entry in entries {
            if Some(entry.loan_id) != pending_loan && !self.loans.contains_key(&entry.loan_id) {
                return Err(LoanError::not_found("loan", entry.loan_id));
            }
            let taken = self
                .months_by_loan
                .get(&entry.loan_id)
                .is_some_and(|months| months.contains(&entry.month_number));
            if taken || !batch.insert((entry.loan_id, entry.month_number)) {
                return Err(LoanError::DuplicateScheduleEntry {
                    loan_id: entry.loan_id,
                    month_number: entry.month_number,
                });
            }
        }
        Ok(())
    }

    fn write_entries(&mut self, entries: &[ScheduleEntry]) {
        for entry in entries {
            self.months_by_loan
                .entry(entry.loan_id)
                .or_default()
                .insert(entry.month_number);
            self.entries.insert(entry.id, entry.clone());
        }
    }
}

/// loan book kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoanRepository for InMemoryRepository {
    fn insert_customer(&self, customer: &Customer) -> Result<()> {
        self.store.write().customers.insert(customer.id, customer.clone());
        Ok(())
    }

    fn find_customer(&self, id: CustomerId) -> Result<Customer> {
        self.store
            .read()
            .customers
            .get(&id)
            .cloned()
            .ok_or(LoanError::not_found("customer", id))
    }

    fn customers_by_employee(&self, employee_id: EmployeeId) -> Result<Vec<Customer>> {
        let store = self.store.read();
        let mut customers: Vec<Customer> = store
            .customers
            .values()
            .filter(|c| c.created_by == Some(employee_id))
            .cloned()
            .collect();
        customers.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(customers)
    }

    fn insert_employee(&self, employee: &Employee) -> Result<()> {
        let mut store = self.store.write();
        if store.employees.values().any(|e| e.username == employee.username) {
            return Err(LoanError::DuplicateUsername {
                username: employee.username.clone(),
            });
        }
        store.employees.insert(employee.id, employee.clone());
        Ok(())
    }

    fn update_employee(&self, employee: &Employee) -> Result<()> {
        let mut store = self.store.write();
        let stored = store
            .employees
            .get_mut(&employee.id)
            .ok_or(LoanError::not_found("employee", employee.id))?;
        *stored = employee.clone();
        Ok(())
    }

    fn find_employee(&self, id: EmployeeId) -> Result<Employee> {
        self.store
            .read()
            .employees
            .get(&id)
            .cloned()
            .ok_or(LoanError::not_found("employee", id))
    }

    fn find_employee_by_username(&self, username: &str) -> Result<Option<Employee>> {
        Ok(self
            .store
            .read()
            .employees
            .values()
            .find(|e| e.username == username)
            .cloned())
    }

    fn list_employees(&self) -> Result<Vec<Employee>> {
        let mut employees: Vec<Employee> = self.store.read().employees.values().cloned().collect();
        employees.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(employees)
    }

    fn insert_loan(&self, loan: &Loan) -> Result<()> {
        self.store.write().loans.insert(loan.id, loan.clone());
        Ok(())
    }

    fn update_loan(&self, loan: &Loan) -> Result<()> {
        let mut store = self.store.write();
        let stored = store
            .loans
            .get_mut(&loan.id)
            .ok_or(LoanError::not_found("loan", loan.id))?;
        *stored = loan.clone();
        Ok(())
    }

    fn find_loan(&self, id: LoanId) -> Result<Loan> {
        self.store
            .read()
            .loans
            .get(&id)
            .cloned()
            .ok_or(LoanError::not_found("loan", id))
    }

    fn loans_by_employee(&self, employee_id: EmployeeId) -> Result<Vec<Loan>> {
        let store = self.store.read();
        let mut loans: Vec<Loan> = store
            .loans
            .values()
            .filter(|l| l.employee_id == employee_id)
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(loans)
    }

    fn insert_entries(&self, entries: &[ScheduleEntry]) -> Result<()> {
        let mut store = self.store.write();
        store.check_entries(entries, None)?;
        store.write_entries(entries);
        Ok(())
    }

    fn insert_origination(
        &self,
        customer: Option<&Customer>,
        loan: &Loan,
        entries: &[ScheduleEntry],
    ) -> Result<()> {
        let mut store = self.store.write();
        store.check_entries(entries, Some(loan.id))?;

        if let Some(customer) = customer {
            store.customers.insert(customer.id, customer.clone());
        }
        store.loans.insert(loan.id, loan.clone());
        store.write_entries(entries);
        Ok(())
    }

    fn find_entry(&self, id: EntryId) -> Result<ScheduleEntry> {
        self.store
            .read()
            .entries
            .get(&id)
            .cloned()
            .ok_or(LoanError::not_found("schedule entry", id))
    }

    fn entries_for_loan(&self, loan_id: LoanId) -> Result<Vec<ScheduleEntry>> {
        let store = self.store.read();
        let mut entries: Vec<ScheduleEntry> = store
            .entries
            .values()
            .filter(|e| e.loan_id == loan_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.month_number);
        Ok(entries)
    }

    fn commit_payment(&self, loan: &Loan, entry: &ScheduleEntry) -> Result<()> {
        let mut store = self.store.write();

        if entry.loan_id != loan.id {
            return Err(LoanError::InvalidState {
                current: format!("entry {} belongs to loan {}", entry.id, entry.loan_id),
                expected: format!("entry of loan {}", loan.id),
            });
        }
        if !store.loans.contains_key(&loan.id) {
            return Err(LoanError::not_found("loan", loan.id));
        }
        let stored = store
            .entries
            .get(&entry.id)
            .ok_or(LoanError::not_found("schedule entry", entry.id))?;
        if stored.is_paid {
            return Err(LoanError::InvalidState {
                current: format!("entry {} already paid", entry.id),
                expected: "unpaid entry".to_string(),
            });
        }

        store.entries.insert(entry.id, entry.clone());
        store.loans.insert(loan.id, loan.clone());
        Ok(())
    }
}
