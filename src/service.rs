use std::collections::HashMap;
use std::sync::Arc;

use hourglass_rs::{SafeTimeProvider, TimeSource};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::config::LoanConfig;
use crate::errors::{LoanError, Result};
use crate::events::{EventStore, LoanEvent};
use crate::loan::{Loan, LoanApplication};
use crate::parties::{Capability, Customer, CustomerRef, Employee, EmployeeUpdate, NewCustomer, NewEmployee};
use crate::payments::{
    build_schedule, progress_percent, LoanLedger, PaymentOutcome, PaymentResult, ScheduleEntry,
};
use crate::portfolio::{DashboardSummary, RecentLoan};
use crate::repository::LoanRepository;
use crate::types::{EmployeeId, EntryId, LoanId, LoanStatus};
use crate::views::LoanDetailView;

/// entry point for everything an employee does with the loan book
///
/// Writes to a single loan are serialized through a per-loan lock, so a schedule
/// entry is paid at most once however many callers race on it.
pub struct LoanService<R: LoanRepository> {
    repo: R,
    config: LoanConfig,
    locks: Mutex<HashMap<LoanId, Arc<Mutex<()>>>>,
    events: Mutex<EventStore>,
}

impl<R: LoanRepository> LoanService<R> {
    pub fn new(repo: R, config: LoanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            repo,
            config,
            locks: Mutex::new(HashMap::new()),
            events: Mutex::new(EventStore::new()),
        })
    }

    pub fn with_defaults(repo: R) -> Self {
        Self {
            repo,
            config: LoanConfig::default(),
            locks: Mutex::new(HashMap::new()),
            events: Mutex::new(EventStore::new()),
        }
    }

    pub fn config(&self) -> &LoanConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// drain the events collected so far
    pub fn take_events(&self) -> Vec<LoanEvent> {
        self.events.lock().take_events()
    }

    fn loan_lock(&self, loan_id: LoanId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        // locks nobody holds any more
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let lock = locks
            .entry(loan_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock
    }

    fn authorize(&self, employee_id: EmployeeId, capability: Capability) -> Result<Employee> {
        let employee = self.repo.find_employee(employee_id)?;
        if let Err(err) = employee.require(capability) {
            warn!(employee_id = %employee_id, ?capability, "permission denied");
            return Err(err);
        }
        Ok(employee)
    }

    // --- employees ---

    /// create the first superuser of an empty loan book
    pub fn bootstrap_superuser(&self, details: NewEmployee, time: &SafeTimeProvider) -> Result<Employee> {
        if !self.repo.list_employees()?.is_empty() {
            return Err(LoanError::InvalidState {
                current: "employees exist".to_string(),
                expected: "empty employee register".to_string(),
            });
        }

        let mut employee = Employee::new(details, time.now());
        employee.is_superuser = true;
        self.repo.insert_employee(&employee)?;
        info!(employee_id = %employee.id, username = %employee.username, "superuser created");
        Ok(employee)
    }

    pub fn create_employee(
        &self,
        actor_id: EmployeeId,
        details: NewEmployee,
        time: &SafeTimeProvider,
    ) -> Result<Employee> {
        self.authorize(actor_id, Capability::ManageEmployees)?;

        let employee = Employee::new(details, time.now());
        self.repo.insert_employee(&employee)?;
        info!(employee_id = %employee.id, username = %employee.username, "employee created");
        Ok(employee)
    }

    pub fn update_employee(
        &self,
        actor_id: EmployeeId,
        employee_id: EmployeeId,
        update: EmployeeUpdate,
    ) -> Result<Employee> {
        self.authorize(actor_id, Capability::ManageEmployees)?;

        let mut employee = self.repo.find_employee(employee_id)?;
        employee.apply(update);
        self.repo.update_employee(&employee)?;
        info!(employee_id = %employee.id, active = employee.is_active_employee, "employee updated");
        Ok(employee)
    }

    pub fn list_employees(&self, actor_id: EmployeeId) -> Result<Vec<Employee>> {
        self.authorize(actor_id, Capability::ManageEmployees)?;
        self.repo.list_employees()
    }

    // --- customers ---

    pub fn register_customer(
        &self,
        employee_id: EmployeeId,
        details: NewCustomer,
        time: &SafeTimeProvider,
    ) -> Result<Customer> {
        let employee = self.authorize(employee_id, Capability::OperateLoans)?;

        let customer = Customer::register(details, employee.id, time.now());
        self.repo.insert_customer(&customer)?;
        info!(customer_id = %customer.id, employee_id = %employee.id, "customer registered");
        Ok(customer)
    }

    pub fn customers_for_employee(&self, employee_id: EmployeeId) -> Result<Vec<Customer>> {
        self.repo.find_employee(employee_id)?;
        self.repo.customers_by_employee(employee_id)
    }

    // --- loans ---

    /// originate a loan and lay out its repayment schedule
    ///
    /// The customer when new, the loan and its schedule are stored together, and only
    /// once the application has passed validation and every due date is known.
    pub fn create_loan(
        &self,
        employee_id: EmployeeId,
        customer: CustomerRef,
        application: &LoanApplication,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        let employee = self.authorize(employee_id, Capability::OperateLoans)?;
        let now = time.now();

        let (customer_id, new_customer) = match customer {
            CustomerRef::Existing(id) => (self.repo.find_customer(id)?.id, None),
            CustomerRef::New(details) => {
                let customer = Customer::register(details, employee.id, now);
                (customer.id, Some(customer))
            }
        };

        let loan = Loan::originate(application, customer_id, employee.id, &self.config, now)?;
        let entries = build_schedule(&loan)?;

        self.repo.insert_origination(new_customer.as_ref(), &loan, &entries)?;
        if let Some(customer) = &new_customer {
            info!(customer_id = %customer.id, employee_id = %employee.id, "customer registered");
        }

        self.events.lock().emit(LoanEvent::LoanOriginated {
            loan_id: loan.id,
            customer_id: loan.customer_id,
            employee_id: loan.employee_id,
            principal: loan.total_amount,
            total_with_interest: loan.total_with_interest,
            monthly_payment: loan.monthly_payment,
            months: loan.months,
            timestamp: now,
        });
        info!(
            loan_id = %loan.id,
            principal = %loan.total_amount,
            rate = %loan.interest_rate,
            months = loan.months,
            monthly_payment = %loan.monthly_payment,
            "loan originated"
        );
        self.schedule_generated(loan.id, &entries);

        Ok(loan)
    }

    pub fn create_loan_now(
        &self,
        employee_id: EmployeeId,
        customer: CustomerRef,
        application: &LoanApplication,
    ) -> Result<Loan> {
        let time = SafeTimeProvider::new(TimeSource::System);
        self.create_loan(employee_id, customer, application, &time)
    }

    /// lay out the loan's schedule unless it already has one; returns entries created
    pub fn generate_schedule(&self, loan_id: LoanId) -> Result<usize> {
        let lock = self.loan_lock(loan_id);
        let _guard = lock.lock();

        let loan = self.repo.find_loan(loan_id)?;
        if self.repo.has_entries(loan_id)? {
            debug!(loan_id = %loan_id, "schedule already generated");
            return Ok(0);
        }

        let entries = build_schedule(&loan)?;
        self.repo.insert_entries(&entries)?;
        self.schedule_generated(loan_id, &entries);
        Ok(entries.len())
    }

    fn schedule_generated(&self, loan_id: LoanId, entries: &[ScheduleEntry]) {
        if let (Some(first), Some(last)) = (entries.first(), entries.last()) {
            self.events.lock().emit(LoanEvent::ScheduleGenerated {
                loan_id,
                entries: entries.len() as u32,
                first_due_date: first.due_date,
                last_due_date: last.due_date,
            });
        }
        debug!(loan_id = %loan_id, entries = entries.len(), "schedule generated");
    }

    /// pay one schedule entry in full
    ///
    /// Paying an entry that is already paid changes nothing and reports
    /// `PaymentOutcome::AlreadyPaid`.
    pub fn pay_entry(&self, entry_id: EntryId, time: &SafeTimeProvider) -> Result<PaymentResult> {
        let loan_id = self.repo.find_entry(entry_id)?.loan_id;

        let lock = self.loan_lock(loan_id);
        let _guard = lock.lock();

        // re-read under the lock, another payment may have landed meanwhile
        let mut entry = self.repo.find_entry(entry_id)?;
        let mut loan = self.repo.find_loan(loan_id)?;

        let mut events = EventStore::new();
        let outcome = LoanLedger::apply_payment(&mut loan, &mut entry, time.now(), &mut events)?;

        if let PaymentOutcome::Applied(_) = outcome {
            let mut entries = self.repo.entries_for_loan(loan_id)?;
            if let Some(stored) = entries.iter_mut().find(|e| e.id == entry.id) {
                *stored = entry.clone();
            }
            if let Err(err) = LoanLedger::reconcile(&loan, &entries) {
                error!(loan_id = %loan_id, error = %err, "balance out of step with schedule");
                return Err(err);
            }

            self.repo.commit_payment(&loan, &entry)?;
        }

        self.events.lock().extend(events.take_events());
        Ok(PaymentResult { loan, outcome })
    }

    pub fn pay_entry_now(&self, entry_id: EntryId) -> Result<PaymentResult> {
        let time = SafeTimeProvider::new(TimeSource::System);
        self.pay_entry(entry_id, &time)
    }

    /// pay an entry on behalf of an employee; only the loan's issuer may do so
    pub fn pay_entry_as(
        &self,
        employee_id: EmployeeId,
        entry_id: EntryId,
        time: &SafeTimeProvider,
    ) -> Result<PaymentResult> {
        let employee = self.authorize(employee_id, Capability::OperateLoans)?;

        let entry = self.repo.find_entry(entry_id)?;
        let loan = self.repo.find_loan(entry.loan_id)?;
        if loan.employee_id != employee.id {
            warn!(employee_id = %employee.id, loan_id = %loan.id, "payment on another employee's loan");
            return Err(LoanError::PermissionDenied {
                reason: format!("loan {} was issued by another employee", loan.id),
            });
        }

        self.pay_entry(entry_id, time)
    }

    /// flag a loan whose due date passed unpaid
    pub fn mark_overdue(&self, loan_id: LoanId, time: &SafeTimeProvider) -> Result<Loan> {
        let lock = self.loan_lock(loan_id);
        let _guard = lock.lock();

        let mut loan = self.repo.find_loan(loan_id)?;
        let old_status = loan.status;
        let now = time.now();
        loan.mark_overdue(now)?;

        if old_status != loan.status {
            self.repo.update_loan(&loan)?;
            self.events.lock().emit(LoanEvent::StatusChanged {
                loan_id,
                old_status,
                new_status: LoanStatus::Overdue,
                reason: "due date passed unpaid".to_string(),
                timestamp: now,
            });
            info!(loan_id = %loan_id, "loan marked overdue");
        }
        Ok(loan)
    }

    pub fn mark_overdue_now(&self, loan_id: LoanId) -> Result<Loan> {
        let time = SafeTimeProvider::new(TimeSource::System);
        self.mark_overdue(loan_id, &time)
    }

    // --- queries ---

    /// share of the loan's months already paid, as a percentage
    pub fn progress_percent(&self, loan_id: LoanId) -> Result<Decimal> {
        let loan = self.repo.find_loan(loan_id)?;
        let paid = self.repo.count_paid(loan_id)?;
        Ok(progress_percent(loan.months, paid))
    }

    /// the loan's schedule entries in month order
    pub fn schedule(&self, loan_id: LoanId) -> Result<Vec<ScheduleEntry>> {
        self.repo.find_loan(loan_id)?;
        self.repo.entries_for_loan(loan_id)
    }

    pub fn loan_detail(&self, loan_id: LoanId) -> Result<LoanDetailView> {
        let loan = self.repo.find_loan(loan_id)?;
        let customer = self.repo.find_customer(loan.customer_id)?;
        let entries = self.repo.entries_for_loan(loan_id)?;
        Ok(LoanDetailView::new(&loan, &customer, &entries))
    }

    /// loans issued by an employee, newest first
    pub fn loans_for_employee(&self, employee_id: EmployeeId) -> Result<Vec<Loan>> {
        self.repo.find_employee(employee_id)?;
        self.repo.loans_by_employee(employee_id)
    }

    pub fn dashboard(&self, employee_id: EmployeeId) -> Result<DashboardSummary> {
        self.repo.find_employee(employee_id)?;

        let customers = self.repo.customers_by_employee(employee_id)?;
        let loans = self.repo.loans_by_employee(employee_id)?;
        let recent_loans = loans
            .iter()
            .take(self.config.dashboard.recent_loans)
            .map(|loan| -> Result<RecentLoan> { Ok(RecentLoan::new(loan, self.repo.count_paid(loan.id)?)) })
            .collect::<Result<Vec<_>>>()?;

        Ok(DashboardSummary::build(employee_id, customers.len(), &loans, recent_loans))
    }
}
