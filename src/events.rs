use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{CustomerId, EmployeeId, EntryId, LoanId, LoanStatus};

/// all events that can be emitted over a loan's lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoanEvent {
    LoanOriginated {
        loan_id: LoanId,
        customer_id: CustomerId,
        employee_id: EmployeeId,
        principal: Money,
        total_with_interest: Money,
        monthly_payment: Money,
        months: u32,
        timestamp: DateTime<Utc>,
    },
    ScheduleGenerated {
        loan_id: LoanId,
        entries: u32,
        first_due_date: NaiveDate,
        last_due_date: NaiveDate,
    },
    PaymentApplied {
        loan_id: LoanId,
        entry_id: EntryId,
        month_number: u32,
        amount: Money,
        remaining_amount: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentAlreadyApplied {
        loan_id: LoanId,
        entry_id: EntryId,
        month_number: u32,
        paid_date: Option<DateTime<Utc>>,
    },
    LoanCompleted {
        loan_id: LoanId,
        final_payment: Money,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl LoanEvent {
    pub fn loan_id(&self) -> LoanId {
        match self {
            LoanEvent::LoanOriginated { loan_id, .. }
            | LoanEvent::ScheduleGenerated { loan_id, .. }
            | LoanEvent::PaymentApplied { loan_id, .. }
            | LoanEvent::PaymentAlreadyApplied { loan_id, .. }
            | LoanEvent::LoanCompleted { loan_id, .. }
            | LoanEvent::StatusChanged { loan_id, .. } => *loan_id,
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<LoanEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: LoanEvent) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = LoanEvent>) {
        self.events.extend(events);
    }

    pub fn take_events(&mut self) -> Vec<LoanEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[LoanEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
