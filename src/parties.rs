use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LoanError, Result};
use crate::types::{CustomerId, EmployeeId};

/// borrower on file with the bank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub full_name: String,
    pub phone: String,
    pub passport_number: String,
    pub address: String,
    /// employee who registered the customer
    pub created_by: Option<EmployeeId>,
    pub created_at: DateTime<Utc>,
}

/// details captured when a customer is registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub full_name: String,
    pub phone: String,
    pub passport_number: String,
    pub address: String,
}

impl Customer {
    pub fn register(details: NewCustomer, created_by: EmployeeId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: details.full_name,
            phone: details.phone,
            passport_number: details.passport_number,
            address: details.address,
            created_by: Some(created_by),
            created_at,
        }
    }
}

/// who a new loan is issued to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerRef {
    Existing(CustomerId),
    New(NewCustomer),
}

/// bank employee operating the loan book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub is_active_employee: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

/// details captured when an employee account is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// editable employee fields; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

/// operations gated at the service boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    /// register customers, originate loans and record payments
    OperateLoans,
    /// list, create and edit employees
    ManageEmployees,
}

impl Employee {
    pub fn new(details: NewEmployee, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: details.username,
            first_name: details.first_name,
            last_name: details.last_name,
            phone: details.phone,
            is_active_employee: true,
            is_superuser: false,
            created_at,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::OperateLoans => self.is_active_employee,
            Capability::ManageEmployees => self.is_active_employee && self.is_superuser,
        }
    }

    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(LoanError::PermissionDenied {
                reason: format!("{} lacks {:?}", self.username, capability),
            })
        }
    }

    pub fn apply(&mut self, update: EmployeeUpdate) {
        if let Some(first_name) = update.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name;
        }
        if let Some(phone) = update.phone {
            self.phone = phone;
        }
        if let Some(is_active) = update.is_active {
            self.is_active_employee = is_active;
        }
    }
}
