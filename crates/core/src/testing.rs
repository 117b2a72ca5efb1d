//! Fixtures shared by the unit tests.

use crate::config::CoreConfig;
use crate::models::accounts::{Account, Employee, EmployeeRole};
use crate::models::common::{Address, Gender, Person};
use crate::models::objects::{Department, Patient};
use crate::password::PasswordHash;
use crate::seed;
use crate::services::HisServices;
use crate::store::Store;
use his_types::NonEmptyText;
use his_uuid::ShardableUuid;
use std::sync::Arc;
use tempfile::TempDir;

/// A seeded store in a temporary directory.
pub struct TestHospital {
    pub services: HisServices,
    pub store: Arc<Store>,
    _dir: TempDir,
}

impl TestHospital {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let cfg = CoreConfig::new(
            dir.path().join("data"),
            NonEmptyText::new("Test Hospital").unwrap(),
        )
        .unwrap();
        let store = Arc::new(Store::open_or_initialise(Arc::new(cfg)).unwrap());
        seed::populate(&store, seed::DEFAULT_SEED_PASSWORD).unwrap();
        Self {
            services: HisServices::new(store.clone()),
            store,
            _dir: dir,
        }
    }

    /// The stored account of `username`.
    pub fn login(&self, username: &str) -> Account {
        self.services
            .accounts
            .find_by_username(username)
            .unwrap_or_else(|| panic!("no account {username}"))
    }

    pub fn department(&self, name: &str) -> Department {
        self.services
            .facility
            .find_department_by_name(name)
            .unwrap_or_else(|| panic!("no department {name}"))
    }
}

pub fn employee_account(username: &str, department_id: &ShardableUuid, role: EmployeeRole) -> Account {
    let employee = Employee {
        person: Person::new(Gender::Diverse, None, "Test", username, None).unwrap(),
        address: Address::new("Teststraße", 1, "12345", "Berlin").unwrap(),
        department_id: department_id.clone(),
        role,
    };
    Account::new_employee(
        NonEmptyText::new(username).unwrap(),
        None,
        PasswordHash::new("test").unwrap(),
        employee,
    )
}

pub fn superuser_account(username: &str) -> Account {
    Account::new_superuser(
        NonEmptyText::new(username).unwrap(),
        None,
        PasswordHash::new("test").unwrap(),
    )
}

pub fn patient(first_name: &str, last_name: &str) -> Patient {
    Patient::new(
        Person::new(Gender::Diverse, None, first_name, last_name, None).unwrap(),
        None,
    )
}
