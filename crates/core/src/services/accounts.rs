use super::ensure;
use crate::author::Author;
use crate::error::{HisError, HisResult};
use crate::models::accounts::{
    generate_username, normalize_username, Account, DoctorQualification, Employee, EmployeeRole,
};
use crate::models::common::{Address, Person};
use crate::models::medical::Discipline;
use crate::models::objects::Department;
use crate::password::PasswordHash;
use crate::permissions::{has_employee_perm, has_model_perm, EntityKind, PermAction};
use crate::store::Store;
use crate::versioned_files::{HisCommitAction, HisCommitDomain};
use his_types::{EmailAddress, NonEmptyText};
use his_uuid::ShardableUuid;
use std::sync::Arc;

/// Data for a new employee account. Without a username one is generated from the name.
#[derive(Clone, Debug)]
pub struct NewEmployee {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
    pub person: Person,
    pub address: Address,
    pub department_id: ShardableUuid,
    pub role: EmployeeRole,
}

/// Staff accounts and doctor qualifications.
#[derive(Clone, Debug)]
pub struct AccountService {
    store: Arc<Store>,
}

impl AccountService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn find_by_username(&self, username: &str) -> Option<Account> {
        let username = username.trim().to_lowercase();
        self.store
            .list::<Account>()
            .into_iter()
            .find(|a| a.username.as_str() == username)
    }

    /// Creates a superuser without a permission check. Meant for bootstrap tools that act
    /// as `author`.
    ///
    /// # Errors
    ///
    /// Returns `HisError::DuplicateUsername` or `HisError::DuplicateEmail` if either is taken.
    pub fn create_superuser(
        &self,
        author: &Author,
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> HisResult<Account> {
        let username = normalize_username(username)?;
        let email = parse_email(email)?;
        let password = PasswordHash::new(password)?;

        self.store.transaction(|tx| {
            check_unique(&tx.list::<Account>(), &username, email.as_ref())?;
            let account = Account::new_superuser(username, email, password);
            tx.save(
                author,
                HisCommitDomain::Account,
                HisCommitAction::Create,
                "Created superuser account",
                &account,
            )?;
            Ok(account)
        })
    }

    /// Creates an employee account.
    ///
    /// # Errors
    ///
    /// Returns `HisError::PermissionDenied` unless `actor` may add staff of the new kind,
    /// `HisError::NotFound` for an unknown department and `HisError::DuplicateUsername` or
    /// `HisError::DuplicateEmail` for taken names.
    pub fn create_employee(&self, actor: &Account, new: NewEmployee) -> HisResult<Account> {
        ensure(
            has_model_perm(
                actor,
                PermAction::Add,
                EntityKind::for_employee(new.role.kind()),
            ),
            actor,
            "add employees of this kind",
        )?;
        let email = parse_email(new.email.as_deref())?;
        let password = PasswordHash::new(&new.password)?;
        let author = Author::for_account(actor)?;

        self.store.transaction(|tx| {
            tx.load::<Department>(&new.department_id)?;
            let accounts = tx.list::<Account>();
            let username = match new.username.as_deref().map(str::trim) {
                Some(requested) if !requested.is_empty() => normalize_username(requested)?,
                _ => generate_username(
                    new.person.first_name.as_str(),
                    new.person.last_name.as_str(),
                    |candidate| accounts.iter().any(|a| a.username.as_str() == candidate),
                )?,
            };
            check_unique(&accounts, &username, email.as_ref())?;

            let account = Account::new_employee(
                username,
                email,
                password,
                Employee {
                    person: new.person,
                    address: new.address,
                    department_id: new.department_id,
                    role: new.role,
                },
            );
            tx.save(
                &author,
                HisCommitDomain::Account,
                HisCommitAction::Create,
                "Created employee account",
                &account,
            )?;
            Ok(account)
        })
    }

    /// Employees `actor` may see, ordered by last name.
    pub fn list_employees(&self, actor: &Account) -> Vec<Account> {
        let mut employees: Vec<Account> = self
            .store
            .list::<Account>()
            .into_iter()
            .filter(|a| a.employee.is_some())
            .filter(|a| has_employee_perm(actor, PermAction::View, a))
            .collect();
        employees.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        employees
    }

    /// # Errors
    ///
    /// Returns `HisError::NotFound` for an unknown id and `HisError::PermissionDenied` for an
    /// employee `actor` may not see.
    pub fn show_employee(&self, actor: &Account, id: &ShardableUuid) -> HisResult<Account> {
        let account = self.store.load::<Account>(id)?;
        ensure(
            account.id == actor.id || has_employee_perm(actor, PermAction::View, &account),
            actor,
            "view this employee",
        )?;
        Ok(account)
    }

    /// Active doctors, ordered by last name.
    pub fn list_doctors(&self) -> Vec<Account> {
        let mut doctors: Vec<Account> = self
            .store
            .list::<Account>()
            .into_iter()
            .filter(|a| a.is_active && a.is_doctor())
            .collect();
        doctors.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        doctors
    }

    /// Records that a doctor is qualified in `discipline`.
    ///
    /// # Errors
    ///
    /// Returns `HisError::InvalidInput` if the account is not a doctor or already holds the
    /// qualification.
    pub fn add_doctor_qualification(
        &self,
        actor: &Account,
        doctor_id: &ShardableUuid,
        discipline: Discipline,
    ) -> HisResult<DoctorQualification> {
        ensure(
            has_model_perm(actor, PermAction::Add, EntityKind::DoctorQualification),
            actor,
            "add doctor qualifications",
        )?;
        let author = Author::for_account(actor)?;

        self.store.transaction(|tx| {
            let doctor = tx.load::<Account>(doctor_id)?;
            if !doctor.is_doctor() {
                return Err(HisError::InvalidInput(format!(
                    "{} is not a doctor",
                    doctor.username
                )));
            }
            if self.qualifications(doctor_id).contains(&discipline) {
                return Err(HisError::InvalidInput(format!(
                    "{} is already qualified in {}",
                    doctor.username,
                    discipline.label()
                )));
            }

            let qualification = DoctorQualification::new(doctor_id.clone(), discipline);
            tx.save(
                &author,
                HisCommitDomain::Account,
                HisCommitAction::Create,
                "Added doctor qualification",
                &qualification,
            )?;
            Ok(qualification)
        })
    }

    /// Disciplines a doctor is qualified in.
    pub fn qualifications(&self, doctor_id: &ShardableUuid) -> Vec<Discipline> {
        let mut disciplines: Vec<Discipline> = self
            .store
            .list::<DoctorQualification>()
            .into_iter()
            .filter(|q| q.doctor_id == *doctor_id)
            .map(|q| q.discipline)
            .collect();
        disciplines.sort();
        disciplines
    }

    /// Activates or deactivates an account. Nobody can deactivate themselves.
    pub fn set_active(
        &self,
        actor: &Account,
        id: &ShardableUuid,
        active: bool,
    ) -> HisResult<Account> {
        let author = Author::for_account(actor)?;
        self.store.transaction(|tx| {
            let mut account = tx.load::<Account>(id)?;
            ensure(
                has_employee_perm(actor, PermAction::Change, &account),
                actor,
                "change this account",
            )?;
            if account.id == actor.id && !active {
                return Err(HisError::InvalidInput(
                    "you cannot deactivate your own account".into(),
                ));
            }
            if account.is_active == active {
                return Ok(account);
            }

            account.is_active = active;
            account.stamps.touch();
            let summary = if active {
                "Activated account"
            } else {
                "Deactivated account"
            };
            tx.save(
                &author,
                HisCommitDomain::Account,
                HisCommitAction::Update,
                summary,
                &account,
            )?;
            Ok(account)
        })
    }

    /// Sets a new password on the actor's own account, or on one the actor manages.
    pub fn set_password(
        &self,
        actor: &Account,
        id: &ShardableUuid,
        password: &str,
    ) -> HisResult<()> {
        let password = PasswordHash::new(password)?;
        let author = Author::for_account(actor)?;
        self.store.transaction(|tx| {
            let mut account = tx.load::<Account>(id)?;
            ensure(
                account.id == actor.id || has_employee_perm(actor, PermAction::Change, &account),
                actor,
                "change this password",
            )?;

            account.password = password;
            account.stamps.touch();
            tx.save(
                &author,
                HisCommitDomain::Account,
                HisCommitAction::Update,
                "Changed password",
                &account,
            )
        })
    }
}

fn check_unique(
    accounts: &[Account],
    username: &NonEmptyText,
    email: Option<&EmailAddress>,
) -> HisResult<()> {
    if accounts.iter().any(|a| a.username == *username) {
        return Err(HisError::DuplicateUsername(username.to_string()));
    }
    if let Some(email) = email {
        if accounts.iter().any(|a| a.email.as_ref() == Some(email)) {
            return Err(HisError::DuplicateEmail(email.to_string()));
        }
    }
    Ok(())
}

fn parse_email(email: Option<&str>) -> HisResult<Option<EmailAddress>> {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(e) => Ok(Some(EmailAddress::parse(e)?)),
        None => Ok(None),
    }
}

fn sort_key(account: &Account) -> (String, String) {
    match &account.employee {
        Some(e) => (
            e.person.last_name.as_str().to_lowercase(),
            e.person.first_name.as_str().to_lowercase(),
        ),
        None => (account.username.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::accounts::{DoctorRank, NurseRank};
    use crate::models::common::Gender;
    use crate::testing::TestHospital;

    fn new_nurse(hospital: &TestHospital, first: &str, last: &str) -> NewEmployee {
        NewEmployee {
            username: None,
            email: None,
            password: "secret".into(),
            person: Person::new(Gender::Female, None, first, last, None).unwrap(),
            address: Address::new("Augustenburger Platz", 1, "13353", "Berlin").unwrap(),
            department_id: hospital.department("Intensiv").id,
            role: EmployeeRole::Nurse {
                rank: NurseRank::Learner,
            },
        }
    }

    #[test]
    fn generated_usernames_get_counters() {
        let hospital = TestHospital::new();
        let clerk = hospital.login("durstig");
        let accounts = &hospital.services.accounts;

        let first = accounts
            .create_employee(&clerk, new_nurse(&hospital, "Clara", "Barton"))
            .unwrap();
        let second = accounts
            .create_employee(&clerk, new_nurse(&hospital, "Cecily", "Barton"))
            .unwrap();
        assert_eq!(first.username.as_str(), "cbarton");
        assert_eq!(second.username.as_str(), "cbarton1");
    }

    #[test]
    fn duplicate_usernames_and_emails_are_rejected() {
        let hospital = TestHospital::new();
        let clerk = hospital.login("durstig");
        let accounts = &hospital.services.accounts;

        let mut taken = new_nurse(&hospital, "Agnes", "Karll");
        taken.username = Some("Karll".into());
        assert!(matches!(
            accounts.create_employee(&clerk, taken),
            Err(HisError::DuplicateUsername(name)) if name == "karll"
        ));

        let mut email = new_nurse(&hospital, "Agnes", "Other");
        email.email = Some("karll@example.com".into());
        assert!(matches!(
            accounts.create_employee(&clerk, email),
            Err(HisError::DuplicateEmail(_))
        ));

        assert!(matches!(
            accounts.create_superuser(&Author::system().unwrap(), "tom", None, "x"),
            Err(HisError::DuplicateUsername(_))
        ));
    }

    #[test]
    fn only_staff_managers_create_employees() {
        let hospital = TestHospital::new();
        let nurse = hospital.login("nightingale");
        let result = hospital
            .services
            .accounts
            .create_employee(&nurse, new_nurse(&hospital, "Linda", "Richards"));
        assert!(matches!(result, Err(HisError::PermissionDenied(_))));
    }

    #[test]
    fn employee_listing_is_filtered() {
        let hospital = TestHospital::new();
        let accounts = &hospital.services.accounts;

        // A nurse in Intensiv sees all nurses, the Intensiv doctors and general personnel.
        let nurse = hospital.login("nightingale");
        let visible: Vec<String> = accounts
            .list_employees(&nurse)
            .iter()
            .map(|a| a.username.to_string())
            .collect();
        assert!(visible.contains(&"karll".to_string()));
        assert!(visible.contains(&"hippocrates".to_string()));
        assert!(visible.contains(&"hurtig".to_string()));
        assert!(!visible.contains(&"koch".to_string()));
        assert!(!visible.contains(&"gecko".to_string()));

        let clerk = hospital.login("durstig");
        assert_eq!(
            accounts.list_employees(&clerk).len(),
            accounts.list_employees(&hospital.login("tom")).len()
        );

        let koch = hospital.login("koch");
        assert!(matches!(
            accounts.show_employee(&nurse, &koch.id),
            Err(HisError::PermissionDenied(_))
        ));
        assert!(accounts.show_employee(&nurse, &nurse.id).is_ok());
    }

    #[test]
    fn doctor_qualifications() {
        let hospital = TestHospital::new();
        let clerk = hospital.login("durstig");
        let koch = hospital.login("koch");
        let accounts = &hospital.services.accounts;

        assert!(accounts.qualifications(&koch.id).contains(&Discipline::Pharmacology));
        accounts
            .add_doctor_qualification(&clerk, &koch.id, Discipline::Radiology)
            .unwrap();
        assert!(accounts.qualifications(&koch.id).contains(&Discipline::Radiology));
        assert!(accounts
            .add_doctor_qualification(&clerk, &koch.id, Discipline::Radiology)
            .is_err());

        let nurse = hospital.login("karll");
        assert!(matches!(
            accounts.add_doctor_qualification(&clerk, &nurse.id, Discipline::Surgery),
            Err(HisError::InvalidInput(_))
        ));
    }

    #[test]
    fn passwords_and_activation() {
        let hospital = TestHospital::new();
        let accounts = &hospital.services.accounts;
        let koch = hospital.login("koch");

        accounts.set_password(&koch, &koch.id, "new secret").unwrap();
        assert!(hospital.services.auth.authenticate("koch", "new secret").is_ok());

        let other = hospital.login("avicenna");
        assert!(matches!(
            accounts.set_password(&koch, &other.id, "hijack"),
            Err(HisError::PermissionDenied(_))
        ));

        let admin = hospital.login("tom");
        assert!(accounts.set_active(&admin, &admin.id, false).is_err());
        let deactivated = accounts.set_active(&admin, &other.id, false).unwrap();
        assert!(!deactivated.is_active);
        assert!(!accounts.list_doctors().iter().any(|d| d.id == other.id));
    }

    #[test]
    fn new_doctors_can_be_created_with_explicit_usernames() {
        let hospital = TestHospital::new();
        let admin = hospital.login("tom");
        let doctor = hospital
            .services
            .accounts
            .create_employee(
                &admin,
                NewEmployee {
                    username: Some("ghouse".into()),
                    email: Some("House@Example.com".into()),
                    password: "pass".into(),
                    person: Person::new(Gender::Male, Some("Dr."), "Gregory", "House", None)
                        .unwrap(),
                    address: Address::new("Baker Street", 221, "10115", "Berlin").unwrap(),
                    department_id: hospital.department("Aufnahme").id,
                    role: EmployeeRole::Doctor {
                        rank: DoctorRank::Specialist,
                    },
                },
            )
            .unwrap();
        assert_eq!(doctor.email.unwrap().as_str(), "house@example.com");
        assert!(hospital.services.auth.authenticate("ghouse", "pass").is_ok());
    }

    #[test]
    fn concurrent_signups_keep_usernames_unique() {
        let hospital = TestHospital::new();
        let barrier = std::sync::Barrier::new(8);
        let created = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        hospital.services.accounts.create_superuser(
                            &Author::system().unwrap(),
                            "Root",
                            None,
                            "pw",
                        )
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(Result::is_ok)
                .count()
        });

        assert_eq!(created, 1);
        let roots = hospital
            .store
            .list::<Account>()
            .into_iter()
            .filter(|a| a.username.as_str() == "root")
            .count();
        assert_eq!(roots, 1);
    }

    #[test]
    fn concurrent_generated_usernames_get_distinct_counters() {
        let hospital = TestHospital::new();
        let clerk = hospital.login("durstig");
        let barrier = std::sync::Barrier::new(4);
        let mut usernames: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        hospital
                            .services
                            .accounts
                            .create_employee(&clerk, new_nurse(&hospital, "Mary", "Seacole"))
                            .unwrap()
                            .username
                            .to_string()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        usernames.sort();
        assert_eq!(usernames, ["mseacole", "mseacole1", "mseacole2", "mseacole3"]);
    }
}
