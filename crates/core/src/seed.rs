//! Demo hospital used by `his seed` and the tests.
//!
//! Everything is written in a single commit by the system author, and only into a store that
//! has no accounts yet.

use crate::author::Author;
use crate::error::{HisError, HisResult};
use crate::models::accounts::{
    Account, AdministrativeRank, DoctorQualification, DoctorRank, Employee, EmployeeRole,
    GeneralRank, NurseRank, PersonnelFunction,
};
use crate::models::common::{Address, Gender, Person};
use crate::models::medical::Discipline;
use crate::models::objects::{Department, DepartmentQualification, Patient, Room};
use crate::models::tasks::{Act, Case, Order, OrderDetails};
use crate::models::Record;
use crate::password::PasswordHash;
use crate::store::{ChangeSet, Store};
use crate::versioned_files::{HisCommitAction, HisCommitDomain};
use chrono::NaiveDate;
use his_types::{EmailAddress, NonEmptyText};
use his_uuid::ShardableUuid;

/// Password given to every demo account unless another is chosen.
pub const DEFAULT_SEED_PASSWORD: &str = "test";

const DEPARTMENTS: [&str; 5] = [
    "Aufnahme",
    "Intensiv",
    "Innere Medizin",
    "Operations",
    "Verwaltung",
];

const ROOMS: [(&str, &str, u32); 7] = [
    ("Aufnahmehalle", "Aufnahme", 30),
    ("OP-Raum 1", "Intensiv", 1),
    ("OP-Raum 2", "Intensiv", 1),
    ("Raum 1 - Internistische Station", "Innere Medizin", 4),
    ("Raum 2 - Internistische Station", "Innere Medizin", 4),
    ("Pausenraum", "Operations", 10),
    ("Büro", "Verwaltung", 4),
];

const DEPARTMENT_QUALIFICATIONS: [(&str, Discipline); 4] = [
    ("Innere Medizin", Discipline::InnerMedicine),
    ("Intensiv", Discipline::Anesthesia),
    ("Intensiv", Discipline::Surgery),
    ("Aufnahme", Discipline::GeneralPractice),
];

struct Staff {
    username: &'static str,
    gender: Gender,
    title: Option<&'static str>,
    first_name: &'static str,
    last_name: &'static str,
    department: &'static str,
    role: EmployeeRole,
    qualifications: &'static [Discipline],
}

const fn staff(
    username: &'static str,
    gender: Gender,
    first_name: &'static str,
    last_name: &'static str,
    department: &'static str,
    role: EmployeeRole,
) -> Staff {
    Staff {
        username,
        gender,
        title: None,
        first_name,
        last_name,
        department,
        role,
        qualifications: &[],
    }
}

const fn doctor(
    username: &'static str,
    gender: Gender,
    title: Option<&'static str>,
    (first_name, last_name): (&'static str, &'static str),
    department: &'static str,
    rank: DoctorRank,
    qualifications: &'static [Discipline],
) -> Staff {
    Staff {
        username,
        gender,
        title,
        first_name,
        last_name,
        department,
        role: EmployeeRole::Doctor { rank },
        qualifications,
    }
}

const TRANSPORT: EmployeeRole = EmployeeRole::GeneralPersonnel {
    rank: GeneralRank::Employee,
    function: PersonnelFunction::Transport,
};

const STAFF: [Staff; 14] = [
    staff("whitman", Gender::Male, "Walt", "Whitman", "Aufnahme", EmployeeRole::Nurse { rank: NurseRank::Helper }),
    staff("nightingale", Gender::Female, "Florence", "Nightingale", "Intensiv", EmployeeRole::Nurse { rank: NurseRank::Lead }),
    staff("dunant", Gender::Male, "Henry", "Dunant", "Intensiv", EmployeeRole::Nurse { rank: NurseRank::Helper }),
    staff("karll", Gender::Female, "Agnes", "Karll", "Innere Medizin", EmployeeRole::Nurse { rank: NurseRank::Trained }),
    staff("mahoney", Gender::Female, "Mary", "Mahoney", "Innere Medizin", EmployeeRole::Nurse { rank: NurseRank::Trained }),
    doctor(
        "koch",
        Gender::Male,
        Some("Dr."),
        ("Robert", "Koch"),
        "Innere Medizin",
        DoctorRank::Senior,
        &[
            Discipline::Biochemistry,
            Discipline::Pharmacology,
            Discipline::MicrobiologyVirologyAndInfectionEpidemology,
        ],
    ),
    doctor(
        "hippocrates",
        Gender::Male,
        None,
        ("Hippocrates", "von Kos"),
        "Intensiv",
        DoctorRank::Chief,
        &[Discipline::Anatomy, Discipline::Surgery],
    ),
    doctor(
        "avicenna",
        Gender::Male,
        None,
        ("Abu", "ibn Sina"),
        "Innere Medizin",
        DoctorRank::Chief,
        &[Discipline::InnerMedicine, Discipline::GeneralPractice],
    ),
    doctor(
        "bingen",
        Gender::Female,
        None,
        ("Hildegard", "von Bingen"),
        "Intensiv",
        DoctorRank::Senior,
        &[
            Discipline::Biochemistry,
            Discipline::HygieneAndEnvironmentalMedicine,
            Discipline::Pharmacology,
        ],
    ),
    doctor(
        "fleming",
        Gender::Male,
        Some("Sir"),
        ("Alexander", "Fleming"),
        "Aufnahme",
        DoctorRank::Specialist,
        &[
            Discipline::Biochemistry,
            Discipline::MicrobiologyVirologyAndInfectionEpidemology,
            Discipline::Pharmacology,
        ],
    ),
    staff("hurtig", Gender::Male, "Harald", "Hurtig", "Operations", TRANSPORT),
    staff("schnell", Gender::Female, "Sandra", "Schnell", "Operations", TRANSPORT),
    staff("gecko", Gender::Male, "Gordon", "Gecko", "Verwaltung", EmployeeRole::Administrative { rank: AdministrativeRank::Ceo }),
    staff("durstig", Gender::Male, "Dietmar", "Durstig", "Verwaltung", EmployeeRole::Administrative { rank: AdministrativeRank::Employee }),
];

const SUPERUSER: &str = "tom";

/// Collects the demo records and resolves names to ids while doing so.
struct Builder {
    changes: ChangeSet,
    departments: Vec<Department>,
    rooms: Vec<Room>,
    accounts: Vec<Account>,
}

impl Builder {
    fn department(&self, name: &str) -> HisResult<&ShardableUuid> {
        self.departments
            .iter()
            .find(|d| d.name.as_str() == name)
            .map(|d| &d.id)
            .ok_or_else(|| not_found(Department::KIND, name))
    }

    fn room_mut(&mut self, name: &str) -> HisResult<&mut Room> {
        self.rooms
            .iter_mut()
            .find(|r| r.name.as_str() == name)
            .ok_or_else(|| not_found(Room::KIND, name))
    }

    fn room(&self, name: &str) -> HisResult<&ShardableUuid> {
        self.rooms
            .iter()
            .find(|r| r.name.as_str() == name)
            .map(|r| &r.id)
            .ok_or_else(|| not_found(Room::KIND, name))
    }

    fn account(&self, username: &str) -> HisResult<&ShardableUuid> {
        self.accounts
            .iter()
            .find(|a| a.username.as_str() == username)
            .map(|a| &a.id)
            .ok_or_else(|| not_found(Account::KIND, username))
    }

    fn transport(
        &self,
        act: &Act,
        (issuer, assignee): (&str, &str),
        (from, to): (&str, &str),
        supervisor: &str,
    ) -> HisResult<Order> {
        let details = OrderDetails::Transport {
            from_room: self.room(from)?.clone(),
            to_room: self.room(to)?.clone(),
            requested_arrival_by: None,
            supervised: true,
            supervised_by: Some(self.account(supervisor)?.clone()),
        };
        let mut order = Order::new(act.id.clone(), self.account(issuer)?.clone(), details)?;
        order.assign(self.account(assignee)?.clone())?;
        Ok(order)
    }
}

fn not_found(kind: &'static str, name: &str) -> HisError {
    HisError::NotFound {
        kind,
        id: name.to_string(),
    }
}

fn default_address() -> HisResult<Address> {
    Address::new("Augustenburger Platz", 1, "13353", "Berlin")
}

fn email(username: &str) -> HisResult<EmailAddress> {
    Ok(EmailAddress::parse(format!("{username}@example.com"))?)
}

/// Loads the demo hospital into an empty store. Every demo account gets `password`, hashed
/// once and shared.
///
/// # Errors
///
/// Returns `HisError::InvalidInput` if the store already has accounts.
pub fn populate(store: &Store, password: &str) -> HisResult<()> {
    if !store.is_empty() {
        return Err(HisError::InvalidInput(
            "the store already holds accounts; demo data goes into an empty store only".into(),
        ));
    }

    let mut b = Builder {
        changes: ChangeSet::new(),
        departments: Vec::new(),
        rooms: Vec::new(),
        accounts: Vec::new(),
    };

    for name in DEPARTMENTS {
        b.departments.push(Department::new(name)?);
    }
    for (name, department, capacity) in ROOMS {
        let room = Room::new(name, Some(b.department(department)?.clone()), capacity)?;
        b.rooms.push(room);
    }
    for (department, discipline) in DEPARTMENT_QUALIFICATIONS {
        let qualification = DepartmentQualification::new(b.department(department)?.clone(), discipline);
        b.changes.put(&qualification)?;
    }

    let password = PasswordHash::new(password)?;
    b.accounts.push(Account::new_superuser(
        NonEmptyText::new(SUPERUSER)?,
        Some(email(SUPERUSER)?),
        password.clone(),
    ));
    let born = NaiveDate::from_ymd_opt(1891, 7, 1);
    for member in &STAFF {
        let employee = Employee {
            person: Person::new(
                member.gender,
                member.title,
                member.first_name,
                member.last_name,
                born,
            )?,
            address: default_address()?,
            department_id: b.department(member.department)?.clone(),
            role: member.role,
        };
        let account = Account::new_employee(
            NonEmptyText::new(member.username)?,
            Some(email(member.username)?),
            password.clone(),
            employee,
        );
        for &discipline in member.qualifications {
            b.changes
                .put(&DoctorQualification::new(account.id.clone(), discipline))?;
        }
        b.accounts.push(account);
    }

    let van_gogh = Patient::new(
        Person::new(
            Gender::Male,
            None,
            "Vincent",
            "van Gogh",
            NaiveDate::from_ymd_opt(1853, 3, 30),
        )?,
        Some(Address::new("Markt", 29, "4880", "Zundert")?),
    );
    let bohlen = Patient::new(
        Person::new(
            Gender::Male,
            None,
            "Dieter",
            "Bohlen",
            NaiveDate::from_ymd_opt(1954, 2, 7),
        )?,
        Some(default_address()?),
    );
    let rbg = Patient::new(
        Person::new(
            Gender::Female,
            Some("Dr. jur."),
            "Ruth",
            "Bader-Ginsburg",
            NaiveDate::from_ymd_opt(1933, 3, 15),
        )?,
        None,
    );

    let admission = b.department("Aufnahme")?.clone();
    let rbg_case = Case::new(rbg.id.clone(), admission.clone());
    let bohlen_case = Case::new(bohlen.id.clone(), admission.clone());
    let van_gogh_case = Case::new(van_gogh.id.clone(), admission.clone());

    let whitman = b.account("whitman")?.clone();
    let rbg_act = Act::new(
        rbg_case.id.clone(),
        whitman.clone(),
        admission.clone(),
        b.department("Innere Medizin")?.clone(),
    );
    let bohlen_act = Act::new(
        bohlen_case.id.clone(),
        whitman,
        admission,
        b.department("Intensiv")?.clone(),
    );

    // Ruth has already been brought to the ward and waits for theatre.
    let mut arrived = b.transport(
        &rbg_act,
        ("whitman", "hurtig"),
        ("Aufnahmehalle", "Raum 1 - Internistische Station"),
        "avicenna",
    )?;
    arrived.lifecycle.close(Order::KIND)?;
    let to_theatre = b.transport(
        &rbg_act,
        ("avicenna", "hurtig"),
        ("Raum 1 - Internistische Station", "OP-Raum 2"),
        "avicenna",
    )?;
    let bohlen_transport = b.transport(
        &bohlen_act,
        ("whitman", "schnell"),
        ("Aufnahmehalle", "OP-Raum 1"),
        "bingen",
    )?;

    // Dieter and Vincent wait in the hall.
    for _ in 0..2 {
        b.room_mut("Aufnahmehalle")?.occupy()?;
    }
    b.room_mut("Raum 1 - Internistische Station")?.occupy()?;

    for department in &b.departments {
        b.changes.put(department)?;
    }
    for room in &b.rooms {
        b.changes.put(room)?;
    }
    for account in &b.accounts {
        b.changes.put(account)?;
    }
    for patient in [&van_gogh, &bohlen, &rbg] {
        b.changes.put(patient)?;
    }
    for case in [&rbg_case, &bohlen_case, &van_gogh_case] {
        b.changes.put(case)?;
    }
    b.changes.put(&rbg_act)?;
    b.changes.put(&bohlen_act)?;
    for order in [&arrived, &to_theatre, &bohlen_transport] {
        b.changes.put(order)?;
    }

    let count = b.changes.len();
    store.commit(
        &Author::system()?,
        HisCommitDomain::Store,
        HisCommitAction::Create,
        "Loaded demo data",
        b.changes,
    )?;
    tracing::info!("seeded demo hospital with {count} records");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHospital;

    #[test]
    fn seeding_writes_one_commit() {
        let hospital = TestHospital::new();
        let log = hospital.store.audit_log(10).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].subject, "store:create: Loaded demo data");

        assert_eq!(hospital.store.list::<Account>().len(), STAFF.len() + 1);
        assert_eq!(hospital.store.list::<Department>().len(), DEPARTMENTS.len());
        assert_eq!(hospital.store.list::<Patient>().len(), 3);
        assert_eq!(hospital.store.list::<Order>().len(), 3);
    }

    #[test]
    fn seeding_twice_is_refused() {
        let hospital = TestHospital::new();
        assert!(matches!(
            populate(&hospital.store, DEFAULT_SEED_PASSWORD),
            Err(HisError::InvalidInput(_))
        ));
    }

    #[test]
    fn seeded_rooms_hold_the_waiting_patients() {
        let hospital = TestHospital::new();
        let rooms = hospital.store.list::<Room>();
        let usage = |name: &str| rooms.iter().find(|r| r.name.as_str() == name).unwrap().usage;
        assert_eq!(usage("Aufnahmehalle"), 2);
        assert_eq!(usage("Raum 1 - Internistische Station"), 1);
        assert_eq!(usage("OP-Raum 1"), 0);
    }
}
