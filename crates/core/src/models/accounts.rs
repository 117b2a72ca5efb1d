//! Staff accounts and their employee profiles.

use super::common::{Address, Person, TimeStamps};
use super::medical::Discipline;
use crate::constants::{ACCOUNTS_DIR_NAME, DOCTOR_QUALIFICATIONS_DIR_NAME, USERNAME_MAX_LEN};
use crate::error::{HisError, HisResult};
use crate::password::PasswordHash;
use his_types::{EmailAddress, NonEmptyText};
use his_uuid::ShardableUuid;
use serde::{Deserialize, Serialize};

coded_enum! {
    /// Which of the four staff groups an employee belongs to.
    EmployeeKind ("employee kind") {
        Administrative => "administrative", "Verwaltungspersonal",
        Doctor => "doctor", "Ärztliches Personal",
        Nurse => "nurse", "Pflegepersonal",
        GeneralPersonnel => "general_personnel", "Allgemeines Personal",
    }
}

coded_enum! {
    AdministrativeRank ("administrative rank") {
        Ceo => "ceo", "Geschäftsführung",
        MedicalDirector => "medical_director", "Ärztliche Leitung",
        NursingDirector => "nursing_director", "Pflegerische Leitung",
        TeamLead => "team_lead", "Teamleitung",
        Employee => "employee", "Angestellte_r",
    }
}

coded_enum! {
    DoctorRank ("doctor rank") {
        Chief => "chief", "Chefärztliches Personal",
        Senior => "senior", "Oberärztliches Personal",
        Specialist => "specialist", "Fachärztliches Personal",
        Junior => "junior", "Assistenzärztliches Personal",
    }
}

coded_enum! {
    NurseRank ("nurse rank") {
        Lead => "lead", "Stationsleitung Pflege",
        Trained => "trained", "Pflegefachpersonal",
        Helper => "helper", "Krankenpflegehilfspersonal",
        Learner => "learner", "Krankenpflege-Azubi",
        Intern => "intern", "Krankenpflege-Praktikant_in",
    }
}

coded_enum! {
    GeneralRank ("general personnel rank") {
        TeamLead => "team_lead", "Teamleitung",
        Employee => "employee", "Angestellte_r",
    }
}

coded_enum! {
    PersonnelFunction ("personnel function") {
        Transport => "transport", "Transport",
        Cleaning => "cleaning", "Raumpflege",
    }
}

/// Staff group plus the rank within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmployeeRole {
    Administrative {
        rank: AdministrativeRank,
    },
    Doctor {
        rank: DoctorRank,
    },
    Nurse {
        rank: NurseRank,
    },
    GeneralPersonnel {
        rank: GeneralRank,
        function: PersonnelFunction,
    },
}

impl EmployeeRole {
    pub const fn kind(self) -> EmployeeKind {
        match self {
            Self::Administrative { .. } => EmployeeKind::Administrative,
            Self::Doctor { .. } => EmployeeKind::Doctor,
            Self::Nurse { .. } => EmployeeKind::Nurse,
            Self::GeneralPersonnel { .. } => EmployeeKind::GeneralPersonnel,
        }
    }

    pub const fn rank_label(self) -> &'static str {
        match self {
            Self::Administrative { rank } => rank.label(),
            Self::Doctor { rank } => rank.label(),
            Self::Nurse { rank } => rank.label(),
            Self::GeneralPersonnel { rank, .. } => rank.label(),
        }
    }

    /// The personnel function, for general personnel only.
    pub const fn function(self) -> Option<PersonnelFunction> {
        match self {
            Self::GeneralPersonnel { function, .. } => Some(function),
            _ => None,
        }
    }

    /// e.g. `"Oberärztliches Personal"` or `"Teamleitung (Transport)"`.
    pub fn label(self) -> String {
        match self.function() {
            Some(function) => format!("{} ({})", self.rank_label(), function.label()),
            None => self.rank_label().to_string(),
        }
    }
}

/// Employment data attached to a staff account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub person: Person,
    pub address: Address,
    pub department_id: ShardableUuid,
    pub role: EmployeeRole,
}

impl Employee {
    pub fn kind(&self) -> EmployeeKind {
        self.role.kind()
    }
}

/// A login. Superusers have no employee profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: ShardableUuid,
    pub username: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailAddress>,
    pub password: PasswordHash,
    pub is_staff: bool,
    pub is_active: bool,
    pub is_admin: bool,
    #[serde(flatten)]
    pub stamps: TimeStamps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee: Option<Employee>,
}

impl Account {
    pub fn new_superuser(
        username: NonEmptyText,
        email: Option<EmailAddress>,
        password: PasswordHash,
    ) -> Self {
        Self {
            id: ShardableUuid::new(),
            username,
            email,
            password,
            is_staff: true,
            is_active: true,
            is_admin: true,
            stamps: TimeStamps::now(),
            employee: None,
        }
    }

    pub fn new_employee(
        username: NonEmptyText,
        email: Option<EmailAddress>,
        password: PasswordHash,
        employee: Employee,
    ) -> Self {
        Self {
            id: ShardableUuid::new(),
            username,
            email,
            password,
            is_staff: true,
            is_active: true,
            is_admin: false,
            stamps: TimeStamps::now(),
            employee: Some(employee),
        }
    }

    /// Admin flag on an active staff account.
    pub fn is_superuser(&self) -> bool {
        self.is_staff && self.is_active && self.is_admin
    }

    pub fn kind(&self) -> Option<EmployeeKind> {
        self.employee.as_ref().map(Employee::kind)
    }

    pub fn is_doctor(&self) -> bool {
        self.kind() == Some(EmployeeKind::Doctor)
    }

    pub fn department_id(&self) -> Option<&ShardableUuid> {
        self.employee.as_ref().map(|e| &e.department_id)
    }

    pub fn display_name(&self) -> String {
        match &self.employee {
            Some(employee) => employee.person.display_name(),
            None => self.username.to_string(),
        }
    }

    /// Role written into commit trailers.
    pub fn role_label(&self) -> &'static str {
        if self.is_admin {
            return "superuser";
        }
        match self.kind() {
            Some(kind) => kind.code(),
            None => "account",
        }
    }
}

impl_record!(Account, "account", ACCOUNTS_DIR_NAME);

/// A discipline a doctor is qualified in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorQualification {
    pub id: ShardableUuid,
    pub doctor_id: ShardableUuid,
    pub discipline: Discipline,
    #[serde(flatten)]
    pub stamps: TimeStamps,
}

impl DoctorQualification {
    pub fn new(doctor_id: ShardableUuid, discipline: Discipline) -> Self {
        Self {
            id: ShardableUuid::new(),
            doctor_id,
            discipline,
            stamps: TimeStamps::now(),
        }
    }
}

impl_record!(DoctorQualification, "doctor_qualification", DOCTOR_QUALIFICATIONS_DIR_NAME);

/// Normalises a requested username: trimmed and lowercased, no inner whitespace.
///
/// # Errors
///
/// Returns `HisError::InvalidInput` if nothing is left or the result is too long.
pub fn normalize_username(input: &str) -> HisResult<NonEmptyText> {
    let username: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    NonEmptyText::bounded(username, USERNAME_MAX_LEN)
        .map_err(|e| HisError::InvalidInput(format!("username: {e}")))
}

/// Builds a free username from the first letter of `first_name` and the whole of `last_name`.
///
/// If the base name is taken, `1`, `2`, ... is appended until `is_taken` says no. The base is
/// shortened where needed so the result stays within [`USERNAME_MAX_LEN`].
pub fn generate_username(
    first_name: &str,
    last_name: &str,
    is_taken: impl Fn(&str) -> bool,
) -> HisResult<NonEmptyText> {
    let initial: String = first_name.trim().chars().take(1).collect();
    let base: Vec<char> = normalize_username(&format!("{initial}{last_name}"))?
        .as_str()
        .chars()
        .collect();

    let candidate = |suffix: &str| -> String {
        let keep = base.len().min(USERNAME_MAX_LEN - suffix.chars().count());
        base[..keep].iter().collect::<String>() + suffix
    };

    let plain = candidate("");
    if !is_taken(&plain) {
        return Ok(NonEmptyText::new(plain)?);
    }

    let mut counter: u64 = 1;
    loop {
        let name = candidate(&counter.to_string());
        if !is_taken(&name) {
            return Ok(NonEmptyText::new(name)?);
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn employee(role: EmployeeRole) -> Employee {
        Employee {
            person: Person::new(Default::default(), Some("Dr."), "Robert", "Koch", None).unwrap(),
            address: Address::new("Dorotheenstraße", 96, "10117", "Berlin").unwrap(),
            department_id: ShardableUuid::new(),
            role,
        }
    }

    #[test]
    fn generate_username_uses_initial_and_last_name() {
        let name = generate_username("Florence", "Nightingale", |_| false).unwrap();
        assert_eq!(name.as_str(), "fnightingale");

        let spaced = generate_username("Vincent", "van Gogh", |_| false).unwrap();
        assert_eq!(spaced.as_str(), "vvangogh");
    }

    #[test]
    fn generate_username_appends_counter_until_free() {
        let taken: HashSet<&str> = ["rkoch", "rkoch1", "rkoch2"].into_iter().collect();
        let name = generate_username("Robert", "Koch", |n| taken.contains(n)).unwrap();
        assert_eq!(name.as_str(), "rkoch3");
    }

    #[test]
    fn generate_username_respects_max_length() {
        let last = "a".repeat(40);
        let name = generate_username("B", &last, |_| false).unwrap();
        assert_eq!(name.as_str().chars().count(), USERNAME_MAX_LEN);

        let base = name.to_string();
        let next = generate_username("B", &last, |n| n == base).unwrap();
        assert_eq!(next.as_str().chars().count(), USERNAME_MAX_LEN);
        assert!(next.as_str().ends_with('1'));
    }

    #[test]
    fn generate_username_rejects_empty_names() {
        assert!(generate_username("", "  ", |_| false).is_err());
    }

    #[test]
    fn role_is_stored_with_kind_tag() {
        let role = EmployeeRole::GeneralPersonnel {
            rank: GeneralRank::TeamLead,
            function: PersonnelFunction::Transport,
        };
        let yaml = serde_yaml::to_string(&role).unwrap();
        assert!(yaml.contains("kind: general_personnel"));
        assert!(yaml.contains("function: transport"));
        assert_eq!(role.label(), "Teamleitung (Transport)");

        let parsed: EmployeeRole = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, role);
    }

    #[test]
    fn superuser_and_employee_flags() {
        let admin = Account::new_superuser(
            NonEmptyText::new("tom").unwrap(),
            None,
            PasswordHash::new("test").unwrap(),
        );
        assert!(admin.is_superuser());
        assert_eq!(admin.role_label(), "superuser");
        assert_eq!(admin.display_name(), "tom");

        let mut doctor = Account::new_employee(
            NonEmptyText::new("rkoch").unwrap(),
            None,
            PasswordHash::new("test").unwrap(),
            employee(EmployeeRole::Doctor {
                rank: DoctorRank::Chief,
            }),
        );
        assert!(!doctor.is_superuser());
        assert!(doctor.is_doctor());
        assert_eq!(doctor.role_label(), "doctor");
        assert_eq!(doctor.display_name(), "Dr. Robert Koch");

        doctor.is_admin = true;
        doctor.is_active = false;
        assert!(!doctor.is_superuser());
    }

    #[test]
    fn ranks_parse_from_codes() {
        assert_eq!("senior".parse::<DoctorRank>().unwrap(), DoctorRank::Senior);
        assert_eq!(NurseRank::Intern.label(), "Krankenpflege-Praktikant_in");
        let err = "boss".parse::<AdministrativeRank>().unwrap_err();
        assert!(err.to_string().contains("ceo"));
    }
}
