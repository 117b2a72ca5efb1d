use super::ensure;
use crate::author::Author;
use crate::error::HisResult;
use crate::models::accounts::Account;
use crate::models::common::{Address, Person};
use crate::models::objects::{Department, Patient};
use crate::models::tasks::Case;
use crate::permissions::{has_model_perm, has_patient_perm, is_privileged, EntityKind, PermAction};
use crate::store::Store;
use crate::versioned_files::{HisCommitAction, HisCommitDomain};
use his_uuid::ShardableUuid;
use serde::Serialize;
use std::sync::Arc;

/// One case in a patient's medical history.
#[derive(Clone, Debug, Serialize)]
pub struct HistoryEntry {
    pub case: Case,
    pub department_name: String,
    pub doctor_name: Option<String>,
}

/// A patient and, for privileged readers, their medical history (newest case first).
#[derive(Clone, Debug, Serialize)]
pub struct PatientDetails {
    pub patient: Patient,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntry>>,
}

#[derive(Clone, Debug)]
pub struct PatientService {
    store: Arc<Store>,
}

impl PatientService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn create_patient(
        &self,
        actor: &Account,
        person: Person,
        address: Option<Address>,
    ) -> HisResult<Patient> {
        ensure(
            has_model_perm(actor, PermAction::Add, EntityKind::Patient),
            actor,
            "add patients",
        )?;
        let patient = Patient::new(person, address);
        self.store.save(
            &Author::for_account(actor)?,
            HisCommitDomain::Patient,
            HisCommitAction::Create,
            "Registered patient",
            &patient,
        )?;
        Ok(patient)
    }

    /// Replaces the personal data and address of a patient.
    pub fn update_patient(
        &self,
        actor: &Account,
        id: &ShardableUuid,
        person: Person,
        address: Option<Address>,
    ) -> HisResult<Patient> {
        let author = Author::for_account(actor)?;
        self.store.transaction(|tx| {
            let mut patient = tx.load::<Patient>(id)?;
            let cases = tx.list::<Case>();
            ensure(
                has_patient_perm(actor, PermAction::Change, &patient, &cases),
                actor,
                "change this patient",
            )?;

            patient.person = person;
            patient.address = address;
            patient.stamps.touch();
            tx.save(
                &author,
                HisCommitDomain::Patient,
                HisCommitAction::Update,
                "Updated patient details",
                &patient,
            )?;
            Ok(patient)
        })
    }

    /// Patients the actor may view, by last name then first name.
    pub fn list_patients(&self, actor: &Account) -> HisResult<Vec<Patient>> {
        ensure(
            has_model_perm(actor, PermAction::View, EntityKind::Patient),
            actor,
            "view patients",
        )?;
        let cases = self.store.list::<Case>();
        let mut patients: Vec<Patient> = self
            .store
            .list::<Patient>()
            .into_iter()
            .filter(|p| has_patient_perm(actor, PermAction::View, p, &cases))
            .collect();
        patients.sort_by(|a, b| {
            (&a.person.last_name, &a.person.first_name)
                .cmp(&(&b.person.last_name, &b.person.first_name))
        });
        Ok(patients)
    }

    pub fn show_patient(&self, actor: &Account, id: &ShardableUuid) -> HisResult<PatientDetails> {
        let patient = self.store.load::<Patient>(id)?;
        let cases = self.store.list::<Case>();
        ensure(
            has_patient_perm(actor, PermAction::View, &patient, &cases),
            actor,
            "view this patient",
        )?;

        let history = is_privileged(actor).then(|| self.history(&patient, cases));
        Ok(PatientDetails { patient, history })
    }

    fn history(&self, patient: &Patient, cases: Vec<Case>) -> Vec<HistoryEntry> {
        let departments = self.store.list::<Department>();
        let accounts = self.store.list::<Account>();

        let mut entries: Vec<HistoryEntry> = cases
            .into_iter()
            .filter(|case| case.patient_id == patient.id)
            .map(|case| {
                let department_name = departments
                    .iter()
                    .find(|d| d.id == case.assigned_department_id)
                    .map_or_else(
                        || case.assigned_department_id.to_string(),
                        |d| d.name.to_string(),
                    );
                let doctor_name = case.assigned_doctor_id.as_ref().map(|doctor_id| {
                    accounts
                        .iter()
                        .find(|a| &a.id == doctor_id)
                        .map_or_else(|| doctor_id.to_string(), Account::display_name)
                });
                HistoryEntry {
                    case,
                    department_name,
                    doctor_name,
                }
            })
            .collect();
        entries.sort_by_key(|entry| std::cmp::Reverse(entry.case.lifecycle.stamps.created_at));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HisError;
    use crate::models::common::Gender;
    use crate::testing::TestHospital;

    #[test]
    fn clerks_register_and_update_patients() {
        let hospital = TestHospital::new();
        let patients = &hospital.services.patients;
        let clerk = hospital.login("durstig");

        let person = Person::new(Gender::Female, None, "Marie", "Curie", None).unwrap();
        let patient = patients.create_patient(&clerk, person, None).unwrap();

        let address = Address::new("Rue Pierre et Marie Curie", 11, "75005", "Paris").unwrap();
        let person = Person::new(Gender::Female, Some("Prof."), "Marie", "Curie", None).unwrap();
        let updated = patients
            .update_patient(&clerk, &patient.id, person, Some(address))
            .unwrap();
        assert_eq!(updated.person.display_name(), "Prof. Marie Curie");
        assert_eq!(
            hospital.store.load::<Patient>(&patient.id).unwrap().address,
            updated.address
        );
    }

    #[test]
    fn nurses_see_patients_of_their_department() {
        let hospital = TestHospital::new();
        let patients = &hospital.services.patients;

        // Every seeded case starts in the admission department.
        let admission_nurse = hospital.login("whitman");
        assert_eq!(patients.list_patients(&admission_nurse).unwrap().len(), 3);

        let icu_nurse = hospital.login("nightingale");
        assert!(patients.list_patients(&icu_nurse).unwrap().is_empty());

        let clerk = hospital.login("durstig");
        let person = Person::new(Gender::Male, None, "Max", "Planck", None).unwrap();
        let patient = patients.create_patient(&clerk, person, None).unwrap();
        assert!(matches!(
            patients.show_patient(&icu_nurse, &patient.id),
            Err(HisError::PermissionDenied(_))
        ));
        assert!(matches!(
            patients.create_patient(
                &icu_nurse,
                Person::new(Gender::Male, None, "Otto", "Hahn", None).unwrap(),
                None
            ),
            Err(HisError::PermissionDenied(_))
        ));
    }

    #[test]
    fn listing_is_sorted_by_name() {
        let hospital = TestHospital::new();
        let clerk = hospital.login("durstig");
        let names: Vec<String> = hospital
            .services
            .patients
            .list_patients(&clerk)
            .unwrap()
            .iter()
            .map(|p| p.person.last_name.to_string())
            .collect();
        assert_eq!(names, ["Bader-Ginsburg", "Bohlen", "van Gogh"]);
    }

    #[test]
    fn history_is_shown_to_privileged_users_only() {
        let hospital = TestHospital::new();
        let services = &hospital.services;
        let admin = hospital.login("tom");
        let nurse = hospital.login("whitman");

        let patient = services
            .patients
            .list_patients(&admin)
            .unwrap()
            .into_iter()
            .find(|p| p.person.last_name.as_str() == "Bohlen")
            .unwrap();

        let details = services.patients.show_patient(&admin, &patient.id).unwrap();
        let history = details.history.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].department_name, "Aufnahme");
        assert_eq!(history[0].doctor_name, None);

        let details = services.patients.show_patient(&nurse, &patient.id).unwrap();
        assert!(details.history.is_none());
    }
}
