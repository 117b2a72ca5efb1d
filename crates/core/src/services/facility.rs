use super::ensure;
use crate::author::Author;
use crate::error::{HisError, HisResult};
use crate::models::accounts::Account;
use crate::models::medical::Discipline;
use crate::models::objects::{Department, DepartmentQualification, Room};
use crate::permissions::{has_model_perm, EntityKind, PermAction};
use crate::store::Store;
use crate::versioned_files::{HisCommitAction, HisCommitDomain};
use his_uuid::ShardableUuid;
use std::collections::HashMap;
use std::sync::Arc;

/// Departments, their required disciplines, and rooms.
#[derive(Clone, Debug)]
pub struct FacilityService {
    store: Arc<Store>,
}

impl FacilityService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `HisError::InvalidInput` if a department of that name exists.
    pub fn create_department(&self, actor: &Account, name: &str) -> HisResult<Department> {
        ensure(
            has_model_perm(actor, PermAction::Add, EntityKind::Department),
            actor,
            "add departments",
        )?;
        let department = Department::new(name)?;
        let author = Author::for_account(actor)?;

        self.store.transaction(|tx| {
            if self.find_department_by_name(name).is_some() {
                return Err(HisError::InvalidInput(format!(
                    "department already exists: {}",
                    department.name
                )));
            }
            tx.save(
                &author,
                HisCommitDomain::Facility,
                HisCommitAction::Create,
                "Created department",
                &department,
            )?;
            Ok(department)
        })
    }

    /// Case-insensitive lookup by name.
    pub fn find_department_by_name(&self, name: &str) -> Option<Department> {
        let name = name.trim().to_lowercase();
        self.store
            .list::<Department>()
            .into_iter()
            .find(|d| d.name.as_str().to_lowercase() == name)
    }

    /// Departments ordered by name.
    pub fn list_departments(&self, actor: &Account) -> HisResult<Vec<Department>> {
        ensure(
            has_model_perm(actor, PermAction::View, EntityKind::Department),
            actor,
            "view departments",
        )?;
        let mut departments = self.store.list::<Department>();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    pub fn show_department(&self, actor: &Account, id: &ShardableUuid) -> HisResult<Department> {
        ensure(
            has_model_perm(actor, PermAction::View, EntityKind::Department),
            actor,
            "view departments",
        )?;
        self.store.load(id)
    }

    /// Records that a department needs staff qualified in `discipline`.
    pub fn add_department_qualification(
        &self,
        actor: &Account,
        department_id: &ShardableUuid,
        discipline: Discipline,
    ) -> HisResult<DepartmentQualification> {
        ensure(
            has_model_perm(actor, PermAction::Add, EntityKind::DepartmentQualification),
            actor,
            "add department qualifications",
        )?;
        let author = Author::for_account(actor)?;

        self.store.transaction(|tx| {
            let department = tx.load::<Department>(department_id)?;
            let exists = tx
                .list::<DepartmentQualification>()
                .iter()
                .any(|q| q.department_id == *department_id && q.discipline == discipline);
            if exists {
                return Err(HisError::InvalidInput(format!(
                    "{} already needs {}",
                    department.name,
                    discipline.label()
                )));
            }

            let qualification = DepartmentQualification::new(department_id.clone(), discipline);
            tx.save(
                &author,
                HisCommitDomain::Facility,
                HisCommitAction::Create,
                "Added department qualification",
                &qualification,
            )?;
            Ok(qualification)
        })
    }

    /// Disciplines the departments need, ordered by department name, then discipline.
    pub fn list_department_qualifications(
        &self,
        actor: &Account,
    ) -> HisResult<Vec<DepartmentQualification>> {
        ensure(
            has_model_perm(actor, PermAction::View, EntityKind::DepartmentQualification),
            actor,
            "view department qualifications",
        )?;
        let names: HashMap<ShardableUuid, String> = self
            .store
            .list::<Department>()
            .into_iter()
            .map(|d| (d.id, d.name.to_string()))
            .collect();
        let mut qualifications: Vec<DepartmentQualification> = self
            .store
            .list::<DepartmentQualification>()
            .into_iter()
            .filter(|q| names.contains_key(&q.department_id))
            .collect();
        qualifications.sort_by(|a, b| {
            (names.get(&a.department_id), a.discipline)
                .cmp(&(names.get(&b.department_id), b.discipline))
        });
        Ok(qualifications)
    }

    /// # Errors
    ///
    /// Returns `HisError::NotFound` for an unknown department.
    pub fn create_room(
        &self,
        actor: &Account,
        name: &str,
        department_id: Option<&ShardableUuid>,
        capacity: u32,
    ) -> HisResult<Room> {
        ensure(
            has_model_perm(actor, PermAction::Add, EntityKind::Room),
            actor,
            "add rooms",
        )?;
        let room = Room::new(name, department_id.cloned(), capacity)?;
        let author = Author::for_account(actor)?;

        self.store.transaction(|tx| {
            if let Some(id) = department_id {
                tx.load::<Department>(id)?;
            }
            tx.save(
                &author,
                HisCommitDomain::Facility,
                HisCommitAction::Create,
                "Created room",
                &room,
            )?;
            Ok(room)
        })
    }

    /// Rooms ordered by name.
    pub fn list_rooms(&self, actor: &Account) -> HisResult<Vec<Room>> {
        ensure(
            has_model_perm(actor, PermAction::View, EntityKind::Room),
            actor,
            "view rooms",
        )?;
        let mut rooms = self.store.list::<Room>();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rooms)
    }

    pub fn show_room(&self, actor: &Account, id: &ShardableUuid) -> HisResult<Room> {
        ensure(
            has_model_perm(actor, PermAction::View, EntityKind::Room),
            actor,
            "view rooms",
        )?;
        self.store.load(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHospital;

    #[test]
    fn departments_and_rooms() {
        let hospital = TestHospital::new();
        let facility = &hospital.services.facility;
        let clerk = hospital.login("durstig");

        let radiology = facility.create_department(&clerk, "Radiologie").unwrap();
        assert!(matches!(
            facility.create_department(&clerk, " radiologie "),
            Err(HisError::InvalidInput(_))
        ));

        let room = facility
            .create_room(&clerk, "CT-Raum", Some(&radiology.id), 1)
            .unwrap();
        assert_eq!(room.usage, 0);
        assert!(facility
            .list_rooms(&clerk)
            .unwrap()
            .iter()
            .any(|r| r.id == room.id));
        assert!(facility.create_room(&clerk, "Leer", None, 0).is_err());
        assert!(matches!(
            facility.create_room(&clerk, "Nirgendwo", Some(&ShardableUuid::new()), 2),
            Err(HisError::NotFound { .. })
        ));
    }

    #[test]
    fn clinical_staff_only_view_facilities() {
        let hospital = TestHospital::new();
        let facility = &hospital.services.facility;
        let porter = hospital.login("hurtig");

        assert!(facility.list_departments(&porter).unwrap().len() >= 5);
        assert!(!facility.list_rooms(&porter).unwrap().is_empty());
        assert!(matches!(
            facility.create_department(&porter, "Keller"),
            Err(HisError::PermissionDenied(_))
        ));
        assert!(matches!(
            facility.list_department_qualifications(&porter),
            Err(HisError::PermissionDenied(_))
        ));
    }

    #[test]
    fn department_qualifications_are_listed() {
        let hospital = TestHospital::new();
        let facility = &hospital.services.facility;
        let admin = hospital.login("tom");
        let ops = hospital.department("Operations");

        facility
            .add_department_qualification(&admin, &ops.id, Discipline::Anesthesia)
            .unwrap();
        assert!(facility
            .add_department_qualification(&admin, &ops.id, Discipline::Anesthesia)
            .is_err());

        let needs = facility.list_department_qualifications(&admin).unwrap();
        assert!(needs
            .iter()
            .any(|q| q.department_id == ops.id && q.discipline == Discipline::Anesthesia));
        let mut sorted = needs.clone();
        sorted.sort_by_key(|q| {
            let department = hospital.store.load::<Department>(&q.department_id).unwrap();
            (department.name.to_string(), q.discipline)
        });
        assert_eq!(needs, sorted);
    }
}
