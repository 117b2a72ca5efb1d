use super::ensure;
use crate::author::Author;
use crate::error::{HisError, HisResult};
use crate::models::accounts::Account;
use crate::models::objects::{Department, Patient, Room};
use crate::models::tasks::{Act, Case, Order, OrderKind};
use crate::models::Record;
use crate::permissions::{
    has_act_perm, has_case_perm, has_model_perm, is_privileged, EntityKind, PermAction,
};
use crate::store::{Store, Transaction};
use crate::versioned_files::{HisCommitAction, HisCommitDomain};
use his_uuid::ShardableUuid;
use std::collections::HashMap;
use std::sync::Arc;

/// Cases and the acts within them.
#[derive(Clone, Debug)]
pub struct CaseService {
    store: Arc<Store>,
}

impl CaseService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Admits `patient_id` into `department_id`.
    pub fn create_case(
        &self,
        actor: &Account,
        patient_id: &ShardableUuid,
        department_id: &ShardableUuid,
    ) -> HisResult<Case> {
        ensure(
            has_model_perm(actor, PermAction::Add, EntityKind::Case),
            actor,
            "add cases",
        )?;
        let author = Author::for_account(actor)?;

        self.store.transaction(|tx| {
            tx.load::<Patient>(patient_id)?;
            tx.load::<Department>(department_id)?;

            let case = Case::new(patient_id.clone(), department_id.clone());
            tx.save(
                &author,
                HisCommitDomain::Case,
                HisCommitAction::Create,
                "Opened case",
                &case,
            )?;
            Ok(case)
        })
    }

    /// Makes an active doctor responsible for the case.
    ///
    /// Privileged accounts may assign doctors to any case; everyone else needs change access
    /// to the case.
    ///
    /// # Errors
    ///
    /// Returns `HisError::InvalidInput` if `doctor_id` is not an active doctor.
    pub fn assign_doctor(
        &self,
        actor: &Account,
        case_id: &ShardableUuid,
        doctor_id: &ShardableUuid,
    ) -> HisResult<Case> {
        let author = Author::for_account(actor)?;
        self.store.transaction(|tx| {
            let mut case = tx.load::<Case>(case_id)?;
            ensure(
                is_privileged(actor) || has_case_perm(actor, PermAction::Change, &case),
                actor,
                "assign a doctor to this case",
            )?;
            let doctor = tx.load::<Account>(doctor_id)?;
            if !(doctor.is_doctor() && doctor.is_active) {
                return Err(HisError::InvalidInput(format!(
                    "{} is not an active doctor",
                    doctor.username
                )));
            }

            case.assign_doctor(doctor.id.clone())?;
            tx.save(
                &author,
                HisCommitDomain::Case,
                HisCommitAction::Update,
                &format!("Assigned doctor {}", doctor.username),
                &case,
            )?;
            Ok(case)
        })
    }

    /// Moves the case to another department.
    pub fn assign_department(
        &self,
        actor: &Account,
        case_id: &ShardableUuid,
        department_id: &ShardableUuid,
    ) -> HisResult<Case> {
        let author = Author::for_account(actor)?;
        self.store.transaction(|tx| {
            let mut case = load_for_change(tx, actor, case_id)?;
            let department = tx.load::<Department>(department_id)?;
            if case.lifecycle.is_closed() {
                return Err(HisError::AlreadyClosed { kind: Case::KIND });
            }
            if case.assigned_department_id == department.id {
                return Err(HisError::AlreadyAssigned(format!(
                    "department {}",
                    department.name
                )));
            }

            case.assigned_department_id = department.id;
            case.lifecycle.stamps.touch();
            tx.save(
                &author,
                HisCommitDomain::Case,
                HisCommitAction::Update,
                &format!("Assigned department {}", department.name),
                &case,
            )?;
            Ok(case)
        })
    }

    pub fn close_case(&self, actor: &Account, case_id: &ShardableUuid) -> HisResult<Case> {
        let author = Author::for_account(actor)?;
        self.store.transaction(|tx| {
            let mut case = load_for_change(tx, actor, case_id)?;
            case.lifecycle.close(Case::KIND)?;
            tx.save(
                &author,
                HisCommitDomain::Case,
                HisCommitAction::Close,
                "Closed case",
                &case,
            )?;
            Ok(case)
        })
    }

    pub fn reopen_case(&self, actor: &Account, case_id: &ShardableUuid) -> HisResult<Case> {
        let author = Author::for_account(actor)?;
        self.store.transaction(|tx| {
            let mut case = load_for_change(tx, actor, case_id)?;
            case.lifecycle.reopen(Case::KIND)?;
            tx.save(
                &author,
                HisCommitDomain::Case,
                HisCommitAction::Reopen,
                "Reopened case",
                &case,
            )?;
            Ok(case)
        })
    }

    /// Cases the actor may view, oldest first.
    pub fn list_cases(&self, actor: &Account) -> HisResult<Vec<Case>> {
        ensure(
            has_model_perm(actor, PermAction::View, EntityKind::Case),
            actor,
            "view cases",
        )?;
        let mut cases: Vec<Case> = self
            .store
            .list::<Case>()
            .into_iter()
            .filter(|case| has_case_perm(actor, PermAction::View, case))
            .collect();
        cases.sort_by_key(|case| case.lifecycle.stamps.created_at);
        Ok(cases)
    }

    pub fn show_case(&self, actor: &Account, case_id: &ShardableUuid) -> HisResult<Case> {
        let case = self.store.load::<Case>(case_id)?;
        ensure(
            has_case_perm(actor, PermAction::View, &case),
            actor,
            "view this case",
        )?;
        Ok(case)
    }

    fn transport_orders(&self, case: &Case) -> Vec<Order> {
        let acts: Vec<ShardableUuid> = self
            .store
            .list::<Act>()
            .into_iter()
            .filter(|act| act.case_id == case.id)
            .map(|act| act.id)
            .collect();
        self.store
            .list::<Order>()
            .into_iter()
            .filter(|order| order.kind() == OrderKind::Transport && acts.contains(&order.act_id))
            .collect()
    }

    /// Where the patient was last taken: the destination of the most recently closed
    /// transport order.
    pub fn last_room(&self, case: &Case) -> HisResult<Option<Room>> {
        let last = self
            .transport_orders(case)
            .into_iter()
            .filter(|order| order.lifecycle.is_closed())
            .max_by_key(|order| order.lifecycle.closed_at);
        self.destination(last)
    }

    /// Where the patient goes next: the destination of the oldest open transport order.
    pub fn next_room(&self, case: &Case) -> HisResult<Option<Room>> {
        let next = self
            .transport_orders(case)
            .into_iter()
            .filter(|order| order.lifecycle.is_open())
            .min_by_key(|order| order.lifecycle.stamps.created_at);
        self.destination(next)
    }

    fn destination(&self, order: Option<Order>) -> HisResult<Option<Room>> {
        match order.as_ref().and_then(Order::transport_destination) {
            Some(room_id) => self.store.find::<Room>(room_id),
            None => Ok(None),
        }
    }

    /// Starts an act on an open case, to be carried out by `executing_department_id`.
    ///
    /// The requesting department is the actor's own; accounts without one request on behalf
    /// of the case's department.
    pub fn create_act(
        &self,
        actor: &Account,
        case_id: &ShardableUuid,
        executing_department_id: &ShardableUuid,
    ) -> HisResult<Act> {
        let author = Author::for_account(actor)?;
        self.store.transaction(|tx| {
            let case = tx.load::<Case>(case_id)?;
            if case.lifecycle.is_closed() {
                return Err(HisError::AlreadyClosed { kind: Case::KIND });
            }
            tx.load::<Department>(executing_department_id)?;

            let requesting = actor
                .department_id()
                .unwrap_or(&case.assigned_department_id)
                .clone();
            let act = Act::new(
                case.id.clone(),
                actor.id.clone(),
                requesting,
                executing_department_id.clone(),
            );
            ensure(
                has_act_perm(actor, PermAction::Add, &act, &case),
                actor,
                "add acts to this case",
            )?;

            tx.save(
                &author,
                HisCommitDomain::Act,
                HisCommitAction::Create,
                "Started act",
                &act,
            )?;
            Ok(act)
        })
    }

    /// Acts the actor may view, oldest first.
    pub fn list_acts(&self, actor: &Account) -> HisResult<Vec<Act>> {
        ensure(
            has_model_perm(actor, PermAction::View, EntityKind::Act),
            actor,
            "view acts",
        )?;
        let cases: HashMap<ShardableUuid, Case> = self
            .store
            .list::<Case>()
            .into_iter()
            .map(|case| (case.id.clone(), case))
            .collect();
        let mut acts: Vec<Act> = self
            .store
            .list::<Act>()
            .into_iter()
            .filter(|act| {
                cases
                    .get(&act.case_id)
                    .is_some_and(|case| has_act_perm(actor, PermAction::View, act, case))
            })
            .collect();
        acts.sort_by_key(|act| act.lifecycle.stamps.created_at);
        Ok(acts)
    }

    pub fn show_act(&self, actor: &Account, act_id: &ShardableUuid) -> HisResult<Act> {
        let act = self.store.load::<Act>(act_id)?;
        let case = self.store.load::<Case>(&act.case_id)?;
        ensure(
            has_act_perm(actor, PermAction::View, &act, &case),
            actor,
            "view this act",
        )?;
        Ok(act)
    }

    pub fn close_act(&self, actor: &Account, act_id: &ShardableUuid) -> HisResult<Act> {
        let author = Author::for_account(actor)?;
        self.store.transaction(|tx| {
            let mut act = tx.load::<Act>(act_id)?;
            let case = tx.load::<Case>(&act.case_id)?;
            ensure(
                has_act_perm(actor, PermAction::Change, &act, &case),
                actor,
                "change this act",
            )?;

            act.lifecycle.close(Act::KIND)?;
            tx.save(
                &author,
                HisCommitDomain::Act,
                HisCommitAction::Close,
                "Closed act",
                &act,
            )?;
            Ok(act)
        })
    }
}

fn load_for_change(
    tx: &Transaction<'_>,
    actor: &Account,
    case_id: &ShardableUuid,
) -> HisResult<Case> {
    let case = tx.load::<Case>(case_id)?;
    ensure(
        has_case_perm(actor, PermAction::Change, &case),
        actor,
        "change this case",
    )?;
    Ok(case)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHospital;

    fn case_of(hospital: &TestHospital, last_name: &str) -> Case {
        let patient = hospital
            .store
            .list::<Patient>()
            .into_iter()
            .find(|p| p.person.last_name.as_str() == last_name)
            .unwrap();
        hospital
            .store
            .list::<Case>()
            .into_iter()
            .find(|c| c.patient_id == patient.id)
            .unwrap()
    }

    #[test]
    fn closing_and_reopening_a_case() {
        let hospital = TestHospital::new();
        let cases = &hospital.services.cases;
        let nurse = hospital.login("whitman");
        let case = case_of(&hospital, "Bohlen");

        let closed = cases.close_case(&nurse, &case.id).unwrap();
        assert!(closed.lifecycle.is_closed());
        assert!(closed.lifecycle.closed_at.is_some());
        assert!(matches!(
            cases.close_case(&nurse, &case.id),
            Err(HisError::AlreadyClosed { kind: "case" })
        ));

        let reopened = cases.reopen_case(&nurse, &case.id).unwrap();
        assert!(reopened.lifecycle.is_open());
        assert!(matches!(
            cases.reopen_case(&nurse, &case.id),
            Err(HisError::NotClosed { kind: "case" })
        ));
    }

    #[test]
    fn admission_staff_assign_doctors_but_do_not_close_cases() {
        let hospital = TestHospital::new();
        let cases = &hospital.services.cases;
        let clerk = hospital.login("durstig");
        let case = case_of(&hospital, "Bohlen");

        assert!(cases.show_case(&clerk, &case.id).is_ok());
        assert!(matches!(
            cases.close_case(&clerk, &case.id),
            Err(HisError::PermissionDenied(_))
        ));
        assert!(matches!(
            cases.assign_department(&clerk, &case.id, &hospital.department("Intensiv").id),
            Err(HisError::PermissionDenied(_))
        ));

        cases.close_case(&hospital.login("whitman"), &case.id).unwrap();
        assert!(matches!(
            cases.reopen_case(&clerk, &case.id),
            Err(HisError::PermissionDenied(_))
        ));
        assert!(hospital.store.load::<Case>(&case.id).unwrap().lifecycle.is_closed());
    }

    #[test]
    fn concurrent_closes_commit_once() {
        let hospital = TestHospital::new();
        let nurse = hospital.login("whitman");
        let case = case_of(&hospital, "Bohlen");
        let commits_before = hospital.store.audit_log(100).unwrap().len();

        let barrier = std::sync::Barrier::new(4);
        let results: Vec<HisResult<Case>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        hospital.services.cases.close_case(&nurse, &case.id)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, HisError::AlreadyClosed { kind: "case" })));
        assert_eq!(hospital.store.audit_log(100).unwrap().len(), commits_before + 1);
    }

    #[test]
    fn assigning_a_doctor() {
        let hospital = TestHospital::new();
        let cases = &hospital.services.cases;
        let clerk = hospital.login("durstig");
        let koch = hospital.login("koch");
        let nurse = hospital.login("karll");
        let case = case_of(&hospital, "van Gogh");

        // Koch neither works in admission nor holds the case yet.
        assert!(cases.show_case(&koch, &case.id).is_err());

        let assigned = cases.assign_doctor(&clerk, &case.id, &koch.id).unwrap();
        assert_eq!(assigned.assigned_doctor_id.as_ref(), Some(&koch.id));
        assert!(cases.show_case(&koch, &case.id).is_ok());
        assert!(matches!(
            cases.assign_doctor(&clerk, &case.id, &koch.id),
            Err(HisError::AlreadyAssigned(_))
        ));
        assert!(matches!(
            cases.assign_doctor(&clerk, &case.id, &nurse.id),
            Err(HisError::InvalidInput(_))
        ));
        assert!(matches!(
            cases.assign_doctor(&nurse, &case.id, &koch.id),
            Err(HisError::PermissionDenied(_))
        ));
    }

    #[test]
    fn case_listing_follows_department() {
        let hospital = TestHospital::new();
        let cases = &hospital.services.cases;

        assert_eq!(cases.list_cases(&hospital.login("whitman")).unwrap().len(), 3);
        assert_eq!(cases.list_cases(&hospital.login("durstig")).unwrap().len(), 3);
        assert!(cases.list_cases(&hospital.login("karll")).unwrap().is_empty());

        let intensive = hospital.department("Intensiv");
        let case = case_of(&hospital, "Bohlen");
        cases
            .assign_department(&hospital.login("tom"), &case.id, &intensive.id)
            .unwrap();
        let listed = cases.list_cases(&hospital.login("nightingale")).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, case.id);
    }

    #[test]
    fn rooms_of_a_case() {
        let hospital = TestHospital::new();
        let cases = &hospital.services.cases;
        let case = case_of(&hospital, "Bader-Ginsburg");

        let last = cases.last_room(&case).unwrap().unwrap();
        assert_eq!(last.name.as_str(), "Raum 1 - Internistische Station");
        let next = cases.next_room(&case).unwrap().unwrap();
        assert_eq!(next.name.as_str(), "OP-Raum 2");

        let fresh = case_of(&hospital, "van Gogh");
        assert!(cases.last_room(&fresh).unwrap().is_none());
        assert!(cases.next_room(&fresh).unwrap().is_none());
    }

    #[test]
    fn acts_need_an_open_case() {
        let hospital = TestHospital::new();
        let cases = &hospital.services.cases;
        let nurse = hospital.login("whitman");
        let internal = hospital.department("Innere Medizin");
        let case = case_of(&hospital, "van Gogh");

        let act = cases.create_act(&nurse, &case.id, &internal.id).unwrap();
        assert_eq!(act.initiator_id, nurse.id);
        assert_eq!(Some(&act.requesting_department_id), nurse.department_id());

        // The executing department sees the act, other departments do not.
        let koch = hospital.login("koch");
        assert!(cases.show_act(&koch, &act.id).is_ok());
        assert!(cases
            .show_act(&hospital.login("nightingale"), &act.id)
            .is_err());

        cases.close_act(&koch, &act.id).unwrap();
        cases.close_case(&nurse, &case.id).unwrap();
        assert!(matches!(
            cases.create_act(&nurse, &case.id, &internal.id),
            Err(HisError::AlreadyClosed { kind: "case" })
        ));
    }

    #[test]
    fn act_listing_is_filtered() {
        let hospital = TestHospital::new();
        let cases = &hospital.services.cases;

        // Both seeded acts were started by whitman.
        assert_eq!(cases.list_acts(&hospital.login("whitman")).unwrap().len(), 2);
        assert_eq!(cases.list_acts(&hospital.login("tom")).unwrap().len(), 2);
        // One act is executed by the intensive care unit, the other by internal medicine.
        assert_eq!(cases.list_acts(&hospital.login("nightingale")).unwrap().len(), 1);
        assert_eq!(cases.list_acts(&hospital.login("karll")).unwrap().len(), 1);        assert!(matches!(
            cases.list_acts(&hospital.login("hurtig")),
            Err(HisError::PermissionDenied(_))
        ));
    }
}
