//! Who may do what.
//!
//! Two layers. Model permissions say which actions an employee kind may take on a kind of
//! record at all. Object predicates then narrow that down to the records the actor is
//! involved with, through their department, authorship or assignment.
//!
//! Inactive accounts have no permissions. Active superusers have all of them.

use crate::models::accounts::{Account, EmployeeKind, PersonnelFunction};
use crate::models::objects::Patient;
use crate::models::tasks::{Act, Case, Order, OrderKind, Report};

coded_enum! {
    PermAction ("permission action") {
        View => "view", "view",
        Add => "add", "add",
        Change => "change", "change",
        Delete => "delete", "delete",
    }
}

coded_enum! {
    /// Kinds of record permissions are granted on.
    EntityKind ("entity kind") {
        Department => "department", "Abteilung",
        Room => "room", "Raum",
        AdministrativeEmployee => "administrative_employee", "Verwaltungspersonal",
        Doctor => "doctor", "Ärztliches Personal",
        Nurse => "nurse", "Pflegepersonal",
        GeneralPersonnel => "general_personnel", "Allgemeines Personal",
        DoctorQualification => "doctor_qualification", "Ärztliche Qualifikation",
        DepartmentQualification => "department_qualification", "Abteilungsqualifikation",
        Patient => "patient", "Patient_in",
        Case => "case", "Fall",
        Act => "act", "Maßnahme",
        TransportOrder => "transport_order", "Transportauftrag",
        TransferOrder => "transfer_order", "Verlegung",
        TreatmentOrder => "treatment_order", "Behandlung",
        ExaminationOrder => "examination_order", "Untersuchung",
        Report => "report", "Bericht",
    }
}

impl EntityKind {
    pub const fn for_employee(kind: EmployeeKind) -> Self {
        match kind {
            EmployeeKind::Administrative => Self::AdministrativeEmployee,
            EmployeeKind::Doctor => Self::Doctor,
            EmployeeKind::Nurse => Self::Nurse,
            EmployeeKind::GeneralPersonnel => Self::GeneralPersonnel,
        }
    }

    pub const fn for_order(kind: OrderKind) -> Self {
        match kind {
            OrderKind::Transport => Self::TransportOrder,
            OrderKind::Transfer => Self::TransferOrder,
            OrderKind::Treatment => Self::TreatmentOrder,
            OrderKind::Examination => Self::ExaminationOrder,
        }
    }

    /// Staff records; the superuser account itself has none.
    const fn is_staff(self) -> bool {
        matches!(
            self,
            Self::AdministrativeEmployee | Self::Doctor | Self::Nurse | Self::GeneralPersonnel
        )
    }
}

use EntityKind as E;
use PermAction as A;

fn administrative_perm(action: PermAction, entity: EntityKind) -> bool {
    match entity {
        E::Department | E::Room | E::DepartmentQualification | E::DoctorQualification => true,
        e if e.is_staff() => action != A::Delete,
        E::Patient => action != A::Delete,
        E::Case => matches!(action, A::Add | A::View),
        _ => false,
    }
}

fn doctor_perm(action: PermAction, entity: EntityKind) -> bool {
    match entity {
        E::Act
        | E::Case
        | E::TransportOrder
        | E::TransferOrder
        | E::TreatmentOrder
        | E::ExaminationOrder
        | E::Report => action != A::Delete,
        _ => action == A::View,
    }
}

fn nurse_perm(action: PermAction, entity: EntityKind) -> bool {
    match entity {
        E::Act | E::Case => action != A::Delete,
        E::Patient => matches!(action, A::Change | A::View),
        E::TransferOrder => matches!(action, A::Add | A::View),
        E::Department
        | E::Room
        | E::DepartmentQualification
        | E::DoctorQualification
        | E::Report
        | E::TransportOrder => action == A::View,
        e if e.is_staff() => action == A::View,
        _ => false,
    }
}

fn general_personnel_perm(action: PermAction, entity: EntityKind) -> bool {
    match entity {
        E::TransportOrder => matches!(action, A::View | A::Change),
        E::Room | E::Department => action == A::View,
        _ => false,
    }
}

/// Model-level permission: may `account` take `action` on records of kind `entity` at all?
pub fn has_model_perm(account: &Account, action: PermAction, entity: EntityKind) -> bool {
    if !account.is_active {
        return false;
    }
    if account.is_superuser() {
        return true;
    }
    match account.kind() {
        Some(EmployeeKind::Administrative) => administrative_perm(action, entity),
        Some(EmployeeKind::Doctor) => doctor_perm(action, entity),
        Some(EmployeeKind::Nurse) => nurse_perm(action, entity),
        Some(EmployeeKind::GeneralPersonnel) => general_personnel_perm(action, entity),
        None => false,
    }
}

/// Superusers and administrative staff: admission and management see every record of the
/// kinds they hold model permissions on.
pub fn is_privileged(account: &Account) -> bool {
    account.is_active
        && (account.is_superuser() || account.kind() == Some(EmployeeKind::Administrative))
}

fn in_department(actor: &Account, department_id: &his_uuid::ShardableUuid) -> bool {
    actor.department_id() == Some(department_id)
}

/// Case access: members of the assigned department and the assigned doctor may view and change
/// it. Administrative staff view every case.
pub fn has_case_perm(actor: &Account, action: PermAction, case: &Case) -> bool {
    if !has_model_perm(actor, action, E::Case) {
        return false;
    }
    if actor.is_superuser() {
        return true;
    }
    match action {
        A::Add => true,
        A::View | A::Change => {
            (action == A::View && is_privileged(actor))
                || in_department(actor, &case.assigned_department_id)
                || case.assigned_doctor_id.as_ref() == Some(&actor.id)
        }
        A::Delete => false,
    }
}

/// Staff access: colleagues of the same department or kind, and all general personnel, are
/// visible. Administrative staff manage every employee.
pub fn has_employee_perm(actor: &Account, action: PermAction, target: &Account) -> bool {
    let Some(target_kind) = target.kind() else {
        // Superuser accounts are not employees.
        return actor.is_superuser();
    };
    if !has_model_perm(actor, action, EntityKind::for_employee(target_kind)) {
        return false;
    }
    if is_privileged(actor) {
        return true;
    }
    if action != A::View {
        return false;
    }
    actor.kind() == Some(target_kind)
        || target_kind == EmployeeKind::GeneralPersonnel
        || target
            .department_id()
            .is_some_and(|department| in_department(actor, department))
}

/// Act access: the initiator, the executing department and the case's doctor work on the act;
/// the case's department may look at it.
pub fn has_act_perm(actor: &Account, action: PermAction, act: &Act, case: &Case) -> bool {
    if !has_model_perm(actor, action, E::Act) {
        return false;
    }
    if actor.is_superuser() {
        return true;
    }
    let involved = act.initiator_id == actor.id
        || in_department(actor, &act.executing_department_id)
        || case.assigned_doctor_id.as_ref() == Some(&actor.id);
    match action {
        A::Add | A::Change | A::View if involved => true,
        A::View => in_department(actor, &case.assigned_department_id),
        _ => false,
    }
}

fn is_transport_staff(actor: &Account) -> bool {
    actor
        .employee
        .as_ref()
        .and_then(|e| e.role.function())
        == Some(PersonnelFunction::Transport)
}

/// Order access: issuer and assignee view and change the order; whoever can see the act can
/// see its orders. Transport staff see every transport order.
pub fn has_order_perm(
    actor: &Account,
    action: PermAction,
    order: &Order,
    act: &Act,
    case: &Case,
) -> bool {
    if !has_model_perm(actor, action, EntityKind::for_order(order.kind())) {
        return false;
    }
    if actor.is_superuser() {
        return true;
    }
    let own = order.issued_by == actor.id || order.assigned_to.as_ref() == Some(&actor.id);
    match action {
        A::Add => has_act_perm(actor, A::Change, act, case),
        A::View | A::Change if own => true,
        A::View => {
            (order.kind() == OrderKind::Transport && is_transport_staff(actor))
                || has_act_perm(actor, A::View, act, case)
        }
        _ => false,
    }
}

/// Report access: the author views and changes it; anyone who can see the case can read it.
pub fn has_report_perm(actor: &Account, action: PermAction, report: &Report, case: &Case) -> bool {
    if !has_model_perm(actor, action, E::Report) {
        return false;
    }
    if actor.is_superuser() {
        return true;
    }
    match action {
        A::Add => has_case_perm(actor, A::View, case),
        A::View | A::Change if report.written_by == actor.id => true,
        A::View => has_case_perm(actor, A::View, case),
        _ => false,
    }
}

/// Patient access: administrative staff reach every patient; clinical staff reach the patients
/// of cases they can see.
pub fn has_patient_perm(
    actor: &Account,
    action: PermAction,
    patient: &Patient,
    cases: &[Case],
) -> bool {
    if !has_model_perm(actor, action, E::Patient) {
        return false;
    }
    if is_privileged(actor) {
        return true;
    }
    matches!(action, A::View | A::Change)
        && cases
            .iter()
            .filter(|case| case.patient_id == patient.id)
            .any(|case| has_case_perm(actor, A::View, case))
}
