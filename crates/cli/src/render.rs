//! Plain text views of records for the shell.

use chrono::{DateTime, Utc};
use his_core::models::accounts::Account;
use his_core::models::medical::Discipline;
use his_core::models::objects::{Department, DepartmentQualification, Patient, Room};
use his_core::models::tasks::{Act, Case, Order, OrderDetails, Report};
use his_core::services::PatientDetails;
use his_core::Store;
use his_uuid::ShardableUuid;
use std::collections::HashMap;

fn timestamp(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

fn status(closed_at: Option<&DateTime<Utc>>) -> String {
    match closed_at {
        Some(t) => format!("closed {}", timestamp(t)),
        None => "open".to_string(),
    }
}

pub fn patient_line(patient: &Patient) -> String {
    let born = patient
        .person
        .date_of_birth
        .map_or_else(|| "unknown".to_string(), |d| d.to_string());
    format!(
        "{}  {}, {} (born {})",
        patient.id, patient.person.last_name, patient.person.first_name, born
    )
}

pub fn department_line(department: &Department) -> String {
    format!("{}  {}", department.id, department.name)
}

/// Display names of everything records refer to by id.
pub struct Names {
    departments: HashMap<ShardableUuid, String>,
    rooms: HashMap<ShardableUuid, String>,
    accounts: HashMap<ShardableUuid, String>,
    patients: HashMap<ShardableUuid, String>,
}

impl Names {
    pub fn load(store: &Store) -> Self {
        Self {
            departments: store
                .list::<Department>()
                .into_iter()
                .map(|d| (d.id, d.name.to_string()))
                .collect(),
            rooms: store
                .list::<Room>()
                .into_iter()
                .map(|r| (r.id, r.name.to_string()))
                .collect(),
            accounts: store
                .list::<Account>()
                .into_iter()
                .map(|a| {
                    let name = a.display_name();
                    (a.id, name)
                })
                .collect(),
            patients: store
                .list::<Patient>()
                .into_iter()
                .map(|p| (p.id, p.person.display_name()))
                .collect(),
        }
    }

    fn name<'a>(map: &'a HashMap<ShardableUuid, String>, id: &ShardableUuid) -> &'a str {
        map.get(id).map_or("?", String::as_str)
    }

    fn department(&self, id: &ShardableUuid) -> &str {
        Self::name(&self.departments, id)
    }

    fn room(&self, id: &ShardableUuid) -> &str {
        Self::name(&self.rooms, id)
    }

    fn account(&self, id: &ShardableUuid) -> &str {
        Self::name(&self.accounts, id)
    }

    fn patient(&self, id: &ShardableUuid) -> &str {
        Self::name(&self.patients, id)
    }

    pub fn case_line(&self, case: &Case) -> String {
        format!(
            "{}  {}  {}  opened {}  {}",
            case.id,
            self.patient(&case.patient_id),
            self.department(&case.assigned_department_id),
            timestamp(&case.lifecycle.stamps.created_at),
            status(case.lifecycle.closed_at.as_ref())
        )
    }

    pub fn case_details(&self, case: &Case, last_room: Option<&Room>, next_room: Option<&Room>) -> String {
        let doctor = case
            .assigned_doctor_id
            .as_ref()
            .map_or("none", |id| self.account(id));
        let room = |room: Option<&Room>| room.map_or_else(|| "-".to_string(), |r| r.name.to_string());
        format!(
            "Case {}\n  Patient: {}\n  Department: {}\n  Doctor: {}\n  Opened: {}\n  Status: {}\n  Last room: {}\n  Next room: {}",
            case.id,
            self.patient(&case.patient_id),
            self.department(&case.assigned_department_id),
            doctor,
            timestamp(&case.lifecycle.stamps.created_at),
            status(case.lifecycle.closed_at.as_ref()),
            room(last_room),
            room(next_room)
        )
    }

    pub fn patient_details(&self, details: &PatientDetails) -> String {
        let patient = &details.patient;
        let person = &patient.person;
        let mut text = format!(
            "Patient {}\n  Name: {}\n  Gender: {}\n  Born: {}",
            patient.id,
            person.display_name(),
            person.gender,
            person
                .date_of_birth
                .map_or_else(|| "unknown".to_string(), |d| d.to_string())
        );
        if let Some(address) = &patient.address {
            text.push_str(&format!("\n  Address: {}", address.lines().replace('\n', ", ")));
        }
        if let Some(history) = &details.history {
            text.push_str("\nMedical history:");
            for entry in history {
                text.push_str(&format!(
                    "\n\t{}  {}  opened {}  {}  doctor: {}",
                    entry.case.id,
                    entry.department_name,
                    timestamp(&entry.case.lifecycle.stamps.created_at),
                    status(entry.case.lifecycle.closed_at.as_ref()),
                    entry.doctor_name.as_deref().unwrap_or("none")
                ));
            }
        }
        text
    }

    pub fn act_line(&self, act: &Act) -> String {
        format!(
            "{}  case {}  {} -> {}  {}",
            act.id,
            act.case_id,
            self.department(&act.requesting_department_id),
            self.department(&act.executing_department_id),
            status(act.lifecycle.closed_at.as_ref())
        )
    }

    pub fn act_details(&self, act: &Act) -> String {
        format!(
            "Act {}\n  Case: {}\n  Started by: {}\n  Requested by: {}\n  Executed by: {}\n  Opened: {}\n  Status: {}",
            act.id,
            act.case_id,
            self.account(&act.initiator_id),
            self.department(&act.requesting_department_id),
            self.department(&act.executing_department_id),
            timestamp(&act.lifecycle.stamps.created_at),
            status(act.lifecycle.closed_at.as_ref())
        )
    }

    fn order_summary(&self, details: &OrderDetails) -> String {
        match details {
            OrderDetails::Transport {
                from_room, to_room, ..
            } => format!("{} -> {}", self.room(from_room), self.room(to_room)),
            OrderDetails::Transfer {
                from_department,
                to_department,
            } => format!(
                "{} -> {}",
                self.department(from_department),
                self.department(to_department)
            ),
            OrderDetails::Treatment { description, .. }
            | OrderDetails::Examination { description, .. } => description.to_string(),
        }
    }

    pub fn order_line(&self, order: &Order) -> String {
        format!(
            "{}  {}  {}  {}",
            order.id,
            order.kind().label(),
            self.order_summary(&order.details),
            status(order.lifecycle.closed_at.as_ref())
        )
    }

    pub fn order_details(&self, order: &Order) -> String {
        let mut text = format!(
            "{} {}\n  Act: {}\n  Issued by: {}\n  Assigned to: {}\n  What: {}",
            order.kind().label(),
            order.id,
            order.act_id,
            self.account(&order.issued_by),
            order
                .assigned_to
                .as_ref()
                .map_or("nobody", |id| self.account(id)),
            self.order_summary(&order.details)
        );
        match &order.details {
            OrderDetails::Transport {
                requested_arrival_by,
                supervised,
                supervised_by,
                ..
            } => {
                if let Some(t) = requested_arrival_by {
                    text.push_str(&format!("\n  Arrival by: {}", timestamp(t)));
                }
                if *supervised {
                    let doctor = supervised_by.as_ref().map_or("any doctor", |id| self.account(id));
                    text.push_str(&format!("\n  Supervised by: {doctor}"));
                }
            }
            OrderDetails::Treatment {
                discipline: Some(discipline),
                ..
            }
            | OrderDetails::Examination {
                discipline: Some(discipline),
                ..
            } => text.push_str(&format!("\n  Discipline: {}", discipline.label())),
            _ => {}
        }
        text.push_str(&format!(
            "\n  Opened: {}\n  Status: {}",
            timestamp(&order.lifecycle.stamps.created_at),
            status(order.lifecycle.closed_at.as_ref())
        ));
        text
    }

    pub fn report_line(&self, report: &Report) -> String {
        format!(
            "{}  {}  case {}  by {}  {}",
            report.id,
            report.kind.label(),
            report.case_id,
            self.account(&report.written_by),
            timestamp(&report.stamps.created_at)
        )
    }

    pub fn report_details(&self, report: &Report) -> String {
        let mut text = format!(
            "{} {}\n  Case: {}\n  Written by: {}\n  Written: {}",
            report.kind.label(),
            report.id,
            report.case_id,
            self.account(&report.written_by),
            timestamp(&report.stamps.created_at)
        );
        if let Some(order_id) = &report.order_id {
            text.push_str(&format!("\n  Order: {order_id}"));
        }
        text.push_str(&format!("\n\n{}", report.text));
        if let Some(staging) = &report.staging {
            text.push_str(&format!("\n\nTNM {staging}\n{}", staging.describe().trim_end()));
        }
        if let Some(resection) = &report.resection {
            text.push_str(&format!("\n\n{resection}"));
        }
        if let Some(study) = &report.imaging {
            text.push_str(&format!("\n\n{study} ({})", study.modality.label()));
        }
        text
    }

    /// `"{department} braucht {discipline}"`.
    pub fn qualification_line(&self, qualification: &DepartmentQualification) -> String {
        format!(
            "{} braucht {}",
            self.department(&qualification.department_id),
            qualification.discipline.label()
        )
    }

    pub fn room_line(&self, room: &Room) -> String {
        let department = room
            .department_id
            .as_ref()
            .map_or("no department", |id| self.department(id));
        format!(
            "{}  {}  ({})  {}/{} in use",
            room.id, room.name, department, room.usage, room.capacity
        )
    }

    pub fn employee_line(&self, account: &Account) -> String {
        let Some(employee) = &account.employee else {
            return format!("{}  {}  superuser", account.id, account.username);
        };
        format!(
            "{}  {}  {}  {}  {}{}",
            account.id,
            account.username,
            employee.person.display_name(),
            employee.role.label(),
            self.department(&employee.department_id),
            if account.is_active { "" } else { "  (inactive)" }
        )
    }

    pub fn employee_details(&self, account: &Account, qualifications: &[Discipline]) -> String {
        let mut text = self.employee_line(account);
        if let Some(email) = &account.email {
            text.push_str(&format!("\n  Email: {email}"));
        }
        if let Some(employee) = &account.employee {
            text.push_str(&format!(
                "\n  Staff group: {}\n  Address: {}",
                employee.kind().label(),
                employee.address.lines().replace('\n', ", ")
            ));
        }
        for discipline in qualifications {
            text.push_str(&format!("\n  Qualified in: {}", discipline.label()));
        }
        text
    }
}
