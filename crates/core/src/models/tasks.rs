//! Clinical workflow records: cases, acts, orders and reports.

use super::common::{Lifecycle, TimeStamps};
use super::medical::Discipline;
use super::staging::{ImagingStudy, Resection, TnmStaging};
use super::Record;
use crate::constants::{ACTS_DIR_NAME, CASES_DIR_NAME, ORDERS_DIR_NAME, REPORTS_DIR_NAME};
use crate::error::{HisError, HisResult};
use chrono::{DateTime, Utc};
use his_types::NonEmptyText;
use his_uuid::ShardableUuid;
use serde::{Deserialize, Serialize};

/// A patient's stay, from admission to discharge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: ShardableUuid,
    pub patient_id: ShardableUuid,
    pub assigned_department_id: ShardableUuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_doctor_id: Option<ShardableUuid>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Case {
    pub fn new(patient_id: ShardableUuid, assigned_department_id: ShardableUuid) -> Self {
        Self {
            id: ShardableUuid::new(),
            patient_id,
            assigned_department_id,
            assigned_doctor_id: None,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Makes `doctor_id` the responsible doctor.
    ///
    /// # Errors
    ///
    /// Returns `HisError::AlreadyClosed` for a closed case and `HisError::AlreadyAssigned` if
    /// the doctor already holds the case.
    pub fn assign_doctor(&mut self, doctor_id: ShardableUuid) -> HisResult<()> {
        if self.lifecycle.is_closed() {
            return Err(HisError::AlreadyClosed { kind: Self::KIND });
        }
        if self.assigned_doctor_id.as_ref() == Some(&doctor_id) {
            return Err(HisError::AlreadyAssigned(format!("doctor {doctor_id}")));
        }
        self.assigned_doctor_id = Some(doctor_id);
        self.lifecycle.stamps.touch();
        Ok(())
    }
}

impl_record!(Case, "case", CASES_DIR_NAME);

/// A clinical action within a case, requested by one department and carried out by another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Act {
    pub id: ShardableUuid,
    pub case_id: ShardableUuid,
    pub initiator_id: ShardableUuid,
    pub requesting_department_id: ShardableUuid,
    pub executing_department_id: ShardableUuid,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Act {
    pub fn new(
        case_id: ShardableUuid,
        initiator_id: ShardableUuid,
        requesting_department_id: ShardableUuid,
        executing_department_id: ShardableUuid,
    ) -> Self {
        Self {
            id: ShardableUuid::new(),
            case_id,
            initiator_id,
            requesting_department_id,
            executing_department_id,
            lifecycle: Lifecycle::new(),
        }
    }
}

impl_record!(Act, "act", ACTS_DIR_NAME);

coded_enum! {
    OrderKind ("order kind") {
        Transport => "transport", "Transportauftrag",
        Transfer => "transfer", "Verlegung",
        Treatment => "treatment", "Behandlung",
        Examination => "examination", "Untersuchung",
    }
}

/// What an order asks for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderDetails {
    /// Move the patient between rooms.
    Transport {
        from_room: ShardableUuid,
        to_room: ShardableUuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        requested_arrival_by: Option<DateTime<Utc>>,
        #[serde(default)]
        supervised: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        supervised_by: Option<ShardableUuid>,
    },
    /// Hand the case over to another department.
    Transfer {
        from_department: ShardableUuid,
        to_department: ShardableUuid,
    },
    Treatment {
        description: NonEmptyText,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        discipline: Option<Discipline>,
    },
    Examination {
        description: NonEmptyText,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        discipline: Option<Discipline>,
    },
}

impl OrderDetails {
    pub fn kind(&self) -> OrderKind {
        match self {
            Self::Transport { .. } => OrderKind::Transport,
            Self::Transfer { .. } => OrderKind::Transfer,
            Self::Treatment { .. } => OrderKind::Treatment,
            Self::Examination { .. } => OrderKind::Examination,
        }
    }

    /// Checks the rules that need no other records.
    ///
    /// # Errors
    ///
    /// Returns `HisError::InvalidInput` for a transport or transfer to where it starts, and for
    /// a supervised transport without a supervisor.
    pub fn validate(&self) -> HisResult<()> {
        match self {
            Self::Transport {
                from_room,
                to_room,
                supervised,
                supervised_by,
                ..
            } => {
                if from_room == to_room {
                    return Err(HisError::InvalidInput(
                        "transport must go to a different room".into(),
                    ));
                }
                if *supervised && supervised_by.is_none() {
                    return Err(HisError::InvalidInput(
                        "supervised transport needs a supervising doctor".into(),
                    ));
                }
                if !*supervised && supervised_by.is_some() {
                    return Err(HisError::InvalidInput(
                        "supervisor given for an unsupervised transport".into(),
                    ));
                }
            }
            Self::Transfer {
                from_department,
                to_department,
            } => {
                if from_department == to_department {
                    return Err(HisError::InvalidInput(
                        "transfer must go to a different department".into(),
                    ));
                }
            }
            Self::Treatment { .. } | Self::Examination { .. } => {}
        }
        Ok(())
    }
}

/// A work request issued by one member of staff, optionally assigned to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: ShardableUuid,
    pub act_id: ShardableUuid,
    pub issued_by: ShardableUuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<ShardableUuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
    pub details: OrderDetails,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Order {
    /// # Errors
    ///
    /// Returns whatever [`OrderDetails::validate`] rejects.
    pub fn new(act_id: ShardableUuid, issued_by: ShardableUuid, details: OrderDetails) -> HisResult<Self> {
        details.validate()?;
        Ok(Self {
            id: ShardableUuid::new(),
            act_id,
            issued_by,
            assigned_to: None,
            assigned_at: None,
            details,
            lifecycle: Lifecycle::new(),
        })
    }

    pub fn kind(&self) -> OrderKind {
        self.details.kind()
    }

    /// Hands the order to `assignee`.
    ///
    /// # Errors
    ///
    /// Returns `HisError::AlreadyClosed` for a closed order and `HisError::AlreadyAssigned` if
    /// `assignee` already holds it.
    pub fn assign(&mut self, assignee: ShardableUuid) -> HisResult<()> {
        if self.lifecycle.is_closed() {
            return Err(HisError::AlreadyClosed { kind: Self::KIND });
        }
        if self.assigned_to.as_ref() == Some(&assignee) {
            return Err(HisError::AlreadyAssigned(format!("order {}", self.id)));
        }
        let now = Utc::now();
        self.assigned_to = Some(assignee);
        self.assigned_at = Some(now);
        self.lifecycle.stamps.updated_at = now;
        Ok(())
    }

    /// Destination room of a transport order.
    pub fn transport_destination(&self) -> Option<&ShardableUuid> {
        match &self.details {
            OrderDetails::Transport { to_room, .. } => Some(to_room),
            _ => None,
        }
    }
}

impl_record!(Order, "order", ORDERS_DIR_NAME);

coded_enum! {
    ReportKind ("report kind") {
        Anamnesis => "anamnesis", "Anamnese",
        Diagnosis => "diagnosis", "Diagnose",
        Examination => "examination", "Untersuchungsbericht",
        Therapy => "therapy", "Therapiebericht",
        Findings => "findings", "Befund",
    }
}

impl ReportKind {
    pub const fn allows_staging(self) -> bool {
        matches!(self, Self::Findings | Self::Diagnosis)
    }

    pub const fn allows_resection(self) -> bool {
        matches!(self, Self::Therapy)
    }

    pub const fn allows_imaging(self) -> bool {
        matches!(self, Self::Examination)
    }
}

/// Clinical documentation on a case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ShardableUuid,
    pub case_id: ShardableUuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<ShardableUuid>,
    pub written_by: ShardableUuid,
    pub kind: ReportKind,
    pub text: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging: Option<TnmStaging>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resection: Option<Resection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imaging: Option<ImagingStudy>,
    #[serde(flatten)]
    pub stamps: TimeStamps,
}

/// Fields of a report before it is filed.
#[derive(Clone, Debug)]
pub struct ReportDraft {
    pub case_id: ShardableUuid,
    pub order_id: Option<ShardableUuid>,
    pub kind: ReportKind,
    pub text: String,
    pub staging: Option<TnmStaging>,
    pub resection: Option<Resection>,
    pub imaging: Option<ImagingStudy>,
}

impl Report {
    /// Files `draft` as written by `author_id`.
    ///
    /// # Errors
    ///
    /// Returns `HisError::InvalidInput` for empty text, or for a staging, resection or imaging
    /// study on a report kind that does not carry one.
    pub fn new(draft: ReportDraft, author_id: ShardableUuid) -> HisResult<Self> {
        if draft.staging.is_some() && !draft.kind.allows_staging() {
            return Err(HisError::InvalidInput(format!(
                "{} reports cannot carry a TNM staging",
                draft.kind.code()
            )));
        }
        if draft.resection.is_some() && !draft.kind.allows_resection() {
            return Err(HisError::InvalidInput(format!(
                "{} reports cannot carry resection data",
                draft.kind.code()
            )));
        }
        if draft.imaging.is_some() && !draft.kind.allows_imaging() {
            return Err(HisError::InvalidInput(format!(
                "{} reports cannot carry an imaging study",
                draft.kind.code()
            )));
        }
        let text = NonEmptyText::new(draft.text.trim())
            .map_err(|_| HisError::InvalidInput("report text must not be empty".into()))?;

        Ok(Self {
            id: ShardableUuid::new(),
            case_id: draft.case_id,
            order_id: draft.order_id,
            written_by: author_id,
            kind: draft.kind,
            text,
            staging: draft.staging,
            resection: draft.resection,
            imaging: draft.imaging,
            stamps: TimeStamps::now(),
        })
    }
}

impl_record!(Report, "report", REPORTS_DIR_NAME);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::staging::Modality;
    use chrono::NaiveDate;

    fn draft(kind: ReportKind) -> ReportDraft {
        ReportDraft {
            case_id: ShardableUuid::new(),
            order_id: None,
            kind,
            text: "Patient reports chest pain.".into(),
            staging: None,
            resection: None,
            imaging: None,
        }
    }

    #[test]
    fn case_assignment_rules() {
        let mut case = Case::new(ShardableUuid::new(), ShardableUuid::new());
        let doctor = ShardableUuid::new();

        case.assign_doctor(doctor.clone()).unwrap();
        assert_eq!(case.assigned_doctor_id.as_ref(), Some(&doctor));
        assert!(matches!(
            case.assign_doctor(doctor),
            Err(HisError::AlreadyAssigned(_))
        ));

        case.lifecycle.close(Case::KIND).unwrap();
        assert!(case.lifecycle.is_closed());
        assert!(matches!(
            case.assign_doctor(ShardableUuid::new()),
            Err(HisError::AlreadyClosed { .. })
        ));
    }

    #[test]
    fn closed_orders_cannot_be_reassigned() {
        let mut order = Order::new(
            ShardableUuid::new(),
            ShardableUuid::new(),
            OrderDetails::Examination {
                description: NonEmptyText::new("Röntgen Thorax").unwrap(),
                discipline: Some(Discipline::Radiology),
            },
        )
        .unwrap();

        order.assign(ShardableUuid::new()).unwrap();
        assert!(order.assigned_at.is_some());

        order.lifecycle.close(Order::KIND).unwrap();
        assert!(matches!(
            order.assign(ShardableUuid::new()),
            Err(HisError::AlreadyClosed { kind: "order" })
        ));
    }

    #[test]
    fn transport_details_are_validated() {
        let room = ShardableUuid::new();
        let same_room = OrderDetails::Transport {
            from_room: room.clone(),
            to_room: room,
            requested_arrival_by: None,
            supervised: false,
            supervised_by: None,
        };
        assert!(same_room.validate().is_err());

        let unsupervised = OrderDetails::Transport {
            from_room: ShardableUuid::new(),
            to_room: ShardableUuid::new(),
            requested_arrival_by: None,
            supervised: true,
            supervised_by: None,
        };
        assert!(unsupervised.validate().is_err());

        let department = ShardableUuid::new();
        let transfer = OrderDetails::Transfer {
            from_department: department.clone(),
            to_department: department,
        };
        assert!(transfer.validate().is_err());
    }

    #[test]
    fn order_details_are_tagged_by_kind() {
        let details = OrderDetails::Treatment {
            description: NonEmptyText::new("Wundversorgung").unwrap(),
            discipline: None,
        };
        let yaml = serde_yaml::to_string(&details).unwrap();
        assert!(yaml.starts_with("kind: treatment"));
        assert_eq!(details.kind(), OrderKind::Treatment);
    }

    #[test]
    fn report_payloads_depend_on_kind() {
        let staging = TnmStaging::parse("T2N1M0").unwrap();
        let resection = Resection {
            organ: NonEmptyText::new("colon").unwrap(),
            resected_on: NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
        };

        let mut findings = draft(ReportKind::Findings);
        findings.staging = Some(staging);
        assert!(Report::new(findings, ShardableUuid::new()).is_ok());

        let mut anamnesis = draft(ReportKind::Anamnesis);
        anamnesis.staging = Some(staging);
        assert!(Report::new(anamnesis, ShardableUuid::new()).is_err());

        let mut therapy = draft(ReportKind::Therapy);
        therapy.resection = Some(resection.clone());
        assert!(Report::new(therapy, ShardableUuid::new()).is_ok());

        let mut diagnosis = draft(ReportKind::Diagnosis);
        diagnosis.resection = Some(resection);
        assert!(Report::new(diagnosis, ShardableUuid::new()).is_err());

        let imaging = ImagingStudy {
            modality: Modality::Ct,
            body_part: NonEmptyText::new("Thorax").unwrap(),
            study_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            patient_id: ShardableUuid::new(),
        };
        let mut examination = draft(ReportKind::Examination);
        examination.imaging = Some(imaging.clone());
        assert!(Report::new(examination, ShardableUuid::new()).is_ok());

        let mut findings = draft(ReportKind::Findings);
        findings.imaging = Some(imaging);
        assert!(Report::new(findings, ShardableUuid::new()).is_err());
    }

    #[test]
    fn report_text_is_required() {
        let mut empty = draft(ReportKind::Anamnesis);
        empty.text = "   ".into();
        assert!(matches!(
            Report::new(empty, ShardableUuid::new()),
            Err(HisError::InvalidInput(_))
        ));
    }
}
