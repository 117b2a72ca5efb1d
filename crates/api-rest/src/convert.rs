//! Mapping between core records and the JSON bodies of `api-shared`.

use api_shared::{
    ActRes, AddressDto, CaseRes, DepartmentRes, EmployeeRes, HistoryEntryRes, ImagingStudyDto,
    OrderFields, OrderRes, PatientRes, PersonDto, ReportRes, ResectionDto, RoomRes,
};
use chrono::{DateTime, NaiveDate, Utc};
use his_core::models::accounts::Account;
use his_core::models::common::{Address, Gender, Person};
use his_core::models::medical::Discipline;
use his_core::models::objects::{Department, Patient, Room};
use his_core::models::staging::{ImagingStudy, Resection, TnmStaging};
use his_core::models::tasks::{Act, Case, Order, OrderDetails, OrderKind, Report};
use his_core::services::HistoryEntry;
use his_core::{HisError, HisResult};
use his_types::NonEmptyText;
use his_uuid::ShardableUuid;

pub fn parse_id(input: &str) -> HisResult<ShardableUuid> {
    Ok(ShardableUuid::parse(input.trim())?)
}

fn parse_date(field: &str, input: &str) -> HisResult<NaiveDate> {
    input
        .trim()
        .parse()
        .map_err(|_| HisError::InvalidInput(format!("{field} must be a YYYY-MM-DD date")))
}

fn parse_timestamp(field: &str, input: &str) -> HisResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| HisError::InvalidInput(format!("{field} must be an RFC 3339 timestamp")))
}

fn required<'a>(field: &str, value: &'a Option<String>) -> HisResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| HisError::InvalidInput(format!("{field} is required")))
}

fn rfc3339(t: &DateTime<Utc>) -> String {
    t.to_rfc3339()
}

pub fn person_from_dto(dto: &PersonDto) -> HisResult<Person> {
    let gender: Gender = dto.gender.parse()?;
    let date_of_birth = dto
        .date_of_birth
        .as_deref()
        .map(|d| parse_date("date_of_birth", d))
        .transpose()?;
    Person::new(
        gender,
        dto.title.as_deref(),
        &dto.first_name,
        &dto.last_name,
        date_of_birth,
    )
}

pub fn address_from_dto(dto: &AddressDto) -> HisResult<Address> {
    Address::new(&dto.street, dto.street_number, &dto.zip_code, &dto.city)
}

fn person_dto(person: &Person) -> PersonDto {
    PersonDto {
        gender: person.gender.code().to_string(),
        title: person.title.as_ref().map(ToString::to_string),
        first_name: person.first_name.to_string(),
        last_name: person.last_name.to_string(),
        date_of_birth: person.date_of_birth.map(|d| d.to_string()),
    }
}

fn address_dto(address: &Address) -> AddressDto {
    AddressDto {
        street: address.street.to_string(),
        street_number: address.street_number,
        zip_code: address.zip_code.to_string(),
        city: address.city.to_string(),
    }
}

pub fn patient_res(patient: &Patient, history: Option<&[HistoryEntry]>) -> PatientRes {
    PatientRes {
        id: patient.id.to_string(),
        person: person_dto(&patient.person),
        address: patient.address.as_ref().map(address_dto),
        history: history.map(|entries| {
            entries
                .iter()
                .map(|entry| HistoryEntryRes {
                    case_id: entry.case.id.to_string(),
                    department: entry.department_name.clone(),
                    doctor: entry.doctor_name.clone(),
                    opened_at: rfc3339(&entry.case.lifecycle.stamps.created_at),
                    closed_at: entry.case.lifecycle.closed_at.as_ref().map(rfc3339),
                })
                .collect()
        }),
    }
}

pub fn case_res(case: &Case) -> CaseRes {
    CaseRes {
        id: case.id.to_string(),
        patient_id: case.patient_id.to_string(),
        department_id: case.assigned_department_id.to_string(),
        doctor_id: case.assigned_doctor_id.as_ref().map(ToString::to_string),
        opened_at: rfc3339(&case.lifecycle.stamps.created_at),
        closed_at: case.lifecycle.closed_at.as_ref().map(rfc3339),
        last_room: None,
        next_room: None,
    }
}

pub fn act_res(act: &Act) -> ActRes {
    ActRes {
        id: act.id.to_string(),
        case_id: act.case_id.to_string(),
        initiator_id: act.initiator_id.to_string(),
        requesting_department_id: act.requesting_department_id.to_string(),
        executing_department_id: act.executing_department_id.to_string(),
        opened_at: rfc3339(&act.lifecycle.stamps.created_at),
        closed_at: act.lifecycle.closed_at.as_ref().map(rfc3339),
    }
}

fn order_fields(details: &OrderDetails) -> OrderFields {
    let mut fields = OrderFields {
        kind: details.kind().code().to_string(),
        ..OrderFields::default()
    };
    match details {
        OrderDetails::Transport {
            from_room,
            to_room,
            requested_arrival_by,
            supervised,
            supervised_by,
        } => {
            fields.from_room = Some(from_room.to_string());
            fields.to_room = Some(to_room.to_string());
            fields.requested_arrival_by = requested_arrival_by.as_ref().map(rfc3339);
            fields.supervised = *supervised;
            fields.supervised_by = supervised_by.as_ref().map(ToString::to_string);
        }
        OrderDetails::Transfer {
            from_department,
            to_department,
        } => {
            fields.from_department = Some(from_department.to_string());
            fields.to_department = Some(to_department.to_string());
        }
        OrderDetails::Treatment {
            description,
            discipline,
        }
        | OrderDetails::Examination {
            description,
            discipline,
        } => {
            fields.description = Some(description.to_string());
            fields.discipline = discipline.map(|d| d.code().to_string());
        }
    }
    fields
}

pub fn order_details_from(fields: &OrderFields) -> HisResult<OrderDetails> {
    let kind: OrderKind = fields.kind.parse()?;
    Ok(match kind {
        OrderKind::Transport => OrderDetails::Transport {
            from_room: parse_id(required("from_room", &fields.from_room)?)?,
            to_room: parse_id(required("to_room", &fields.to_room)?)?,
            requested_arrival_by: fields
                .requested_arrival_by
                .as_deref()
                .map(|t| parse_timestamp("requested_arrival_by", t))
                .transpose()?,
            supervised: fields.supervised,
            supervised_by: fields.supervised_by.as_deref().map(parse_id).transpose()?,
        },
        OrderKind::Transfer => OrderDetails::Transfer {
            from_department: parse_id(required("from_department", &fields.from_department)?)?,
            to_department: parse_id(required("to_department", &fields.to_department)?)?,
        },
        OrderKind::Treatment | OrderKind::Examination => {
            let description: NonEmptyText = required("description", &fields.description)?.parse()?;
            let discipline: Option<Discipline> =
                fields.discipline.as_deref().map(str::parse).transpose()?;
            if kind == OrderKind::Treatment {
                OrderDetails::Treatment {
                    description,
                    discipline,
                }
            } else {
                OrderDetails::Examination {
                    description,
                    discipline,
                }
            }
        }
    })
}

pub fn order_res(order: &Order) -> OrderRes {
    OrderRes {
        id: order.id.to_string(),
        act_id: order.act_id.to_string(),
        issued_by: order.issued_by.to_string(),
        assigned_to: order.assigned_to.as_ref().map(ToString::to_string),
        assigned_at: order.assigned_at.as_ref().map(rfc3339),
        opened_at: rfc3339(&order.lifecycle.stamps.created_at),
        closed_at: order.lifecycle.closed_at.as_ref().map(rfc3339),
        fields: order_fields(&order.details),
    }
}

pub fn staging_from(input: Option<&str>) -> HisResult<Option<TnmStaging>> {
    input.map(TnmStaging::parse).transpose()
}

pub fn resection_from(dto: Option<&ResectionDto>) -> HisResult<Option<Resection>> {
    dto.map(|r| -> HisResult<Resection> {
        Ok(Resection {
            organ: r.organ.parse()?,
            resected_on: parse_date("resected_on", &r.resected_on)?,
        })
    })
    .transpose()
}

pub fn imaging_from(dto: Option<&ImagingStudyDto>) -> HisResult<Option<ImagingStudy>> {
    dto.map(|i| -> HisResult<ImagingStudy> {
        Ok(ImagingStudy {
            modality: i.modality.parse()?,
            body_part: i.body_part.parse()?,
            study_date: parse_date("study_date", &i.study_date)?,
            patient_id: parse_id(&i.patient_id)?,
        })
    })
    .transpose()
}

pub fn report_res(report: &Report) -> ReportRes {
    ReportRes {
        id: report.id.to_string(),
        case_id: report.case_id.to_string(),
        order_id: report.order_id.as_ref().map(ToString::to_string),
        written_by: report.written_by.to_string(),
        kind: report.kind.code().to_string(),
        text: report.text.to_string(),
        staging: report.staging.map(|s| s.to_string()),
        resection: report.resection.as_ref().map(|r| ResectionDto {
            organ: r.organ.to_string(),
            resected_on: r.resected_on.to_string(),
        }),
        imaging: report.imaging.as_ref().map(|i| ImagingStudyDto {
            modality: i.modality.code().to_string(),
            body_part: i.body_part.to_string(),
            study_date: i.study_date.to_string(),
            patient_id: i.patient_id.to_string(),
        }),
        created_at: rfc3339(&report.stamps.created_at),
    }
}

pub fn department_res(department: &Department) -> DepartmentRes {
    DepartmentRes {
        id: department.id.to_string(),
        name: department.name.to_string(),
    }
}

pub fn room_res(room: &Room) -> RoomRes {
    RoomRes {
        id: room.id.to_string(),
        name: room.name.to_string(),
        department_id: room.department_id.as_ref().map(ToString::to_string),
        capacity: room.capacity,
        usage: room.usage,
    }
}

/// `None` for accounts without an employee profile.
pub fn employee_res(account: &Account) -> Option<EmployeeRes> {
    let employee = account.employee.as_ref()?;
    Some(EmployeeRes {
        id: account.id.to_string(),
        username: account.username.to_string(),
        name: employee.person.display_name(),
        kind: employee.kind().code().to_string(),
        role: employee.role.label(),
        department_id: employee.department_id.to_string(),
        is_active: account.is_active,
    })
}
