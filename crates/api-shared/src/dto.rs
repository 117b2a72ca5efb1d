//! JSON request and response bodies of the REST API.
//!
//! Identifiers are the 32-character lowercase hex form. Timestamps are RFC 3339, dates ISO 8601
//! (`YYYY-MM-DD`). Enumerations travel as their lowercase codes, e.g. `"transport"` or
//! `"findings"`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersonDto {
    /// `m`, `w` or `d`.
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AddressDto {
    pub street: String,
    pub street_number: u32,
    pub zip_code: String,
    pub city: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientReq {
    pub person: PersonDto,
    #[serde(default)]
    pub address: Option<AddressDto>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntryRes {
    pub case_id: String,
    pub department: String,
    pub doctor: Option<String>,
    pub opened_at: String,
    pub closed_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub person: PersonDto,
    pub address: Option<AddressDto>,
    /// Only present for privileged readers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntryRes>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCaseReq {
    pub patient_id: String,
    pub department_id: String,
}

/// Give at least one of the two.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct AssignCaseReq {
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CaseRes {
    pub id: String,
    pub patient_id: String,
    pub department_id: String,
    pub doctor_id: Option<String>,
    pub opened_at: String,
    pub closed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_room: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListCasesRes {
    pub cases: Vec<CaseRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateActReq {
    pub case_id: String,
    pub executing_department_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ActRes {
    pub id: String,
    pub case_id: String,
    pub initiator_id: String,
    pub requesting_department_id: String,
    pub executing_department_id: String,
    pub opened_at: String,
    pub closed_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListActsRes {
    pub acts: Vec<ActRes>,
}

/// An order of any kind. Fields that do not belong to `kind` are left empty.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct OrderFields {
    /// `transport`, `transfer`, `treatment` or `examination`.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_arrival_by: Option<String>,
    #[serde(default)]
    pub supervised: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervised_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discipline: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderReq {
    pub act_id: String,
    #[serde(flatten)]
    pub fields: OrderFields,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignOrderReq {
    pub assignee_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderRes {
    pub id: String,
    pub act_id: String,
    pub issued_by: String,
    pub assigned_to: Option<String>,
    pub assigned_at: Option<String>,
    pub opened_at: String,
    pub closed_at: Option<String>,
    #[serde(flatten)]
    pub fields: OrderFields,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListOrdersRes {
    pub orders: Vec<OrderRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ResectionDto {
    pub organ: String,
    /// `YYYY-MM-DD`.
    pub resected_on: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ImagingStudyDto {
    /// DICOM modality code, e.g. `CT` or `MR`.
    pub modality: String,
    pub body_part: String,
    /// `YYYY-MM-DD`.
    pub study_date: String,
    /// Patient the images were acquired for.
    pub patient_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateReportReq {
    pub case_id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    /// `anamnesis`, `diagnosis`, `examination`, `therapy` or `findings`.
    pub kind: String,
    pub text: String,
    /// Compact TNM code, e.g. `T2N1M0`.
    #[serde(default)]
    pub staging: Option<String>,
    #[serde(default)]
    pub resection: Option<ResectionDto>,
    /// Only on `examination` reports.
    #[serde(default)]
    pub imaging: Option<ImagingStudyDto>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportRes {
    pub id: String,
    pub case_id: String,
    pub order_id: Option<String>,
    pub written_by: String,
    pub kind: String,
    pub text: String,
    pub staging: Option<String>,
    pub resection: Option<ResectionDto>,
    pub imaging: Option<ImagingStudyDto>,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListReportsRes {
    pub reports: Vec<ReportRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DepartmentRes {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListDepartmentsRes {
    pub departments: Vec<DepartmentRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RoomRes {
    pub id: String,
    pub name: String,
    pub department_id: Option<String>,
    pub capacity: u32,
    pub usage: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListRoomsRes {
    pub rooms: Vec<RoomRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EmployeeRes {
    pub id: String,
    pub username: String,
    pub name: String,
    /// `administrative`, `doctor`, `nurse` or `general_personnel`.
    pub kind: String,
    pub role: String,
    pub department_id: String,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListEmployeesRes {
    pub employees: Vec<EmployeeRes>,
}
