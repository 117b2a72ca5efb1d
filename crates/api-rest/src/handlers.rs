//! Request handlers. Every handler except `health` authenticates through [`Actor`].

use crate::auth::Actor;
use crate::convert::{
    act_res, address_from_dto, case_res, department_res, employee_res, imaging_from,
    order_details_from, order_res, parse_id, patient_res, person_from_dto, report_res,
    resection_from, room_res, staging_from,
};
use crate::error::ApiError;
use crate::AppState;
use api_shared::{
    ActRes, AssignCaseReq, AssignOrderReq, CaseRes, CreateActReq, CreateCaseReq, CreateOrderReq,
    CreatePatientReq, CreateReportReq, ErrorRes, HealthRes, HealthService, ListActsRes,
    ListCasesRes, ListDepartmentsRes, ListEmployeesRes, ListOrdersRes, ListPatientsRes,
    ListReportsRes, ListRoomsRes, OrderRes, PatientRes, ReportRes,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use his_core::models::tasks::{OrderKind, ReportDraft, ReportKind};
use his_core::HisError;
use serde::Deserialize;
use utoipa::IntoParams;

type ApiResult<T> = Result<Json<T>, ApiError>;
type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

/// Optional `kind` filter for order and report listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct KindQuery {
    pub kind: Option<String>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "Patients the caller may see", body = ListPatientsRes),
        (status = 401, description = "Missing or wrong credentials", body = ErrorRes)
    )
)]
pub async fn list_patients(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<ListPatientsRes> {
    let patients = state.services.patients.list_patients(&actor)?;
    Ok(Json(ListPatientsRes {
        patients: patients.iter().map(|p| patient_res(p, None)).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Patient registered", body = PatientRes),
        (status = 400, description = "Invalid personal data", body = ErrorRes),
        (status = 403, description = "Not allowed to register patients", body = ErrorRes)
    )
)]
pub async fn create_patient(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<CreatePatientReq>,
) -> Created<PatientRes> {
    let person = person_from_dto(&req.person)?;
    let address = req.address.as_ref().map(address_from_dto).transpose()?;
    let patient = state
        .services
        .patients
        .create_patient(&actor, person, address)?;
    Ok((StatusCode::CREATED, Json(patient_res(&patient, None))))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient, with medical history for privileged callers", body = PatientRes),
        (status = 404, description = "No such patient", body = ErrorRes)
    )
)]
pub async fn show_patient(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<PatientRes> {
    let details = state
        .services
        .patients
        .show_patient(&actor, &parse_id(&id)?)?;
    Ok(Json(patient_res(&details.patient, details.history.as_deref())))
}

#[utoipa::path(
    get,
    path = "/cases",
    responses((status = 200, description = "Cases the caller may see", body = ListCasesRes))
)]
pub async fn list_cases(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<ListCasesRes> {
    let cases = state.services.cases.list_cases(&actor)?;
    Ok(Json(ListCasesRes {
        cases: cases.iter().map(case_res).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/cases",
    request_body = CreateCaseReq,
    responses((status = 201, description = "Case opened", body = CaseRes))
)]
pub async fn create_case(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<CreateCaseReq>,
) -> Created<CaseRes> {
    let case = state.services.cases.create_case(
        &actor,
        &parse_id(&req.patient_id)?,
        &parse_id(&req.department_id)?,
    )?;
    Ok((StatusCode::CREATED, Json(case_res(&case))))
}

#[utoipa::path(
    get,
    path = "/cases/{id}",
    params(("id" = String, Path, description = "Case id")),
    responses((status = 200, description = "Case with its last and next room", body = CaseRes))
)]
pub async fn show_case(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<CaseRes> {
    let cases = &state.services.cases;
    let case = cases.show_case(&actor, &parse_id(&id)?)?;
    let mut res = case_res(&case);
    res.last_room = cases.last_room(&case)?.map(|r| r.name.to_string());
    res.next_room = cases.next_room(&case)?.map(|r| r.name.to_string());
    Ok(Json(res))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/assign",
    params(("id" = String, Path, description = "Case id")),
    request_body = AssignCaseReq,
    responses(
        (status = 200, description = "Case reassigned", body = CaseRes),
        (status = 409, description = "Already assigned or closed", body = ErrorRes)
    )
)]
pub async fn assign_case(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(req): Json<AssignCaseReq>,
) -> ApiResult<CaseRes> {
    let cases = &state.services.cases;
    let id = parse_id(&id)?;
    if req.doctor_id.is_none() && req.department_id.is_none() {
        return Err(HisError::InvalidInput("give a doctor_id or a department_id".into()).into());
    }

    let mut case = None;
    if let Some(department_id) = &req.department_id {
        case = Some(cases.assign_department(&actor, &id, &parse_id(department_id)?)?);
    }
    if let Some(doctor_id) = &req.doctor_id {
        case = Some(cases.assign_doctor(&actor, &id, &parse_id(doctor_id)?)?);
    }
    let case = case.ok_or_else(|| HisError::InvalidInput("nothing to assign".into()))?;
    Ok(Json(case_res(&case)))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/close",
    params(("id" = String, Path, description = "Case id")),
    responses((status = 200, description = "Case closed", body = CaseRes))
)]
pub async fn close_case(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<CaseRes> {
    let case = state.services.cases.close_case(&actor, &parse_id(&id)?)?;
    Ok(Json(case_res(&case)))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/reopen",
    params(("id" = String, Path, description = "Case id")),
    responses((status = 200, description = "Case reopened", body = CaseRes))
)]
pub async fn reopen_case(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<CaseRes> {
    let case = state.services.cases.reopen_case(&actor, &parse_id(&id)?)?;
    Ok(Json(case_res(&case)))
}

#[utoipa::path(
    get,
    path = "/acts",
    responses((status = 200, description = "Acts the caller may see", body = ListActsRes))
)]
pub async fn list_acts(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<ListActsRes> {
    let acts = state.services.cases.list_acts(&actor)?;
    Ok(Json(ListActsRes {
        acts: acts.iter().map(act_res).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/acts",
    request_body = CreateActReq,
    responses((status = 201, description = "Act started", body = ActRes))
)]
pub async fn create_act(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<CreateActReq>,
) -> Created<ActRes> {
    let act = state.services.cases.create_act(
        &actor,
        &parse_id(&req.case_id)?,
        &parse_id(&req.executing_department_id)?,
    )?;
    Ok((StatusCode::CREATED, Json(act_res(&act))))
}

#[utoipa::path(
    get,
    path = "/orders",
    params(KindQuery),
    responses((status = 200, description = "Orders the caller may see", body = ListOrdersRes))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<KindQuery>,
) -> ApiResult<ListOrdersRes> {
    let kind: Option<OrderKind> = query.kind.as_deref().map(str::parse).transpose()?;
    let orders = state.services.orders.list_orders(&actor, kind)?;
    Ok(Json(ListOrdersRes {
        orders: orders.iter().map(order_res).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderReq,
    responses(
        (status = 201, description = "Order issued", body = OrderRes),
        (status = 400, description = "Invalid order", body = ErrorRes)
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<CreateOrderReq>,
) -> Created<OrderRes> {
    let details = order_details_from(&req.fields)?;
    let order = state
        .services
        .orders
        .create_order(&actor, &parse_id(&req.act_id)?, details)?;
    Ok((StatusCode::CREATED, Json(order_res(&order))))
}

#[utoipa::path(
    post,
    path = "/orders/{id}/assign",
    params(("id" = String, Path, description = "Order id")),
    request_body = AssignOrderReq,
    responses((status = 200, description = "Order assigned", body = OrderRes))
)]
pub async fn assign_order(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(req): Json<AssignOrderReq>,
) -> ApiResult<OrderRes> {
    let order = state.services.orders.assign_order(
        &actor,
        &parse_id(&id)?,
        &parse_id(&req.assignee_id)?,
    )?;
    Ok(Json(order_res(&order)))
}

#[utoipa::path(
    post,
    path = "/orders/{id}/close",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order closed", body = OrderRes),
        (status = 409, description = "Already closed, or destination room full", body = ErrorRes)
    )
)]
pub async fn close_order(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<OrderRes> {
    let order = state.services.orders.close_order(&actor, &parse_id(&id)?)?;
    Ok(Json(order_res(&order)))
}

#[utoipa::path(
    get,
    path = "/reports",
    params(KindQuery),
    responses((status = 200, description = "Reports the caller may read", body = ListReportsRes))
)]
pub async fn list_reports(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<KindQuery>,
) -> ApiResult<ListReportsRes> {
    let kind: Option<ReportKind> = query.kind.as_deref().map(str::parse).transpose()?;
    let reports = state.services.reports.list_reports(&actor, kind)?;
    Ok(Json(ListReportsRes {
        reports: reports.iter().map(report_res).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/reports",
    request_body = CreateReportReq,
    responses((status = 201, description = "Report filed", body = ReportRes))
)]
pub async fn create_report(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<CreateReportReq>,
) -> Created<ReportRes> {
    let draft = ReportDraft {
        case_id: parse_id(&req.case_id)?,
        order_id: req.order_id.as_deref().map(parse_id).transpose()?,
        kind: req.kind.parse()?,
        text: req.text,
        staging: staging_from(req.staging.as_deref())?,
        resection: resection_from(req.resection.as_ref())?,
        imaging: imaging_from(req.imaging.as_ref())?,
    };
    let report = state.services.reports.create_report(&actor, draft)?;
    Ok((StatusCode::CREATED, Json(report_res(&report))))
}

#[utoipa::path(
    get,
    path = "/reports/{id}",
    params(("id" = String, Path, description = "Report id")),
    responses((status = 200, description = "Report", body = ReportRes))
)]
pub async fn show_report(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<ReportRes> {
    let report = state
        .services
        .reports
        .show_report(&actor, &parse_id(&id)?)?;
    Ok(Json(report_res(&report)))
}

#[utoipa::path(
    get,
    path = "/departments",
    responses((status = 200, description = "All departments", body = ListDepartmentsRes))
)]
pub async fn list_departments(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<ListDepartmentsRes> {
    let departments = state.services.facility.list_departments(&actor)?;
    Ok(Json(ListDepartmentsRes {
        departments: departments.iter().map(department_res).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/rooms",
    responses((status = 200, description = "All rooms with their occupancy", body = ListRoomsRes))
)]
pub async fn list_rooms(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<ListRoomsRes> {
    let rooms = state.services.facility.list_rooms(&actor)?;
    Ok(Json(ListRoomsRes {
        rooms: rooms.iter().map(room_res).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/employees",
    responses((status = 200, description = "Employees the caller may see", body = ListEmployeesRes))
)]
pub async fn list_employees(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<ListEmployeesRes> {
    let employees = state.services.accounts.list_employees(&actor);
    Ok(Json(ListEmployeesRes {
        employees: employees.iter().filter_map(employee_res).collect(),
    }))
}
