//! # API REST
//!
//! REST API implementation for HIS.
//!
//! Handles:
//! - HTTP endpoints with axum, authenticated with HTTP Basic credentials
//! - OpenAPI/Swagger documentation
//! - Mapping core errors to HTTP status codes
//!
//! Uses `api-shared` for request/response types and credential parsing.

#![warn(rust_2018_idioms)]

mod auth;
mod convert;
pub mod error;
mod handlers;

use axum::routing::{get, post};
use axum::Router;
use his_core::HisServices;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use auth::Actor;
pub use error::ApiError;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: HisServices,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_patients,
        handlers::create_patient,
        handlers::show_patient,
        handlers::list_cases,
        handlers::create_case,
        handlers::show_case,
        handlers::assign_case,
        handlers::close_case,
        handlers::reopen_case,
        handlers::list_acts,
        handlers::create_act,
        handlers::list_orders,
        handlers::create_order,
        handlers::assign_order,
        handlers::close_order,
        handlers::list_reports,
        handlers::create_report,
        handlers::show_report,
        handlers::list_departments,
        handlers::list_rooms,
        handlers::list_employees,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ErrorRes,
        api_shared::PersonDto,
        api_shared::AddressDto,
        api_shared::CreatePatientReq,
        api_shared::HistoryEntryRes,
        api_shared::PatientRes,
        api_shared::ListPatientsRes,
        api_shared::CreateCaseReq,
        api_shared::AssignCaseReq,
        api_shared::CaseRes,
        api_shared::ListCasesRes,
        api_shared::CreateActReq,
        api_shared::ActRes,
        api_shared::ListActsRes,
        api_shared::OrderFields,
        api_shared::CreateOrderReq,
        api_shared::AssignOrderReq,
        api_shared::OrderRes,
        api_shared::ListOrdersRes,
        api_shared::ResectionDto,
        api_shared::ImagingStudyDto,
        api_shared::CreateReportReq,
        api_shared::ReportRes,
        api_shared::ListReportsRes,
        api_shared::DepartmentRes,
        api_shared::ListDepartmentsRes,
        api_shared::RoomRes,
        api_shared::ListRoomsRes,
        api_shared::EmployeeRes,
        api_shared::ListEmployeesRes,
    ))
)]
pub struct ApiDoc;

/// All routes, without the Swagger UI.
pub fn router(services: HisServices) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route("/patients/:id", get(handlers::show_patient))
        .route("/cases", get(handlers::list_cases).post(handlers::create_case))
        .route("/cases/:id", get(handlers::show_case))
        .route("/cases/:id/assign", post(handlers::assign_case))
        .route("/cases/:id/close", post(handlers::close_case))
        .route("/cases/:id/reopen", post(handlers::reopen_case))
        .route("/acts", get(handlers::list_acts).post(handlers::create_act))
        .route(
            "/orders",
            get(handlers::list_orders).post(handlers::create_order),
        )
        .route("/orders/:id/assign", post(handlers::assign_order))
        .route("/orders/:id/close", post(handlers::close_order))
        .route(
            "/reports",
            get(handlers::list_reports).post(handlers::create_report),
        )
        .route("/reports/:id", get(handlers::show_report))
        .route("/departments", get(handlers::list_departments))
        .route("/rooms", get(handlers::list_rooms))
        .route("/employees", get(handlers::list_employees))
        .with_state(AppState { services })
}

/// The API with Swagger UI, CORS and request tracing, as served by the binaries.
pub fn app(services: HisServices) -> Router {
    router(services)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
    use axum::http::{Request, StatusCode};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use his_core::{seed, CoreConfig, Store};
    use his_types::NonEmptyText;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn seeded() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let cfg = CoreConfig::new(
            dir.path().join("data"),
            NonEmptyText::new("Test Hospital").unwrap(),
        )
        .unwrap();
        let store = Arc::new(Store::open_or_initialise(Arc::new(cfg)).unwrap());
        seed::populate(&store, "test").unwrap();
        (dir, router(HisServices::new(store)))
    }

    fn basic(username: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{username}:test")))
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_as(username: &str, uri: &str) -> Request<Body> {
        Request::get(uri)
            .header(AUTHORIZATION, basic(username))
            .body(Body::empty())
            .unwrap()
    }

    fn post_as(username: &str, uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(AUTHORIZATION, basic(username))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_credentials() {
        let (_dir, app) = seeded();
        let (status, body) = call(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn credentials_are_required() {
        let (_dir, app) = seeded();

        let response = app
            .clone()
            .oneshot(Request::get("/patients").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(WWW_AUTHENTICATE));

        let wrong = Request::get("/patients")
            .header(AUTHORIZATION, format!("Basic {}", STANDARD.encode("tom:nope")))
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(&app, wrong).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "login incorrect");
    }

    #[tokio::test]
    async fn listings_are_filtered_per_caller() {
        let (_dir, app) = seeded();

        let (status, body) = call(&app, get_as("whitman", "/cases")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cases"].as_array().unwrap().len(), 3);

        let (_, body) = call(&app, get_as("karll", "/cases")).await;
        assert!(body["cases"].as_array().unwrap().is_empty());

        let (status, _) = call(&app, get_as("gecko", "/orders")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&app, get_as("tom", "/orders?kind=parcel")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn patient_and_case_workflow() {
        let (_dir, app) = seeded();

        let (status, patient) = call(
            &app,
            post_as(
                "durstig",
                "/patients",
                json!({
                    "person": {
                        "gender": "w",
                        "first_name": "Marie",
                        "last_name": "Curie",
                        "date_of_birth": "1867-11-07"
                    }
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let patient_id = patient["id"].as_str().unwrap().to_string();

        let (_, departments) = call(&app, get_as("durstig", "/departments")).await;
        let intensive = departments["departments"]
            .as_array()
            .unwrap()
            .iter()
            .find(|d| d["name"] == "Intensiv")
            .unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, case) = call(
            &app,
            post_as(
                "durstig",
                "/cases",
                json!({ "patient_id": patient_id, "department_id": intensive }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let case_id = case["id"].as_str().unwrap().to_string();

        let close = format!("/cases/{case_id}/close");
        let (status, closed) = call(&app, post_as("nightingale", &close, json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(closed["closed_at"].is_string());

        let (status, body) = call(&app, post_as("nightingale", &close, json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "case is already closed");

        let (status, shown) = call(&app, get_as("durstig", &format!("/patients/{patient_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(shown["history"].as_array().unwrap().len(), 1);

        let (status, _) = call(&app, get_as("durstig", "/patients/not-an-id")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn porter_closes_a_transport() {
        let (_dir, app) = seeded();

        let (_, employees) = call(&app, get_as("tom", "/employees")).await;
        let hurtig = employees["employees"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["username"] == "hurtig")
            .unwrap()["id"]
            .clone();

        let (status, orders) = call(&app, get_as("hurtig", "/orders?kind=transport")).await;
        assert_eq!(status, StatusCode::OK);
        let open = orders["orders"]
            .as_array()
            .unwrap()
            .iter()
            .find(|o| o["closed_at"].is_null() && o["assigned_to"] == hurtig)
            .unwrap()
            .clone();

        let uri = format!("/orders/{}/close", open["id"].as_str().unwrap());
        let (status, closed) = call(&app, post_as("hurtig", &uri, json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(closed["closed_at"].is_string());

        let (_, rooms) = call(&app, get_as("hurtig", "/rooms")).await;
        let theatre = rooms["rooms"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["name"] == "OP-Raum 2")
            .unwrap()
            .clone();
        assert_eq!(theatre["usage"], 1);

        let (status, body) = call(&app, post_as("hurtig", &uri, json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "order is already closed");
    }

    #[tokio::test]
    async fn examination_reports_carry_imaging() {
        let (_dir, app) = seeded();

        let (_, cases) = call(&app, get_as("fleming", "/cases")).await;
        let case = cases["cases"][0].clone();
        let report = |kind: &str, modality: &str| {
            json!({
                "case_id": case["id"],
                "kind": kind,
                "text": "Keine Auffälligkeiten.",
                "imaging": {
                    "modality": modality,
                    "body_part": "Thorax",
                    "study_date": "2024-03-02",
                    "patient_id": case["patient_id"]
                }
            })
        };

        let (status, filed) = call(&app, post_as("fleming", "/reports", report("examination", "CT"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(filed["imaging"]["modality"], "CT");
        assert_eq!(filed["imaging"]["patient_id"], case["patient_id"]);

        let (status, _) = call(&app, post_as("fleming", "/reports", report("examination", "XR"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(&app, post_as("fleming", "/reports", report("findings", "CT"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
