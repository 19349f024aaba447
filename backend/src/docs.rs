#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::{
    error::ErrorResponse,
    handlers::health::HealthResponse,
    models::{
        attendance::{
            ActiveSessionResponse, AttendanceLogEntry, AttendanceLogsQuery, AttendanceMethod,
            AttendanceRecord, CheckInRequest, CheckOutRequest, ManualCheckInRequest,
        },
        attendance_session::{GenerateCodeRequest, GenerateCodeResponse},
    },
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        check_in_doc,
        check_out_doc,
        manual_check_in_doc,
        active_session_doc,
        subject_logs_doc,
        generate_code_doc,
        health_doc
    ),
    components(
        schemas(
            CheckInRequest,
            CheckOutRequest,
            ManualCheckInRequest,
            AttendanceRecord,
            AttendanceMethod,
            ActiveSessionResponse,
            AttendanceLogEntry,
            GenerateCodeRequest,
            GenerateCodeResponse,
            HealthResponse,
            ErrorResponse
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Attendance", description = "Geofenced check-in and check-out"),
        (name = "Teacher", description = "Attendance codes and rosters"),
        (name = "System", description = "Liveness")
    ),
    security(("BearerAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());

        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Checked in", body = AttendanceRecord),
        (status = 400, description = "Invalid or expired code, outside geofence or already checked in", body = ErrorResponse),
        (status = 401, description = "Missing token or not a student"),
        (status = 403, description = "VPN, proxy or Tor detected", body = ErrorResponse),
        (status = 503, description = "IP intelligence unavailable", body = ErrorResponse)
    ),
    tag = "Attendance"
)]
fn check_in_doc() {}

#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Checked out", body = AttendanceRecord),
        (status = 400, description = "Still within geofence or no active check-in", body = ErrorResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    ),
    tag = "Attendance"
)]
fn check_out_doc() {}

#[utoipa::path(
    post,
    path = "/api/attendance/manual",
    request_body = ManualCheckInRequest,
    responses(
        (status = 201, description = "Student marked present", body = AttendanceRecord),
        (status = 400, description = "Session expired, not a student or already checked in", body = ErrorResponse),
        (status = 403, description = "Session belongs to another teacher", body = ErrorResponse)
    ),
    tag = "Teacher"
)]
fn manual_check_in_doc() {}

#[utoipa::path(
    get,
    path = "/api/attendance/active-session",
    responses((status = 200, description = "Open record or null", body = Option<ActiveSessionResponse>)),
    tag = "Attendance"
)]
fn active_session_doc() {}

#[utoipa::path(
    get,
    path = "/api/attendance/logs",
    params(AttendanceLogsQuery),
    responses(
        (status = 200, body = Vec<AttendanceLogEntry>),
        (status = 403, description = "Not the subject's teacher", body = ErrorResponse)
    ),
    tag = "Teacher"
)]
fn subject_logs_doc() {}

#[utoipa::path(
    post,
    path = "/api/teacher/generate-code",
    request_body = GenerateCodeRequest,
    responses(
        (status = 201, description = "Session created", body = GenerateCodeResponse),
        (status = 404, description = "Unknown subject", body = ErrorResponse),
        (status = 503, description = "No unique code found", body = ErrorResponse)
    ),
    tag = "Teacher"
)]
fn generate_code_doc() {}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, body = HealthResponse)),
    tag = "System",
    security(())
)]
fn health_doc() {}
