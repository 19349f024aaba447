use axum::{
    extract::{rejection::JsonRejection, Extension, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::{
        attendance::{
            ActiveSessionResponse, AttendanceLogEntry, AttendanceLogsQuery, AttendanceRecord,
            CheckInRequest, CheckOutRequest, ManualCheckInRequest,
        },
        user::User,
    },
    state::AppState,
};

pub async fn check_in(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<CheckInRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AttendanceRecord>), AppError> {
    let Json(payload) = payload?;
    let record = state
        .attendance
        .check_in(&user, &payload, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn check_out(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<CheckOutRequest>, JsonRejection>,
) -> Result<Json<AttendanceRecord>, AppError> {
    let Json(payload) = payload?;
    let record = state
        .attendance
        .check_out(&user, &payload, Utc::now())
        .await?;
    Ok(Json(record))
}

pub async fn manual_check_in(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<ManualCheckInRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AttendanceRecord>), AppError> {
    let Json(payload) = payload?;
    let record = state
        .attendance
        .manual_check_in(&user, &payload, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn active_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Option<ActiveSessionResponse>>, AppError> {
    Ok(Json(state.attendance.active_session(&user).await?))
}

pub async fn subject_logs(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<AttendanceLogsQuery>,
) -> Result<Json<Vec<AttendanceLogEntry>>, AppError> {
    Ok(Json(
        state
            .attendance
            .subject_logs(&user, query.subject_id)
            .await?,
    ))
}
