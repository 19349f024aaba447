use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::{
        attendance_session::{GenerateCodeRequest, GenerateCodeResponse},
        user::User,
    },
    state::AppState,
};

pub async fn generate_code(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<GenerateCodeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GenerateCodeResponse>), AppError> {
    let Json(payload) = payload?;
    let session = state
        .issuer
        .issue_code(&user, payload.subject_id, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}
