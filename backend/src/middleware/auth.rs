use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::{
    models::user::{User, UserRole},
    state::AppState,
    utils::jwt::{verify_access_token, Claims},
};

// Auth + require student role for attendance events
pub async fn auth_student(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    authorize(&state, request, next, UserRole::Student).await
}

// Auth + require teacher role for session and roster routes
pub async fn auth_teacher(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    authorize(&state, request, next, UserRole::Teacher).await
}

async fn authorize(
    state: &AppState,
    mut request: Request,
    next: Next,
    required: UserRole,
) -> Result<Response, StatusCode> {
    let (claims, user) = authenticate_request(request.headers(), state).await?;
    if user.role != required {
        tracing::debug!(
            user_id = %user.id,
            role = %user.role,
            required = %required,
            "Rejected request for wrong role"
        );
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = rest.trim();
        (!token.is_empty()).then_some(token)
    } else {
        None
    }
}

async fn authenticate_request(
    headers: &axum::http::HeaderMap,
    state: &AppState,
) -> Result<(Claims, User), StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims =
        verify_access_token(token, &state.config.jwt_secret).map_err(|_| StatusCode::UNAUTHORIZED)?;
    let user_id = claims.user_id().ok_or(StatusCode::UNAUTHORIZED)?;
    let claimed_role = claims.role().ok_or(StatusCode::UNAUTHORIZED)?;

    let user = state
        .users
        .find_by_id(user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "Failed to load authenticated user");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // a token minted before a role change is no longer honoured
    if user.role != claimed_role {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok((claims, user))
}
