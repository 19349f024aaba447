use axum::{
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{docs::ApiDoc, handlers, middleware, state::AppState};

pub fn app_router(state: AppState) -> Router {
    let public_routes = Router::new().route("/api/health", get(handlers::health::health));

    // Build student-protected routes (auth + student role)
    let student_routes = Router::new()
        .route(
            "/api/attendance/check-in",
            post(handlers::attendance::check_in),
        )
        .route(
            "/api/attendance/check-out",
            post(handlers::attendance::check_out),
        )
        .route(
            "/api/attendance/active-session",
            get(handlers::attendance::active_session),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_student,
        ));

    // Build teacher-protected routes (auth + teacher role)
    let teacher_routes = Router::new()
        .route(
            "/api/attendance/manual",
            post(handlers::attendance::manual_check_in),
        )
        .route(
            "/api/attendance/logs",
            get(handlers::attendance::subject_logs),
        )
        .route(
            "/api/teacher/generate-code",
            post(handlers::teacher::generate_code),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_teacher,
        ));

    let cors = cors_layer(&state.config.cors_allow_origins);

    Router::new()
        .merge(SwaggerUi::new("/api/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(public_routes)
        .merge(student_routes)
        .merge(teacher_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_id))
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(middleware::log_error_responses))
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(24 * 60 * 60));

    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return base.allow_origin(Any);
    }

    let allowed = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();
    base.allow_origin(AllowOrigin::list(allowed))
}
