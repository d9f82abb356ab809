use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{
    HeaderName, CONTENT_TYPE, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS,
    X_FRAME_OPTIONS,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::questions::{validate_submission, Question};

use super::admin;
use super::error::{panic_response, ApiError};
use super::responses::{HealthResponse, MessageResponse, SubmitQuestionRequest};
use super::state::AppState;

/// Request bodies carry rich-text answers, so allow more than axum's default.
const BODY_LIMIT_BYTES: usize = 5 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/questions", post(submit_question))
        .route("/answered", get(list_answered))
        .merge(admin::routes(&state.login_limit));

    let app = if state.base_path.is_empty() {
        api
    } else {
        Router::new().nest(&state.base_path, api)
    };

    with_middleware(app.route("/health", get(health)), state)
}

/// Each `.layer` wraps the ones before it. Panic recovery sits inside the
/// security headers, and the request id is set before it is propagated.
pub(super) fn with_middleware(app: Router<AppState>, state: AppState) -> Router {
    let request_id = HeaderName::from_static("x-request-id");

    app.layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("same-origin"),
        ))
        .layer(cors_layer(&state.cors_origins))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for the configured front-end origins. Without any, no
/// cross-origin access is granted.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// The stored record is not echoed back.
async fn submit_question(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<SubmitQuestionRequest>, ApiError>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let text = validate_submission(&request.question)?;
    let question = Question::submitted(text, Utc::now());
    let id = question.id.clone();

    state.questions.prepend(question).await?;
    info!(id = %id, "question submitted");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok("question received")),
    ))
}

async fn list_answered(State(state): State<AppState>) -> Result<Json<Vec<Question>>, ApiError> {
    let answered = state.questions.answered().await?;
    debug!(count = answered.len(), "answered questions requested");
    Ok(Json(answered))
}
