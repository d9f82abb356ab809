//! Admin routes: login state machine and question CRUD.
//!
//! `anonymous -> login -> authenticated -> logout | expiry -> anonymous`.
//! Every route except login requires an [`AdminSession`].

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::{SignedCookieJar, WithRejection};
use chrono::Utc;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor},
    GovernorLayer,
};
use tracing::{debug, info, warn};

use crate::config::{LoginLimit, SessionSettings};
use crate::questions::{Question, QuestionInput};
use crate::session::{Session, SessionCookie, SESSION_COOKIE};

use super::auth::{session_id, AdminSession};
use super::error::ApiError;
use super::responses::{
    LoginRequest, MessageResponse, QuestionResponse, StatusResponse,
};
use super::state::AppState;

/// The governor config is only rejected for a zero period or burst, which
/// config resolution already refuses.
#[allow(clippy::expect_used)]
pub fn routes(limit: &LoginLimit) -> Router<AppState> {
    // Token bucket per client address: a full window's worth of attempts up
    // front, then one more every window / max_attempts.
    let login_route = if limit.trust_proxy {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .period(limit.replenish_interval())
                .burst_size(limit.max_attempts)
                .key_extractor(SmartIpKeyExtractor)
                .use_headers()
                .finish()
                .expect("login limit validated by config"),
        );
        post(login).layer(GovernorLayer::new(governor_conf))
    } else {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .period(limit.replenish_interval())
                .burst_size(limit.max_attempts)
                .key_extractor(PeerIpKeyExtractor)
                .use_headers()
                .finish()
                .expect("login limit validated by config"),
        );
        post(login).layer(GovernorLayer::new(governor_conf))
    };

    Router::new()
        .route("/admin/login", login_route)
        .route("/admin/logout", post(logout))
        .route("/admin/status", get(status))
        .route("/admin/questions", get(list_questions))
        .route("/admin/question", post(create_question))
        .route(
            "/admin/question/{id}",
            put(update_question).delete(delete_question),
        )
}

fn session_cookie(settings: &SessionSettings, session_id: String) -> Cookie<'static> {
    let max_age = i64::try_from(settings.ttl.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .secure(settings.cookie_secure)
        .same_site(settings.same_site.into())
        .max_age(cookie::time::Duration::seconds(max_age))
        .build()
}

async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<(SignedCookieJar, Json<MessageResponse>), ApiError> {
    if request.password.trim().is_empty() {
        return Err(ApiError::Validation(String::from("password is required")));
    }
    if !state
        .credentials
        .verify(request.username.as_deref(), &request.password)
    {
        warn!("admin login rejected");
        return Err(ApiError::InvalidCredentials);
    }

    // Never reuse an id the client arrived with.
    if let Some(previous) = session_id(&jar) {
        debug!("discarding pre-login session");
        state.sessions.destroy(&previous).await?;
    }

    let mut session = Session::new(SessionCookie::issue(&state.session, Utc::now()));
    session.authenticated = true;
    state.sessions.set(&session).await?;
    info!("admin logged in");

    let jar = jar.add(session_cookie(&state.session, session.session_id));
    Ok((jar, Json(MessageResponse::ok("logged in"))))
}

async fn logout(
    AdminSession(session): AdminSession,
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Json<MessageResponse>), ApiError> {
    state.sessions.destroy(&session.session_id).await?;
    info!("admin logged out");

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Json(MessageResponse::ok("logged out"))))
}

async fn status(AdminSession(session): AdminSession) -> Json<StatusResponse> {
    Json(StatusResponse {
        authenticated: session.authenticated,
    })
}

async fn list_questions(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<Question>>, ApiError> {
    let questions = state.questions.load_all().await?;
    debug!(count = questions.len(), "admin listed questions");
    Ok(Json(questions))
}

async fn create_question(
    _admin: AdminSession,
    State(state): State<AppState>,
    WithRejection(Json(input), _): WithRejection<Json<QuestionInput>, ApiError>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    let question = Question::create(input.validate()?, Utc::now());
    state.questions.prepend(question.clone()).await?;
    info!(id = %question.id, answered = question.is_answered(), "question created");

    Ok((StatusCode::CREATED, Json(QuestionResponse::ok(question))))
}

async fn update_question(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(input), _): WithRejection<Json<QuestionInput>, ApiError>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let edit = input.validate()?;
    let updated = state
        .questions
        .update(&id, edit, Utc::now())
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(id = %id, answered = updated.is_answered(), "question updated");

    Ok(Json(QuestionResponse::ok(updated)))
}

async fn delete_question(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let removed = state
        .questions
        .remove(&id)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(id = %id, "question deleted");

    Ok(Json(QuestionResponse::ok(removed)))
}
