use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::Key;
use axum_extra::extract::SignedCookieJar;
use tracing::{debug, warn};

use crate::session::{Session, SESSION_COOKIE};

use super::error::ApiError;
use super::state::AppState;

/// An authenticated admin session. Handlers that take this extractor reject
/// every other request with 401 before doing any work.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::<Key>::from_headers(&parts.headers, state.cookie_key.clone());
        let Some(session_id) = session_id(&jar) else {
            debug!("admin request without a valid session cookie");
            return Err(ApiError::Unauthorized);
        };

        match state.sessions.get(&session_id).await? {
            Some(session) if is_authorized(Some(&session)) => Ok(Self(session)),
            _ => {
                warn!("unauthorized admin request");
                Err(ApiError::Unauthorized)
            }
        }
    }
}

/// Session id from a signed cookie; tampered cookies read as absent.
pub fn session_id(jar: &SignedCookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|id| !id.is_empty())
}

pub fn is_authorized(session: Option<&Session>) -> bool {
    session.is_some_and(|session| session.authenticated)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::is_authorized;
    use crate::config::{SameSitePolicy, SessionSettings};
    use crate::session::{Session, SessionCookie};

    fn session(authenticated: bool) -> Session {
        let settings = SessionSettings {
            ttl: Duration::from_secs(60),
            cookie_secure: false,
            same_site: SameSitePolicy::Lax,
        };
        let mut session = Session::new(SessionCookie::issue(&settings, Utc::now()));
        session.authenticated = authenticated;
        session
    }

    #[test]
    fn only_authenticated_sessions_pass() {
        assert!(is_authorized(Some(&session(true))));
        assert!(!is_authorized(Some(&session(false))));
        assert!(!is_authorized(None));
    }
}
