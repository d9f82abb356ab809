use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::auth::AdminCredentials;
use crate::config::{AppConfig, LoginLimit, SessionSettings};
use crate::questions::QuestionRepository;
use crate::session::{KvSessionStore, SessionStore};
use crate::store::KvStore;

/// Everything a request handler needs. Built once at startup; all
/// cross-request data lives behind the store handles.
#[derive(Clone)]
pub struct AppState {
    pub questions: QuestionRepository,
    pub sessions: Arc<dyn SessionStore>,
    pub credentials: Arc<AdminCredentials>,
    pub cookie_key: Key,
    pub session: SessionSettings,
    pub login_limit: LoginLimit,
    pub base_path: String,
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// The session secret has been length-checked by config resolution.
    pub fn new(config: &AppConfig, store: KvStore) -> Self {
        Self {
            questions: QuestionRepository::new(store.clone()),
            sessions: Arc::new(KvSessionStore::new(store)),
            credentials: Arc::new(AdminCredentials::from_config(config)),
            cookie_key: Key::derive_from(config.session_secret.expose().as_bytes()),
            session: config.session,
            login_limit: config.login_limit,
            base_path: config.base_path.clone(),
            cors_origins: config.cors_origins.clone(),
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
