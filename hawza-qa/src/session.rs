//! Server-side admin sessions persisted in the blob store.
//!
//! Each session lives under `sess:{id}` with a TTL taken from the cookie's
//! max-age, so expiry works without any in-process state.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{SameSitePolicy, SessionSettings};
use crate::store::{KvStore, StoreError};

pub const SESSION_COOKIE: &str = "hawza.sid";
const KEY_PREFIX: &str = "sess:";
/// Used when a session cookie carries no max-age.
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
#[error("session store unavailable: {0}")]
pub struct SessionError(#[from] StoreError);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub max_age_secs: Option<u64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: String,
}

impl SessionCookie {
    pub fn issue(settings: &SessionSettings, now: DateTime<Utc>) -> Self {
        let expires_at = chrono::Duration::from_std(settings.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl));
        Self {
            max_age_secs: Some(settings.ttl.as_secs()),
            expires_at,
            http_only: true,
            secure: settings.cookie_secure,
            same_site: same_site_label(settings.same_site).to_string(),
        }
    }
}

fn same_site_label(policy: SameSitePolicy) -> &'static str {
    match policy {
        SameSitePolicy::Lax => "lax",
        SameSitePolicy::Strict => "strict",
        SameSitePolicy::None => "none",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub authenticated: bool,
    pub cookie: SessionCookie,
}

impl Session {
    /// A fresh, unauthenticated session with a random id.
    pub fn new(cookie: SessionCookie) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            authenticated: false,
            cookie,
        }
    }

    pub fn ttl(&self) -> Duration {
        match self.cookie.max_age_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_TTL,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.cookie.expires_at.is_some_and(|at| at <= now)
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync + Debug {
    /// `Ok(None)` when the session does not exist or has expired.
    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionError>;

    async fn set(&self, session: &Session) -> Result<(), SessionError>;

    /// Destroying an absent session succeeds.
    async fn destroy(&self, session_id: &str) -> Result<(), SessionError>;
}

#[derive(Debug, Clone)]
pub struct KvSessionStore {
    store: KvStore,
}

impl KvSessionStore {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    fn key(session_id: &str) -> String {
        format!("{KEY_PREFIX}{session_id}")
    }
}

#[async_trait]
impl SessionStore for KvSessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        let key = Self::key(session_id);
        let session = match self.store.get_json::<Session>(&key).await {
            Ok(session) => session,
            Err(StoreError::Json { source, .. }) => {
                warn!(error = %source, "discarding unreadable session record");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        match session {
            Some(session) if session.is_expired(Utc::now()) => {
                debug!("session expired; removing");
                self.store.delete(&key).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn set(&self, session: &Session) -> Result<(), SessionError> {
        self.store
            .set_json(&Self::key(&session.session_id), session, Some(session.ttl()))
            .await?;
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        self.store.delete(&Self::key(session_id)).await?;
        Ok(())
    }
}
