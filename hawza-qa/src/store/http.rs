//! Remote blob backend over HTTP.
//!
//! Objects live at `{base_url}/{namespace}/{key}`. Requests carry a bearer token;
//! a TTL travels in the `x-blob-ttl` header as whole seconds.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::{BlobBackend, StoreError};

pub const TTL_HEADER: &str = "x-blob-ttl";

const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'{')
    .add(b'}');

#[derive(Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
    namespace: String,
    token: String,
}

impl HttpBlobStore {
    pub fn new(
        base_url: &str,
        namespace: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hawza-qa/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            namespace: namespace.to_string(),
            token: token.to_string(),
        })
    }

    fn key_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            utf8_percent_encode(&self.namespace, PATH_SEGMENT_ENCODE_SET),
            utf8_percent_encode(key, PATH_SEGMENT_ENCODE_SET)
        )
    }
}

impl fmt::Debug for HttpBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBlobStore")
            .field("base_url", &self.base_url)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

fn status_error(key: &str, status: StatusCode) -> StoreError {
    StoreError::Status {
        key: String::from(key),
        status,
    }
}

#[async_trait]
impl BlobBackend for HttpBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let resp = self
            .client
            .get(self.key_url(key))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| {
                warn!(key, error = %e, "blob store get: connection failed");
                StoreError::Transport(e)
            })?;

        match resp.status() {
            StatusCode::NOT_FOUND => {
                debug!(key, "blob store get: absent");
                Ok(None)
            }
            status if status.is_success() => Ok(Some(resp.bytes().await?)),
            status => {
                warn!(key, status = %status, "blob store get: HTTP error");
                Err(status_error(key, status))
            }
        }
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut request = self
            .client
            .put(self.key_url(key))
            .bearer_auth(&self.token)
            .body(value);
        if let Some(ttl) = ttl {
            request = request.header(TTL_HEADER, ttl.as_secs().max(1).to_string());
        }

        let resp = request.send().await.map_err(|e| {
            warn!(key, error = %e, "blob store set: connection failed");
            StoreError::Transport(e)
        })?;
        let status = resp.status();
        if !status.is_success() {
            warn!(key, status = %status, "blob store set: HTTP error");
            return Err(status_error(key, status));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let resp = self
            .client
            .delete(self.key_url(key))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| {
                warn!(key, error = %e, "blob store delete: connection failed");
                StoreError::Transport(e)
            })?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            status => {
                warn!(key, status = %status, "blob store delete: HTTP error");
                Err(status_error(key, status))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Result;
    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use dashmap::DashMap;
    use tokio::net::TcpListener;

    use super::{HttpBlobStore, TTL_HEADER};
    use crate::store::{BlobBackend, StoreError};

    const TOKEN: &str = "blob-token";

    #[derive(Clone, Default)]
    struct FakeBlobs {
        objects: Arc<DashMap<String, Bytes>>,
        ttls: Arc<DashMap<String, String>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {TOKEN}"))
    }

    async fn read_blob(
        State(blobs): State<FakeBlobs>,
        Path((ns, key)): Path<(String, String)>,
        headers: HeaderMap,
    ) -> Result<Bytes, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        blobs
            .objects
            .get(&format!("{ns}/{key}"))
            .map(|entry| entry.clone())
            .ok_or(StatusCode::NOT_FOUND)
    }

    async fn write_blob(
        State(blobs): State<FakeBlobs>,
        Path((ns, key)): Path<(String, String)>,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED;
        }
        let id = format!("{ns}/{key}");
        if let Some(ttl) = headers.get(TTL_HEADER).and_then(|v| v.to_str().ok()) {
            blobs.ttls.insert(id.clone(), ttl.to_string());
        }
        blobs.objects.insert(id, body);
        StatusCode::NO_CONTENT
    }

    async fn delete_blob(
        State(blobs): State<FakeBlobs>,
        Path((ns, key)): Path<(String, String)>,
        headers: HeaderMap,
    ) -> StatusCode {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED;
        }
        match blobs.objects.remove(&format!("{ns}/{key}")) {
            Some(_) => StatusCode::NO_CONTENT,
            None => StatusCode::NOT_FOUND,
        }
    }

    async fn spawn_fake(blobs: FakeBlobs) -> Result<SocketAddr> {
        let app = Router::new()
            .route(
                "/v1/{ns}/{key}",
                get(read_blob).put(write_blob).delete(delete_blob),
            )
            .with_state(blobs);
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(addr)
    }

    fn client_for(addr: SocketAddr, token: &str) -> HttpBlobStore {
        HttpBlobStore::new(
            &format!("http://{addr}/v1/"),
            "questions",
            token,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn get_set_delete_against_remote() -> Result<()> {
        let blobs = FakeBlobs::default();
        let addr = spawn_fake(blobs.clone()).await?;
        let store = client_for(addr, TOKEN);

        assert_eq!(store.get("all_questions").await?, None);

        store
            .set("all_questions", Bytes::from_static(b"[]"), None)
            .await?;
        assert_eq!(
            store.get("all_questions").await?,
            Some(Bytes::from_static(b"[]"))
        );
        assert!(blobs.objects.contains_key("questions/all_questions"));

        store.delete("all_questions").await?;
        assert_eq!(store.get("all_questions").await?, None);
        // second delete hits a 404 and still succeeds
        store.delete("all_questions").await?;
        Ok(())
    }

    #[tokio::test]
    async fn ttl_is_sent_in_seconds() -> Result<()> {
        let blobs = FakeBlobs::default();
        let addr = spawn_fake(blobs.clone()).await?;
        let store = client_for(addr, TOKEN);

        store
            .set(
                "sess:abc",
                Bytes::from_static(b"{}"),
                Some(Duration::from_secs(3600)),
            )
            .await?;

        let ttl = blobs.ttls.get("questions/sess:abc").map(|v| v.clone());
        assert_eq!(ttl.as_deref(), Some("3600"));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_token_is_a_status_error() -> Result<()> {
        let addr = spawn_fake(FakeBlobs::default()).await?;
        let store = client_for(addr, "wrong-token");

        let result = store.get("all_questions").await;
        assert!(matches!(
            result,
            Err(StoreError::Status { status, .. }) if status == StatusCode::UNAUTHORIZED
        ));

        let result = store.set("all_questions", Bytes::new(), None).await;
        assert!(matches!(result, Err(StoreError::Status { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let store = client_for(addr, TOKEN);
        let result = store.get("all_questions").await;
        assert!(matches!(result, Err(StoreError::Transport(_))));
        Ok(())
    }

    #[test]
    fn keys_are_encoded_as_single_segments() {
        let store = HttpBlobStore::new(
            "https://blobs.example.net/",
            "questions",
            TOKEN,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            store.key_url("a/b c"),
            "https://blobs.example.net/questions/a%2Fb%20c"
        );
        assert!(!format!("{store:?}").contains(TOKEN));
    }
}
