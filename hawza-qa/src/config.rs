use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum_extra::extract::cookie::SameSite;
use clap::Parser;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub const ENV_ADMIN_PASSWORD: &str = "HAWZA_ADMIN_PASSWORD";
pub const ENV_ADMIN_USERNAME: &str = "HAWZA_ADMIN_USERNAME";
pub const ENV_SESSION_SECRET: &str = "HAWZA_SESSION_SECRET";
pub const ENV_STORE_BACKEND: &str = "HAWZA_STORE_BACKEND";
pub const ENV_STORE_URL: &str = "HAWZA_STORE_URL";
pub const ENV_STORE_TOKEN: &str = "HAWZA_STORE_TOKEN";
pub const ENV_STORE_NAMESPACE: &str = "HAWZA_STORE_NAMESPACE";
pub const ENV_STORE_TIMEOUT: &str = "HAWZA_STORE_TIMEOUT";
pub const ENV_BIND: &str = "HAWZA_BIND";
pub const ENV_BASE_PATH: &str = "HAWZA_BASE_PATH";
pub const ENV_COOKIE_SECURE: &str = "HAWZA_COOKIE_SECURE";
pub const ENV_COOKIE_SAMESITE: &str = "HAWZA_COOKIE_SAMESITE";
pub const ENV_SESSION_TTL: &str = "HAWZA_SESSION_TTL";
pub const ENV_LOGIN_MAX_ATTEMPTS: &str = "HAWZA_LOGIN_MAX_ATTEMPTS";
pub const ENV_LOGIN_WINDOW: &str = "HAWZA_LOGIN_WINDOW";
pub const ENV_CORS_ORIGINS: &str = "HAWZA_CORS_ORIGINS";
pub const ENV_TRUST_PROXY: &str = "HAWZA_TRUST_PROXY";

pub const DEFAULT_STORE_NAMESPACE: &str = "questions";
const DEFAULT_BASE_PATH: &str = "/api";
const DEFAULT_SESSION_TTL: &str = "8h";
const DEFAULT_LOGIN_WINDOW: &str = "15m";
const DEFAULT_LOGIN_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_STORE_TIMEOUT: &str = "10s";
const MIN_SESSION_SECRET_BYTES: usize = 32;

#[derive(Debug, Default, Parser)]
#[command(
    name = "hawza-qa",
    version,
    about = "Question submission and answer archive service"
)]
pub struct Cli {
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    /// Path prefix the API routes are mounted under (e.g. `/api`).
    #[arg(long, value_name = "PATH")]
    pub base_path: Option<String>,

    /// Storage backend: `remote` (default) or `memory`.
    #[arg(long, value_name = "BACKEND")]
    pub store_backend: Option<String>,

    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// A configuration value that must never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSitePolicy {
    Lax,
    Strict,
    None,
}

impl SameSitePolicy {
    fn parse(key: &str, raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lax" => Ok(Self::Lax),
            "strict" => Ok(Self::Strict),
            "none" => Ok(Self::None),
            _ => Err(ConfigError::InvalidValue {
                key: String::from(key),
                value: String::from(raw),
                reason: String::from("expected one of lax, strict, none"),
            }),
        }
    }
}

impl From<SameSitePolicy> for SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        match policy {
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::None => SameSite::None,
        }
    }
}

/// Cookie and lifetime policy for admin sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub ttl: Duration,
    pub cookie_secure: bool,
    pub same_site: SameSitePolicy,
}

/// Login attempts allowed per source address within `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginLimit {
    pub max_attempts: u32,
    pub window: Duration,
    /// Key attempts by `x-forwarded-for` and friends instead of the peer
    /// address. Only safe behind a proxy that overwrites those headers.
    pub trust_proxy: bool,
}

impl LoginLimit {
    /// Time for one spent attempt to become available again.
    pub fn replenish_interval(&self) -> Duration {
        self.window / self.max_attempts.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStoreConfig {
    pub url: String,
    pub token: Secret,
    pub namespace: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Remote(RemoteStoreConfig),
    /// Process-local store; chosen explicitly, never as a fallback.
    Memory,
}

impl StoreConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            StoreConfig::Remote(_) => "remote",
            StoreConfig::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub base_path: String,
    pub admin_username: Option<String>,
    pub admin_password: Secret,
    pub session_secret: Secret,
    pub session: SessionSettings,
    pub login_limit: LoginLimit,
    pub cors_origins: Vec<String>,
    pub store: StoreConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("required setting {key} is not set")]
    Missing { key: String },
    #[error("invalid boolean value for {key}: {value}")]
    InvalidBool { key: String, value: String },
    #[error("invalid value for {key}: {value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("HAWZA_SESSION_SECRET must be at least 32 bytes long")]
    WeakSessionSecret,
    #[error("SameSite=None session cookies require HAWZA_COOKIE_SECURE=true")]
    InsecureCrossSiteCookie,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind: Option<SocketAddr>,
    base_path: Option<String>,
    admin_username: Option<String>,
    cookie_secure: Option<bool>,
    cookie_same_site: Option<String>,
    session_ttl: Option<String>,
    login_max_attempts: Option<u32>,
    login_window: Option<String>,
    trust_proxy: Option<bool>,
    cors_origins: Option<Vec<String>>,
    #[serde(default)]
    store: FileStoreConfig,
}

#[derive(Debug, Default, Deserialize)]
struct FileStoreConfig {
    backend: Option<String>,
    url: Option<String>,
    namespace: Option<String>,
    timeout: Option<String>,
}

type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

impl AppConfig {
    /// Resolve configuration from CLI flags, the process environment and an
    /// optional TOML file, in that order of precedence. Secrets come from the
    /// environment only.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let from_file = read_file_config(cli.config.as_deref())?;
        Self::resolve(cli, from_file, &process_env)
    }

    fn resolve(cli: Cli, file: FileConfig, env: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let admin_password = Secret::new(required(env, ENV_ADMIN_PASSWORD)?);
        let session_secret = required(env, ENV_SESSION_SECRET)?;
        if session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(ConfigError::WeakSessionSecret);
        }

        let bind = match lookup(env, ENV_BIND) {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: String::from(ENV_BIND),
                value: raw.clone(),
                reason: String::from("expected a socket address such as 0.0.0.0:3000"),
            })?),
            None => None,
        };
        let bind = cli
            .bind
            .or(bind)
            .or(file.bind)
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let base_path = normalize_base_path(
            &cli.base_path
                .or_else(|| lookup(env, ENV_BASE_PATH))
                .or(file.base_path)
                .unwrap_or_else(|| String::from(DEFAULT_BASE_PATH)),
        );

        let admin_username = lookup(env, ENV_ADMIN_USERNAME).or_else(|| {
            file.admin_username
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
        });

        let cookie_secure = match lookup(env, ENV_COOKIE_SECURE) {
            Some(raw) => parse_bool_value(ENV_COOKIE_SECURE, &raw)?,
            None => file.cookie_secure.unwrap_or(true),
        };
        let same_site = match lookup(env, ENV_COOKIE_SAMESITE).or(file.cookie_same_site) {
            Some(raw) => SameSitePolicy::parse(ENV_COOKIE_SAMESITE, &raw)?,
            None => SameSitePolicy::Lax,
        };
        if same_site == SameSitePolicy::None && !cookie_secure {
            return Err(ConfigError::InsecureCrossSiteCookie);
        }
        let session_ttl = parse_duration(
            ENV_SESSION_TTL,
            &lookup(env, ENV_SESSION_TTL)
                .or(file.session_ttl)
                .unwrap_or_else(|| String::from(DEFAULT_SESSION_TTL)),
        )?;

        let max_attempts = match lookup(env, ENV_LOGIN_MAX_ATTEMPTS) {
            Some(raw) => parse_positive(ENV_LOGIN_MAX_ATTEMPTS, &raw)?,
            None => file
                .login_max_attempts
                .unwrap_or(DEFAULT_LOGIN_MAX_ATTEMPTS),
        };
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: String::from(ENV_LOGIN_MAX_ATTEMPTS),
                value: String::from("0"),
                reason: String::from("must be at least 1"),
            });
        }
        let window = parse_duration(
            ENV_LOGIN_WINDOW,
            &lookup(env, ENV_LOGIN_WINDOW)
                .or(file.login_window)
                .unwrap_or_else(|| String::from(DEFAULT_LOGIN_WINDOW)),
        )?;
        let trust_proxy = match lookup(env, ENV_TRUST_PROXY) {
            Some(raw) => parse_bool_value(ENV_TRUST_PROXY, &raw)?,
            None => file.trust_proxy.unwrap_or(false),
        };
        let login_limit = LoginLimit {
            max_attempts,
            window,
            trust_proxy,
        };
        if login_limit.replenish_interval().is_zero() {
            return Err(ConfigError::InvalidValue {
                key: String::from(ENV_LOGIN_WINDOW),
                value: humantime::format_duration(window).to_string(),
                reason: String::from("window is too short for the configured attempt count"),
            });
        }

        let cors_origins = match lookup(env, ENV_CORS_ORIGINS) {
            Some(raw) => split_list(&raw),
            None => file.cors_origins.unwrap_or_default(),
        };

        let store = resolve_store(cli.store_backend, file.store, env)?;

        Ok(Self {
            bind,
            base_path,
            admin_username,
            admin_password,
            session_secret: Secret::new(session_secret),
            session: SessionSettings {
                ttl: session_ttl,
                cookie_secure,
                same_site,
            },
            login_limit,
            cors_origins,
            store,
        })
    }
}

fn resolve_store(
    cli_backend: Option<String>,
    file: FileStoreConfig,
    env: EnvLookup<'_>,
) -> Result<StoreConfig, ConfigError> {
    let backend = cli_backend
        .or_else(|| lookup(env, ENV_STORE_BACKEND))
        .or(file.backend)
        .unwrap_or_else(|| String::from("remote"));

    match backend.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(StoreConfig::Memory),
        "remote" => {
            let url = lookup(env, ENV_STORE_URL)
                .or(file.url)
                .ok_or_else(|| missing(ENV_STORE_URL))?;
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    key: String::from(ENV_STORE_URL),
                    value: url,
                    reason: String::from("expected an http(s) URL"),
                });
            }
            let token = Secret::new(required(env, ENV_STORE_TOKEN)?);
            let namespace = lookup(env, ENV_STORE_NAMESPACE)
                .or(file.namespace)
                .unwrap_or_else(|| String::from(DEFAULT_STORE_NAMESPACE));
            let timeout = parse_duration(
                ENV_STORE_TIMEOUT,
                &lookup(env, ENV_STORE_TIMEOUT)
                    .or(file.timeout)
                    .unwrap_or_else(|| String::from(DEFAULT_STORE_TIMEOUT)),
            )?;
            Ok(StoreConfig::Remote(RemoteStoreConfig {
                url,
                token,
                namespace,
                timeout,
            }))
        }
        _ => Err(ConfigError::InvalidValue {
            key: String::from(ENV_STORE_BACKEND),
            value: backend,
            reason: String::from("expected remote or memory"),
        }),
    }
}

fn read_file_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn process_env(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) => Some(value),
        Err(std::env::VarError::NotPresent) => None,
        Err(std::env::VarError::NotUnicode(_)) => {
            warn!(key, "ignoring non-unicode environment variable");
            None
        }
    }
}

/// Environment lookup that treats blank values as unset.
fn lookup(env: EnvLookup<'_>, key: &str) -> Option<String> {
    env(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(env: EnvLookup<'_>, key: &str) -> Result<String, ConfigError> {
    lookup(env, key).ok_or_else(|| missing(key))
}

fn missing(key: &str) -> ConfigError {
    ConfigError::Missing {
        key: String::from(key),
    }
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        key: String::from(key),
        value: String::from(raw),
        reason: e.to_string(),
    })
}

fn parse_positive(key: &str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|e| ConfigError::InvalidValue {
            key: String::from(key),
            value: String::from(raw),
            reason: e.to_string(),
        })
}

fn parse_bool_value(key: &str, raw: &str) -> Result<bool, ConfigError> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: String::from(key),
            value: String::from(raw),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use anyhow::Result;
    use tempfile::tempdir;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (String::from(*k), String::from(*v)))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn base_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_ADMIN_PASSWORD, "hunter2"),
            (ENV_SESSION_SECRET, SECRET),
            (ENV_STORE_URL, "https://blobs.example.net/v1"),
            (ENV_STORE_TOKEN, "token-123"),
        ]
    }

    fn resolve_with(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        AppConfig::resolve(Cli::default(), FileConfig::default(), &env_of(pairs))
    }

    #[test]
    fn parse_bool_value_accepts_common_true_values() {
        assert_eq!(parse_bool_value("K", "true").ok(), Some(true));
        assert_eq!(parse_bool_value("K", "1").ok(), Some(true));
        assert_eq!(parse_bool_value("K", "YES").ok(), Some(true));
        assert_eq!(parse_bool_value("K", " on ").ok(), Some(true));
    }

    #[test]
    fn parse_bool_value_accepts_common_false_values() {
        assert_eq!(parse_bool_value("K", "false").ok(), Some(false));
        assert_eq!(parse_bool_value("K", "0").ok(), Some(false));
        assert_eq!(parse_bool_value("K", "NO").ok(), Some(false));
        assert_eq!(parse_bool_value("K", " off ").ok(), Some(false));
    }

    #[test]
    fn parse_bool_value_rejects_invalid_values() {
        assert!(parse_bool_value("K", "maybe").is_err());
    }

    #[test]
    fn defaults_apply_when_only_required_settings_present() {
        let config = resolve_with(&base_env()).unwrap();

        assert_eq!(config.bind, SocketAddr::from(([0, 0, 0, 0], 3000)));
        assert_eq!(config.base_path, "/api");
        assert_eq!(config.admin_username, None);
        assert_eq!(config.admin_password.expose(), "hunter2");
        assert_eq!(config.session.ttl, Duration::from_secs(8 * 3600));
        assert!(config.session.cookie_secure);
        assert_eq!(config.session.same_site, SameSitePolicy::Lax);
        assert_eq!(config.login_limit.max_attempts, 10);
        assert_eq!(config.login_limit.window, Duration::from_secs(15 * 60));
        assert!(!config.login_limit.trust_proxy);
        assert!(config.cors_origins.is_empty());
        match config.store {
            StoreConfig::Remote(remote) => {
                assert_eq!(remote.url, "https://blobs.example.net/v1");
                assert_eq!(remote.namespace, DEFAULT_STORE_NAMESPACE);
                assert_eq!(remote.token.expose(), "token-123");
                assert_eq!(remote.timeout, Duration::from_secs(10));
            }
            StoreConfig::Memory => panic!("expected remote store"),
        }
    }

    #[test]
    fn missing_admin_password_is_fatal() {
        let env: Vec<_> = base_env()
            .into_iter()
            .filter(|(k, _)| *k != ENV_ADMIN_PASSWORD)
            .collect();
        let err = resolve_with(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key } if key == ENV_ADMIN_PASSWORD));
    }

    #[test]
    fn blank_admin_password_counts_as_missing() {
        let mut env = base_env();
        env[0] = (ENV_ADMIN_PASSWORD, "   ");
        assert!(matches!(
            resolve_with(&env).unwrap_err(),
            ConfigError::Missing { .. }
        ));
    }

    #[test]
    fn remote_store_requires_url_and_token() {
        let env: Vec<_> = base_env()
            .into_iter()
            .filter(|(k, _)| *k != ENV_STORE_TOKEN)
            .collect();
        let err = resolve_with(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key } if key == ENV_STORE_TOKEN));

        let env: Vec<_> = base_env()
            .into_iter()
            .filter(|(k, _)| *k != ENV_STORE_URL)
            .collect();
        let err = resolve_with(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key } if key == ENV_STORE_URL));
    }

    #[test]
    fn memory_store_must_be_selected_explicitly() {
        let env = [
            (ENV_ADMIN_PASSWORD, "hunter2"),
            (ENV_SESSION_SECRET, SECRET),
            (ENV_STORE_BACKEND, "memory"),
        ];
        let config = resolve_with(&env).unwrap();
        assert_eq!(config.store, StoreConfig::Memory);
    }

    #[test]
    fn unknown_store_backend_is_rejected() {
        let mut env = base_env();
        env.push((ENV_STORE_BACKEND, "sqlite"));
        assert!(matches!(
            resolve_with(&env).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn short_session_secret_is_rejected() {
        let mut env = base_env();
        env[1] = (ENV_SESSION_SECRET, "too-short");
        assert!(matches!(
            resolve_with(&env).unwrap_err(),
            ConfigError::WeakSessionSecret
        ));
    }

    #[test]
    fn same_site_none_requires_secure_cookie() {
        let mut env = base_env();
        env.push((ENV_COOKIE_SAMESITE, "none"));
        env.push((ENV_COOKIE_SECURE, "false"));
        assert!(matches!(
            resolve_with(&env).unwrap_err(),
            ConfigError::InsecureCrossSiteCookie
        ));

        let mut env = base_env();
        env.push((ENV_COOKIE_SAMESITE, "None"));
        let config = resolve_with(&env).unwrap();
        assert_eq!(config.session.same_site, SameSitePolicy::None);
    }

    #[test]
    fn zero_login_attempts_is_rejected() {
        let mut env = base_env();
        env.push((ENV_LOGIN_MAX_ATTEMPTS, "0"));
        assert!(resolve_with(&env).is_err());
    }

    #[test]
    fn base_path_is_normalized() {
        assert_eq!(normalize_base_path("api"), "/api");
        assert_eq!(normalize_base_path("/.netlify/functions/api/"), "/.netlify/functions/api");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path(""), "");
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let mut env = base_env();
        env.push((ENV_CORS_ORIGINS, "https://a.example, ,https://b.example "));
        let config = resolve_with(&env).unwrap();
        assert_eq!(
            config.cors_origins,
            vec![
                String::from("https://a.example"),
                String::from("https://b.example")
            ]
        );
    }

    #[test]
    fn proxy_headers_are_trusted_only_when_enabled() {
        let mut env = base_env();
        env.push((ENV_TRUST_PROXY, "true"));
        assert!(resolve_with(&env).unwrap().login_limit.trust_proxy);

        let mut env = base_env();
        env.push((ENV_TRUST_PROXY, "sometimes"));
        assert!(matches!(
            resolve_with(&env).unwrap_err(),
            ConfigError::InvalidBool { .. }
        ));
    }

    #[test]
    fn replenish_interval_spreads_window_over_attempts() {
        let limit = LoginLimit {
            max_attempts: 10,
            window: Duration::from_secs(900),
            trust_proxy: false,
        };
        assert_eq!(limit.replenish_interval(), Duration::from_secs(90));
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let config = resolve_with(&base_env()).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains(SECRET));
        assert!(!rendered.contains("token-123"));
    }

    #[test]
    fn file_settings_fill_gaps_and_cli_wins() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("hawza.toml");
        std::fs::write(
            &path,
            "bind = \"127.0.0.1:9000\"\nbase_path = \"/qa\"\nsession_ttl = \"2h\"\nlogin_max_attempts = 3\n\n[store]\nbackend = \"memory\"\n",
        )?;

        let file = read_file_config(Some(&path))?;
        let cli = Cli {
            base_path: Some(String::from("/override")),
            ..Cli::default()
        };
        let env = env_of(&[(ENV_ADMIN_PASSWORD, "pw"), (ENV_SESSION_SECRET, SECRET)]);
        let config = AppConfig::resolve(cli, file, &env)?;

        assert_eq!(config.bind, SocketAddr::from(([127, 0, 0, 1], 9000)));
        assert_eq!(config.base_path, "/override");
        assert_eq!(config.session.ttl, Duration::from_secs(7200));
        assert_eq!(config.login_limit.max_attempts, 3);
        assert_eq!(config.store, StoreConfig::Memory);
        Ok(())
    }

    #[test]
    fn unreadable_config_file_is_reported() {
        let dir = tempdir().unwrap();
        let result = read_file_config(Some(&dir.path().join("missing.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
