//! Administrator credential check.
//!
//! A single admin password (and optionally a username) is configured through the
//! environment. Submissions are compared in constant time; buffers of unequal
//! length never match.

use std::fmt;

use subtle::ConstantTimeEq;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AdminCredentials {
    username: Option<String>,
    password: String,
}

impl AdminCredentials {
    pub fn new(username: Option<String>, password: impl Into<String>) -> Self {
        Self {
            username: username
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            password: password.into().trim().to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.admin_username.clone(),
            config.admin_password.expose(),
        )
    }

    pub fn requires_username(&self) -> bool {
        self.username.is_some()
    }

    /// Both halves are always evaluated so a wrong username and a wrong
    /// password cost the same.
    pub fn verify(&self, username: Option<&str>, password: &str) -> bool {
        let password_ok = constant_time_eq(password.trim(), &self.password);
        let username_ok = match &self.username {
            Some(expected) => username.is_some_and(|given| constant_time_eq(given.trim(), expected)),
            None => true,
        };
        password_ok & username_ok
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn constant_time_eq(given: &str, expected: &str) -> bool {
    let a = given.as_bytes();
    let b = expected.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
