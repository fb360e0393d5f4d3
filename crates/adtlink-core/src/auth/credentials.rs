use std::fmt;

use anyhow::{Context, Result};
use base64::Engine;
use keyring::Entry;
use reqwest::header::{self, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::api::AdtError;

const SERVICE_NAME: &str = "adtlink";

/// How the client authenticates against the server.
///
/// Only `Basic` and `Cookie` are handled here. Browser based SSO and client
/// certificates are external strategies; a strategy that has already
/// obtained session cookies hands them over as `Cookie`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMethod {
    Basic { username: String, password: String },
    Cookie { username: String, cookies: String },
    Browser { username: Option<String> },
    Certificate { cert_path: String, key_path: String },
}

impl AuthMethod {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::Basic { .. } => "basic",
            AuthMethod::Cookie { .. } => "cookie",
            AuthMethod::Browser { .. } => "browser",
            AuthMethod::Certificate { .. } => "certificate",
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            AuthMethod::Cookie { username, .. } => f
                .debug_struct("Cookie")
                .field("username", username)
                .field("cookies", &"<redacted>")
                .finish(),
            AuthMethod::Browser { username } => {
                f.debug_struct("Browser").field("username", username).finish()
            }
            AuthMethod::Certificate { cert_path, key_path } => f
                .debug_struct("Certificate")
                .field("cert_path", cert_path)
                .field("key_path", key_path)
                .finish(),
        }
    }
}

/// Supplies the authentication header for every outbound call.
#[derive(Debug, Clone)]
pub struct CredentialProvider {
    method: AuthMethod,
}

impl CredentialProvider {
    pub fn new(method: AuthMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> &AuthMethod {
        &self.method
    }

    pub fn username(&self) -> Option<&str> {
        match &self.method {
            AuthMethod::Basic { username, .. } | AuthMethod::Cookie { username, .. } => {
                Some(username)
            }
            AuthMethod::Browser { username } => username.as_deref(),
            AuthMethod::Certificate { .. } => None,
        }
    }

    /// Fails with `UnsupportedAuth` for strategies this client can't drive.
    pub fn ensure_supported(&self) -> crate::api::Result<()> {
        match self.method {
            AuthMethod::Basic { .. } | AuthMethod::Cookie { .. } => Ok(()),
            _ => Err(AdtError::UnsupportedAuth(self.method.kind().to_string())),
        }
    }

    pub fn auth_header(&self) -> crate::api::Result<(HeaderName, HeaderValue)> {
        match &self.method {
            AuthMethod::Basic { username, password } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
                    .map_err(|_| AdtError::InvalidHeader("authorization"))?;
                value.set_sensitive(true);
                Ok((header::AUTHORIZATION, value))
            }
            AuthMethod::Cookie { cookies, .. } => {
                let mut value = HeaderValue::from_str(cookies)
                    .map_err(|_| AdtError::InvalidHeader("cookie"))?;
                value.set_sensitive(true);
                Ok((header::COOKIE, value))
            }
            other => Err(AdtError::UnsupportedAuth(other.kind().to_string())),
        }
    }
}

/// Passwords in the OS keychain, keyed by `user@server`.
pub struct CredentialStore;

impl CredentialStore {
    fn account(username: &str, server: &str) -> String {
        format!("{}@{}", username, server)
    }

    /// Store a password in the OS keychain
    pub fn store(username: &str, server: &str, password: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, &Self::account(username, server))
            .context("Failed to create keyring entry")?;
        entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Retrieve a password from the OS keychain
    pub fn get_password(username: &str, server: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, &Self::account(username, server))
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    /// Delete stored credentials
    pub fn delete(username: &str, server: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, &Self::account(username, server))
            .context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }
}
