//! Authentication state for the ADT conversation.
//!
//! This module provides:
//! - `TokenStore` / `AuthToken`: the live anti-forgery token
//! - `CredentialProvider`: per-request authentication header from `AuthMethod`
//! - `CredentialStore`: OS keychain storage for passwords
//! - `Session`: server session identity with expiry
//!
//! Sessions expire after 30 minutes unless renewed.

pub mod credentials;
pub mod session;
pub mod token;

pub use credentials::{AuthMethod, CredentialProvider, CredentialStore};
pub use session::{Session, SessionSnapshot};
pub use token::{AuthToken, TokenStore, FETCH_SENTINEL};
