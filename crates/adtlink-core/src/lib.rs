//! Core library for adtlink.
//!
//! This crate keeps an authenticated, stateful conversation with an ADT
//! repository server and browses its virtual folder hierarchy:
//!
//! - `api`: the resilient request pipeline, session lifecycle and the
//!   auto-refresh scheduler, wired together by [`AdtClient`]
//! - `auth`: anti-forgery token store, credential provider and session data
//! - `tree`: facet-based discovery of the repository's virtual folders
//! - `search`: quick object search
//! - `models`: result rows shared by discovery and search

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod search;
pub mod tree;

pub use api::{AdtClient, AdtError, Result};
pub use auth::{AuthMethod, CredentialStore, Session, SessionSnapshot};
pub use config::{AutoRefreshConfig, ClientConfig, RefreshMode};
pub use models::{DiscoveryResult, RepositoryObject, VirtualFolder};
pub use tree::{Facet, FacetQuery, FacetValue, StaticTypeRegistry, TypeRegistry};
