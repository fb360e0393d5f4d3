//! Protocol layer for the ADT repository server.
//!
//! This module provides the `AdtClient` facade over the resilient request
//! pipeline:
//!
//! - `executor`: header assembly, timeout, CSRF refresh and session reset
//! - `lifecycle`: login, logout and session reset
//! - `refresh`: background timer that renews the session proactively
//! - `transport`: the HTTP seam (reqwest in production)
//!
//! Every call carries the `sap-client` parameter and the stateful session
//! headers; authentication is Basic or session cookies.

pub mod client;
pub mod context;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod refresh;
pub mod transport;

pub use client::AdtClient;
pub use context::{ClientContext, ClientState};
pub use error::{AdtError, Result};
pub use executor::{Recovery, RequestExecutor};
pub use lifecycle::SessionManager;
pub use refresh::AutoRefresh;
pub use transport::{AdtRequest, AdtResponse, HttpTransport, PreparedRequest, ReqwestTransport};
