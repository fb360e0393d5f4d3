//! Result rows produced by tree discovery and object search.
//!
//! - `VirtualFolder`: one facet value at the current browse position
//! - `RepositoryObject`: a development object with its resolved type label
//! - `DiscoveryResult`: accumulator of both across discovery rounds

pub mod repository;

pub use repository::{DiscoveryResult, RepositoryObject, VirtualFolder, PARENT_MARKER_PREFIX};
