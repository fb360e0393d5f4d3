//! Facet-based discovery of the repository's virtual folder hierarchy.
//!
//! The server indexes objects by four facets (package, group, type, API
//! release state). A query pins some facets to exact values and asks the
//! server to enumerate the others; facets flagged "expand same facet" also
//! list children of the pinned value, which needs one extra round.

pub mod discovery;
pub mod facet;
pub mod parser;
pub mod registry;
pub mod request;

pub use discovery::TreeDiscovery;
pub use facet::{Facet, FacetQuery, FacetValue};
pub use registry::{ObjectTypeInfo, StaticTypeRegistry, TypeRegistry};
