use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One browsing dimension. Declaration order is the canonical facet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Facet {
    Package,
    Group,
    Type,
    Api,
}

impl Facet {
    pub const ALL: [Facet; 4] = [Facet::Package, Facet::Group, Facet::Type, Facet::Api];

    /// Name used in request documents.
    pub fn wire_name(self) -> &'static str {
        match self {
            Facet::Package => "package",
            Facet::Group => "group",
            Facet::Type => "type",
            Facet::Api => "api",
        }
    }

    /// Case-insensitive; responses use upper case.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.wire_name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire_name().to_ascii_uppercase())
    }
}

impl FromStr for Facet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s).ok_or_else(|| format!("unknown facet: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacetValue {
    pub value: String,
    pub expand_same_facet: bool,
}

/// Browse position: facets pinned to one value each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetQuery {
    facets: BTreeMap<Facet, FacetValue>,
}

impl FacetQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, facet: Facet, value: impl Into<String>, expand_same_facet: bool) -> Self {
        self.set(facet, value, expand_same_facet);
        self
    }

    pub fn set(&mut self, facet: Facet, value: impl Into<String>, expand_same_facet: bool) {
        self.facets.insert(
            facet,
            FacetValue {
                value: value.into(),
                expand_same_facet,
            },
        );
    }

    pub fn get(&self, facet: Facet) -> Option<&FacetValue> {
        self.facets.get(&facet)
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Pinned facets in canonical order; sent as preselections.
    pub fn specified(&self) -> impl Iterator<Item = (Facet, &FacetValue)> {
        self.facets.iter().map(|(facet, value)| (*facet, value))
    }

    pub fn is_specified(&self, facet: Facet) -> bool {
        self.facets.contains_key(&facet)
    }

    pub fn is_expanded(&self, facet: Facet) -> bool {
        self.facets.get(&facet).is_some_and(|v| v.expand_same_facet)
    }

    pub fn expanded_facets(&self) -> Vec<Facet> {
        self.specified()
            .filter(|(_, value)| value.expand_same_facet)
            .map(|(facet, _)| facet)
            .collect()
    }

    pub fn open_facets(&self) -> Vec<Facet> {
        Facet::ALL
            .into_iter()
            .filter(|facet| !self.is_specified(*facet))
            .collect()
    }

    /// Facets the server should enumerate: expanded ones first, then the
    /// open ones.
    pub fn facet_order(&self) -> Vec<Facet> {
        let mut order = self.expanded_facets();
        order.extend(self.open_facets());
        order
    }

    /// Same position with `facet` no longer expanded.
    pub fn without_expansion(&self, facet: Facet) -> Self {
        let mut query = self.clone();
        if let Some(value) = query.facets.get_mut(&facet) {
            value.expand_same_facet = false;
        }
        query
    }
}
