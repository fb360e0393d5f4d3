//! Parsing of the virtual folders result document.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;

use super::{Facet, TypeRegistry};
use crate::api::{AdtError, Result};
use crate::models::{RepositoryObject, VirtualFolder};

/// Attributes of an element keyed by local name (namespace prefix dropped).
pub(crate) fn attributes(element: &BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for attr in element.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

/// Rows of one response, before parent markers are filtered.
#[derive(Debug, Default)]
pub struct ParsedRound {
    pub folders: Vec<VirtualFolder>,
    pub objects: Vec<RepositoryObject>,
}

pub fn parse_virtual_folders(xml: &str, registry: &dyn TypeRegistry) -> Result<ParsedRound> {
    let mut reader = Reader::from_str(xml);
    let mut round = ParsedRound::default();
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element) => {
                match element.local_name().as_ref() {
                    b"virtualFoldersResult" => saw_root = true,
                    b"virtualFolder" => {
                        if let Some(folder) = folder_from(&attributes(&element)?)? {
                            round.folders.push(folder);
                        }
                    }
                    b"object" => {
                        round.objects.push(object_from(&attributes(&element)?, registry)?);
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(AdtError::ProtocolParse(
            "response is not a virtualFoldersResult document".to_string(),
        ));
    }
    Ok(round)
}

fn folder_from(attrs: &HashMap<String, String>) -> Result<Option<VirtualFolder>> {
    let facet_name = required(attrs, "facet", "virtualFolder")?;
    let Some(facet) = Facet::from_wire(facet_name) else {
        debug!(facet = %facet_name, "Skipping folder of unknown facet");
        return Ok(None);
    };
    let technical_name = required(attrs, "name", "virtualFolder")?.to_string();

    let display_name = attrs
        .get("displayName")
        .or_else(|| attrs.get("text"))
        .filter(|s| !s.is_empty())
        .cloned()
        .unwrap_or_else(|| technical_name.clone());

    let count = match attrs.get("counter") {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<u32>().map_err(|_| {
            AdtError::ProtocolParse(format!("invalid counter {:?} on folder {}", raw, technical_name))
        })?,
        _ => 0,
    };

    Ok(Some(VirtualFolder {
        facet,
        display_name,
        description: attrs.get("description").filter(|s| !s.is_empty()).cloned(),
        count,
        has_children_of_same_facet: attrs
            .get("hasChildrenOfSameFacet")
            .is_some_and(|v| v.eq_ignore_ascii_case("true")),
        technical_name,
    }))
}

fn object_from(attrs: &HashMap<String, String>, registry: &dyn TypeRegistry) -> Result<RepositoryObject> {
    let name = required(attrs, "name", "object")?.to_string();
    let type_code = required(attrs, "type", "object")?.to_string();
    let info = registry.resolve(&type_code);

    Ok(RepositoryObject {
        name,
        object_type: info.label,
        extension: info.extension,
        type_code,
        uri: attrs.get("uri").cloned(),
        package_name: attrs.get("packageName").cloned(),
    })
}

pub(crate) fn required<'a>(
    attrs: &'a HashMap<String, String>,
    key: &str,
    element: &str,
) -> Result<&'a str> {
    attrs
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| AdtError::ProtocolParse(format!("{} element without {} attribute", element, key)))
}
