//! Quick object search by name pattern.

use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::header;
use tracing::debug;

use crate::api::{AdtError, AdtRequest, RequestExecutor, Result};
use crate::models::RepositoryObject;
use crate::tree::parser::{attributes, required};
use crate::tree::TypeRegistry;

pub const SEARCH_PATH: &str = "/sap/bc/adt/repository/informationsystem/search";

/// Default cap on results when the caller doesn't give one.
pub const DEFAULT_MAX_RESULTS: u32 = 100;

pub struct ObjectSearch {
    executor: RequestExecutor,
    registry: Arc<dyn TypeRegistry>,
}

impl ObjectSearch {
    pub fn new(executor: RequestExecutor, registry: Arc<dyn TypeRegistry>) -> Self {
        Self { executor, registry }
    }

    pub async fn search(&self, pattern: &str, max_results: u32) -> Result<Vec<RepositoryObject>> {
        let request = AdtRequest::get(SEARCH_PATH)
            .with_query("operation", "quickSearch")
            .with_query("query", pattern)
            .with_query("maxResults", max_results.to_string())
            .with_header(header::ACCEPT, "application/xml");

        let response = self.executor.execute(request).await?;
        if !response.is_success() {
            return Err(AdtError::from_status(response.status, &response.body));
        }

        let objects = parse_object_references(&response.body, self.registry.as_ref())?;
        debug!(pattern = %pattern, found = objects.len(), "Search complete");
        Ok(objects)
    }
}

pub fn parse_object_references(xml: &str, registry: &dyn TypeRegistry) -> Result<Vec<RepositoryObject>> {
    let mut reader = Reader::from_str(xml);
    let mut objects = Vec::new();
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element) => match element.local_name().as_ref() {
                b"objectReferences" => saw_root = true,
                b"objectReference" => {
                    let attrs = attributes(&element)?;
                    let type_code = required(&attrs, "type", "objectReference")?.to_string();
                    let info = registry.resolve(&type_code);
                    objects.push(RepositoryObject {
                        name: required(&attrs, "name", "objectReference")?.to_string(),
                        object_type: info.label,
                        extension: info.extension,
                        type_code,
                        uri: attrs.get("uri").cloned(),
                        package_name: attrs.get("packageName").cloned(),
                    });
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(AdtError::ProtocolParse(
            "response is not an objectReferences document".to_string(),
        ));
    }
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::context::testing::test_context;
    use crate::api::transport::mock::MockTransport;
    use crate::tree::StaticTypeRegistry;

    const REFERENCES: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<adtcore:objectReferences xmlns:adtcore="http://www.sap.com/adt/core">
  <adtcore:objectReference adtcore:uri="/sap/bc/adt/oo/classes/zcl_demo" adtcore:type="CLAS/OC" adtcore:name="ZCL_DEMO" adtcore:packageName="$TMP" adtcore:description="Demo"/>
  <adtcore:objectReference adtcore:uri="/sap/bc/adt/ddic/tables/zdemo" adtcore:type="TABL/DT" adtcore:name="ZDEMO" adtcore:packageName="$TMP"/>
</adtcore:objectReferences>"#;

    #[test]
    fn test_parse_references() {
        let objects = parse_object_references(REFERENCES, &StaticTypeRegistry).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].name, "ZCL_DEMO");
        assert_eq!(objects[0].object_type, "Class");
        assert_eq!(objects[0].uri.as_deref(), Some("/sap/bc/adt/oo/classes/zcl_demo"));
        assert_eq!(objects[1].object_type, "Database Table");
        assert_eq!(objects[1].package_name.as_deref(), Some("$TMP"));
    }

    #[test]
    fn test_wrong_document_rejected() {
        let err = parse_object_references("<other/>", &StaticTypeRegistry).unwrap_err();
        assert!(matches!(err, AdtError::ProtocolParse(_)));
    }

    #[tokio::test]
    async fn test_search_request() {
        let transport = Arc::new(MockTransport::default());
        transport.push(200, &[], REFERENCES);
        let search = ObjectSearch::new(
            RequestExecutor::new(test_context(&transport)),
            Arc::new(StaticTypeRegistry),
        );

        let objects = search.search("ZCL_*", 10).await.unwrap();
        assert_eq!(objects.len(), 2);

        let sent = &transport.requests()[0];
        assert_eq!(sent.url.path(), SEARCH_PATH);
        let pairs: Vec<(String, String)> = sent.url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("operation".to_string(), "quickSearch".to_string())));
        assert!(pairs.contains(&("query".to_string(), "ZCL_*".to_string())));
        assert!(pairs.contains(&("maxResults".to_string(), "10".to_string())));
    }

    #[tokio::test]
    async fn test_search_maps_status() {
        let transport = Arc::new(MockTransport::default());
        transport.push(403, &[], "No authorization");
        let search = ObjectSearch::new(
            RequestExecutor::new(test_context(&transport)),
            Arc::new(StaticTypeRegistry),
        );
        let err = search.search("Z*", 10).await.unwrap_err();
        assert!(matches!(err, AdtError::AccessDenied(_)));
    }
}
