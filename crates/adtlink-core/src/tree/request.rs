//! Request document for the virtual folders endpoint.

use quick_xml::escape::escape;

use super::FacetQuery;

pub const VIRTUAL_FOLDERS_PATH: &str = "/sap/bc/adt/repository/informationsystem/virtualfolders";
pub const REQUEST_CONTENT_TYPE: &str =
    "application/vnd.sap.adt.repository.virtualfolders.request.v1+xml";
pub const RESULT_CONTENT_TYPE: &str =
    "application/vnd.sap.adt.repository.virtualfolders.result.v1+xml";

const VFS_NAMESPACE: &str = "http://www.sap.com/adt/ris/virtualFolders";

/// Build the request: one preselection per pinned facet, then the facet
/// order the server should enumerate.
pub fn build_request_body(query: &FacetQuery, search_pattern: &str) -> String {
    let pattern = if search_pattern.trim().is_empty() {
        "*"
    } else {
        search_pattern.trim()
    };

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(
        r#"<vfs:virtualFoldersRequest xmlns:vfs="{}" objectSearchPattern="{}">"#,
        VFS_NAMESPACE,
        escape(pattern)
    ));
    xml.push('\n');

    for (facet, value) in query.specified() {
        xml.push_str(&format!(
            r#"  <vfs:preselection facet="{}"><vfs:value>{}</vfs:value></vfs:preselection>"#,
            facet.wire_name(),
            escape(value.value.as_str())
        ));
        xml.push('\n');
    }

    xml.push_str("  <vfs:facetorder>");
    for facet in query.facet_order() {
        xml.push_str(&format!("<vfs:facet>{}</vfs:facet>", facet.wire_name()));
    }
    xml.push_str("</vfs:facetorder>\n");
    xml.push_str("</vfs:virtualFoldersRequest>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Facet;

    #[test]
    fn test_expanded_package_body() {
        let query = FacetQuery::new().with(Facet::Package, "BASIS", true);
        let body = build_request_body(&query, "*");

        assert!(body.contains(r#"objectSearchPattern="*""#));
        assert!(body.contains(
            r#"<vfs:preselection facet="package"><vfs:value>BASIS</vfs:value></vfs:preselection>"#
        ));
        assert!(body.contains(
            "<vfs:facetorder><vfs:facet>package</vfs:facet><vfs:facet>group</vfs:facet><vfs:facet>type</vfs:facet><vfs:facet>api</vfs:facet></vfs:facetorder>"
        ));
    }

    #[test]
    fn test_pinned_facet_not_enumerated() {
        let query = FacetQuery::new().with(Facet::Type, "CLAS", false);
        let body = build_request_body(&query, "ZCL_*");

        assert!(body.contains(r#"objectSearchPattern="ZCL_*""#));
        assert!(body.contains(r#"<vfs:preselection facet="type">"#));
        assert!(!body.contains("<vfs:facet>type</vfs:facet>"));
    }

    #[test]
    fn test_values_are_escaped() {
        let query = FacetQuery::new().with(Facet::Package, "$TMP<&>", false);
        let body = build_request_body(&query, "");
        assert!(body.contains("<vfs:value>$TMP&lt;&amp;&gt;</vfs:value>"));
        assert!(body.contains(r#"objectSearchPattern="*""#));
    }
}
