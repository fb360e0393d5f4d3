//! Tree discovery over the virtual folders endpoint.

use std::sync::Arc;

use futures::future::try_join_all;
use reqwest::header;
use tracing::debug;

use super::parser::parse_virtual_folders;
use super::request::{build_request_body, REQUEST_CONTENT_TYPE, RESULT_CONTENT_TYPE, VIRTUAL_FOLDERS_PATH};
use super::{FacetQuery, TypeRegistry};
use crate::api::{AdtError, AdtRequest, RequestExecutor, Result};
use crate::models::DiscoveryResult;

pub struct TreeDiscovery {
    executor: RequestExecutor,
    registry: Arc<dyn TypeRegistry>,
}

impl TreeDiscovery {
    pub fn new(executor: RequestExecutor, registry: Arc<dyn TypeRegistry>) -> Self {
        Self { executor, registry }
    }

    /// Folders and objects at the position described by `query`.
    ///
    /// For every expanded facet the first response lists the children of
    /// that facet's value; one follow-up round with the expansion switched
    /// off fetches the other dimensions at the same position. Follow-ups
    /// are never expanded again, so there are at most `1 + expanded` rounds.
    pub async fn discover(&self, query: &FacetQuery, search_pattern: &str) -> Result<DiscoveryResult> {
        let mut result = self.fetch_round(query, search_pattern).await?;

        let follow_ups: Vec<FacetQuery> = query
            .expanded_facets()
            .into_iter()
            .map(|facet| query.without_expansion(facet))
            .collect();

        if !follow_ups.is_empty() {
            debug!(rounds = follow_ups.len(), "Fetching same-position rounds for expanded facets");
            let rounds = try_join_all(
                follow_ups
                    .iter()
                    .map(|follow_up| self.fetch_round(follow_up, search_pattern)),
            )
            .await?;
            for round in rounds {
                result.merge(round);
            }
        }

        debug!(
            folders = result.folders.len(),
            objects = result.objects.len(),
            "Discovery complete"
        );
        Ok(result)
    }

    async fn fetch_round(&self, query: &FacetQuery, search_pattern: &str) -> Result<DiscoveryResult> {
        let request = AdtRequest::post(VIRTUAL_FOLDERS_PATH)
            .with_query("ignoreShortDescriptions", "false")
            .with_header(header::CONTENT_TYPE, REQUEST_CONTENT_TYPE)
            .with_header(header::ACCEPT, RESULT_CONTENT_TYPE)
            .with_body(build_request_body(query, search_pattern));

        let response = self.executor.execute(request).await?;
        if !response.is_success() {
            return Err(AdtError::from_status(response.status, &response.body));
        }

        let round = parse_virtual_folders(&response.body, self.registry.as_ref())?;

        // The row re-emitting a pinned value is not a child of itself
        let folders = round
            .folders
            .into_iter()
            .filter(|folder| !(folder.is_parent_marker() && query.is_specified(folder.facet)))
            .collect();

        Ok(DiscoveryResult::new(folders, round.objects))
    }
}
