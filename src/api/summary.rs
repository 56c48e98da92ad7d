//! Document summaries.

use super::ApiClient;
use super::paths;
use super::types::{DocumentId, DocumentSummary};
use crate::error::Result;
use crate::transport::ApiRequest;

/// Summary API client.
#[derive(Debug)]
pub struct SummaryApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl SummaryApi<'_> {
    /// Generate (or fetch the cached) summary of a document.
    pub async fn generate(&self, document_id: DocumentId) -> Result<DocumentSummary> {
        let request = ApiRequest::post(paths::summary(document_id))
            .json(&serde_json::json!({}))?
            .timeout(self.client.settings().summary_timeout);
        self.client.fetch(request).await
    }
}
