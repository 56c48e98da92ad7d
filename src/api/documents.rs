//! Documents resource, including ingestion polling.

use std::path::Path;
use std::sync::Arc;

use tracing::instrument;

use super::ApiClient;
use super::paths;
use super::types::{DocumentBrief, DocumentId, DocumentStatus, UploadedDocument};
use crate::error::{ApiError, Result};
use crate::transport::{ApiRequest, FileUpload, ProgressFn};

/// File extensions the backend can ingest.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "docx", "txt"];

/// Documents API client.
#[derive(Debug)]
pub struct DocumentsApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl DocumentsApi<'_> {
    /// Upload a file from disk.
    pub async fn upload_path(
        &self,
        path: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<UploadedDocument> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ApiError::InvalidInput(format!(
                "unsupported file type '{}'; expected one of {}",
                path.display(),
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ApiError::InvalidInput(format!("bad file name: {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        self.upload(file_name, mime, bytes, progress).await
    }

    /// Upload in-memory content as a multipart `file` field.
    #[instrument(skip(self, bytes, progress), fields(len = bytes.len()))]
    pub async fn upload(
        &self,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
        progress: Option<ProgressFn>,
    ) -> Result<UploadedDocument> {
        let mut request = ApiRequest::post(paths::UPLOAD).multipart(FileUpload {
            field: "file".to_string(),
            file_name,
            mime,
            bytes: Arc::from(bytes),
        });
        if let Some(progress) = progress {
            request = request.on_progress(progress);
        }
        let uploaded: UploadedDocument = self.client.fetch(request).await?;
        tracing::info!(name: "documents.uploaded", document_id = uploaded.id, filename = %uploaded.filename);
        Ok(uploaded)
    }

    pub async fn list_mine(&self) -> Result<Vec<DocumentBrief>> {
        self.client.fetch(ApiRequest::get(paths::MY_FILES)).await
    }

    pub async fn status(&self, id: DocumentId) -> Result<DocumentStatus> {
        self.client
            .fetch(ApiRequest::get(paths::document_status(id)))
            .await
    }

    /// Delete a document.
    ///
    /// A 422 means the record was removed but its vector index was already
    /// gone; the document no longer exists, so that counts as success.
    pub async fn delete(&self, id: DocumentId) -> Result<()> {
        match self.client.send(ApiRequest::delete(paths::document(id))).await {
            Ok(_) => Ok(()),
            Err(ApiError::Validation { status: 422, message }) => {
                tracing::warn!(
                    name: "documents.delete.index_missing",
                    document_id = id,
                    detail = %message,
                    "Document deleted; vector index was already missing"
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Poll the status endpoint until ingestion completes.
    ///
    /// Checks at the configured interval, at most `max_poll_attempts` times.
    #[instrument(skip(self))]
    pub async fn wait_until_processed(&self, id: DocumentId) -> Result<DocumentStatus> {
        let settings = self.client.settings();
        let attempts = settings.max_poll_attempts.max(1);

        for attempt in 1..=attempts {
            let status = self.status(id).await?;
            if status.processing_complete {
                tracing::info!(name: "documents.processed", document_id = id, attempt);
                return Ok(status);
            }
            if status.has_failed() {
                return Err(ApiError::IngestionFailed {
                    document_id: id,
                    status: status.status,
                });
            }
            tracing::debug!(
                name: "documents.processing",
                document_id = id,
                attempt,
                status = %status.status
            );
            if attempt < attempts {
                tokio::time::sleep(settings.poll_interval).await;
            }
        }

        Err(ApiError::IngestionTimeout {
            document_id: id,
            attempts,
        })
    }
}
