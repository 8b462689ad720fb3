//! Backend gateway: the only code that talks to the design service.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, GatewayError, GatewayErrorKind, Result};
use crate::http::{decode_body, map_failure, Failure, Operation};
use crate::models::{DesignDocument, DesignRequest, RevisionRequest};

/// Operations the client needs from a design backend.
///
/// Each call is a single attempt; retries are up to the caller.
#[async_trait]
pub trait DesignBackend: Send + Sync {
    /// Generate a first-version design.
    async fn generate(&self, request: &DesignRequest) -> std::result::Result<DesignDocument, GatewayError>;

    /// Fetch every stored design. An empty list is a valid answer.
    async fn list_designs(&self) -> std::result::Result<Vec<DesignDocument>, GatewayError>;

    /// Produce a new version of an existing design.
    async fn revise(&self, request: &RevisionRequest) -> std::result::Result<DesignDocument, GatewayError>;

    /// Fetch one design by id.
    async fn fetch_design(&self, id: &str) -> std::result::Result<DesignDocument, GatewayError>;
}

/// HTTP client for the design service.
pub struct Gateway {
    http_client: reqwest::Client,
    config: Config,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(config: Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http_client, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> std::result::Result<T, GatewayError> {
        let base_url = &self.config.base_url;
        debug!(operation = operation.name(), "Calling design service");

        let response = request
            .send()
            .await
            .map_err(|e| map_failure(Failure::from_reqwest(&e), base_url, operation))?;

        let status = response.status();
        if !status.is_success() {
            // A truncated error body still reports the status.
            let body = response.text().await.unwrap_or_else(|e| {
                debug!(status = status.as_u16(), "Failed to read error body: {}", e);
                String::new()
            });
            return Err(map_failure(
                Failure::Status {
                    status: status.as_u16(),
                    body,
                },
                base_url,
                operation,
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| map_failure(Failure::from_reqwest(&e), base_url, operation))?;

        decode_body(&body)
    }

    async fn send_document(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> std::result::Result<DesignDocument, GatewayError> {
        let document: DesignDocument = self.send(operation, request).await?;
        checked(document)
    }
}

fn checked(document: DesignDocument) -> std::result::Result<DesignDocument, GatewayError> {
    document.check().map_err(|reason| {
        GatewayError::new(
            GatewayErrorKind::Decode,
            format!("Invalid response from backend: {}", reason),
        )
    })?;

    let unknown: Vec<&str> = document.design.unknown_sections().collect();
    if !unknown.is_empty() {
        debug!(design_id = %document.id, sections = ?unknown, "Design has sections outside the known schema");
    }

    Ok(document)
}

/// One history entry. A bad entry only costs itself, not the whole listing.
fn listed_document(entry: Value) -> std::result::Result<DesignDocument, GatewayError> {
    let document: DesignDocument = serde_json::from_value(entry).map_err(|e| {
        GatewayError::new(
            GatewayErrorKind::Decode,
            format!("Invalid response from backend: {}", e),
        )
    })?;
    checked(document)
}

#[async_trait]
impl DesignBackend for Gateway {
    async fn generate(&self, request: &DesignRequest) -> std::result::Result<DesignDocument, GatewayError> {
        info!(constraints = request.constraints.len(), "Requesting design generation");

        let builder = self
            .http_client
            .post(self.config.endpoint("/generate_design"))
            .json(request);
        let document = self
            .send_document(Operation::Generate, builder)
            .await
            .inspect_err(|e| warn!(kind = %e.kind, "Design generation failed: {}", e))?;

        info!(design_id = %document.id, version = document.version.get(), "Design generated");
        Ok(document)
    }

    async fn list_designs(&self) -> std::result::Result<Vec<DesignDocument>, GatewayError> {
        let builder = self.http_client.get(self.config.endpoint("/list_designs"));
        let entries: Vec<Value> = self
            .send(Operation::ListDesigns, builder)
            .await
            .inspect_err(|e| warn!(kind = %e.kind, "Listing designs failed: {}", e))?;

        let total = entries.len();
        let documents: Vec<DesignDocument> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match listed_document(entry) {
                Ok(document) => Some(document),
                Err(e) => {
                    warn!(index, "Skipping unreadable design in history: {}", e);
                    None
                }
            })
            .collect();

        info!(count = documents.len(), skipped = total - documents.len(), "Fetched design history");
        Ok(documents)
    }

    async fn revise(&self, request: &RevisionRequest) -> std::result::Result<DesignDocument, GatewayError> {
        info!(design_id = %request.design_id, "Requesting design revision");

        let builder = self
            .http_client
            .post(self.config.endpoint("/update_design"))
            .json(request);
        let document = self
            .send_document(Operation::Revise, builder)
            .await
            .inspect_err(|e| warn!(kind = %e.kind, "Design revision failed: {}", e))?;

        if document.parent_id.as_deref() != Some(request.design_id.as_str()) {
            warn!(
                design_id = %document.id,
                parent_id = ?document.parent_id,
                requested = %request.design_id,
                "Revision does not reference the revised design"
            );
        }
        if document.version.get() < 2 {
            warn!(design_id = %document.id, "Revision came back as a first version");
        }

        info!(design_id = %document.id, version = document.version.get(), "Design revised");
        Ok(document)
    }

    async fn fetch_design(&self, id: &str) -> std::result::Result<DesignDocument, GatewayError> {
        let url = self
            .config
            .endpoint(&format!("/design/{}", urlencoding::encode(id)));
        let builder = self.http_client.get(url);

        self.send_document(Operation::FetchDesign, builder)
            .await
            .inspect_err(|e| warn!(kind = %e.kind, design_id = %id, "Loading design failed: {}", e))
    }
}
