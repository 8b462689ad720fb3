//! History store: the cached list of previously generated designs.
//!
//! The list is fetched on demand and replaced wholesale on every refresh.
//! It is not synchronized with the generation session; a freshly generated
//! design only shows up here after the next refresh.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, NotFound};
use crate::gateway::DesignBackend;
use crate::models::DesignDocument;
use crate::tokens::{RequestToken, RequestTokens, Resolution};

/// Load state of the history list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryStatus {
    NotLoaded,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug)]
pub struct HistoryStore {
    designs: Vec<Arc<DesignDocument>>,
    status: HistoryStatus,
    tokens: RequestTokens,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    pub fn new() -> Self {
        Self {
            designs: Vec::new(),
            status: HistoryStatus::NotLoaded,
            tokens: RequestTokens::default(),
        }
    }

    /// Documents, newest first.
    pub fn designs(&self) -> &[Arc<DesignDocument>] {
        &self.designs
    }

    pub fn is_empty(&self) -> bool {
        self.designs.is_empty()
    }

    pub fn status(&self) -> &HistoryStatus {
        &self.status
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            HistoryStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn begin_refresh(&mut self) -> RequestToken {
        let token = self.tokens.issue();
        self.status = HistoryStatus::Loading;
        debug!(token = token.get(), "History refresh started");
        token
    }

    /// Apply a listing for `token`. Stale listings are dropped; a failure
    /// keeps the previous list and records the error.
    pub fn finish_refresh(
        &mut self,
        token: RequestToken,
        result: Result<Vec<DesignDocument>, GatewayError>,
    ) -> Resolution {
        if !self.tokens.settle(token) {
            debug!(token = token.get(), "Discarding stale history listing");
            return Resolution::Stale;
        }

        match result {
            Ok(documents) => {
                self.designs = normalize(documents);
                self.status = HistoryStatus::Loaded;
                info!(count = self.designs.len(), "History updated");
            }
            Err(e) => {
                self.status = HistoryStatus::Failed(e.message);
            }
        }
        Resolution::Applied
    }

    /// Fetch the full history and replace the cached list.
    pub async fn refresh<B>(&mut self, backend: &B) -> Result<&[Arc<DesignDocument>], GatewayError>
    where
        B: DesignBackend + ?Sized,
    {
        let token = self.begin_refresh();
        let result = backend.list_designs().await;
        let failure = result.as_ref().err().cloned();
        self.finish_refresh(token, result);

        match failure {
            Some(e) => Err(e),
            None => Ok(self.designs.as_slice()),
        }
    }

    /// Look up a document by id.
    pub fn select(&self, id: &str) -> Result<&Arc<DesignDocument>, NotFound> {
        self.designs
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| NotFound { id: id.to_string() })
    }

    /// The document `id` revises, if it is in the list.
    pub fn parent_of(&self, id: &str) -> Result<Option<&Arc<DesignDocument>>, NotFound> {
        let document = self.select(id)?;
        Ok(document
            .parent_id
            .as_deref()
            .and_then(|parent| self.select(parent).ok()))
    }

    /// Direct revisions of `id`, lowest version first.
    pub fn revisions_of(&self, id: &str) -> Vec<&Arc<DesignDocument>> {
        let mut children: Vec<_> = self
            .designs
            .iter()
            .filter(|d| d.parent_id.as_deref() == Some(id))
            .collect();
        children.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.id.cmp(&b.id)));
        children
    }

    /// The chain of documents leading to `id`, root first.
    ///
    /// The walk stops at a parent that is missing from the list or that
    /// was already visited.
    pub fn lineage(&self, id: &str) -> Result<Vec<&Arc<DesignDocument>>, NotFound> {
        let mut chain = vec![self.select(id)?];
        let mut seen: HashSet<&str> = HashSet::from([id]);

        loop {
            let child = chain[chain.len() - 1];
            let Some(parent_id) = child.parent_id.as_deref() else {
                break;
            };
            if !seen.insert(parent_id) {
                warn!(design_id = %child.id, parent_id, "Cycle in design lineage");
                break;
            }
            let Ok(parent) = self.select(parent_id) else {
                warn!(design_id = %child.id, parent_id, "Parent design not in history");
                break;
            };
            if parent.version >= child.version {
                warn!(
                    design_id = %child.id,
                    version = child.version.get(),
                    parent_version = parent.version.get(),
                    "Revision version does not exceed its parent"
                );
            }
            chain.push(parent);
        }

        chain.reverse();
        Ok(chain)
    }
}

/// Drop duplicate ids (first wins) and order newest first.
fn normalize(documents: Vec<DesignDocument>) -> Vec<Arc<DesignDocument>> {
    let mut seen = HashSet::new();
    let mut designs: Vec<Arc<DesignDocument>> = Vec::with_capacity(documents.len());

    for document in documents {
        if !seen.insert(document.id.clone()) {
            warn!(design_id = %document.id, "Duplicate design id in history; keeping the first");
            continue;
        }
        designs.push(Arc::new(document));
    }

    designs.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.version.cmp(&a.version))
            .then_with(|| a.id.cmp(&b.id))
    });
    designs
}

/// Refresh a store shared between tasks without holding the lock across
/// the backend call.
pub async fn drive_refresh<B>(store: &Mutex<HistoryStore>, backend: &B) -> Resolution
where
    B: DesignBackend + ?Sized,
{
    let token = store.lock().await.begin_refresh();
    let result = backend.list_designs().await;
    store.lock().await.finish_refresh(token, result)
}
