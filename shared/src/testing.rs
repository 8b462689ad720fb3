//! Scripted in-memory backend for state-machine tests.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use tokio::sync::oneshot;

use crate::error::{GatewayError, GatewayErrorKind};
use crate::gateway::DesignBackend;
use crate::models::{DesignContent, DesignDocument, DesignRequest, RevisionRequest};

struct Scripted<T> {
    result: Result<T, GatewayError>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Answers generation calls by requirements text (revisions by design id)
/// and listing calls in FIFO order. A gated answer waits for its sender.
#[derive(Default)]
pub struct FakeBackend {
    documents: Mutex<HashMap<String, Scripted<DesignDocument>>>,
    listings: Mutex<VecDeque<Scripted<Vec<DesignDocument>>>>,
    calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(&self, key: &str, result: Result<DesignDocument, GatewayError>) {
        self.insert(key, result, None);
    }

    pub fn answer_gated(&self, key: &str, result: Result<DesignDocument, GatewayError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.insert(key, result, Some(rx));
        tx
    }

    pub fn listing(&self, result: Result<Vec<DesignDocument>, GatewayError>) {
        self.listings.lock().unwrap().push_back(Scripted { result, gate: None });
    }

    pub fn listing_gated(&self, result: Result<Vec<DesignDocument>, GatewayError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.listings.lock().unwrap().push_back(Scripted { result, gate: Some(rx) });
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn insert(&self, key: &str, result: Result<DesignDocument, GatewayError>, gate: Option<oneshot::Receiver<()>>) {
        self.documents
            .lock()
            .unwrap()
            .insert(key.to_string(), Scripted { result, gate });
    }

    async fn take_document(&self, key: &str) -> Result<DesignDocument, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .documents
            .lock()
            .unwrap()
            .remove(key)
            .unwrap_or_else(|| panic!("no scripted answer for {:?}", key));
        settle(scripted).await
    }
}

async fn settle<T>(scripted: Scripted<T>) -> Result<T, GatewayError> {
    if let Some(gate) = scripted.gate {
        let _ = gate.await;
    }
    scripted.result
}

#[async_trait]
impl DesignBackend for FakeBackend {
    async fn generate(&self, request: &DesignRequest) -> Result<DesignDocument, GatewayError> {
        self.take_document(&request.requirements).await
    }

    async fn list_designs(&self) -> Result<Vec<DesignDocument>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .listings
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted listing");
        settle(scripted).await
    }

    async fn revise(&self, request: &RevisionRequest) -> Result<DesignDocument, GatewayError> {
        self.take_document(&request.design_id).await
    }

    async fn fetch_design(&self, id: &str) -> Result<DesignDocument, GatewayError> {
        self.take_document(id).await
    }
}

/// A document created `minutes` after a fixed epoch.
pub fn document(id: &str, version: u32, parent_id: Option<&str>, minutes: i64) -> DesignDocument {
    DesignDocument {
        id: id.to_string(),
        version: NonZeroU32::new(version).expect("version must be positive"),
        parent_id: parent_id.map(str::to_string),
        timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes),
        requirements: "Build a URL shortener".to_string(),
        assumptions: serde_json::Map::new(),
        constraints: vec![],
        design: DesignContent::default(),
    }
}

pub fn backend_error(message: &str) -> GatewayError {
    GatewayError::new(GatewayErrorKind::Backend, message).with_status(500)
}

pub fn generate(requirements: &str) -> DesignRequest {
    DesignRequest {
        requirements: requirements.to_string(),
        assumptions: serde_json::Map::new(),
        constraints: vec![],
    }
}
