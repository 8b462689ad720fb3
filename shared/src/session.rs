//! Generation session state.
//!
//! One [`GenerationSession`] is created per user session and handed by
//! reference to whatever renders it. Transitions are synchronous; the only
//! suspension point is the backend call made between [`GenerationSession::begin`]
//! and [`GenerationSession::resolve`].

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, GatewayError, Result};
use crate::gateway::DesignBackend;
use crate::intake;
use crate::models::{DesignDocument, DesignRequest, RevisionRequest};
use crate::tokens::{RequestToken, RequestTokens, Resolution};

/// Display state of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Loading,
    Success,
    Error(String),
}

/// What the user asked the backend to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Generate(DesignRequest),
    Revise(RevisionRequest),
}

impl Submission {
    /// Issue the backend call for this submission.
    pub async fn send<B>(&self, backend: &B) -> std::result::Result<DesignDocument, GatewayError>
    where
        B: DesignBackend + ?Sized,
    {
        match self {
            Submission::Generate(request) => backend.generate(request).await,
            Submission::Revise(request) => backend.revise(request).await,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Submission::Generate(_) => "generate",
            Submission::Revise(_) => "revise",
        }
    }
}

impl From<DesignRequest> for Submission {
    fn from(request: DesignRequest) -> Self {
        Submission::Generate(request)
    }
}

impl From<RevisionRequest> for Submission {
    fn from(request: RevisionRequest) -> Self {
        Submission::Revise(request)
    }
}

/// Tracks one user's request lifecycle and the document on display.
#[derive(Debug)]
pub struct GenerationSession {
    status: SessionStatus,
    current: Option<Arc<DesignDocument>>,
    tokens: RequestTokens,
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationSession {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            current: None,
            tokens: RequestTokens::default(),
        }
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// The document on display, if any.
    pub fn current(&self) -> Option<&Arc<DesignDocument>> {
        self.current.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            SessionStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::Loading
    }

    /// Enter `Loading` for a new submission. Any earlier outstanding
    /// submission is superseded and its response will be discarded.
    pub fn begin(&mut self, submission: &Submission) -> RequestToken {
        if let Some(previous) = self.tokens.outstanding() {
            debug!(token = previous.get(), "Superseding outstanding submission");
        }
        let token = self.tokens.issue();
        self.status = SessionStatus::Loading;
        debug!(token = token.get(), kind = submission.label(), "Submission started");
        token
    }

    /// Apply the backend's answer for `token`, unless it is stale.
    ///
    /// A failure keeps the previously displayed document.
    pub fn resolve(
        &mut self,
        token: RequestToken,
        result: std::result::Result<DesignDocument, GatewayError>,
    ) -> Resolution {
        self.apply(token, result.map(Arc::new))
    }

    fn apply(
        &mut self,
        token: RequestToken,
        result: std::result::Result<Arc<DesignDocument>, GatewayError>,
    ) -> Resolution {
        if !self.tokens.settle(token) {
            debug!(token = token.get(), "Discarding stale response");
            return Resolution::Stale;
        }

        match result {
            Ok(document) => {
                info!(design_id = %document.id, version = document.version.get(), "Displaying design");
                self.current = Some(document);
                self.status = SessionStatus::Success;
            }
            Err(e) => {
                self.status = SessionStatus::Error(e.message);
            }
        }
        Resolution::Applied
    }

    /// Submit and wait for the answer. Exactly one backend call is made.
    pub async fn submit<B>(
        &mut self,
        backend: &B,
        submission: Submission,
    ) -> std::result::Result<Arc<DesignDocument>, GatewayError>
    where
        B: DesignBackend + ?Sized,
    {
        let token = self.begin(&submission);
        match submission.send(backend).await {
            Ok(document) => {
                let document = Arc::new(document);
                self.apply(token, Ok(Arc::clone(&document)));
                Ok(document)
            }
            Err(e) => {
                self.apply(token, Err(e.clone()));
                Err(e)
            }
        }
    }

    /// Validate raw form input, then submit it. Validation failures return
    /// before the state changes and before any backend call.
    pub async fn submit_form<B>(
        &mut self,
        backend: &B,
        raw_requirements: &str,
        raw_assumptions: &str,
        raw_constraints: &str,
    ) -> Result<Arc<DesignDocument>>
    where
        B: DesignBackend + ?Sized,
    {
        let request = intake::build_request(raw_requirements, raw_assumptions, raw_constraints)?;
        self.submit(backend, Submission::Generate(request))
            .await
            .map_err(Error::from)
    }

    /// Show a document picked from history. No backend call; any
    /// outstanding submission is abandoned.
    pub fn select_document(&mut self, document: impl Into<Arc<DesignDocument>>) {
        if let Some(token) = self.tokens.abandon() {
            debug!(token = token.get(), "Selection supersedes outstanding submission");
        }
        self.current = Some(document.into());
        self.status = SessionStatus::Success;
    }

    /// Clear the error and fall back to whatever was displayed before.
    pub fn dismiss_error(&mut self) {
        if let SessionStatus::Error(_) = self.status {
            self.status = if self.current.is_some() {
                SessionStatus::Success
            } else {
                SessionStatus::Idle
            };
        }
    }
}

/// Run a submission against a session shared between tasks. The lock is
/// released while the backend call is in flight.
pub async fn drive<B>(session: &Mutex<GenerationSession>, backend: &B, submission: Submission) -> Resolution
where
    B: DesignBackend + ?Sized,
{
    let token = session.lock().await.begin(&submission);
    let result = submission.send(backend).await;
    session.lock().await.resolve(token, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::testing::{backend_error, document, generate, FakeBackend};

    #[tokio::test]
    async fn test_submit_success() {
        let backend = FakeBackend::new();
        backend.answer("Build a URL shortener", Ok(document("a", 1, None, 0)));

        let mut session = GenerationSession::new();
        assert_eq!(session.status(), &SessionStatus::Idle);

        let shown = session
            .submit_form(&backend, "Build a URL shortener", "{}", "")
            .await
            .unwrap();

        assert_eq!(session.status(), &SessionStatus::Success);
        assert_eq!(shown.version.get(), 1);
        assert!(shown.parent_id.is_none());
        assert!(Arc::ptr_eq(&shown, session.current().unwrap()));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_form_makes_no_call() {
        let backend = FakeBackend::new();
        let mut session = GenerationSession::new();

        let err = session
            .submit_form(&backend, "Build a URL shortener", "{bad json", "")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidAssumptionsJson(ref d)) if !d.is_empty()
        ));

        let err = session.submit_form(&backend, "   ", "", "").await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyRequirements)));

        assert_eq!(session.status(), &SessionStatus::Idle);
        assert!(session.current().is_none());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_form_keeps_previous_state() {
        let backend = FakeBackend::new();
        let mut session = GenerationSession::new();
        session.select_document(document("a", 1, None, 0));

        assert!(session.submit_form(&backend, "x", "{bad json", "").await.is_err());
        assert_eq!(session.status(), &SessionStatus::Success);
        assert_eq!(session.current().unwrap().id, "a");
    }

    #[tokio::test]
    async fn test_failure_keeps_current_document() {
        let backend = FakeBackend::new();
        backend.answer("first", Ok(document("a", 1, None, 0)));
        backend.answer("second", Err(backend_error("rate limited")));

        let mut session = GenerationSession::new();
        session.submit(&backend, generate("first").into()).await.unwrap();
        let err = session.submit(&backend, generate("second").into()).await.unwrap_err();

        assert_eq!(err.message, "rate limited");
        assert_eq!(session.status(), &SessionStatus::Error("rate limited".to_string()));
        assert_eq!(session.error(), Some("rate limited"));
        assert_eq!(session.current().unwrap().id, "a");
    }

    #[tokio::test]
    async fn test_dismiss_error_restores_display_state() {
        let backend = FakeBackend::new();
        backend.answer("x", Err(backend_error("boom")));
        backend.answer("y", Ok(document("b", 1, None, 0)));
        backend.answer("z", Err(backend_error("boom again")));

        let mut session = GenerationSession::new();
        let _ = session.submit(&backend, generate("x").into()).await;
        session.dismiss_error();
        assert_eq!(session.status(), &SessionStatus::Idle);

        session.submit(&backend, generate("y").into()).await.unwrap();
        let _ = session.submit(&backend, generate("z").into()).await;
        session.dismiss_error();
        assert_eq!(session.status(), &SessionStatus::Success);
        assert_eq!(session.current().unwrap().id, "b");

        session.dismiss_error();
        assert_eq!(session.status(), &SessionStatus::Success);
    }

    #[tokio::test]
    async fn test_new_submission_clears_error() {
        let backend = FakeBackend::new();
        backend.answer("x", Err(backend_error("boom")));

        let mut session = GenerationSession::new();
        let _ = session.submit(&backend, generate("x").into()).await;
        session.begin(&generate("again").into());
        assert!(session.is_loading());
        assert_eq!(session.error(), None);
    }

    #[test]
    fn test_select_document_is_idempotent() {
        let backend = FakeBackend::new();
        let chosen = Arc::new(document("a", 2, Some("root"), 5));

        let mut session = GenerationSession::new();
        session.select_document(Arc::clone(&chosen));
        session.select_document(Arc::clone(&chosen));

        assert_eq!(session.status(), &SessionStatus::Success);
        assert!(Arc::ptr_eq(session.current().unwrap(), &chosen));
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_select_document_overrides_error() {
        let mut session = GenerationSession::new();
        let token = session.begin(&generate("x").into());
        session.resolve(token, Err(backend_error("boom")));

        session.select_document(document("a", 1, None, 0));
        assert_eq!(session.status(), &SessionStatus::Success);
        assert_eq!(session.error(), None);
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut session = GenerationSession::new();
        let older = session.begin(&generate("first").into());
        let newer = session.begin(&generate("second").into());

        assert_eq!(session.resolve(newer, Ok(document("new", 1, None, 1))), Resolution::Applied);
        assert_eq!(session.resolve(older, Ok(document("old", 1, None, 0))), Resolution::Stale);
        assert_eq!(session.current().unwrap().id, "new");
        assert_eq!(session.status(), &SessionStatus::Success);
    }

    #[test]
    fn test_late_response_after_selection_discarded() {
        let mut session = GenerationSession::new();
        let token = session.begin(&generate("first").into());
        session.select_document(document("picked", 1, None, 0));

        assert_eq!(session.resolve(token, Err(backend_error("late"))), Resolution::Stale);
        assert_eq!(session.status(), &SessionStatus::Success);
        assert_eq!(session.current().unwrap().id, "picked");
    }

    #[tokio::test]
    async fn test_overlapping_drives_last_issued_wins() {
        let backend = FakeBackend::new();
        let release_first = backend.answer_gated("first", Ok(document("first", 1, None, 0)));
        let release_second = backend.answer_gated("second", Ok(document("second", 1, None, 1)));
        let shared = Mutex::new(GenerationSession::new());
        let session = &shared;

        let (first, second, ()) = tokio::join!(
            drive(&session, &backend, generate("first").into()),
            drive(&session, &backend, generate("second").into()),
            async move {
                release_second.send(()).unwrap();
                while session.lock().await.current().map(|d| d.id.clone()) != Some("second".to_string()) {
                    tokio::task::yield_now().await;
                }
                release_first.send(()).unwrap();
            }
        );

        assert_eq!(first, Resolution::Stale);
        assert_eq!(second, Resolution::Applied);
        let session = shared.lock().await;
        assert_eq!(session.current().unwrap().id, "second");
        assert_eq!(session.status(), &SessionStatus::Success);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_revision_submission() {
        let backend = FakeBackend::new();
        backend.answer("a", Ok(document("b", 2, Some("a"), 1)));

        let mut session = GenerationSession::new();
        session.select_document(document("a", 1, None, 0));
        let revision = intake::build_revision("a", "add a CDN").unwrap();
        let shown = session.submit(&backend, revision.into()).await.unwrap();

        assert_eq!(shown.parent_id.as_deref(), Some("a"));
        assert_eq!(shown.version.get(), 2);
        assert_eq!(session.current().unwrap().id, "b");
    }
}
