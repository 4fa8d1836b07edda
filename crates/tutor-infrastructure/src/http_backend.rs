//! HTTP client for the tutoring backend.

use crate::wire::{
    LessonResponse, NewSessionResponse, ProfileResponse, PromptRequest, error_detail,
    parse_history,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use std::time::Duration;
use tutor_core::backend::{AssistantReply, SessionHandle, TutorBackend};
use tutor_core::config::BackendConfig;
use tutor_core::profile::Profile;
use tutor_core::{Credential, RawTurn, Result, TutorError};

/// [`TutorBackend`] over the backend's JSON API.
///
/// Every request carries the caller's credential as a bearer token.
#[derive(Clone)]
pub struct HttpTutorBackend {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTutorBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.base_url.clone()).with_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Builds `{base}/chat/{session_id}/{action}` with the id encoded as a
    /// single path segment, so `/`, `?` and `#` in an id cannot reach other
    /// endpoints.
    fn session_url(
        &self,
        session_id: &str,
        action: &str,
        wrap: fn(String) -> TutorError,
    ) -> Result<Url> {
        if matches!(session_id.trim(), "" | "." | "..") {
            return Err(wrap(format!("invalid session id {session_id:?}")));
        }
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| wrap(format!("invalid backend URL {}: {err}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| wrap(format!("backend URL {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(["chat", session_id, action]);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        request
            .header("Authorization", credential.bearer())
            .timeout(self.timeout)
    }

    /// Sends `request` and returns the body of a successful response.
    ///
    /// `wrap` turns a failure message into the operation's error variant.
    async fn execute(
        &self,
        request: RequestBuilder,
        operation: &str,
        wrap: fn(String) -> TutorError,
    ) -> Result<String> {
        let response = request.send().await.map_err(|err| {
            tracing::error!("[HttpTutorBackend] {} request failed: {}", operation, err);
            wrap(format!("{operation} request failed: {err}"))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| wrap(format!("failed to read {operation} response: {err}")))?;

        if !status.is_success() {
            return Err(map_http_error(status, &body, operation, wrap));
        }
        Ok(body)
    }
}

fn map_http_error(
    status: StatusCode,
    body: &str,
    operation: &str,
    wrap: fn(String) -> TutorError,
) -> TutorError {
    let detail = error_detail(body);
    tracing::warn!(
        "[HttpTutorBackend] {} returned {}: {}",
        operation,
        status.as_u16(),
        detail
    );
    wrap(format!("{operation} failed with HTTP {}: {detail}", status.as_u16()))
}

#[async_trait]
impl TutorBackend for HttpTutorBackend {
    async fn create_session(&self, credential: &Credential) -> Result<SessionHandle> {
        let request = self.authorized(self.client.post(self.url("/chat/new")), credential);
        let body = self
            .execute(request, "create session", TutorError::SessionCreation)
            .await?;

        let response: NewSessionResponse = serde_json::from_str(&body).map_err(|err| {
            TutorError::session_creation(format!("unexpected create session response: {err}"))
        })?;
        if response.session_id.trim().is_empty() {
            return Err(TutorError::session_creation("backend returned an empty session id"));
        }

        tracing::info!("[HttpTutorBackend] Created session {}", response.session_id);
        Ok(response.into())
    }

    async fn send_message(
        &self,
        credential: &Credential,
        session_id: &str,
        prompt: &str,
    ) -> Result<AssistantReply> {
        let url = self.session_url(session_id, "message", TutorError::MessageSend)?;
        let request = self
            .authorized(self.client.post(url), credential)
            .json(&PromptRequest { prompt });
        let body = self
            .execute(request, "send message", TutorError::MessageSend)
            .await?;

        let lesson: LessonResponse = serde_json::from_str(&body).map_err(|err| {
            TutorError::message_send(format!("unexpected reply shape: {err}"))
        })?;
        Ok(lesson.into_reply(&self.base_url))
    }

    async fn fetch_history(
        &self,
        credential: &Credential,
        session_id: &str,
    ) -> Result<Vec<RawTurn>> {
        let url = self.session_url(session_id, "messages", TutorError::HistoryLoad)?;
        let request = self.authorized(self.client.get(url), credential);
        let body = self
            .execute(request, "fetch history", TutorError::HistoryLoad)
            .await?;

        let turns = parse_history(&body, &self.base_url)?;
        tracing::debug!(
            "[HttpTutorBackend] Fetched {} records for {}",
            turns.len(),
            session_id
        );
        Ok(turns)
    }

    async fn fetch_profile(&self, credential: &Credential) -> Result<Profile> {
        let request = self.authorized(self.client.get(self.url("/profile")), credential);
        let body = self
            .execute(request, "fetch profile", TutorError::HistoryLoad)
            .await?;

        let profile: ProfileResponse = serde_json::from_str(&body).map_err(|err| {
            TutorError::history_load(format!("unexpected profile response: {err}"))
        })?;
        Ok(profile.into())
    }
}
