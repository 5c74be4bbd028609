use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, Response,
};
use shared::{
    domain::{Coordinates, Memo, MemoId},
    protocol::{CreateMemoDraft, ListMemosQuery, MemosResponse, UpdateLocationRequest},
};
use tracing::{debug, warn};
use url::Url;

pub mod audio;
pub mod error;
pub mod sync;

pub use audio::{silent_placeholder, PlaceholderAudio};
pub use error::SyncError;
pub use sync::{MemoSnapshot, Mutation, SyncCoordinator, DEFAULT_LOAD_LIMIT, FRESHNESS_WINDOW};

/// Remote memo collection. Transport, auth and timeouts belong to the implementation.
#[async_trait]
pub trait MemoStore: Send + Sync {
    async fn list_memos(&self, query: &ListMemosQuery) -> Result<MemosResponse, SyncError>;
    async fn get_memo(&self, memo_id: &MemoId) -> Result<Memo, SyncError>;
    async fn create_memo(&self, draft: &CreateMemoDraft) -> Result<Memo, SyncError>;
    async fn update_location(
        &self,
        memo_id: &MemoId,
        position: Coordinates,
    ) -> Result<Memo, SyncError>;
    async fn delete_memo(&self, memo_id: &MemoId) -> Result<(), SyncError>;
}

pub struct HttpMemoStore {
    http: Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl HttpMemoStore {
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, SyncError> {
        let parsed = Url::parse(base_url.trim()).map_err(|e| SyncError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(SyncError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "url cannot carry a path".to_string(),
            });
        }
        Ok(Self {
            http,
            base_url: parsed,
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| SyncError::InvalidBaseUrl {
                    url: self.base_url.to_string(),
                    reason: "url cannot carry a path".to_string(),
                })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SyncError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = SyncError::from_response_body(status.as_u16(), &body);
        warn!(status = status.as_u16(), "memo store rejected request: {err}");
        Err(err)
    }

    fn creation_form(draft: &CreateMemoDraft) -> Result<Form, SyncError> {
        let audio = silent_placeholder();
        let part = Part::bytes(audio.bytes)
            .file_name(audio.file_name)
            .mime_str(audio.mime_type)?;
        let mut form = Form::new()
            .part("audio", part)
            .text("text", draft.text.clone())
            .text("duration_seconds", audio.duration_seconds.to_string())
            .text("latitude", draft.position.latitude.to_string())
            .text("longitude", draft.position.longitude.to_string());
        if let Some(title) = &draft.title {
            form = form.text("title", title.clone());
        }
        if let Some(park_name) = &draft.park_name {
            form = form.text("park_name", park_name.clone());
        }
        Ok(form)
    }
}

#[async_trait]
impl MemoStore for HttpMemoStore {
    async fn list_memos(&self, query: &ListMemosQuery) -> Result<MemosResponse, SyncError> {
        let url = self.endpoint(&["memos"])?;
        debug!(limit = query.limit, "fetching memo collection");
        let response = self.send(self.http.get(url).query(query)).await?;
        Ok(response.json().await?)
    }

    async fn get_memo(&self, memo_id: &MemoId) -> Result<Memo, SyncError> {
        let url = self.endpoint(&["memos", memo_id.as_str()])?;
        let response = self.send(self.http.get(url)).await?;
        Ok(response.json().await?)
    }

    async fn create_memo(&self, draft: &CreateMemoDraft) -> Result<Memo, SyncError> {
        let url = self.endpoint(&["memos"])?;
        let form = Self::creation_form(draft)?;
        debug!(
            latitude = draft.position.latitude,
            longitude = draft.position.longitude,
            "submitting memo"
        );
        let response = self.send(self.http.post(url).multipart(form)).await?;
        Ok(response.json().await?)
    }

    async fn update_location(
        &self,
        memo_id: &MemoId,
        position: Coordinates,
    ) -> Result<Memo, SyncError> {
        let url = self.endpoint(&["memos", memo_id.as_str()])?;
        debug!(memo_id = %memo_id, "updating memo location");
        let response = self
            .send(
                self.http
                    .put(url)
                    .json(&UpdateLocationRequest::from(position)),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn delete_memo(&self, memo_id: &MemoId) -> Result<(), SyncError> {
        let url = self.endpoint(&["memos", memo_id.as_str()])?;
        debug!(memo_id = %memo_id, "deleting memo");
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
