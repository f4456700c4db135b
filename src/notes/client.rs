//! HTTP client for the notes API routes.

use async_trait::async_trait;
use axum::http::header::{ACCEPT, CONTENT_TYPE, COOKIE};
use serde::Deserialize;

use crate::config::NotesConfig;
use crate::http::request::X_REQUEST_ID;
use crate::notes::{safe_json, CallContext, NotesApi, NotesError};

#[derive(Debug, Deserialize)]
struct NewestNote {
    #[serde(rename = "newestNoteId", default)]
    newest_note_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedNote {
    #[serde(rename = "noteId")]
    note_id: String,
}

#[derive(Debug, Clone)]
pub struct HttpNotesApi {
    client: reqwest::Client,
    fetch_newest_url: String,
    create_url: String,
}

impl HttpNotesApi {
    /// `base_url` is used when the config does not name one (normally the upstream).
    pub fn new(client: reqwest::Client, config: &NotesConfig, base_url: &str) -> Self {
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(base_url)
            .trim_end_matches('/')
            .to_string();
        Self {
            client,
            fetch_newest_url: format!("{}{}", base, config.fetch_newest_path),
            create_url: format!("{}{}", base, config.create_path),
        }
    }

    fn with_context(&self, mut builder: reqwest::RequestBuilder, ctx: &CallContext) -> reqwest::RequestBuilder {
        builder = builder.header(ACCEPT, "application/json");
        if let Some(cookie) = &ctx.cookie {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(id) = &ctx.request_id {
            builder = builder.header(X_REQUEST_ID, id);
        }
        builder
    }
}

#[async_trait]
impl NotesApi for HttpNotesApi {
    async fn fetch_newest(&self, user_id: &str, ctx: &CallContext) -> Result<Option<String>, NotesError> {
        let request = self
            .client
            .get(&self.fetch_newest_url)
            .query(&[("userId", user_id)]);
        let response = self.with_context(request, ctx).send().await?;

        let newest: NewestNote = safe_json(response).await?;
        Ok(newest.newest_note_id.filter(|id| !id.is_empty()))
    }

    async fn create(&self, user_id: &str, ctx: &CallContext) -> Result<String, NotesError> {
        let request = self
            .client
            .post(&self.create_url)
            .query(&[("userId", user_id)])
            .header(CONTENT_TYPE, "application/json");
        let response = self.with_context(request, ctx).send().await?;

        let created: CreatedNote = safe_json(response).await?;
        Ok(created.note_id)
    }
}
