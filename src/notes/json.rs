//! Defensive JSON decoding of collaborator responses.

use axum::http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

use crate::notes::NotesError;

/// How much of a non-JSON body ends up in the error.
const BODY_PREVIEW_CHARS: usize = 200;

/// Decode a JSON response, refusing anything not labelled `application/json`.
pub async fn safe_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, NotesError> {
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !content_type.contains("application/json") {
        let body = response.text().await.unwrap_or_default();
        return Err(NotesError::NotJson {
            status,
            content_type,
            body: body.chars().take(BODY_PREVIEW_CHARS).collect(),
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|source| NotesError::Decode { status, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Created {
        #[serde(rename = "noteId")]
        note_id: String,
    }

    fn response(status: u16, content_type: &str, body: impl Into<String>) -> reqwest::Response {
        let body: String = body.into();
        axum::http::Response::builder()
            .status(status)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn decodes_json_body() {
        let created: Created = safe_json(response(200, "application/json; charset=utf-8", r#"{"noteId":"n1"}"#))
            .await
            .unwrap();
        assert_eq!(created.note_id, "n1");
    }

    #[tokio::test]
    async fn html_body_is_described() {
        let html = format!("<html>{}</html>", "x".repeat(500));
        let err = safe_json::<Created>(response(404, "text/html", html)).await.unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("Expected JSON, got 404 Not Found (text/html). Body: <html>"));
        match err {
            NotesError::NotJson { body, .. } => assert_eq!(body.chars().count(), 200),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn wrong_shape_is_decode_error() {
        let err = safe_json::<Created>(response(500, "application/json", r#"{"error":"boom"}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, NotesError::Decode { status, .. } if status.as_u16() == 500));
    }
}
