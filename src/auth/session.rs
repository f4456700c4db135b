//! Session cookie codec.
//!
//! The session is stored as JSON in one cookie, or split across
//! `<name>.0`, `<name>.1`, ... when it outgrows a single cookie. Values are
//! either `base64-` followed by base64url, or percent-encoded JSON.

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;

const BASE64_PREFIX: &str = "base64-";

/// Largest value written into a single cookie.
pub const MAX_CHUNK_SIZE: usize = 3180;

/// Lifetime of written session cookies.
const COOKIE_MAX_AGE_DAYS: i64 = 400;

/// Session stored in the auth cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<serde_json::Value>,
    /// Provider fields we don't interpret but must write back intact.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Session {
    /// True when the access token expires within `margin_secs` of `now`.
    /// Sessions without an expiry are treated as current.
    pub fn expires_within(&self, margin_secs: u64, now_unix: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let margin = i64::try_from(margin_secs).unwrap_or(i64::MAX);
                expires_at <= now_unix.saturating_add(margin)
            }
            None => false,
        }
    }
}

/// A change to one cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieUpdate {
    Set { name: String, value: String },
    Remove { name: String },
}

impl CookieUpdate {
    pub fn name(&self) -> &str {
        match self {
            CookieUpdate::Set { name, .. } | CookieUpdate::Remove { name } => name,
        }
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_set_cookie(&self) -> String {
        let cookie = match self {
            CookieUpdate::Set { name, value } => Cookie::build((name.clone(), value.clone()))
                .path("/")
                .same_site(SameSite::Lax)
                .max_age(time::Duration::days(COOKIE_MAX_AGE_DAYS))
                .build(),
            CookieUpdate::Remove { name } => Cookie::build((name.clone(), String::new()))
                .path("/")
                .same_site(SameSite::Lax)
                .max_age(time::Duration::ZERO)
                .build(),
        };
        cookie.to_string()
    }
}

/// Request cookies exactly as sent, values still encoded.
///
/// Cookie jars percent-decode values, which would both double-decode the
/// session and mangle unrelated cookies when the header is rebuilt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCookies {
    pairs: Vec<(String, String)>,
}

impl RequestCookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let pairs = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        Self { pairs }
    }

    /// Raw value of the first cookie called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// The `Cookie` request header after applying updates. Cookies not named
    /// by an update keep their original bytes.
    pub fn rewrite(&self, updates: &[CookieUpdate]) -> String {
        let mut pairs: Vec<String> = self
            .pairs
            .iter()
            .filter(|(name, _)| !updates.iter().any(|u| u.name() == name))
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        for update in updates {
            if let CookieUpdate::Set { name, value } = update {
                pairs.push(format!("{}={}", name, value));
            }
        }
        pairs.join("; ")
    }
}

/// Names of the session cookies present, in chunk order.
pub fn session_cookie_names(cookies: &RequestCookies, name: &str) -> Vec<String> {
    let mut names = Vec::new();
    if cookies.get(name).is_some() {
        names.push(name.to_string());
    }
    let mut index = 0;
    loop {
        let chunk = format!("{}.{}", name, index);
        if cookies.get(&chunk).is_none() {
            break;
        }
        names.push(chunk);
        index += 1;
    }
    names
}

/// Reassemble the raw cookie value. An unchunked cookie wins over chunks.
pub fn read_session_value(cookies: &RequestCookies, name: &str) -> Option<String> {
    if let Some(value) = cookies.get(name) {
        return Some(value.to_string());
    }
    let mut value = String::new();
    let mut index = 0;
    while let Some(chunk) = cookies.get(&format!("{}.{}", name, index)) {
        value.push_str(chunk);
        index += 1;
    }
    if index == 0 {
        None
    } else {
        Some(value)
    }
}

/// Decode a raw cookie value into a session.
pub fn decode_session(raw: &str) -> Result<Session, AuthError> {
    let json = match raw.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => {
            let trimmed = encoded.trim_end_matches('=');
            let bytes = URL_SAFE_NO_PAD
                .decode(trimmed)
                .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
                .map_err(|e| AuthError::MalformedSession(e.to_string()))?;
            String::from_utf8(bytes).map_err(|e| AuthError::MalformedSession(e.to_string()))?
        }
        None => urlencoding::decode(raw)
            .map_err(|e| AuthError::MalformedSession(e.to_string()))?
            .into_owned(),
    };
    serde_json::from_str(&json).map_err(|e| AuthError::MalformedSession(e.to_string()))
}

/// Read and decode the session from the request cookies.
pub fn read_session(cookies: &RequestCookies, name: &str) -> Option<Result<Session, AuthError>> {
    read_session_value(cookies, name).map(|raw| decode_session(&raw))
}

/// Encode a session into cookie updates, removing chunks that are no longer used.
pub fn write_session(name: &str, session: &Session, existing: &[String]) -> Result<Vec<CookieUpdate>, AuthError> {
    let json = serde_json::to_string(session).map_err(|e| AuthError::MalformedSession(e.to_string()))?;
    let value = format!("{}{}", BASE64_PREFIX, URL_SAFE_NO_PAD.encode(json));

    let mut updates = Vec::new();
    if value.len() <= MAX_CHUNK_SIZE {
        updates.push(CookieUpdate::Set {
            name: name.to_string(),
            value,
        });
    } else {
        // base64 output is ASCII, so byte offsets are char boundaries.
        for (index, start) in (0..value.len()).step_by(MAX_CHUNK_SIZE).enumerate() {
            let end = (start + MAX_CHUNK_SIZE).min(value.len());
            updates.push(CookieUpdate::Set {
                name: format!("{}.{}", name, index),
                value: value[start..end].to_string(),
            });
        }
    }

    for old in existing {
        if !updates.iter().any(|u| u.name() == old) {
            updates.push(CookieUpdate::Remove { name: old.clone() });
        }
    }
    Ok(updates)
}

/// Updates that delete every existing session cookie.
pub fn clear_session(existing: &[String]) -> Vec<CookieUpdate> {
    existing
        .iter()
        .map(|name| CookieUpdate::Remove { name: name.clone() })
        .collect()
}
