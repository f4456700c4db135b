//! Response construction helpers.

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::CookieUpdate;

/// `307 Temporary Redirect` to a relative location.
pub fn redirect(location: &str) -> Response {
    Redirect::temporary(location).into_response()
}

/// Attach one `Set-Cookie` per update.
pub fn append_set_cookies(response: &mut Response, updates: &[CookieUpdate]) {
    for update in updates {
        match HeaderValue::from_str(&update.to_set_cookie()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(cookie = %update.name(), error = %e, "Skipping unrepresentable cookie"),
        }
    }
}
