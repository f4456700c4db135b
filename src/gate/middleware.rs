//! Gate middleware.
//! Enforces sign-in on gated paths and lands signed-in users on a note.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{AuthenticatedUser, RequestCookies};
use crate::error::GateError;
use crate::gate::{Gate, GateHandle, GatePlan};
use crate::http::request::RequestIdExt;
use crate::http::response::{append_set_cookies, redirect};
use crate::notes::CallContext;
use crate::observability::metrics;

pub async fn gate_middleware(
    State(handle): State<GateHandle>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let gate = handle.load();
    let path = req.uri().path().to_string();

    if !gate.scope.is_gated(&path) {
        return next.run(req).await;
    }

    let start = Instant::now();
    let request_id = req.request_id().map(str::to_owned);
    let cookies = RequestCookies::from_headers(req.headers());

    // 1. Who is this?
    let resolution = gate.auth.resolve(&cookies).await;
    let cookie_updates = resolution.cookie_updates;
    let user = resolution.user;

    // 2. Refreshed cookies replace the stale ones for everything downstream
    if !cookie_updates.is_empty() {
        let rewritten = cookies.rewrite(&cookie_updates);
        if rewritten.is_empty() {
            req.headers_mut().remove(header::COOKIE);
        } else if let Ok(value) = HeaderValue::from_str(&rewritten) {
            req.headers_mut().insert(header::COOKIE, value);
        }
    }

    let query = req.uri().query().map(str::to_owned);
    let plan = gate.rules.plan(&path, query.as_deref(), user.as_ref());
    let label = plan.label();

    tracing::debug!(
        request_id = ?request_id,
        path = %path,
        user_id = ?user.as_ref().map(|u| u.id.as_str()),
        decision = label,
        "Gate decision"
    );

    let (decision, mut response) = match plan {
        GatePlan::RedirectToLanding(location)
        | GatePlan::RedirectToLogin(location)
        | GatePlan::Canonicalize(location) => (label, redirect(&location)),
        GatePlan::AttachNote(user) => {
            let ctx = CallContext {
                cookie: req
                    .headers()
                    .get(header::COOKIE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned),
                request_id: request_id.clone(),
            };
            match attach_note(&gate, user, &ctx).await {
                Ok((decision, location)) => (decision, redirect(&location)),
                Err(e) => ("attach_failed", e.into_response()),
            }
        }
        GatePlan::PassThrough => {
            if let Some(user) = user.clone() {
                req.extensions_mut().insert(user);
            }
            ("pass_through", next.run(req).await)
        }
    };

    append_set_cookies(&mut response, &cookie_updates);
    metrics::record_decision(decision, start);
    response
}

/// Redirect target for a signed-in user without a note id: their newest note,
/// or a freshly created one.
async fn attach_note(
    gate: &Gate,
    user: &AuthenticatedUser,
    ctx: &CallContext,
) -> Result<(&'static str, String), GateError> {
    match gate.notes.fetch_newest(&user.id, ctx).await {
        Ok(Some(note_id)) => return Ok(("attach_existing", gate.rules.note_location(&note_id))),
        Ok(None) => {}
        Err(e) => {
            tracing::debug!(user_id = %user.id, error = %e, "Newest note lookup failed, creating one");
            metrics::record_collaborator_error("fetch_newest");
        }
    }

    let note_id = gate.notes.create(&user.id, ctx).await.map_err(|e| {
        metrics::record_collaborator_error("create");
        e
    })?;
    tracing::info!(user_id = %user.id, note_id = %note_id, "Created note for user");
    Ok(("attach_created", gate.rules.note_location(&note_id)))
}
