//! Shared harness: mock auth service, mock notes app, and a running gate.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use note_gate::config::GateConfig;
use note_gate::{HttpServer, Shutdown};

pub const COOKIE_NAME: &str = "sb-test-auth-token";

/// Users the mock app knows about.
pub const USER_WITH_NOTE: &str = "u-existing";
pub const USER_WITHOUT_NOTE: &str = "u-empty";
pub const USER_BROKEN_LOOKUP: &str = "u-broken";
pub const USER_BROKEN_CREATE: &str = "u-nocreate";

/// Bind an ephemeral loopback port and serve `app` on it.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Mock auth service.
///
/// Access tokens of the form `valid-<user id>` are accepted. The refresh
/// token `good-refresh` is exchanged for `valid-<user>` + `rotated`;
/// `flaky-refresh` gets a 503, anything else a 400.
pub async fn start_mock_auth(refreshed_user: &'static str) -> SocketAddr {
    async fn user(headers: HeaderMap) -> Response {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or_default();
        if headers.get("apikey").is_none() {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        match token.strip_prefix("valid-") {
            Some(id) => Json(json!({ "id": id, "email": format!("{id}@example.com") })).into_response(),
            None => (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "invalid JWT" }))).into_response(),
        }
    }

    #[derive(Deserialize)]
    struct RefreshBody {
        refresh_token: String,
    }

    let app = Router::new()
        .route("/auth/v1/user", get(user))
        .route(
            "/auth/v1/token",
            post(move |Json(body): Json<RefreshBody>| async move {
                if body.refresh_token == "good-refresh" {
                    Json(json!({
                        "access_token": format!("valid-{refreshed_user}"),
                        "refresh_token": "rotated",
                        "expires_in": 3600,
                        "token_type": "bearer",
                        "user": { "id": refreshed_user }
                    }))
                    .into_response()
                } else if body.refresh_token == "flaky-refresh" {
                    (StatusCode::SERVICE_UNAVAILABLE, "auth is down").into_response()
                } else {
                    (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" }))).into_response()
                }
            }),
        );
    serve(app).await
}

/// What the mock notes app observed.
#[derive(Default)]
pub struct AppLog {
    pub creates: AtomicUsize,
    pub api_cookies: Mutex<Vec<String>>,
}

#[derive(Deserialize)]
struct UserQuery {
    #[serde(rename = "userId")]
    user_id: String,
}

fn record_cookie(log: &AppLog, headers: &HeaderMap) {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    log.api_cookies.lock().unwrap().push(cookie);
}

/// Mock upstream app: the two notes API routes plus an echo fallback.
pub async fn start_mock_app(log: Arc<AppLog>) -> SocketAddr {
    async fn newest(State(log): State<Arc<AppLog>>, headers: HeaderMap, Query(q): Query<UserQuery>) -> Response {
        record_cookie(&log, &headers);
        match q.user_id.as_str() {
            USER_WITH_NOTE => Json(json!({ "newestNoteId": "n-42" })).into_response(),
            USER_BROKEN_LOOKUP => (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/html")],
                "<html>oops</html>",
            )
                .into_response(),
            _ => Json(json!({ "newestNoteId": null })).into_response(),
        }
    }

    async fn create(State(log): State<Arc<AppLog>>, headers: HeaderMap, Query(q): Query<UserQuery>) -> Response {
        record_cookie(&log, &headers);
        log.creates.fetch_add(1, Ordering::SeqCst);
        if q.user_id == USER_BROKEN_CREATE {
            return (StatusCode::BAD_GATEWAY, [(header::CONTENT_TYPE, "text/plain")], "upstream down").into_response();
        }
        Json(json!({ "noteId": format!("new-{}", q.user_id) })).into_response()
    }

    async fn echo(headers: HeaderMap, uri: Uri) -> String {
        let cookie = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        format!("upstream {} cookie={}", uri, cookie)
    }

    let app = Router::new()
        .route("/api/fetch-newest-note", get(newest))
        .route("/api/create-new-note", post(create))
        .fallback(echo)
        .with_state(log);
    serve(app).await
}

/// A running gate in front of the mock app.
pub struct Harness {
    pub gate_addr: SocketAddr,
    pub app_log: Arc<AppLog>,
    pub shutdown: Shutdown,
    pub client: reqwest::Client,
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with_refresh_user(USER_WITH_NOTE).await
    }

    pub async fn start_with_refresh_user(refreshed_user: &'static str) -> Self {
        Self::start_with(refreshed_user, |_| {}).await
    }

    /// Start with the mocks wired in, then let `adjust` override the config.
    pub async fn start_with<F>(refreshed_user: &'static str, adjust: F) -> Self
    where
        F: FnOnce(&mut GateConfig),
    {
        let auth_addr = start_mock_auth(refreshed_user).await;
        let app_log = Arc::new(AppLog::default());
        let app_addr = start_mock_app(app_log.clone()).await;

        let mut config = GateConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.upstream.address = app_addr.to_string();
        config.auth.url = format!("http://{}", auth_addr);
        config.auth.anon_key = "anon".into();
        config.auth.cookie_name = Some(COOKIE_NAME.into());
        adjust(&mut config);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let gate_addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let (_updates_tx, updates) = mpsc::unbounded_channel();
        let server = HttpServer::new(config).unwrap();
        let server_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, updates, server_shutdown).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .unwrap();

        Self {
            gate_addr,
            app_log,
            shutdown,
            client,
        }
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.gate_addr, path_and_query)
    }

    pub async fn get(&self, path_and_query: &str, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path_and_query));
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        request.send().await.expect("gate unreachable")
    }
}

/// Session cookie for `user_id` with a long-lived access token.
pub fn session_cookie(user_id: &str) -> String {
    session_cookie_with(&format!("valid-{user_id}"), "unused-refresh", far_future())
}

/// Session cookie with explicit tokens and expiry.
pub fn session_cookie_with(access_token: &str, refresh_token: &str, expires_at: i64) -> String {
    let session = json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_at": expires_at,
        "token_type": "bearer",
    });
    format!("{}=base64-{}", COOKIE_NAME, URL_SAFE_NO_PAD.encode(session.to_string()))
}

/// The same session split across `<name>.0` and `<name>.1`.
pub fn chunked_session_cookie(user_id: &str) -> String {
    let whole = session_cookie(user_id);
    let value = whole.split_once('=').map(|(_, v)| v).unwrap();
    let (first, second) = value.split_at(value.len() / 2);
    format!("{COOKIE_NAME}.0={first}; {COOKIE_NAME}.1={second}")
}

/// A loopback address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn far_future() -> i64 {
    4_102_444_800 // 2100-01-01
}

pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
