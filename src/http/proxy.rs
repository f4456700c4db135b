//! Pass-through forwarding to the upstream application.
//!
//! # Responsibilities
//! - Rewrite the URI authority to the upstream, keeping path and query
//! - Strip hop-by-hop headers, add X-Forwarded-*
//! - Stream request and response bodies without buffering

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{
        header,
        uri::{Authority, Scheme},
        HeaderMap, HeaderName, HeaderValue, Request, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::UpstreamConfig;
use crate::error::GateError;
use crate::http::request::RequestIdExt;

const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
];

static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
static X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// The upstream every pass-through request goes to.
#[derive(Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

impl Upstream {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, GateError> {
        let authority = Authority::from_str(&config.address)
            .map_err(|e| GateError::Upstream(format!("invalid upstream address '{}': {}", config.address, e)))?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self { client, authority })
    }

    /// Forward a request and return the upstream's response as-is.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response, GateError> {
        let request_id = request.request_id().unwrap_or("unknown").to_string();
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let (mut parts, body) = request.into_parts();

        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(self.authority.clone());
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some("/".parse().map_err(|_| GateError::Upstream("bad path".into()))?);
        }
        parts.uri = Uri::from_parts(uri_parts).map_err(|e| GateError::Upstream(e.to_string()))?;

        strip_hop_by_hop(&mut parts.headers);
        add_forwarded_headers(&mut parts.headers, peer);

        tracing::debug!(
            request_id = %request_id,
            method = %parts.method,
            uri = %parts.uri,
            "Forwarding to upstream"
        );

        let response = self
            .client
            .request(Request::from_parts(parts, body))
            .await
            .map_err(|e| GateError::Upstream(e.to_string()))?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn add_forwarded_headers(headers: &mut HeaderMap, peer: Option<std::net::IpAddr>) {
    if let Some(ip) = peer {
        let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{}, {}", existing, ip),
            None => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(X_FORWARDED_FOR.clone(), value);
        }
    }
    if let Some(host) = headers.get(header::HOST).cloned() {
        headers.insert(X_FORWARDED_HOST.clone(), host);
    }
    headers.insert(X_FORWARDED_PROTO.clone(), HeaderValue::from_static("http"));
}

/// Swappable upstream, shared with the reload task.
pub type UpstreamHandle = Arc<ArcSwap<Upstream>>;

/// Catch-all handler: everything the gate lets through lands here.
pub async fn proxy_handler(State(upstream): State<UpstreamHandle>, request: Request<Body>) -> Response {
    let upstream = upstream.load_full();
    match upstream.forward(request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
