//! Transport metadata extracted from each HTTP request.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use opentelemetry::propagation::Extractor;

use crate::telemetry::TraceContext;

/// Header map as a trace-context carrier.
struct HeaderCarrier<'a>(&'a HeaderMap);

impl Extractor for HeaderCarrier<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(axum::http::HeaderName::as_str).collect()
    }
}

/// Peer address, verb, URL, protocol and caller trace of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpInfo {
    /// `None` when the server was not started with connect info.
    pub remote_addr: Option<SocketAddr>,
    pub method: String,
    pub url: String,
    pub protocol: String,
    /// From the `traceparent` header, when the caller sent one.
    pub parent: Option<TraceContext>,
}

impl<S> FromRequestParts<S> for HttpInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self {
            remote_addr,
            method: parts.method.to_string(),
            url: parts.uri.to_string(),
            protocol: format!("{:?}", parts.version),
            parent: TraceContext::extract(&HeaderCarrier(&parts.headers)),
        })
    }
}
