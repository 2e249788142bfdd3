//! Upstream forwarding.
//!
//! # Responsibilities
//! - Send the rewritten request to the proxy destination
//! - Stream request and response bodies without buffering
//! - Strip hop-by-hop headers in both directions
//! - Record the client in `X-Forwarded-*` headers
//!
//! # Design Decisions
//! - Redirects are relayed to the client, never followed
//! - Transport failures map to 502 Bad Gateway

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::header::{self, HeaderName};
use axum::http::{request, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::TryStreamExt;
use url::Url;

use crate::http::rewrite::target_url;
use crate::observability::metrics;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Forwards requests to the fixed proxy destination.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    proxy_url: Url,
    inbound_scheme: &'static str,
}

impl Forwarder {
    pub fn new(client: reqwest::Client, proxy_url: Url, inbound_tls: bool) -> Self {
        Self {
            client,
            proxy_url,
            inbound_scheme: if inbound_tls { "https" } else { "http" },
        }
    }

    pub async fn forward(
        &self,
        parts: request::Parts,
        body: Body,
        client_addr: Option<SocketAddr>,
    ) -> Response {
        let url = target_url(&self.proxy_url, &parts.uri);
        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        let original_host = headers.remove(header::HOST);
        self.add_forwarded_headers(&mut headers, original_host, client_addr);

        tracing::debug!(method = %parts.method, target = %url, "Forwarding request");

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(reqwest::Body::wrap_stream(body.into_data_stream()))
            .send()
            .await;

        match upstream {
            Ok(upstream) => {
                let status = upstream.status();
                metrics::record_upstream(status.as_u16());

                let mut headers = upstream.headers().clone();
                strip_hop_by_hop(&mut headers);

                let stream = upstream.bytes_stream().map_err(axum::Error::new);
                let mut response = Response::new(Body::from_stream(stream));
                *response.status_mut() = status;
                *response.headers_mut() = headers;
                response
            }
            Err(e) => {
                tracing::error!(error = %e, "Upstream error");
                metrics::record_upstream(StatusCode::BAD_GATEWAY.as_u16());
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }

    fn add_forwarded_headers(
        &self,
        headers: &mut HeaderMap,
        original_host: Option<HeaderValue>,
        client_addr: Option<SocketAddr>,
    ) {
        if let Some(addr) = client_addr {
            let forwarded_for = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
                Some(existing) => format!("{existing}, {}", addr.ip()),
                None => addr.ip().to_string(),
            };
            if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
                headers.insert(X_FORWARDED_FOR, value);
            }
        }
        if let Some(host) = original_host {
            headers.insert(X_FORWARDED_HOST, host);
        }
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static(self.inbound_scheme));
    }
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-trace-hop"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-trace-hop", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/x-git-upload-pack-request"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::CONTENT_TYPE));
    }

    #[test]
    fn test_forwarded_headers() {
        let forwarder = Forwarder::new(
            reqwest::Client::new(),
            Url::parse("http://backend.internal").unwrap(),
            true,
        );
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.7"));

        forwarder.add_forwarded_headers(
            &mut headers,
            Some(HeaderValue::from_static("gateway.example.com")),
            Some("198.51.100.2:51234".parse().unwrap()),
        );

        assert_eq!(headers.get(X_FORWARDED_FOR).unwrap(), "203.0.113.7, 198.51.100.2");
        assert_eq!(headers.get(X_FORWARDED_HOST).unwrap(), "gateway.example.com");
        assert_eq!(headers.get(X_FORWARDED_PROTO).unwrap(), "https");
    }
}
