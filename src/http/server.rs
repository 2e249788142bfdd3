//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (sensitive headers, request ID, tracing)
//! - Authenticate each request and rewrite its credential
//! - Forward to the proxy destination
//! - Serve over plain TCP or rustls with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    trace::TraceLayer,
};

use crate::auth::{Authentication, Authenticator};
use crate::config::GatewayConfig;
use crate::http::forward::Forwarder;
use crate::http::request::{request_id, UuidRequestId};
use crate::http::rewrite::apply_credential;
use crate::observability::metrics;
use crate::oidc::SharedProviderConfig;

/// Grace period for in-flight TLS connections after shutdown starts.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid identity server URL: {0}")]
    IdentityServerUrl(#[from] url::ParseError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the token-translating gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(
        config: &GatewayConfig,
        client: reqwest::Client,
        provider_config: SharedProviderConfig,
    ) -> Result<Self, ServerError> {
        let authenticator = Authenticator::from_config(config, client.clone(), provider_config)?;
        let forwarder = Forwarder::new(
            client,
            config.proxy_url.clone(),
            config.listener.tls.is_some(),
        );

        let state = AppState {
            authenticator: Arc::new(authenticator),
            forwarder: Arc::new(forwarder),
        };

        Ok(Self {
            router: Self::build_router(state),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetSensitiveRequestHeadersLayer::new([
                header::AUTHORIZATION,
                header::PROXY_AUTHORIZATION,
                header::COOKIE,
            ]))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id());

        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(middleware)
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve plain HTTP on an already-bound listener until shutdown fires.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until shutdown fires.
    pub async fn serve_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Catch-all handler: authenticate, rewrite the credential, forward.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (mut parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        path = %parts.uri.path(),
        "Proxying request"
    );

    let authentication = match state
        .authenticator
        .authenticate(parts.uri.path(), &parts.headers)
        .await
    {
        Ok(authentication) => authentication,
        Err(e) => {
            tracing::warn!(request_id = %request_id, kind = e.kind(), error = %e, "Request rejected");
            metrics::record_request("rejected");
            return e.into_response();
        }
    };

    if let Err(e) = apply_credential(&mut parts.headers, &authentication) {
        tracing::warn!(request_id = %request_id, kind = e.kind(), "Request rejected");
        metrics::record_request("rejected");
        return e.into_response();
    }

    metrics::record_request(match authentication {
        Authentication::Anonymous => "passthrough",
        Authentication::Authenticated(_) => "authenticated",
    });

    state.forwarder.forward(parts, body, client_addr).await
}
