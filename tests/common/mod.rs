//! Shared utilities for gateway integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use token_proxy::config::validation::validate;
use token_proxy::config::{ProviderType, Settings};
use token_proxy::http::GatewayServer;
use token_proxy::lifecycle::Shutdown;
use token_proxy::net::build_client;
use token_proxy::oidc::{shared, HttpDiscovery, ProviderConfigSource};

pub const CLIENT_ID: &str = "token-proxy";
pub const SIGNING_KEY: &str = include_str!("../fixtures/signing_key.pem");
pub const ROGUE_KEY: &str = include_str!("../fixtures/rogue_key.pem");
const JWKS: &str = include_str!("../fixtures/jwks.json");

/// A running gateway wired to a mock identity provider and a mock backend.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub idp: MockServer,
    pub backend: MockServer,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    pub fn issuer(&self) -> String {
        self.idp.uri()
    }

    /// Sign a client token the gateway will accept.
    pub fn valid_token(&self) -> String {
        sign_token(SIGNING_KEY, &self.issuer())
    }

    pub fn broker_path(&self, alias: &str) -> String {
        format!("/broker/{alias}/token")
    }

    /// Requests the backend has received so far.
    pub async fn backend_requests(&self) -> Vec<Request> {
        self.backend.received_requests().await.unwrap_or_default()
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start an identity provider, a backend and the gateway in front of it.
pub async fn start_gateway(kind: ProviderType, require_credential: bool) -> TestGateway {
    let idp = start_identity_provider().await;
    let backend = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_string("backend ok"))
        .mount(&backend)
        .await;

    let settings = Settings {
        listen: Some("127.0.0.1:0".into()),
        issuer_url: Some(idp.uri()),
        proxy_url: Some(backend.uri()),
        client_id: Some(CLIENT_ID.into()),
        provider_alias: Some(alias(kind).into()),
        provider_type: Some(kind.as_str().into()),
        identity_server_url: Some(format!("{}/", idp.uri())),
        upstream_auth_timeout: Some("5s".into()),
        require_credential: Some(require_credential),
        ..Settings::default()
    };
    let config = validate(&settings).expect("test settings are valid");

    let client = build_client(&config.outbound).expect("client builds");
    let discovery = HttpDiscovery::new(client.clone(), config.provider.issuer.clone());
    let provider_config = shared(discovery.fetch().await.expect("discovery succeeds"));

    let server = GatewayServer::new(&config, client, provider_config).expect("server builds");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.serve(listener, rx).await;
    });

    TestGateway {
        addr,
        idp,
        backend,
        shutdown,
    }
}

pub fn alias(kind: ProviderType) -> &'static str {
    match kind {
        ProviderType::Openshift => "openshift-v3",
        ProviderType::Github => "github",
    }
}

async fn start_identity_provider() -> MockServer {
    let idp = MockServer::start().await;
    let issuer = idp.uri();

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": issuer,
            "jwks_uri": format!("{issuer}/certs"),
            "id_token_signing_alg_values_supported": ["RS256"],
        })))
        .mount(&idp)
        .await;

    Mock::given(method("GET"))
        .and(path("/certs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(JWKS))
        .mount(&idp)
        .await;

    idp
}

pub fn sign_token(pem: &str, issuer: &str) -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    let claims = json!({
        "iss": issuer,
        "sub": "f3b1c0de",
        "aud": CLIENT_ID,
        "iat": now,
        "exp": now + 300,
        "preferred_username": "alice",
    });
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some("test-key".into());
    encode(&header, &claims, &EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap()).unwrap()
}

pub fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// The Authorization header of a recorded request, if any.
pub fn authorization(request: &Request) -> Option<String> {
    request
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
