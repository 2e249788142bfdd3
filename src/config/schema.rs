//! Configuration schema definitions.
//!
//! Two layers live here:
//! - [`Settings`]: the loose shape read from a TOML file and from command-line
//!   flags. Every field is optional so the two sources can be layered.
//! - [`GatewayConfig`]: the validated, typed configuration built once at
//!   startup and shared read-only with every subsystem.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Well-known path of the OpenID Connect discovery document.
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Identity server used to resolve GitHub logins when no override is given.
pub const DEFAULT_IDENTITY_SERVER_URL: &str = "https://api.github.com/";

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_RETRY_INTERVAL: &str = "10s";
pub const DEFAULT_RETRY_MAX: i64 = -1;
pub const DEFAULT_SYNC_INTERVAL: &str = "5m";
pub const DEFAULT_UPSTREAM_AUTH_TIMEOUT: &str = "30s";

/// Unvalidated settings, as read from a config file or the command line.
///
/// Durations are kept as strings (`"10s"`, `"5m"`) and parsed during
/// validation so that file and flag errors are reported the same way.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub listen: Option<String>,
    pub issuer_url: Option<String>,
    pub proxy_url: Option<String>,
    pub client_id: Option<String>,
    pub provider_alias: Option<String>,
    pub provider_type: Option<String>,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
    pub ca_certs: Vec<PathBuf>,
    pub insecure_skip_verify: Option<bool>,
    pub identity_server_url: Option<String>,
    pub provider_config_retry_interval: Option<String>,
    pub provider_config_retry_max: Option<i64>,
    pub provider_config_sync_interval: Option<String>,
    pub upstream_auth_timeout: Option<String>,
    pub require_credential: Option<bool>,
    pub verbose: Option<bool>,
    pub log_json: Option<bool>,
    pub metrics_address: Option<String>,
}

impl Settings {
    /// Layer `overrides` on top of `self`. Values present in `overrides` win;
    /// CA certificate lists are concatenated.
    pub fn merge(self, overrides: Settings) -> Settings {
        let mut ca_certs = self.ca_certs;
        ca_certs.extend(overrides.ca_certs);

        Settings {
            listen: overrides.listen.or(self.listen),
            issuer_url: overrides.issuer_url.or(self.issuer_url),
            proxy_url: overrides.proxy_url.or(self.proxy_url),
            client_id: overrides.client_id.or(self.client_id),
            provider_alias: overrides.provider_alias.or(self.provider_alias),
            provider_type: overrides.provider_type.or(self.provider_type),
            tls_cert: overrides.tls_cert.or(self.tls_cert),
            tls_key: overrides.tls_key.or(self.tls_key),
            ca_certs,
            insecure_skip_verify: overrides.insecure_skip_verify.or(self.insecure_skip_verify),
            identity_server_url: overrides.identity_server_url.or(self.identity_server_url),
            provider_config_retry_interval: overrides
                .provider_config_retry_interval
                .or(self.provider_config_retry_interval),
            provider_config_retry_max: overrides
                .provider_config_retry_max
                .or(self.provider_config_retry_max),
            provider_config_sync_interval: overrides
                .provider_config_sync_interval
                .or(self.provider_config_sync_interval),
            upstream_auth_timeout: overrides.upstream_auth_timeout.or(self.upstream_auth_timeout),
            require_credential: overrides.require_credential.or(self.require_credential),
            verbose: overrides.verbose.or(self.verbose),
            log_json: overrides.log_json.or(self.log_json),
            metrics_address: overrides.metrics_address.or(self.metrics_address),
        }
    }
}

/// Root configuration for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Identity provider the client tokens are issued by.
    pub provider: ProviderSettings,

    /// Fixed destination every request is forwarded to.
    pub proxy_url: Url,

    /// Outbound HTTP client settings.
    pub outbound: OutboundConfig,

    /// Provider config bootstrap retry policy.
    pub bootstrap: RetryPolicy,

    /// Reject requests that carry no credential instead of passing them through.
    pub require_credential: bool,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: SocketAddr,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Identity provider settings.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Issuer URL with the discovery path and trailing slash removed.
    pub issuer: String,

    /// OIDC client identifier tokens must be issued to.
    pub client_id: String,

    /// Broker alias used to build the token exchange URL.
    pub alias: String,

    /// Backend flavour behind the broker.
    pub kind: ProviderType,

    /// Base URL of the identity server used to resolve GitHub logins.
    pub identity_server_url: Url,

    /// Cadence of the background provider config refresh.
    pub sync_interval: Duration,
}

impl ProviderSettings {
    /// URL of the broker endpoint that hands out backend tokens.
    pub fn broker_token_url(&self) -> String {
        format!("{}/broker/{}/token", self.issuer, self.alias)
    }

    /// URL of the provider's discovery document.
    pub fn discovery_url(&self) -> String {
        format!("{}{}", self.issuer, DISCOVERY_PATH)
    }
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone)]
pub struct OutboundConfig {
    /// Extra PEM bundles trusted in addition to the system roots.
    pub ca_certs: Vec<PathBuf>,

    /// Accept any server certificate. Testing only.
    pub insecure_skip_verify: bool,

    /// Deadline for the broker exchange and identity resolution calls.
    pub auth_timeout: Duration,
}

/// Observability configuration.
#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    /// Lower the default log level to debug.
    pub verbose: bool,

    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,

    /// Prometheus listener address; metrics are disabled when unset.
    pub metrics_address: Option<SocketAddr>,
}

/// Retry policy for the provider config bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between attempts.
    pub interval: Duration,

    /// Retries allowed after the first attempt; `None` retries forever.
    pub max_retries: Option<u32>,
}

impl RetryPolicy {
    /// Build a policy from the flag form, where a negative maximum means unlimited.
    pub fn new(interval: Duration, max_retries: i64) -> Self {
        let max_retries = if max_retries < 0 {
            None
        } else {
            Some(u32::try_from(max_retries).unwrap_or(u32::MAX))
        };
        Self {
            interval,
            max_retries,
        }
    }

    /// Whether another attempt is allowed after `retries` retries have run.
    pub fn allows_retry(&self, retries: u32) -> bool {
        self.max_retries.map_or(true, |max| retries < max)
    }
}

/// Backend flavour behind the identity provider's broker.
///
/// Every provider-dependent decision switches on this type: the broker
/// response encoding, the outbound authorization scheme and whether the
/// identity resolver runs on git requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Openshift,
    Github,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Openshift => "openshift",
            ProviderType::Github => "github",
        }
    }

    /// Scheme used in the outbound `Authorization` header.
    pub fn authorization_scheme(&self) -> &'static str {
        match self {
            ProviderType::Openshift => "Bearer",
            ProviderType::Github => "token",
        }
    }

    /// Whether git requests need the token owner's login for Basic-Auth.
    pub fn resolves_identity(&self) -> bool {
        matches!(self, ProviderType::Github)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a provider type outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider-type '{0}' (expected openshift or github)")]
pub struct UnknownProviderType(pub String);

impl FromStr for ProviderType {
    type Err = UnknownProviderType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openshift" => Ok(ProviderType::Openshift),
            "github" => Ok(ProviderType::Github),
            other => Err(UnknownProviderType(other.to_string())),
        }
    }
}
