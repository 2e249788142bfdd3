//! Configuration validation.
//!
//! # Responsibilities
//! - Required values are present (issuer, proxy destination, client, alias, provider type)
//! - URLs parse and use http(s)
//! - TLS certificate and key are given together
//! - Durations parse and are non-zero
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: Settings → Result<GatewayConfig, Vec<ValidationError>>
//! - Runs before anything touches the network

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::schema::{
    GatewayConfig, ListenerConfig, ObservabilityConfig, OutboundConfig, ProviderSettings,
    ProviderType, RetryPolicy, Settings, TlsConfig, DEFAULT_IDENTITY_SERVER_URL,
    DEFAULT_LISTEN_ADDRESS, DEFAULT_RETRY_INTERVAL, DEFAULT_RETRY_MAX, DEFAULT_SYNC_INTERVAL,
    DEFAULT_UPSTREAM_AUTH_TIMEOUT, DISCOVERY_PATH,
};

/// A single semantic problem with the supplied settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{field} is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("{field} must use http or https, got '{scheme}'")]
    UnsupportedScheme { field: &'static str, scheme: String },

    #[error(transparent)]
    UnknownProviderType(#[from] crate::config::schema::UnknownProviderType),

    #[error("tls-cert specified with no tls-key")]
    TlsCertWithoutKey,

    #[error("tls-key specified with no tls-cert")]
    TlsKeyWithoutCert,

    #[error("{field} is not a valid duration: {reason}")]
    InvalidDuration { field: &'static str, reason: String },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("{field} is not a valid socket address: {reason}")]
    InvalidAddress { field: &'static str, reason: String },
}

/// Validate settings and build the typed configuration.
pub fn validate(settings: &Settings) -> Result<GatewayConfig, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let issuer = required_url(&mut errors, "issuer-url", settings.issuer_url.as_deref())
        .map(|url| normalize_issuer(url.as_str()));
    let proxy_url = required_url(&mut errors, "proxy-url", settings.proxy_url.as_deref());
    let identity_server_url = http_url(
        &mut errors,
        "identity-server-url",
        settings
            .identity_server_url
            .as_deref()
            .unwrap_or(DEFAULT_IDENTITY_SERVER_URL),
    );
    let client_id = required_string(&mut errors, "client-id", settings.client_id.as_deref());
    let alias = required_string(&mut errors, "provider-alias", settings.provider_alias.as_deref());

    let kind = match settings.provider_type.as_deref() {
        None | Some("") => {
            errors.push(ValidationError::Missing("provider-type"));
            None
        }
        Some(raw) => match raw.parse::<ProviderType>() {
            Ok(kind) => Some(kind),
            Err(e) => {
                errors.push(e.into());
                None
            }
        },
    };

    let tls = match (&settings.tls_cert, &settings.tls_key) {
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: cert.clone(),
            key_path: key.clone(),
        }),
        (Some(_), None) => {
            errors.push(ValidationError::TlsCertWithoutKey);
            None
        }
        (None, Some(_)) => {
            errors.push(ValidationError::TlsKeyWithoutCert);
            None
        }
        (None, None) => None,
    };

    let bind_address = socket_addr(
        &mut errors,
        "listen",
        settings.listen.as_deref().unwrap_or(DEFAULT_LISTEN_ADDRESS),
    );
    let metrics_address = settings
        .metrics_address
        .as_deref()
        .and_then(|raw| socket_addr(&mut errors, "metrics-address", raw));

    let retry_interval = duration(
        &mut errors,
        "provider-config-retry-interval",
        settings
            .provider_config_retry_interval
            .as_deref()
            .unwrap_or(DEFAULT_RETRY_INTERVAL),
    );
    let sync_interval = duration(
        &mut errors,
        "provider-config-sync-interval",
        settings
            .provider_config_sync_interval
            .as_deref()
            .unwrap_or(DEFAULT_SYNC_INTERVAL),
    );
    let auth_timeout = duration(
        &mut errors,
        "upstream-auth-timeout",
        settings
            .upstream_auth_timeout
            .as_deref()
            .unwrap_or(DEFAULT_UPSTREAM_AUTH_TIMEOUT),
    );

    match (
        issuer,
        proxy_url,
        identity_server_url,
        client_id,
        alias,
        kind,
        bind_address,
        retry_interval,
        sync_interval,
        auth_timeout,
    ) {
        (
            Some(issuer),
            Some(proxy_url),
            Some(identity_server_url),
            Some(client_id),
            Some(alias),
            Some(kind),
            Some(bind_address),
            Some(retry_interval),
            Some(sync_interval),
            Some(auth_timeout),
        ) if errors.is_empty() => Ok(GatewayConfig {
            listener: ListenerConfig { bind_address, tls },
            provider: ProviderSettings {
                issuer,
                client_id,
                alias,
                kind,
                identity_server_url: with_trailing_slash(identity_server_url),
                sync_interval,
            },
            proxy_url,
            outbound: OutboundConfig {
                ca_certs: settings.ca_certs.clone(),
                insecure_skip_verify: settings.insecure_skip_verify.unwrap_or(false),
                auth_timeout,
            },
            bootstrap: RetryPolicy::new(
                retry_interval,
                settings.provider_config_retry_max.unwrap_or(DEFAULT_RETRY_MAX),
            ),
            require_credential: settings.require_credential.unwrap_or(false),
            observability: ObservabilityConfig {
                verbose: settings.verbose.unwrap_or(false),
                log_json: settings.log_json.unwrap_or(false),
                metrics_address,
            },
        }),
        _ => Err(errors),
    }
}

/// Canonicalise an issuer URL and strip the discovery document path and any
/// trailing slash. Default ports and host case do not affect the result.
pub fn normalize_issuer(raw: &str) -> String {
    let canonical = Url::parse(raw.trim()).map(String::from);
    let canonical = canonical.as_deref().unwrap_or(raw);
    let trimmed = canonical.trim_end_matches('/');
    trimmed
        .strip_suffix(DISCOVERY_PATH)
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}

fn required_string(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: Option<&str>,
) -> Option<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            errors.push(ValidationError::Missing(field));
            None
        }
    }
}

fn required_url(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: Option<&str>,
) -> Option<Url> {
    match value {
        Some(raw) if !raw.trim().is_empty() => http_url(errors, field, raw),
        _ => {
            errors.push(ValidationError::Missing(field));
            None
        }
    }
}

fn http_url(errors: &mut Vec<ValidationError>, field: &'static str, raw: &str) -> Option<Url> {
    match Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            errors.push(ValidationError::UnsupportedScheme {
                field,
                scheme: url.scheme().to_string(),
            });
            None
        }
        Err(e) => {
            errors.push(ValidationError::InvalidUrl {
                field,
                reason: e.to_string(),
            });
            None
        }
    }
}

fn duration(errors: &mut Vec<ValidationError>, field: &'static str, raw: &str) -> Option<Duration> {
    match humantime::parse_duration(raw.trim()) {
        Ok(d) if d.is_zero() => {
            errors.push(ValidationError::ZeroDuration(field));
            None
        }
        Ok(d) => Some(d),
        Err(e) => {
            errors.push(ValidationError::InvalidDuration {
                field,
                reason: e.to_string(),
            });
            None
        }
    }
}

fn socket_addr(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    raw: &str,
) -> Option<SocketAddr> {
    match raw.trim().parse() {
        Ok(addr) => Some(addr),
        Err(e) => {
            errors.push(ValidationError::InvalidAddress {
                field,
                reason: e.to_string(),
            });
            None
        }
    }
}

// Url::join treats the last segment as a file unless the path ends in '/'.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Settings {
        Settings {
            issuer_url: Some("https://sso.example.com/auth/realms/demo".into()),
            proxy_url: Some("http://backend.internal:8080".into()),
            client_id: Some("proxy".into()),
            provider_alias: Some("openshift-v3".into()),
            provider_type: Some("openshift".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_settings_use_defaults() {
        let config = validate(&minimal()).unwrap();

        assert_eq!(config.listener.bind_address.port(), 8080);
        assert!(config.listener.tls.is_none());
        assert_eq!(config.provider.kind, ProviderType::Openshift);
        assert_eq!(config.provider.issuer, "https://sso.example.com/auth/realms/demo");
        assert_eq!(config.provider.identity_server_url.as_str(), "https://api.github.com/");
        assert_eq!(config.bootstrap.interval, Duration::from_secs(10));
        assert_eq!(config.bootstrap.max_retries, None);
        assert_eq!(config.outbound.auth_timeout, Duration::from_secs(30));
        assert!(!config.outbound.insecure_skip_verify);
        assert!(!config.require_credential);
    }

    #[test]
    fn test_all_errors_reported() {
        let errors = validate(&Settings::default()).unwrap_err();

        assert!(errors.contains(&ValidationError::Missing("issuer-url")));
        assert!(errors.contains(&ValidationError::Missing("proxy-url")));
        assert!(errors.contains(&ValidationError::Missing("client-id")));
        assert!(errors.contains(&ValidationError::Missing("provider-alias")));
        assert!(errors.contains(&ValidationError::Missing("provider-type")));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_unknown_provider_type_rejected() {
        let mut settings = minimal();
        settings.provider_type = Some("bitbucket".into());

        let errors = validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("bitbucket"));
    }

    #[test]
    fn test_tls_pair_required() {
        let mut settings = minimal();
        settings.tls_cert = Some("server.crt".into());
        assert_eq!(validate(&settings).unwrap_err(), vec![ValidationError::TlsCertWithoutKey]);

        let mut settings = minimal();
        settings.tls_key = Some("server.key".into());
        assert_eq!(validate(&settings).unwrap_err(), vec![ValidationError::TlsKeyWithoutCert]);

        let mut settings = minimal();
        settings.tls_cert = Some("server.crt".into());
        settings.tls_key = Some("server.key".into());
        let config = validate(&settings).unwrap();
        assert_eq!(
            config.listener.tls,
            Some(TlsConfig {
                cert_path: "server.crt".into(),
                key_path: "server.key".into(),
            })
        );
    }

    #[test]
    fn test_durations_and_retry_max() {
        let mut settings = minimal();
        settings.provider_config_retry_interval = Some("250ms".into());
        settings.provider_config_retry_max = Some(2);
        settings.upstream_auth_timeout = Some("0s".into());
        settings.provider_config_sync_interval = Some("soon".into());

        let errors = validate(&settings).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroDuration("upstream-auth-timeout")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidDuration { field: "provider-config-sync-interval", .. })));

        settings.upstream_auth_timeout = None;
        settings.provider_config_sync_interval = None;
        let config = validate(&settings).unwrap();
        assert_eq!(config.bootstrap.interval, Duration::from_millis(250));
        assert_eq!(config.bootstrap.max_retries, Some(2));
    }

    #[test]
    fn test_url_scheme_checked() {
        let mut settings = minimal();
        settings.proxy_url = Some("ftp://backend.internal".into());
        let errors = validate(&settings).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnsupportedScheme {
                field: "proxy-url",
                scheme: "ftp".into(),
            }]
        );
    }

    #[test]
    fn test_normalize_issuer() {
        assert_eq!(
            normalize_issuer("https://sso.example.com/auth/realms/demo/"),
            "https://sso.example.com/auth/realms/demo"
        );
        assert_eq!(
            normalize_issuer("https://sso.example.com/auth/realms/demo/.well-known/openid-configuration"),
            "https://sso.example.com/auth/realms/demo"
        );
        assert_eq!(normalize_issuer("https://sso.example.com"), "https://sso.example.com");
    }

    #[test]
    fn test_normalize_issuer_default_port_and_host_case() {
        let configured = normalize_issuer("https://sso.example.com/auth/realms/demo");
        assert_eq!(normalize_issuer("https://SSO.Example.com:443/auth/realms/demo/"), configured);
        assert_eq!(
            normalize_issuer("https://sso.example.com:8443/auth/realms/demo"),
            "https://sso.example.com:8443/auth/realms/demo"
        );
    }

    #[test]
    fn test_identity_server_override_gets_trailing_slash() {
        let mut settings = minimal();
        settings.identity_server_url = Some("https://github.example.com/api/v3".into());
        let config = validate(&settings).unwrap();
        assert_eq!(
            config.provider.identity_server_url.as_str(),
            "https://github.example.com/api/v3/"
        );
    }
}
