//! Command-line flags.
//!
//! Flags mirror the keys accepted in the TOML config file. A flag that is
//! not given leaves the file value (or the built-in default) in place.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::Settings;

/// OIDC token-translating reverse proxy.
#[derive(Debug, Parser)]
#[command(name = "token-proxy", version)]
pub struct Cli {
    /// TOML file with settings; flags override its values
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// URL to the OpenID Connect issuer (or its discovery document)
    #[arg(long, value_name = "URL")]
    pub issuer_url: Option<String>,

    /// URL to proxy requests to
    #[arg(long, value_name = "URL")]
    pub proxy_url: Option<String>,

    /// OpenID Connect client ID tokens must be issued to
    #[arg(long, value_name = "ID")]
    pub client_id: Option<String>,

    /// Broker provider alias to exchange the client token against
    #[arg(long, value_name = "ALIAS")]
    pub provider_alias: Option<String>,

    /// Type of the brokered provider (openshift or github)
    #[arg(long, value_name = "TYPE")]
    pub provider_type: Option<String>,

    /// Address to listen on
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// PEM-encoded certificate chain to serve TLS with
    #[arg(long, value_name = "PATH")]
    pub tls_cert: Option<PathBuf>,

    /// PEM-encoded private key to serve TLS with
    #[arg(long, value_name = "PATH")]
    pub tls_key: Option<PathBuf>,

    /// Extra root certificate bundle(s) trusted for outbound calls (repeatable)
    #[arg(long = "ca-cert", value_name = "PATH")]
    pub ca_certs: Vec<PathBuf>,

    /// Accept any certificate presented by upstream servers. Testing only.
    #[arg(long)]
    pub insecure_skip_verify: bool,

    /// Base URL of the identity server used to resolve GitHub logins
    #[arg(long, value_name = "URL")]
    pub identity_server_url: Option<String>,

    /// Retry interval while the provider config is unavailable (e.g. "10s")
    #[arg(long, value_name = "DURATION")]
    pub provider_config_retry_interval: Option<String>,

    /// Max retries while the provider config is unavailable; negative retries forever
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub provider_config_retry_max: Option<i64>,

    /// How often the provider config and signing keys are refreshed (e.g. "5m")
    #[arg(long, value_name = "DURATION")]
    pub provider_config_sync_interval: Option<String>,

    /// Deadline for broker exchange and identity lookups (e.g. "30s")
    #[arg(long, value_name = "DURATION")]
    pub upstream_auth_timeout: Option<String>,

    /// Reject requests without a credential instead of forwarding them anonymously
    #[arg(long)]
    pub require_credential: bool,

    /// Verbose logging
    #[arg(long)]
    pub verbose: bool,

    /// Log in JSON format
    #[arg(long)]
    pub log_json: bool,

    /// Address to expose Prometheus metrics on
    #[arg(long, value_name = "ADDR")]
    pub metrics_address: Option<String>,
}

impl Cli {
    /// Convert the flags into settings. Boolean switches only override when set.
    pub fn into_settings(self) -> Settings {
        Settings {
            listen: self.listen,
            issuer_url: self.issuer_url,
            proxy_url: self.proxy_url,
            client_id: self.client_id,
            provider_alias: self.provider_alias,
            provider_type: self.provider_type,
            tls_cert: self.tls_cert,
            tls_key: self.tls_key,
            ca_certs: self.ca_certs,
            insecure_skip_verify: self.insecure_skip_verify.then_some(true),
            identity_server_url: self.identity_server_url,
            provider_config_retry_interval: self.provider_config_retry_interval,
            provider_config_retry_max: self.provider_config_retry_max,
            provider_config_sync_interval: self.provider_config_sync_interval,
            upstream_auth_timeout: self.upstream_auth_timeout,
            require_credential: self.require_credential.then_some(true),
            verbose: self.verbose.then_some(true),
            log_json: self.log_json.then_some(true),
            metrics_address: self.metrics_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_to_settings() {
        let cli = Cli::parse_from([
            "token-proxy",
            "--issuer-url",
            "https://sso.example.com/auth/realms/demo",
            "--proxy-url",
            "https://api.github.com",
            "--client-id",
            "proxy",
            "--provider-alias",
            "github",
            "--provider-type",
            "github",
            "--ca-cert",
            "one.pem",
            "--ca-cert",
            "two.pem",
            "--provider-config-retry-max",
            "-1",
            "--verbose",
        ]);

        assert_eq!(cli.config, None);
        let settings = cli.into_settings();
        assert_eq!(settings.provider_type.as_deref(), Some("github"));
        assert_eq!(settings.ca_certs.len(), 2);
        assert_eq!(settings.provider_config_retry_max, Some(-1));
        assert_eq!(settings.verbose, Some(true));
        // Unset switches must not override file values
        assert_eq!(settings.insecure_skip_verify, None);
        assert_eq!(settings.log_json, None);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
