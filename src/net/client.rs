//! Outbound HTTP client.
//!
//! One `reqwest::Client` is shared by discovery, broker exchange, identity
//! lookup and forwarding, so all of them trust the same CA bundles and pool
//! connections together.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::OutboundConfig;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unable to read CA bundle {path}: {source}")]
    CaBundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CA bundle {0} contains no certificates")]
    EmptyCaBundle(PathBuf),

    #[error("invalid certificate in {path}: {source}")]
    Certificate {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    #[error("unable to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Build the shared client from the outbound settings.
pub fn build_client(config: &OutboundConfig) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::none());

    for path in &config.ca_certs {
        for certificate in load_ca_bundle(path)? {
            builder = builder.add_root_certificate(certificate);
        }
        tracing::debug!(path = %path.display(), "Loaded CA bundle");
    }

    if config.insecure_skip_verify {
        tracing::warn!("TLS certificate verification disabled for outbound requests");
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder.build()?)
}

fn load_ca_bundle(path: &Path) -> Result<Vec<reqwest::Certificate>, ClientError> {
    let io_err = |source| ClientError::CaBundle {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let ders = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;

    if ders.is_empty() {
        return Err(ClientError::EmptyCaBundle(path.to_path_buf()));
    }

    ders.iter()
        .map(|der| {
            reqwest::Certificate::from_der(der.as_ref()).map_err(|source| ClientError::Certificate {
                path: path.to_path_buf(),
                source,
            })
        })
        .collect()
}
