//! TLS configuration and certificate loading.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

use crate::config::TlsConfig;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificates found in {0}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0}")]
    NoPrivateKey(PathBuf),

    #[error("invalid TLS configuration: {0}")]
    Config(#[source] std::io::Error),
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Load the serving certificate chain and key.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, TlsError> {
    let read_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| TlsError::Read { path, source }
    };

    let certs = rustls_pemfile::certs(&mut open(&config.cert_path)?)
        .map(|cert| cert.map(|der| der.to_vec()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err(&config.cert_path))?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(config.cert_path.clone()));
    }

    let key = rustls_pemfile::private_key(&mut open(&config.key_path)?)
        .map_err(read_err(&config.key_path))?
        .ok_or_else(|| TlsError::NoPrivateKey(config.key_path.clone()))?;

    RustlsConfig::from_der(certs, key.secret_der().to_vec())
        .await
        .map_err(TlsError::Config)
}
