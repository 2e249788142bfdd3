//! Background refresh of the provider config.
//!
//! Handlers read the config through a [`SharedProviderConfig`]; this task
//! replaces the whole snapshot at once so a handler never sees keys from one
//! fetch mixed with metadata from another. A failed refresh keeps serving the
//! previous snapshot.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::observability::metrics;
use crate::oidc::discovery::{ProviderConfig, ProviderConfigSource};

/// Process-wide provider config, swapped atomically on refresh.
pub type SharedProviderConfig = Arc<ArcSwap<ProviderConfig>>;

/// Wrap a bootstrapped config for sharing.
pub fn shared(config: ProviderConfig) -> SharedProviderConfig {
    Arc::new(ArcSwap::from_pointee(config))
}

pub struct ProviderSync<S> {
    source: S,
    snapshot: SharedProviderConfig,
    interval: Duration,
}

impl<S: ProviderConfigSource> ProviderSync<S> {
    pub fn new(source: S, snapshot: SharedProviderConfig, interval: Duration) -> Self {
        Self {
            source,
            snapshot,
            interval,
        }
    }

    /// Refresh on every interval tick until shutdown is signalled.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Provider config sync starting");

        // The bootstrap fetch is fresh; first refresh is one interval out.
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Provider config sync received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Fetch once and swap the snapshot on success. Returns whether it succeeded.
    pub async fn refresh(&self) -> bool {
        match self.source.fetch().await {
            Ok(config) => {
                tracing::debug!(
                    issuer = %config.issuer,
                    keys = config.keys.keys.len(),
                    "Provider config refreshed"
                );
                self.snapshot.store(Arc::new(config));
                metrics::record_provider_refresh(true);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Provider config refresh failed, keeping previous config");
                metrics::record_provider_refresh(false);
                false
            }
        }
    }
}
