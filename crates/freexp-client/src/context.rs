//! Process-wide application context.
//!
//! Backend selection happens exactly once, when the context is built:
//! a usable remote configuration selects the HTTP backend, anything else
//! falls back to the in-process local backend. Individual operations never
//! re-route.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

use freexp_config::AppConfig;
use freexp_storage::{DynBackend, MarketStore};
use freexp_store_local::create_local_backend;
use freexp_store_remote::RemoteBackend;

use crate::events::AuthEvent;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// The explicit context object collaborators receive instead of reaching
/// for globals. Cloning is cheap; clones share the store and the event
/// channel.
#[derive(Clone)]
pub struct AppContext {
    store: MarketStore,
    events: broadcast::Sender<AuthEvent>,
}

impl AppContext {
    /// Builds the context, performing the once-per-process backend choice.
    ///
    /// A missing or unusable remote configuration is not an error: the
    /// context silently degrades to the local backend so the application
    /// stays functional offline.
    pub fn init(config: &AppConfig) -> Self {
        let backend = select_backend(config);
        Self::with_backend(backend, config.cache_ttl())
    }

    /// Dependency-injection constructor, used by tests and embedders that
    /// manage their own backend.
    pub fn with_backend(backend: DynBackend, ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store: MarketStore::with_ttl(backend, ttl),
            events,
        }
    }

    pub fn store(&self) -> &MarketStore {
        &self.store
    }

    /// Subscribes to identity-provider events emitted via [`Self::emit`].
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Publishes an identity-provider event to all subscribers. Emitting
    /// with no live subscribers is a no-op.
    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }
}

fn select_backend(config: &AppConfig) -> DynBackend {
    match config.remote() {
        Some(remote) => match RemoteBackend::new(remote) {
            Ok(backend) => {
                info!("using remote backend");
                Arc::new(backend)
            }
            Err(error) => {
                warn!(%error, "remote backend unusable, falling back to local storage");
                create_local_backend()
            }
        },
        None => {
            info!("remote not configured, using local storage");
            create_local_backend()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_remote_selects_local_backend() {
        let ctx = AppContext::init(&AppConfig::default());
        // The local backend starts empty.
        assert!(ctx.store().session(false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn events_reach_subscribers() {
        let ctx = AppContext::init(&AppConfig::default());
        let mut rx = ctx.subscribe();
        ctx.emit(AuthEvent::SignedIn);
        assert_eq!(rx.recv().await.unwrap(), AuthEvent::SignedIn);
    }

    #[test]
    fn emit_without_subscribers_is_harmless() {
        let ctx = AppContext::init(&AppConfig::default());
        ctx.emit(AuthEvent::SignedOut);
    }
}
