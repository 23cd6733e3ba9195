//! Per-profile cache of source clients.
//!
//! Building a client is comparatively expensive (binary lookup, cookie
//! preparation), so handles are reused until they reach `max_age`. A
//! handle that produced a failed attempt is dropped so the next request
//! for that profile builds a fresh one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use yshort_models::ClientProfile;

use super::{SourceClient, SourceClientFactory};
use crate::error::MediaResult;

/// Default lifetime of a cached client.
pub const DEFAULT_CLIENT_MAX_AGE: Duration = Duration::from_secs(300);

struct ClientHandle {
    client: Arc<dyn SourceClient>,
    created_at: Instant,
}

impl ClientHandle {
    fn is_fresh(&self, max_age: Duration) -> bool {
        self.created_at.elapsed() < max_age
    }
}

/// Cache of one client per [`ClientProfile`].
pub struct SourceClientPool {
    factory: Arc<dyn SourceClientFactory>,
    max_age: Duration,
    handles: Mutex<HashMap<ClientProfile, ClientHandle>>,
}

impl SourceClientPool {
    pub fn new(factory: Arc<dyn SourceClientFactory>) -> Self {
        Self::with_max_age(factory, DEFAULT_CLIENT_MAX_AGE)
    }

    pub fn with_max_age(factory: Arc<dyn SourceClientFactory>, max_age: Duration) -> Self {
        Self {
            factory,
            max_age,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Return a fresh client for `profile`, building one if needed.
    ///
    /// The lock is held across construction so concurrent callers never
    /// build two clients for the same profile.
    pub async fn acquire(&self, profile: ClientProfile) -> MediaResult<Arc<dyn SourceClient>> {
        let mut handles = self.handles.lock().await;

        if let Some(handle) = handles.get(&profile) {
            if handle.is_fresh(self.max_age) {
                return Ok(Arc::clone(&handle.client));
            }
            debug!(profile = %profile, "Cached source client expired");
        }

        let client = self.factory.create(profile).await?;
        debug!(profile = %profile, "Created source client");
        handles.insert(
            profile,
            ClientHandle {
                client: Arc::clone(&client),
                created_at: Instant::now(),
            },
        );

        Ok(client)
    }

    /// Drop the cached client for `profile`.
    pub async fn invalidate(&self, profile: ClientProfile) {
        if self.handles.lock().await.remove(&profile).is_some() {
            debug!(profile = %profile, "Invalidated source client");
        }
    }

    /// Drop every cached client.
    pub async fn invalidate_all(&self) {
        self.handles.lock().await.clear();
    }

    /// Whether a fresh client for `profile` is cached.
    pub async fn is_cached(&self, profile: ClientProfile) -> bool {
        self.handles
            .lock()
            .await
            .get(&profile)
            .is_some_and(|h| h.is_fresh(self.max_age))
    }
}
