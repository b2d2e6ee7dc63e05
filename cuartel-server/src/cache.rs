//! Snapshot cache with single-flight background refresh.
//!
//! The cache holds one published [`Snapshot`]. Reads never wait for
//! upstream I/O: a stale snapshot is returned as-is and a refresh is
//! spawned in the background (stale-while-revalidate).
//!
//! A refresh fetches every source concurrently and swaps in the new
//! snapshot in one step, so readers see either the old or the new set of
//! records, never a mix. A busy flag ensures at most one refresh runs at a
//! time; triggering another while one is in flight does nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{Registry, Snapshot};
use crate::fetch::StationFetch;

/// Default time before a snapshot is considered stale.
const DEFAULT_TTL: Duration = Duration::from_secs(20);

/// Configuration for the snapshot cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Age after which a read triggers a refresh.
    pub ttl: Duration,
}

impl CacheConfig {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

/// Result of asking for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was published.
    Completed {
        /// Records in the new snapshot.
        records: usize,
        /// Records that are failure sentinels.
        degraded: usize,
    },

    /// Another refresh was already running; nothing was done.
    AlreadyRunning,
}

/// Clears the busy flag when dropped, even if the refresh panics.
#[must_use]
pub struct RefreshGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

struct Inner<F> {
    fetcher: F,
    registry: Registry,
    ttl: Duration,
    snapshot: RwLock<Arc<Snapshot>>,
    busy: Arc<AtomicBool>,
}

/// Shared station snapshot plus the machinery to refresh it.
///
/// Cheap to clone; clones share the same snapshot and busy flag.
pub struct SnapshotCache<F> {
    inner: Arc<Inner<F>>,
}

impl<F> Clone for SnapshotCache<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: StationFetch> SnapshotCache<F> {
    /// Create a cache with an empty snapshot.
    ///
    /// Nothing is fetched until a refresh is triggered.
    pub fn new(fetcher: F, registry: Registry, config: &CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                registry,
                ttl: config.ttl,
                snapshot: RwLock::new(Arc::new(Snapshot::empty())),
                busy: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Whether a refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// The published snapshot, without triggering a refresh.
    pub async fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.inner.snapshot.read().await)
    }

    /// The published snapshot, spawning a background refresh if it is stale.
    ///
    /// Never waits for the refresh; the returned snapshot may be stale.
    pub async fn get_snapshot(&self) -> Arc<Snapshot> {
        let snapshot = self.current().await;

        if snapshot.is_stale(Utc::now(), self.inner.ttl) && self.spawn_refresh() {
            debug!("Snapshot stale, refresh spawned");
        }

        snapshot
    }

    /// Claim the busy flag, or `None` if a refresh is already running.
    pub fn try_refresh(&self) -> Option<RefreshGuard> {
        self.inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshGuard {
                busy: Arc::clone(&self.inner.busy),
            })
    }

    /// Refresh now and wait for it, unless a refresh is already running.
    pub async fn refresh_all(&self) -> RefreshOutcome {
        match self.try_refresh() {
            Some(guard) => self.run_refresh(guard).await,
            None => {
                debug!("Refresh already running, skipping");
                RefreshOutcome::AlreadyRunning
            }
        }
    }

    /// Start a refresh on a detached task and return immediately.
    ///
    /// Returns `false` if a refresh was already running. There is no way to
    /// observe the spawned refresh's outcome other than the snapshot itself.
    /// Must be called from within a tokio runtime.
    pub fn spawn_refresh(&self) -> bool {
        let Some(guard) = self.try_refresh() else {
            return false;
        };

        let cache = self.clone();
        tokio::spawn(async move {
            cache.run_refresh(guard).await;
        });

        true
    }

    /// Fetch every source and publish the result. The guard is held until
    /// the new snapshot is in place.
    async fn run_refresh(&self, guard: RefreshGuard) -> RefreshOutcome {
        let started = Instant::now();
        let registry = &self.inner.registry;
        info!(sources = registry.len(), "Refreshing station snapshot");

        // Concurrency is bounded by the fetcher.
        let fetches = registry
            .iter()
            .map(|source| self.inner.fetcher.fetch_station(source));
        let records = join_all(fetches).await;

        let snapshot = Snapshot::new(records, Utc::now());
        let records = snapshot.records().len();
        let degraded = snapshot.degraded_count();

        *self.inner.snapshot.write().await = Arc::new(snapshot);
        drop(guard);

        info!(
            records,
            degraded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Station snapshot refreshed"
        );

        RefreshOutcome::Completed { records, degraded }
    }
}
