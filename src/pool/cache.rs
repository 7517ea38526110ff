//! Connection cache shared by round trippers.
//!
//! - HTTP/2: one multiplexed connection per key, shared by every request
//! - HTTP/1.1: idle connections parked after their response is drained, one request each
//!
//! A per-key dial lock keeps at most one handshake in flight per key until the key's ALPN
//! outcome is known. Keys that negotiated HTTP/1.1 dial without the lock afterwards.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use crate::error::Result;
use crate::transport::connector::AlpnProtocol;
use crate::transport::exchange::Exchanger;

/// Cache key: one entry per origin and fingerprint.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct PoolKey {
    pub host: String,
    pub port: u16,
    pub is_https: bool,
    pub profile: &'static str,
}

impl PoolKey {
    pub fn new(host: impl Into<String>, port: u16, is_https: bool, profile: &'static str) -> Self {
        Self {
            host: host.into(),
            port,
            is_https,
            profile,
        }
    }
}

struct H1PoolEntry {
    exchanger: Exchanger,
    last_used: Instant,
}

impl H1PoolEntry {
    fn is_expired(&self, max_idle: Duration) -> bool {
        self.last_used.elapsed() >= max_idle
    }
}

struct H2PoolEntry {
    exchanger: Exchanger,
    established_at: Instant,
    last_used: Instant,
}

impl H2PoolEntry {
    fn is_usable(&self, max_idle: Duration) -> bool {
        !self.exchanger.is_closed() && self.last_used.elapsed() < max_idle
    }
}

struct Inner {
    h2: RwLock<HashMap<PoolKey, H2PoolEntry>>,
    h1_idle: RwLock<HashMap<PoolKey, Vec<H1PoolEntry>>>,
    /// ALPN outcome last observed per key.
    protocols: RwLock<HashMap<PoolKey, AlpnProtocol>>,
    dial_locks: Mutex<HashMap<PoolKey, Arc<Mutex<()>>>>,
    max_idle: Duration,
    max_idle_per_host: usize,
    connections_established: AtomicU64,
}

/// Reuse cache for established connections. Cloning shares the same cache.
#[derive(Clone)]
pub struct ConnectionCache {
    inner: Arc<Inner>,
}

impl ConnectionCache {
    /// Default maximum idle duration (90 seconds)
    const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(90);

    /// Default idle HTTP/1.1 connections kept per key
    const DEFAULT_MAX_IDLE_PER_HOST: usize = 6;

    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_MAX_IDLE, Self::DEFAULT_MAX_IDLE_PER_HOST)
    }

    pub fn with_config(max_idle: Duration, max_idle_per_host: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                h2: RwLock::new(HashMap::new()),
                h1_idle: RwLock::new(HashMap::new()),
                protocols: RwLock::new(HashMap::new()),
                dial_locks: Mutex::new(HashMap::new()),
                max_idle,
                max_idle_per_host,
                connections_established: AtomicU64::new(0),
            }),
        }
    }

    /// Reuse a cached connection for `key`, or establish one with `dial`.
    ///
    /// HTTP/2 connections produced by `dial` are registered for sharing before returning.
    pub async fn checkout<F, Fut>(&self, key: &PoolKey, dial: F) -> Result<Exchanger>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Exchanger>>,
    {
        if let Some(exchanger) = self.get(key).await {
            return Ok(exchanger);
        }

        if self.known_protocol(key).await == Some(AlpnProtocol::Http1) {
            return self.establish(key, dial).await;
        }

        let lock = self.dial_lock(key).await;
        let _guard = lock.lock().await;

        // Another request may have finished its handshake while we waited
        if let Some(exchanger) = self.get(key).await {
            tracing::debug!("Pool: Sharing connection established concurrently for {:?}", key);
            return Ok(exchanger);
        }

        self.establish(key, dial).await
    }

    async fn establish<F, Fut>(&self, key: &PoolKey, dial: F) -> Result<Exchanger>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Exchanger>>,
    {
        let exchanger = dial().await?;
        self.inner
            .connections_established
            .fetch_add(1, Ordering::Relaxed);
        self.inner
            .protocols
            .write()
            .await
            .insert(key.clone(), exchanger.protocol());

        if let Some(shared) = exchanger.share() {
            let now = Instant::now();
            self.inner.h2.write().await.insert(
                key.clone(),
                H2PoolEntry {
                    exchanger: shared,
                    established_at: now,
                    last_used: now,
                },
            );
            tracing::debug!("H2 Pool: Registered connection for {:?}", key);
        }
        Ok(exchanger)
    }

    /// Look up a usable cached connection without dialing.
    pub async fn get(&self, key: &PoolKey) -> Option<Exchanger> {
        {
            let mut h2 = self.inner.h2.write().await;
            if let Some(entry) = h2.get_mut(key) {
                if entry.is_usable(self.inner.max_idle) {
                    entry.last_used = Instant::now();
                    tracing::debug!(
                        "H2 Pool: Reusing connection for {:?} (age: {:?})",
                        key,
                        entry.established_at.elapsed()
                    );
                    return entry.exchanger.share();
                }
                tracing::debug!("H2 Pool: Dropping stale connection for {:?}", key);
                h2.remove(key);
            }
        }

        let mut pool = self.inner.h1_idle.write().await;
        let entries = pool.get_mut(key)?;
        while let Some(entry) = entries.pop() {
            if !entry.is_expired(self.inner.max_idle) && !entry.exchanger.is_closed() {
                tracing::debug!("H1 Pool: Reusing connection for {:?}", key);
                return Some(entry.exchanger);
            }
            tracing::debug!(
                "H1 Pool: Discarding idle connection for {:?} (idle: {:?})",
                key,
                entry.last_used.elapsed()
            );
        }
        None
    }

    /// Park an HTTP/1.1 connection whose previous response has been fully read.
    pub async fn put_h1(&self, key: PoolKey, exchanger: Exchanger) {
        if exchanger.protocol() != AlpnProtocol::Http1 || exchanger.is_closed() {
            return;
        }
        let mut pool = self.inner.h1_idle.write().await;
        let entries = pool.entry(key.clone()).or_default();
        if entries.len() >= self.inner.max_idle_per_host {
            tracing::debug!("H1 Pool: Idle limit reached for {:?}, closing connection", key);
            return;
        }
        entries.push(H1PoolEntry {
            exchanger,
            last_used: Instant::now(),
        });
        tracing::debug!(
            "H1 Pool: Returned connection for {:?} (idle: {})",
            key,
            entries.len()
        );
    }

    /// Forget every connection for `key` after a connection-level failure.
    pub async fn invalidate(&self, key: &PoolKey) {
        self.inner.h2.write().await.remove(key);
        self.inner.h1_idle.write().await.remove(key);
        tracing::debug!("Pool: Invalidated connections for {:?}", key);
    }

    /// Remove expired and closed connections and unused dial locks.
    pub async fn cleanup(&self) {
        let max_idle = self.inner.max_idle;
        {
            let mut h2 = self.inner.h2.write().await;
            h2.retain(|_, entry| entry.is_usable(max_idle));
        }
        {
            let mut h1_pool = self.inner.h1_idle.write().await;
            for entries in h1_pool.values_mut() {
                entries.retain(|e| !e.is_expired(max_idle) && !e.exchanger.is_closed());
            }
            h1_pool.retain(|_, entries| !entries.is_empty());
        }
        {
            let mut locks = self.inner.dial_locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        {
            // Forget ALPN outcomes of keys with nothing cached and no dial in flight
            let h2 = self.inner.h2.read().await;
            let h1_pool = self.inner.h1_idle.read().await;
            let locks = self.inner.dial_locks.lock().await;
            let mut protocols = self.inner.protocols.write().await;
            protocols.retain(|key, _| {
                h2.contains_key(key) || h1_pool.contains_key(key) || locks.contains_key(key)
            });
        }
    }

    /// Spawn a background task running [`cleanup`](Self::cleanup) every `interval`.
    pub fn spawn_cleanup_task(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            loop {
                interval_timer.tick().await;
                cache.cleanup().await;
            }
        })
    }

    pub async fn stats(&self) -> PoolStats {
        let h2 = self.inner.h2.read().await;
        let h1_pool = self.inner.h1_idle.read().await;
        let http1_idle_connections = h1_pool.values().map(Vec::len).sum();

        PoolStats {
            total_connections: h2.len() + http1_idle_connections,
            http2_connections: h2.len(),
            http1_idle_connections,
            connections_established: self.inner.connections_established.load(Ordering::Relaxed),
        }
    }

    async fn known_protocol(&self, key: &PoolKey) -> Option<AlpnProtocol> {
        self.inner.protocols.read().await.get(key).copied()
    }

    async fn dial_lock(&self, key: &PoolKey) -> Arc<Mutex<()>> {
        let mut locks = self.inner.dial_locks.lock().await;
        locks.entry(key.clone()).or_default().clone()
    }
}

impl Default for ConnectionCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub total_connections: usize,
    pub http2_connections: usize,
    pub http1_idle_connections: usize,
    /// Connections dialed through the cache since creation.
    pub connections_established: u64,
}
