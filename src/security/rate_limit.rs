//! Per-client admission control.
//!
//! Each client address owns a token bucket plus a rolling request counter.
//! A background janitor evicts clients idle past the alive window and
//! resets the counter of clients that stayed active.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Admission state for one client address.
struct ClientState {
    /// Requests since the last sweep that found this client alive.
    count: u32,
    last_seen: Instant,
    bucket: TokenBucket,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Request counter exceeded the per-window budget. Rejected regardless
    /// of bucket state.
    HighFrequency,
    /// Token bucket is empty.
    Throttled,
}

/// Tracks admission state for every client address seen recently.
///
/// The map is the only mutable state shared across request tasks; the lock
/// is held for the map access and counter/timestamp update only, never for
/// the rest of a request.
pub struct ClientRegistry {
    clients: Mutex<HashMap<IpAddr, ClientState>>,
    refill_rate: f64,
    burst: f64,
    max_requests: u32,
    alive_window: Duration,
}

impl ClientRegistry {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            refill_rate: config.requests_per_second,
            burst: config.burst_size as f64,
            max_requests: config.max_requests_per_window,
            alive_window: Duration::from_secs(config.alive_window_secs),
        }
    }

    /// Admit or reject one request from `addr`. Creates the client entry on
    /// first sight, updates its last-activity timestamp and counter on every
    /// call. Rejection is immediate; there is no queueing.
    pub fn admit(&self, addr: IpAddr) -> Admission {
        let mut clients = self.clients.lock().expect("client registry mutex poisoned");
        let state = clients.entry(addr).or_insert_with(|| ClientState {
            count: 0,
            last_seen: Instant::now(),
            bucket: TokenBucket::new(self.burst),
        });
        state.last_seen = Instant::now();
        state.count += 1;

        if state.count > self.max_requests {
            return Admission::HighFrequency;
        }
        if state.bucket.try_acquire(self.burst, self.refill_rate) {
            Admission::Allowed
        } else {
            Admission::Throttled
        }
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.clients.lock().expect("client registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One janitor pass: evict clients idle past the alive window, reset
    /// the request counter of the rest. Takes the registry lock for the
    /// whole pass; sweep cost is bounded by registry size.
    pub fn sweep(&self) {
        self.sweep_at(Instant::now());
    }

    /// Sweep against an explicit `now`, for deterministic tests.
    pub fn sweep_at(&self, now: Instant) {
        let mut evicted = 0usize;
        {
            let mut clients = self.clients.lock().expect("client registry mutex poisoned");
            clients.retain(|_, state| {
                if now.duration_since(state.last_seen) > self.alive_window {
                    evicted += 1;
                    false
                } else {
                    state.count = 0;
                    true
                }
            });
        }
        if evicted > 0 {
            tracing::debug!(evicted, "janitor evicted idle clients");
            metrics::record_clients_evicted(evicted);
        }
    }

    /// Spawn the background janitor task sweeping on a fixed period,
    /// independent of request traffic.
    pub fn spawn_janitor(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; skip it so the first sweep
            // happens one full period after startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                registry.sweep();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rps: f64, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            requests_per_second: rps,
            burst_size: burst,
            max_requests_per_window: 2000,
            sweep_interval_secs: 600,
            alive_window_secs: 600,
        }
    }

    fn addr(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn allows_up_to_burst_then_throttles() {
        let registry = ClientRegistry::new(&config(0.0001, 3));
        let client = addr(1);

        for _ in 0..3 {
            assert_eq!(registry.admit(client), Admission::Allowed);
        }
        assert_eq!(registry.admit(client), Admission::Throttled);
    }

    #[test]
    fn clients_are_limited_independently() {
        let registry = ClientRegistry::new(&config(0.0001, 1));

        assert_eq!(registry.admit(addr(1)), Admission::Allowed);
        assert_eq!(registry.admit(addr(1)), Admission::Throttled);
        assert_eq!(registry.admit(addr(2)), Admission::Allowed);
    }

    #[test]
    fn bucket_refills_over_time() {
        let registry = ClientRegistry::new(&config(1000.0, 1));
        let client = addr(1);

        assert_eq!(registry.admit(client), Admission::Allowed);
        assert_eq!(registry.admit(client), Admission::Throttled);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(registry.admit(client), Admission::Allowed);
    }

    #[test]
    fn high_frequency_guard_overrides_bucket() {
        let mut cfg = config(1_000_000.0, 1_000_000);
        cfg.max_requests_per_window = 5;
        let registry = ClientRegistry::new(&cfg);
        let client = addr(1);

        for _ in 0..5 {
            assert_eq!(registry.admit(client), Admission::Allowed);
        }
        assert_eq!(registry.admit(client), Admission::HighFrequency);
        // Stays rejected until a sweep grants amnesty.
        assert_eq!(registry.admit(client), Admission::HighFrequency);
    }

    #[test]
    fn sweep_evicts_idle_clients() {
        let registry = ClientRegistry::new(&config(10.0, 5));
        registry.admit(addr(1));
        assert_eq!(registry.len(), 1);

        let past_window = Instant::now() + Duration::from_secs(601);
        registry.sweep_at(past_window);
        assert!(registry.is_empty());
    }

    #[test]
    fn sweep_resets_counter_of_active_clients() {
        let mut cfg = config(1_000_000.0, 1_000_000);
        cfg.max_requests_per_window = 3;
        let registry = ClientRegistry::new(&cfg);
        let client = addr(1);

        for _ in 0..3 {
            assert_eq!(registry.admit(client), Admission::Allowed);
        }
        assert_eq!(registry.admit(client), Admission::HighFrequency);

        // Client is still within the alive window: counter amnesty, no eviction.
        registry.sweep_at(Instant::now());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.admit(client), Admission::Allowed);
    }
}
