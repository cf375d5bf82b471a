//! Per-principal cooldown limiter
//!
//! Each (principal, operation class) pair remembers the time of its last
//! accepted request. A new request is accepted only when the class cooldown
//! has fully elapsed since then.
//!
//! ## Eviction
//!
//! After an accepted write, if the table holds more than `sweep_threshold`
//! entries, every entry older than `stale_after_ms` is removed. The sweep is
//! O(n) over live entries and triggered by size, not by a timer, so the table
//! may exceed the threshold between sweeps by the number of accepted calls.
//!
//! ## Limitations
//!
//! State lives in process memory: it resets on restart and is not shared
//! between server instances. Limits are best-effort abuse prevention, not a
//! global guarantee under horizontal scaling.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ink_common::OperationClass;
use ink_config::RateLimitConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Source of epoch-millisecond time.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Manually driven clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self { now: AtomicU64::new(start_millis) }
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub principal_id: String,
    pub class: OperationClass,
}

impl RateLimitKey {
    pub fn new(principal_id: impl Into<String>, class: OperationClass) -> Self {
        Self { principal_id: principal_id.into(), class }
    }
}

pub struct RateLimiter {
    entries: DashMap<RateLimitKey, u64>,
    interactive_cooldown_ms: u64,
    expensive_cooldown_ms: u64,
    sweep_threshold: usize,
    stale_after_ms: u64,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            interactive_cooldown_ms: config.interactive_cooldown_ms,
            expensive_cooldown_ms: config.expensive_cooldown_ms,
            sweep_threshold: config.sweep_threshold,
            stale_after_ms: config.stale_after_ms,
            clock,
        }
    }

    pub fn cooldown_ms(&self, class: OperationClass) -> u64 {
        match class {
            OperationClass::Interactive => self.interactive_cooldown_ms,
            OperationClass::Expensive => self.expensive_cooldown_ms,
        }
    }

    /// Accept and record the request, or reject it while the key is cooling down.
    ///
    /// A rejected call leaves the stored timestamp untouched.
    pub fn try_consume(&self, principal_id: &str, class: OperationClass) -> bool {
        let now = self.clock.now_millis();
        let cooldown = self.cooldown_ms(class);

        // The entry guard holds the shard lock; it must be released before
        // the sweep below touches every shard.
        let accepted = match self.entries.entry(RateLimitKey::new(principal_id, class)) {
            Entry::Occupied(mut entry) => {
                if now.saturating_sub(*entry.get()) < cooldown {
                    false
                } else {
                    *entry.get_mut() = now;
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        };

        if accepted && self.entries.len() > self.sweep_threshold {
            let removed = self.sweep_at(now);
            debug!(removed, remaining = self.entries.len(), "Rate limit table swept");
        }

        accepted
    }

    /// Remove entries older than the stale horizon. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(self.clock.now_millis())
    }

    fn sweep_at(&self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, last| now.saturating_sub(*last) < self.stale_after_ms);
        before.saturating_sub(self.entries.len())
    }

    /// Timestamp of the last accepted request for the key, if tracked.
    pub fn last_accepted(&self, principal_id: &str, class: OperationClass) -> Option<u64> {
        self.entries
            .get(&RateLimitKey::new(principal_id, class))
            .map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
