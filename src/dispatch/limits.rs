//! Rate and concurrency limiting hooks.
//!
//! Both limiters are shared, reusable hook objects holding per-route
//! mutable state with a lifetime independent of any single request.
//!
//! The concurrency limiter uses an optimistic increment-then-rollback
//! pattern (`fetch_add`, then `fetch_sub` on over-limit). Under a
//! concurrent burst, several requests can each observe the limit exceeded
//! and all roll back. This is an advisory limit, not a hard exclusion
//! guarantee, and is intentionally left that way.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;

use crate::dispatch::Dispatcher;

/// Sliding-window rate limiter usable as a before hook.
pub struct RateLimit {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimit {
    /// Creates a limiter allowing `max_requests` per `window`.
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Arc<Self> {
        Arc::new(Self {
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::new()),
        })
    }

    /// Records one request; returns `false` when the window is full.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut timestamps = self
            .timestamps
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        while let Some(front) = timestamps.front() {
            if now.duration_since(*front) > self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
        if timestamps.len() >= self.max_requests {
            return false;
        }
        timestamps.push_back(now);
        true
    }

    /// Installs the limiter as a before hook on the dispatcher.
    ///
    /// Over-limit requests short-circuit with an error-shaped response.
    pub fn install(self: Arc<Self>, dispatcher: &mut Dispatcher) {
        let limiter = self;
        dispatcher.before(move |route, _| {
            if limiter.try_acquire() {
                None
            } else {
                tracing::warn!(route, "rate limit exceeded");
                Some(json!({
                    "isError": true,
                    "content": [{"type": "text", "text": "rate limit exceeded"}],
                }))
            }
        });
    }
}

/// Advisory concurrency limiter usable as a before/after hook pair.
pub struct ConcurrencyLimit {
    max_concurrent: usize,
    active: AtomicUsize,
}

impl ConcurrencyLimit {
    /// Creates a limiter allowing `max_concurrent` in-flight requests.
    #[must_use]
    pub fn new(max_concurrent: usize) -> Arc<Self> {
        Arc::new(Self {
            max_concurrent,
            active: AtomicUsize::new(0),
        })
    }

    /// Optimistically claims a slot; rolls back and returns `false` when
    /// over the limit.
    pub fn try_acquire(&self) -> bool {
        let previous = self.active.fetch_add(1, Ordering::SeqCst);
        if previous >= self.max_concurrent {
            self.active.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Releases a previously claimed slot.
    pub fn release(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Returns the current in-flight count.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Installs the limiter on the dispatcher: a before hook that claims a
    /// slot (short-circuiting when saturated) and an after hook that
    /// releases it.
    ///
    /// A short-circuit from an earlier before hook skips the after hook,
    /// but in that case this limiter's before hook never claimed a slot
    /// either, so the count stays balanced.
    pub fn install(self: Arc<Self>, dispatcher: &mut Dispatcher) {
        let acquire = Arc::clone(&self);
        dispatcher.before(move |route, _| {
            if acquire.try_acquire() {
                None
            } else {
                tracing::warn!(route, "concurrency limit exceeded");
                Some(json!({
                    "isError": true,
                    "content": [{"type": "text", "text": "too many concurrent requests"}],
                }))
            }
        });

        let release = self;
        dispatcher.after(move |_, _, _| {
            release.release();
        });
    }
}
