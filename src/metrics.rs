use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Account and activity counters since process start
#[derive(Clone)]
pub struct Metrics {
    pub signups: Arc<AtomicU64>,
    pub logins_succeeded: Arc<AtomicU64>,
    pub logins_failed: Arc<AtomicU64>,
    pub reviews_submitted: Arc<AtomicU64>,
    pub reviews_approved: Arc<AtomicU64>,
    pub shelf_additions: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            signups: Arc::new(AtomicU64::new(0)),
            logins_succeeded: Arc::new(AtomicU64::new(0)),
            logins_failed: Arc::new(AtomicU64::new(0)),
            reviews_submitted: Arc::new(AtomicU64::new(0)),
            reviews_approved: Arc::new(AtomicU64::new(0)),
            shelf_additions: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_signups(&self) {
        self.signups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_logins_succeeded(&self) {
        self.logins_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_logins_failed(&self) {
        self.logins_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reviews_submitted(&self) {
        self.reviews_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_reviews_approved(&self, count: u64) {
        self.reviews_approved.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_shelf_additions(&self) {
        self.shelf_additions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            signups: self.signups.load(Ordering::Relaxed),
            logins_succeeded: self.logins_succeeded.load(Ordering::Relaxed),
            logins_failed: self.logins_failed.load(Ordering::Relaxed),
            reviews_submitted: self.reviews_submitted.load(Ordering::Relaxed),
            reviews_approved: self.reviews_approved.load(Ordering::Relaxed),
            shelf_additions: self.shelf_additions.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub signups: u64,
    pub logins_succeeded: u64,
    pub logins_failed: u64,
    pub reviews_submitted: u64,
    pub reviews_approved: u64,
    pub shelf_additions: u64,
    pub uptime_seconds: u64,
}
