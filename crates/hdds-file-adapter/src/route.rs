// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Route statistics.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Statistics for the route of one stream.
#[derive(Debug)]
pub struct RouteStats {
    /// Stream routed.
    pub stream_name: String,

    /// Samples handed to the sink.
    pub samples_routed: AtomicU64,

    /// Batches handed to the sink.
    pub batches_routed: AtomicU64,

    /// Errors encountered.
    pub errors: AtomicU64,

    /// Set once the route has stopped.
    pub finished: AtomicBool,

    /// Route creation time.
    pub created: Instant,
}

impl RouteStats {
    /// Create new stats.
    pub fn new(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            samples_routed: AtomicU64::new(0),
            batches_routed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            finished: AtomicBool::new(false),
            created: Instant::now(),
        }
    }

    /// Record a routed batch.
    pub fn record_batch(&self, samples: u64) {
        self.batches_routed.fetch_add(1, Ordering::Relaxed);
        self.samples_routed.fetch_add(samples, Ordering::Relaxed);
    }

    /// Record an error.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark the route as stopped.
    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }

    /// Get snapshot of current stats.
    pub fn snapshot(&self) -> RouteStatsSnapshot {
        RouteStatsSnapshot {
            stream_name: self.stream_name.clone(),
            samples_routed: self.samples_routed.load(Ordering::Relaxed),
            batches_routed: self.batches_routed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            finished: self.finished.load(Ordering::Relaxed),
            uptime_secs: self.created.elapsed().as_secs(),
        }
    }
}

/// Snapshot of route statistics.
#[derive(Debug, Clone)]
pub struct RouteStatsSnapshot {
    pub stream_name: String,
    pub samples_routed: u64,
    pub batches_routed: u64,
    pub errors: u64,
    pub finished: bool,
    pub uptime_secs: u64,
}

impl RouteStatsSnapshot {
    /// Calculate samples per second.
    pub fn samples_per_second(&self) -> f64 {
        if self.uptime_secs > 0 {
            self.samples_routed as f64 / self.uptime_secs as f64
        } else {
            0.0
        }
    }
}
