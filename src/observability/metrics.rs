//! Thread-safe router metrics
//!
//! Atomic counters for whole-run and per-attempt events plus a
//! mutex-protected per-model breakdown. No token or cost accounting.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Global metrics collector instance
pub static METRICS: Lazy<RouterMetrics> = Lazy::new(RouterMetrics::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static RouterMetrics {
    &METRICS
}

const MAX_DURATION_SAMPLES: usize = 1000;

/// How one attempt ended, from the metrics point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    Success,
    TransportError,
    InvalidResponse,
    QuotaExhausted,
    Unresolvable,
}

#[derive(Debug, Default, Clone)]
struct ModelCounters {
    attempts: u64,
    successes: u64,
    quota_hits: u64,
    failures: u64,
}

/// Thread-safe metrics collector using atomics and mutexes
pub struct RouterMetrics {
    calls_started: AtomicU64,
    calls_succeeded: AtomicU64,
    calls_exhausted: AtomicU64,
    transport_attempts: AtomicU64,
    transport_errors: AtomicU64,
    invalid_responses: AtomicU64,
    quota_hits: AtomicU64,
    unresolved_models: AtomicU64,
    skipped_models: AtomicU64,

    // milliseconds, bounded
    call_durations: Mutex<Vec<u64>>,
    per_model: Mutex<BTreeMap<String, ModelCounters>>,
}

impl RouterMetrics {
    pub fn new() -> Self {
        Self {
            calls_started: AtomicU64::new(0),
            calls_succeeded: AtomicU64::new(0),
            calls_exhausted: AtomicU64::new(0),
            transport_attempts: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            invalid_responses: AtomicU64::new(0),
            quota_hits: AtomicU64::new(0),
            unresolved_models: AtomicU64::new(0),
            skipped_models: AtomicU64::new(0),
            call_durations: Mutex::new(Vec::new()),
            per_model: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn call_started(&self) {
        self.calls_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the end of a router invocation
    pub fn call_finished(&self, succeeded: bool, skipped_models: usize, duration: Duration) {
        if succeeded {
            self.calls_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.calls_exhausted.fetch_add(1, Ordering::Relaxed);
        }
        self.skipped_models
            .fetch_add(skipped_models as u64, Ordering::Relaxed);

        if let Ok(mut durations) = self.call_durations.lock() {
            durations.push(duration.as_millis() as u64);
            if durations.len() > MAX_DURATION_SAMPLES {
                durations.remove(0);
            }
        }
    }

    /// Record one attempt against `model_id`
    pub fn attempt_finished(&self, model_id: &str, kind: AttemptKind) {
        if kind == AttemptKind::Unresolvable {
            self.unresolved_models.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.transport_attempts.fetch_add(1, Ordering::Relaxed);
        match kind {
            AttemptKind::TransportError => {
                self.transport_errors.fetch_add(1, Ordering::Relaxed);
            }
            AttemptKind::InvalidResponse => {
                self.invalid_responses.fetch_add(1, Ordering::Relaxed);
            }
            AttemptKind::QuotaExhausted => {
                self.quota_hits.fetch_add(1, Ordering::Relaxed);
            }
            AttemptKind::Success | AttemptKind::Unresolvable => {}
        }

        if let Ok(mut per_model) = self.per_model.lock() {
            let counters = per_model.entry(model_id.to_string()).or_default();
            counters.attempts += 1;
            match kind {
                AttemptKind::Success => counters.successes += 1,
                AttemptKind::QuotaExhausted => counters.quota_hits += 1,
                AttemptKind::TransportError | AttemptKind::InvalidResponse => counters.failures += 1,
                AttemptKind::Unresolvable => {}
            }
        }
    }

    // Reset all metrics (useful for testing)
    pub fn reset(&self) {
        for counter in [
            &self.calls_started,
            &self.calls_succeeded,
            &self.calls_exhausted,
            &self.transport_attempts,
            &self.transport_errors,
            &self.invalid_responses,
            &self.quota_hits,
            &self.unresolved_models,
            &self.skipped_models,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        if let Ok(mut durations) = self.call_durations.lock() {
            durations.clear();
        }
        if let Ok(mut per_model) = self.per_model.lock() {
            per_model.clear();
        }
    }

    /// Duration statistics as (avg, p50, p95) in milliseconds
    fn duration_statistics(&self) -> (f64, f64, f64) {
        let Ok(durations) = self.call_durations.lock() else {
            return (0.0, 0.0, 0.0);
        };
        if durations.is_empty() {
            return (0.0, 0.0, 0.0);
        }

        let mut sorted = durations.clone();
        sorted.sort_unstable();
        let avg = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;
        (avg, percentile(&sorted, 50.0), percentile(&sorted, 95.0))
    }

    /// Get complete metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (avg_call_duration_ms, call_duration_p50_ms, call_duration_p95_ms) =
            self.duration_statistics();

        let models = self
            .per_model
            .lock()
            .map(|per_model| {
                per_model
                    .iter()
                    .map(|(model_id, counters)| {
                        (
                            model_id.clone(),
                            ModelMetrics {
                                attempts: counters.attempts,
                                successes: counters.successes,
                                quota_hits: counters.quota_hits,
                                failures: counters.failures,
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        MetricsSnapshot {
            calls_started: self.calls_started.load(Ordering::Relaxed),
            calls_succeeded: self.calls_succeeded.load(Ordering::Relaxed),
            calls_exhausted: self.calls_exhausted.load(Ordering::Relaxed),
            transport_attempts: self.transport_attempts.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            invalid_responses: self.invalid_responses.load(Ordering::Relaxed),
            quota_hits: self.quota_hits.load(Ordering::Relaxed),
            unresolved_models: self.unresolved_models.load(Ordering::Relaxed),
            skipped_models: self.skipped_models.load(Ordering::Relaxed),
            avg_call_duration_ms,
            call_duration_p50_ms,
            call_duration_p95_ms,
            models,
            timestamp: current_timestamp(),
        }
    }
}

impl Default for RouterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub calls_started: u64,
    pub calls_succeeded: u64,
    pub calls_exhausted: u64,
    pub transport_attempts: u64,
    pub transport_errors: u64,
    pub invalid_responses: u64,
    pub quota_hits: u64,
    pub unresolved_models: u64,
    pub skipped_models: u64,
    pub avg_call_duration_ms: f64,
    pub call_duration_p50_ms: f64,
    pub call_duration_p95_ms: f64,
    pub models: BTreeMap<String, ModelMetrics>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetrics {
    pub attempts: u64,
    pub successes: u64,
    pub quota_hits: u64,
    pub failures: u64,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let len = sorted_data.len();
    let index = (percentile / 100.0) * (len - 1) as f64;

    if index.fract() == 0.0 {
        sorted_data[index as usize] as f64
    } else {
        let lower = sorted_data[index.floor() as usize] as f64;
        let upper = sorted_data[index.ceil() as usize] as f64;
        lower + (upper - lower) * index.fract()
    }
}
