//! Process-wide counters for the gateway
//!
//! Atomics for the hot counters, a mutex for the bounded latency window.
//! Exposed as JSON on `GET /metrics`.

use crate::routing::TaskCategory;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

const LATENCY_WINDOW: usize = 1000;

pub struct MetricsCollector {
    connections_opened: AtomicU64,
    connections_active: AtomicU64,

    turns_general: AtomicU64,
    turns_gui: AtomicU64,
    turns_api: AtomicU64,
    turns_failed: AtomicU64,
    invalid_messages: AtomicU64,
    classifier_fallbacks: AtomicU64,

    gui_worker_failures: AtomicU64,
    api_worker_failures: AtomicU64,

    signups: AtomicU64,
    logins_succeeded: AtomicU64,
    logins_failed: AtomicU64,

    turn_times: Mutex<Vec<u64>>,
    started_at: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            connections_opened: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            turns_general: AtomicU64::new(0),
            turns_gui: AtomicU64::new(0),
            turns_api: AtomicU64::new(0),
            turns_failed: AtomicU64::new(0),
            invalid_messages: AtomicU64::new(0),
            classifier_fallbacks: AtomicU64::new(0),
            gui_worker_failures: AtomicU64::new(0),
            api_worker_failures: AtomicU64::new(0),
            signups: AtomicU64::new(0),
            logins_succeeded: AtomicU64::new(0),
            logins_failed: AtomicU64::new(0),
            turn_times: Mutex::new(Vec::new()),
            started_at: AtomicU64::new(current_timestamp()),
        }
    }

    // Connections
    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    // Turns
    pub fn turn_completed(&self, category: TaskCategory, duration: Duration) {
        let counter = match category {
            TaskCategory::General => &self.turns_general,
            TaskCategory::Gui => &self.turns_gui,
            TaskCategory::Api => &self.turns_api,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.record_turn_time(duration);
    }

    pub fn turn_failed(&self, duration: Duration) {
        self.turns_failed.fetch_add(1, Ordering::Relaxed);
        self.record_turn_time(duration);
    }

    pub fn invalid_message(&self) {
        self.invalid_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn classifier_fallback(&self) {
        self.classifier_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    // Workers
    pub fn gui_worker_failed(&self) {
        self.gui_worker_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn api_worker_failed(&self) {
        self.api_worker_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Auth
    pub fn signup_completed(&self) {
        self.signups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn login_attempted(&self, success: bool) {
        if success {
            self.logins_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.logins_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_turn_time(&self, duration: Duration) {
        if let Ok(mut times) = self.turn_times.lock() {
            times.push(duration.as_millis() as u64);
            if times.len() > LATENCY_WINDOW {
                times.remove(0);
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (average_turn_ms, p95_turn_ms) = self
            .turn_times
            .lock()
            .map(|times| latency_summary(&times))
            .unwrap_or((0.0, 0));

        MetricsSnapshot {
            timestamp: current_timestamp(),
            uptime_seconds: current_timestamp()
                .saturating_sub(self.started_at.load(Ordering::Relaxed)),
            connections: ConnectionMetrics {
                opened: self.connections_opened.load(Ordering::Relaxed),
                active: self.connections_active.load(Ordering::Relaxed),
            },
            turns: TurnMetrics {
                general: self.turns_general.load(Ordering::Relaxed),
                gui: self.turns_gui.load(Ordering::Relaxed),
                api: self.turns_api.load(Ordering::Relaxed),
                failed: self.turns_failed.load(Ordering::Relaxed),
                invalid_messages: self.invalid_messages.load(Ordering::Relaxed),
                classifier_fallbacks: self.classifier_fallbacks.load(Ordering::Relaxed),
                average_turn_ms,
                p95_turn_ms,
            },
            workers: WorkerMetrics {
                gui_failures: self.gui_worker_failures.load(Ordering::Relaxed),
                api_failures: self.api_worker_failures.load(Ordering::Relaxed),
            },
            auth: AuthMetrics {
                signups: self.signups.load(Ordering::Relaxed),
                logins_succeeded: self.logins_succeeded.load(Ordering::Relaxed),
                logins_failed: self.logins_failed.load(Ordering::Relaxed),
            },
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn latency_summary(times: &[u64]) -> (f64, u64) {
    if times.is_empty() {
        return (0.0, 0);
    }
    let average = times.iter().sum::<u64>() as f64 / times.len() as f64;
    let mut sorted = times.to_vec();
    sorted.sort_unstable();
    let index = ((sorted.len() as f64) * 0.95).ceil() as usize;
    let p95 = sorted[index.saturating_sub(1).min(sorted.len() - 1)];
    (average, p95)
}

pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: u64,
    pub uptime_seconds: u64,
    pub connections: ConnectionMetrics,
    pub turns: TurnMetrics,
    pub workers: WorkerMetrics,
    pub auth: AuthMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionMetrics {
    pub opened: u64,
    pub active: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnMetrics {
    pub general: u64,
    pub gui: u64,
    pub api: u64,
    pub failed: u64,
    pub invalid_messages: u64,
    pub classifier_fallbacks: u64,
    pub average_turn_ms: f64,
    pub p95_turn_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerMetrics {
    pub gui_failures: u64,
    pub api_failures: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthMetrics {
    pub signups: u64,
    pub logins_succeeded: u64,
    pub logins_failed: u64,
}
