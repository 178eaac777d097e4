//! Metrics definitions for the sidecar.
//!
//! This module defines all metrics used throughout the sidecar.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "messages_applied_total",
        "Total number of node messages fully applied to the store"
    );
    describe_counter!(
        "message_apply_errors_total",
        "Total number of node messages whose application failed"
    );
    describe_counter!(
        "events_applied_total",
        "Total number of event records written to the store"
    );
    describe_counter!(
        "connections_total",
        "Total number of observer connections by outcome"
    );
    describe_histogram!(
        "message_apply_duration_seconds",
        "Time taken to apply one node message in seconds"
    );
    describe_gauge!(
        "queue_depth",
        "Number of messages waiting for or under application"
    );
}

/// Record a fully applied message.
pub fn record_message_applied() {
    counter!("messages_applied_total").increment(1);
}

/// Record a failed message application.
///
/// # Arguments
/// * `kind` - Error kind ("domain", "storage", "decode", ...)
pub fn record_apply_error(kind: &'static str) {
    counter!("message_apply_errors_total", "kind" => kind).increment(1);
}

/// Record an event record written to the store.
///
/// # Arguments
/// * `kind` - Record kind ("stx_asset", "ft_asset", ...)
pub fn record_event_applied(kind: &'static str) {
    counter!("events_applied_total", "kind" => kind).increment(1);
}

/// Record how an observer connection ended.
///
/// # Arguments
/// * `outcome` - "submitted", "empty" or "malformed"
pub fn record_connection(outcome: &'static str) {
    counter!("connections_total", "outcome" => outcome).increment(1);
}

/// Record the current serial queue depth.
pub fn set_queue_depth(depth: usize) {
    gauge!("queue_depth").set(depth as f64);
}

/// Record message application duration.
pub fn record_apply_duration(duration_secs: f64) {
    histogram!("message_apply_duration_seconds").record(duration_secs);
}

/// A timer that automatically records duration when dropped.
pub struct ProcessingTimer {
    start: Instant,
}

impl ProcessingTimer {
    /// Start a new processing timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for ProcessingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessingTimer {
    fn drop(&mut self) {
        record_apply_duration(self.start.elapsed().as_secs_f64());
    }
}
