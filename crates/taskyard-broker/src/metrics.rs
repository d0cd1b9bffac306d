//! Prometheus metrics for broker monitoring.
//!
//! Recorded through the `metrics` facade; installing an exporter is up to the
//! embedding application.

use crate::queue::QueueName;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Metric names for the broker.
pub mod names {
    /// Current number of tasks per queue.
    pub const QUEUE_SIZE: &str = "taskyard_queue_size";
    /// Total transition attempts by source queue and outcome.
    pub const TRANSITIONS_TOTAL: &str = "taskyard_transitions_total";
    /// Total malformed members dropped from listings.
    pub const SKIPPED_ENTRIES_TOTAL: &str = "taskyard_skipped_entries_total";
    /// Store round-trip duration in seconds.
    pub const STORE_OPERATION_DURATION: &str = "taskyard_store_operation_duration_seconds";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_gauge!(names::QUEUE_SIZE, "Current number of tasks in each queue");
    describe_counter!(
        names::TRANSITIONS_TOTAL,
        "Total number of attempts to move a task into the ready queue"
    );
    describe_counter!(
        names::SKIPPED_ENTRIES_TOTAL,
        "Total number of malformed queue members skipped by listings"
    );
    describe_histogram!(
        names::STORE_OPERATION_DURATION,
        "Store operation duration in seconds"
    );
}

/// Queue metrics recorder.
#[derive(Clone)]
pub struct QueueMetrics;

impl QueueMetrics {
    /// Update the size gauge of one queue.
    pub fn update_queue_size(queue: QueueName, size: u64) {
        gauge!(
            names::QUEUE_SIZE,
            "queue" => queue.as_str()
        )
        .set(size as f64);
    }

    /// Record a malformed member dropped from a listing.
    pub fn entry_skipped(queue: QueueName) {
        counter!(
            names::SKIPPED_ENTRIES_TOTAL,
            "queue" => queue.as_str()
        )
        .increment(1);
    }
}

/// Transition metrics recorder.
#[derive(Clone)]
pub struct TransitionMetrics;

impl TransitionMetrics {
    /// Record a transition attempt. `outcome` is `moved` or an error label.
    pub fn transition(source: QueueName, outcome: &'static str) {
        counter!(
            names::TRANSITIONS_TOTAL,
            "source" => source.as_str(),
            "outcome" => outcome
        )
        .increment(1);
    }
}

/// Store metrics recorder.
#[derive(Clone)]
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record how long a store round trip took.
    pub fn operation(operation: &'static str, duration: Duration) {
        histogram!(
            names::STORE_OPERATION_DURATION,
            "operation" => operation
        )
        .record(duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorders_without_exporter() {
        register_metrics();
        QueueMetrics::update_queue_size(QueueName::Dead, 3);
        QueueMetrics::entry_skipped(QueueName::Active);
        TransitionMetrics::transition(QueueName::Retry, "moved");
        StoreMetrics::operation("ping", Duration::from_millis(2));
    }

    #[test]
    fn test_metric_names_are_prefixed() {
        for name in [
            names::QUEUE_SIZE,
            names::TRANSITIONS_TOTAL,
            names::SKIPPED_ENTRIES_TOTAL,
            names::STORE_OPERATION_DURATION,
        ] {
            assert!(name.starts_with("taskyard_"));
        }
    }
}
