//! Client-side metrics instrumentation.
//!
//! Counters go through the `metrics` facade; whether and how they are
//! exported is the embedding application's choice.

use metrics::counter;

/// Metric names.
pub mod names {
    pub const CONNECTS_TOTAL: &str = "wavelink_connects_total";
    pub const RECONNECT_ATTEMPTS_TOTAL: &str = "wavelink_reconnect_attempts_total";
    pub const MESSAGES_TOTAL: &str = "wavelink_messages_total";
    pub const NOTIFICATIONS_TOTAL: &str = "wavelink_notifications_total";
    pub const HISTORY_FAILURES_TOTAL: &str = "wavelink_history_failures_total";
    pub const ERRORS_TOTAL: &str = "wavelink_errors_total";
}

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(
        names::CONNECTS_TOTAL,
        "Channel sessions opened since process start"
    );
    metrics::describe_counter!(
        names::RECONNECT_ATTEMPTS_TOTAL,
        "Reconnect attempts, successful or not"
    );
    metrics::describe_counter!(names::MESSAGES_TOTAL, "Chat messages by direction");
    metrics::describe_counter!(
        names::NOTIFICATIONS_TOTAL,
        "Notifications received over the channel"
    );
    metrics::describe_counter!(
        names::HISTORY_FAILURES_TOTAL,
        "History API failures by endpoint"
    );
    metrics::describe_counter!(names::ERRORS_TOTAL, "Errors by source");
}

pub(crate) fn record_connect() {
    counter!(names::CONNECTS_TOTAL).increment(1);
}

pub(crate) fn record_reconnect_attempt() {
    counter!(names::RECONNECT_ATTEMPTS_TOTAL).increment(1);
}

pub(crate) fn record_message(direction: &'static str) {
    counter!(names::MESSAGES_TOTAL, "direction" => direction).increment(1);
}

pub(crate) fn record_notification() {
    counter!(names::NOTIFICATIONS_TOTAL).increment(1);
}

pub(crate) fn record_history_failure(endpoint: &'static str) {
    counter!(names::HISTORY_FAILURES_TOTAL, "endpoint" => endpoint).increment(1);
}

pub(crate) fn record_error(source: &'static str) {
    counter!(names::ERRORS_TOTAL, "source" => source).increment(1);
}
