//! Metric emission for the queue engine and event pipeline.
//!
//! Deliberately narrower than the richer per-stage timing histograms
//! this is generalized from: a job queue only needs enough signal to
//! answer "is work piling up" and "is it succeeding".

mod names {
    pub const JOBS_STORED: &str = "queue_jobs_stored_total";
    pub const JOBS_DRAINED: &str = "queue_jobs_drained_total";
    pub const JOBS_COMPLETED: &str = "queue_jobs_completed_total";
    pub const JOBS_FAILED: &str = "queue_jobs_failed_total";
    pub const JOBS_IN_FLIGHT: &str = "queue_jobs_in_flight";
    pub const EVENTS_STORED: &str = "queue_events_stored_total";
    pub const EVENTS_COMPLETED: &str = "queue_events_completed_total";
}

pub fn record_stored(command_type: &str) {
    metrics::counter!(names::JOBS_STORED, "command_type" => command_type.to_string()).increment(1);
}

pub fn record_drained(command_type: &str, count: usize) {
    metrics::counter!(names::JOBS_DRAINED, "command_type" => command_type.to_string())
        .increment(count as u64);
}

pub fn record_completed(command_type: &str) {
    metrics::counter!(names::JOBS_COMPLETED, "command_type" => command_type.to_string())
        .increment(1);
}

pub fn record_failed(command_type: &str) {
    metrics::counter!(names::JOBS_FAILED, "command_type" => command_type.to_string()).increment(1);
}

pub fn set_in_flight(command_type: &str, count: i64) {
    metrics::gauge!(names::JOBS_IN_FLIGHT, "command_type" => command_type.to_string())
        .set(count as f64);
}

pub fn record_event_stored(event_type: &str) {
    metrics::counter!(names::EVENTS_STORED, "event_type" => event_type.to_string()).increment(1);
}

pub fn record_event_completed(event_type: &str) {
    metrics::counter!(names::EVENTS_COMPLETED, "event_type" => event_type.to_string()).increment(1);
}
