//! Shared metrics recording for store operations.

use std::time::Instant;

/// Records operation metrics for one store operation.
///
/// Two metrics are emitted per call:
/// 1. `userdb_operations_total` - Counter for operation count by status
/// 2. `userdb_operation_duration_ms` - Histogram for operation latency
///
/// # Arguments
///
/// * `operation` - Operation name (e.g., "lookup_by_code", "upsert")
/// * `start` - Operation start time from `Instant::now()`
/// * `status` - Operation status ("success" or "error")
pub(crate) fn record_operation_metrics(
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "userdb_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "userdb_operation_duration_ms",
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_record_operation_metrics_success() {
        // Recording must complete without panicking even with no recorder
        // installed.
        let start = Instant::now();
        thread::sleep(Duration::from_millis(1));

        record_operation_metrics("test_operation", start, "success");
    }

    #[test]
    fn test_record_operation_metrics_error() {
        let start = Instant::now();

        record_operation_metrics("test_operation", start, "error");
    }

    #[test]
    fn test_record_operation_metrics_timing() {
        let start = Instant::now();
        thread::sleep(Duration::from_millis(10));

        record_operation_metrics("timed_operation", start, "success");

        assert!(start.elapsed().as_millis() >= 10);
    }
}
