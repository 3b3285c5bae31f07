use tracing::trace;

// Trace-based counters; the Prometheus recorder only serves `/metrics`.

pub fn inc_requests(route: &'static str) {
    trace!(
        target = "printdrop.metrics",
        route = route,
        "requests_total_inc"
    );
}

pub fn stage_elapsed(stage: &'static str, elapsed_ms: u128) {
    trace!(
        target = "printdrop.metrics",
        stage = stage,
        elapsed_ms = elapsed_ms as u64,
        "stage_elapsed"
    );
}

pub fn attempt_finished(outcome: &'static str) {
    trace!(
        target = "printdrop.metrics",
        outcome = outcome,
        "publish_attempts_total_inc"
    );
}
