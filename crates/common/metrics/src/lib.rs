use prometheus_exporter::prometheus::{
    HistogramTimer, HistogramVec, IntCounterVec, IntGaugeVec, default_registry,
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_vec_with_registry,
};

// Provisioning each metrics
lazy_static::lazy_static! {
    pub static ref ATTESTATION_GOSSIP_VERDICTS: IntCounterVec = create_int_counter_vec(
        "attestation_gossip_verdicts_total",
        "Gossip verdicts produced for attestation messages",
        &["topic", "verdict"]
    );

    pub static ref PENDING_ATTESTATION_ROOTS: IntGaugeVec = create_int_gauge_vec(
        "pending_attestation_roots",
        "Distinct unknown block roots with buffered attestations",
        &[]
    );

    pub static ref PENDING_ATTESTATIONS: IntGaugeVec = create_int_gauge_vec(
        "pending_attestations",
        "Attestations buffered until their block is imported",
        &[]
    );

    pub static ref SIGNATURE_VERIFICATION_TIME: HistogramVec = create_histogram_vec(
        "signature_verification_seconds",
        "Time a worker spends verifying one job",
        &["kind"]
    );

    pub static ref SIGNATURE_VERIFICATION_JOBS: IntCounterVec = create_int_counter_vec(
        "signature_verification_jobs_total",
        "Signature verification jobs by outcome",
        &["outcome"]
    );
}

/// Create a new gauge metric
pub fn create_int_gauge_vec(name: &str, help: &str, label_names: &[&str]) -> IntGaugeVec {
    let registry = default_registry();
    register_int_gauge_vec_with_registry!(name, help, label_names, registry)
        .expect("failed to create int gauge vec")
}

/// Set the value of a gauge metric
pub fn set_int_gauge_vec(gauge_vec: &IntGaugeVec, value: i64, label_values: &[&str]) {
    gauge_vec.with_label_values(label_values).set(value);
}

/// Create a new counter metric
pub fn create_int_counter_vec(name: &str, help: &str, label_names: &[&str]) -> IntCounterVec {
    let registry = default_registry();
    register_int_counter_vec_with_registry!(name, help, label_names, registry)
        .expect("failed to create int counter vec")
}

/// Increment a counter metric
pub fn inc_int_counter_vec(counter_vec: &IntCounterVec, label_values: &[&str]) {
    counter_vec.with_label_values(label_values).inc();
}

/// Create a new histogram metric
pub fn create_histogram_vec(name: &str, help: &str, label_names: &[&str]) -> HistogramVec {
    let registry = default_registry();
    register_histogram_vec_with_registry!(name, help, label_names, registry)
        .expect("failed to create histogram")
}

/// Start a timer for a histogram metric
pub fn start_timer_vec(histogram_vec: &HistogramVec, label_values: &[&str]) -> HistogramTimer {
    histogram_vec.with_label_values(label_values).start_timer()
}

/// Stop a timer for a histogram metric
pub fn stop_timer(timer: HistogramTimer) {
    timer.observe_duration()
}
