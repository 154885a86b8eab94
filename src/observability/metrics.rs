use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub status_transitions_total: IntCounterVec,
    pub parcels_created_total: IntCounter,
    pub status_update_latency_seconds: HistogramVec,
    pub active_agents: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "status_transitions_total",
                "Parcel status transitions by outcome",
            ),
            &["outcome"],
        )
        .expect("valid status_transitions_total metric");

        let parcels_created_total =
            IntCounter::new("parcels_created_total", "Parcels created by senders")
                .expect("valid parcels_created_total metric");

        let status_update_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "status_update_latency_seconds",
                "Latency of status update handling in seconds",
            ),
            &["outcome"],
        )
        .expect("valid status_update_latency_seconds metric");

        let active_agents = IntGauge::new(
            "active_agents",
            "Delivery agents currently AVAILABLE or BUSY",
        )
        .expect("valid active_agents metric");

        registry
            .register(Box::new(status_transitions_total.clone()))
            .expect("register status_transitions_total");
        registry
            .register(Box::new(parcels_created_total.clone()))
            .expect("register parcels_created_total");
        registry
            .register(Box::new(status_update_latency_seconds.clone()))
            .expect("register status_update_latency_seconds");
        registry
            .register(Box::new(active_agents.clone()))
            .expect("register active_agents");

        Self {
            registry,
            status_transitions_total,
            parcels_created_total,
            status_update_latency_seconds,
            active_agents,
        }
    }

    pub fn record_status_update(&self, outcome: &str, elapsed_secs: f64) {
        self.status_transitions_total
            .with_label_values(&[outcome])
            .inc();
        self.status_update_latency_seconds
            .with_label_values(&[outcome])
            .observe(elapsed_secs);
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
