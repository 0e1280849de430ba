use opentelemetry::{KeyValue, global, metrics::Counter};

/// Relay counters. Recorded into the global meter provider, which is a no-op
/// unless telemetry export is configured.
#[derive(Clone)]
pub struct RelayMetrics {
    connections: Counter<u64>,
    frames_forwarded: Counter<u64>,
    frames_skipped: Counter<u64>,
}

impl RelayMetrics {
    pub fn new() -> Self {
        let meter = global::meter("relay");
        let connections = meter
            .u64_counter("relay_connection_events_total")
            .with_description("Viewer connection lifecycle events by outcome")
            .build();
        let frames_forwarded = meter
            .u64_counter("relay_frames_forwarded_total")
            .with_description("Stream messages delivered to viewers")
            .build();
        let frames_skipped = meter
            .u64_counter("relay_frames_skipped_total")
            .with_description("Stream messages skipped for lagging viewers")
            .build();

        Self {
            connections,
            frames_forwarded,
            frames_skipped,
        }
    }

    pub fn connection_opened(&self) {
        self.connection_event("opened");
    }

    pub fn connection_closed(&self) {
        self.connection_event("closed");
    }

    pub fn connection_errored(&self) {
        self.connection_event("errored");
    }

    pub fn frame_forwarded(&self) {
        self.frames_forwarded.add(1, &[]);
    }

    pub fn frames_skipped(&self, count: u64) {
        self.frames_skipped.add(count, &[]);
    }

    fn connection_event(&self, outcome: &'static str) {
        self.connections.add(1, &[KeyValue::new("outcome", outcome)]);
    }
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
