//! Generation metric names and instruments

use std::time::Instant;

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};

pub const GENERATION_COUNT: &str = "talkinghead.generation.count";
pub const GENERATION_DURATION: &str = "talkinghead.generation.duration";
pub const STAGE_DURATION: &str = "talkinghead.stage.duration";

/// Instruments recorded by the generation pipeline
///
/// Backed by the global meter provider, so they are no-ops until
/// [`crate::init`] installs an exporter.
#[derive(Clone)]
pub struct GenerationMetrics {
    count: Counter<u64>,
    duration: Histogram<f64>,
    stage_duration: Histogram<f64>,
}

impl GenerationMetrics {
    pub fn new() -> Self {
        let meter = global::meter("talkinghead");

        Self {
            count: meter
                .u64_counter(GENERATION_COUNT)
                .with_description("Generation requests by outcome")
                .build(),
            duration: meter
                .f64_histogram(GENERATION_DURATION)
                .with_description("End-to-end generation time")
                .with_unit("s")
                .build(),
            stage_duration: meter
                .f64_histogram(STAGE_DURATION)
                .with_description("Time spent in each pipeline stage")
                .with_unit("s")
                .build(),
        }
    }

    /// Record a finished generation request
    pub fn record_generation(&self, start: Instant, outcome: &'static str) {
        let attributes = [KeyValue::new("outcome", outcome)];
        self.count.add(1, &attributes);
        record_duration(&self.duration, start, &attributes);
    }

    /// Record the time spent in one stage
    pub fn record_stage(&self, stage: &'static str, start: Instant) {
        record_duration(&self.stage_duration, start, &[KeyValue::new("stage", stage)]);
    }
}

impl Default for GenerationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Record a duration measurement on a histogram
pub fn record_duration(histogram: &Histogram<f64>, start: Instant, attributes: &[KeyValue]) {
    histogram.record(start.elapsed().as_secs_f64(), attributes);
}
