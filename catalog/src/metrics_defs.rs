//! Metrics definitions for the upstream clients.

use shared::metrics_defs::{MetricDef, MetricType};

pub const UPSTREAM_REQUEST_DURATION: MetricDef = MetricDef {
    name: "upstream.request.duration",
    metric_type: MetricType::Histogram,
    description: "Upstream call duration in seconds. Tagged with upstream, outcome.",
};

pub const UPSTREAM_MALFORMED: MetricDef = MetricDef {
    name: "upstream.malformed",
    metric_type: MetricType::Counter,
    description: "Success envelopes missing their payload, treated as empty. Tagged with upstream.",
};

pub const UPSTREAM_ITEMS_SKIPPED: MetricDef = MetricDef {
    name: "upstream.items.skipped",
    metric_type: MetricType::Counter,
    description: "Listing items dropped because they could not be decoded. Tagged with upstream.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    UPSTREAM_REQUEST_DURATION,
    UPSTREAM_MALFORMED,
    UPSTREAM_ITEMS_SKIPPED,
];
