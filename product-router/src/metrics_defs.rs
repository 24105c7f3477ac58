use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with status, handler.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const CORRELATION_BULK_FAILURES: MetricDef = MetricDef {
    name: "correlation.bulk.failures",
    metric_type: MetricType::Counter,
    description: "Bulk legacy passes that failed and fell back to per-id lookups",
};

pub const CORRELATION_PER_ID_CALLS: MetricDef = MetricDef {
    name: "correlation.per_id.calls",
    metric_type: MetricType::Counter,
    description: "Per-id legacy lookups issued. Tagged with outcome.",
};

pub const CORRELATION_UNRESOLVED: MetricDef = MetricDef {
    name: "correlation.unresolved",
    metric_type: MetricType::Histogram,
    description: "Candidate ids left without a shop after correlation",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    REQUESTS_INFLIGHT,
    CORRELATION_BULK_FAILURES,
    CORRELATION_PER_ID_CALLS,
    CORRELATION_UNRESOLVED,
];
