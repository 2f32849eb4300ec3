//! Metrics — a side-effectful counter interface (spec §1, §5, §9).
//!
//! "Only metric counters [are global state]. They should be injected as an
//! abstract counter interface to permit nil/no-op testing." The engine
//! depends only on this trait; emission implementations live outside the
//! core.

pub trait MetricsSink: Send + Sync {
    /// `tool_executions_total{tool,status}` (spec §4.6 step 8), where
    /// `status` is `"success"` or `"error"`.
    fn record_tool_execution(&self, tool: &str, status: &str);

    /// Time-to-first-token, recorded on the first text-delta emission
    /// (spec §4.5).
    fn record_time_to_first_token(&self, millis: u64);
}

/// The default no-op sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_tool_execution(&self, _tool: &str, _status: &str) {}
    fn record_time_to_first_token(&self, _millis: u64) {}
}
