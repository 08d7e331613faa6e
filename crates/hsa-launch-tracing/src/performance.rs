//! Timing helpers for the launch pipeline.
//!
//! ```rust
//! use hsa_launch_tracing::performance::{record_kernarg_allocation, PerformanceSpan};
//!
//! let span = PerformanceSpan::new("kernel_launch", Some(100));
//! record_kernarg_allocation(64, 8, 3);
//! drop(span); // logged only if the launch took at least 100us
//! ```

use std::time::Instant;
use tracing::Level;

/// RAII guard that measures its own lifetime and logs it on drop when the
/// duration reaches the optional threshold.
pub struct PerformanceSpan {
    name: String,
    threshold_us: Option<u64>,
    start_time: Instant,
    span: tracing::Span,
}

impl PerformanceSpan {
    /// Create a debug-level span. `threshold_us = None` always logs.
    pub fn new(name: impl Into<String>, threshold_us: Option<u64>) -> Self {
        Self::with_level(Level::DEBUG, name, threshold_us)
    }

    /// Create a span at the given level.
    pub fn with_level(level: Level, name: impl Into<String>, threshold_us: Option<u64>) -> Self {
        let name = name.into();
        let span = match level {
            Level::TRACE => tracing::trace_span!("perf", name = %name),
            Level::DEBUG => tracing::debug_span!("perf", name = %name),
            Level::INFO => tracing::info_span!("perf", name = %name),
            Level::WARN => tracing::warn_span!("perf", name = %name),
            Level::ERROR => tracing::error_span!("perf", name = %name),
        };

        Self::from_span(name, span, threshold_us)
    }

    /// Wrap a span built by the caller, keeping whatever fields it carries
    /// on the completion event.
    pub fn from_span(name: impl Into<String>, span: tracing::Span, threshold_us: Option<u64>) -> Self {
        Self {
            name: name.into(),
            threshold_us,
            start_time: Instant::now(),
            span,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Microseconds since the span was created.
    pub fn elapsed_us(&self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Enter this span's context.
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for PerformanceSpan {
    fn drop(&mut self) {
        let elapsed_us = self.elapsed_us();
        if self.threshold_us.is_none_or(|t| elapsed_us >= t) {
            let _entered = self.span.enter();
            tracing::debug!(
                duration_us = elapsed_us,
                duration_ms = elapsed_us as f64 / 1000.0,
                "performance_span_complete"
            );
        }
    }
}

/// Record a kernel-argument buffer allocation.
pub fn record_kernarg_allocation(size_bytes: usize, alignment: usize, duration_us: u64) {
    tracing::debug!(
        event = "kernarg_allocation",
        size_bytes = size_bytes,
        alignment = alignment,
        duration_us = duration_us,
        "kernarg_allocation"
    );
}

/// Record a queue submission together with its total work-item count.
pub fn record_dispatch(symbol: &str, work_items: u64, duration_us: u64) {
    let items_per_sec = if duration_us > 0 {
        (work_items as f64 / duration_us as f64) * 1_000_000.0
    } else {
        0.0
    };

    tracing::debug!(
        event = "dispatch",
        symbol = symbol,
        work_items = work_items,
        duration_us = duration_us,
        items_per_sec = items_per_sec,
        "kernel_dispatch"
    );
}
