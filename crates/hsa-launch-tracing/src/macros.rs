//! Convenience macros over [`crate::performance`].

/// Create a [`crate::performance::PerformanceSpan`] with extra fields.
///
/// ```rust
/// use hsa_launch_tracing::perf_span;
///
/// let _span = perf_span!("kernel_launch", symbol = "&vadd", nargs = 3);
/// ```
#[macro_export]
macro_rules! perf_span {
    ($name:expr) => {{
        $crate::performance::PerformanceSpan::new($name, None)
    }};
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {{
        let name = $name;
        let span = $crate::__private::tracing::debug_span!(
            "perf",
            name = %name,
            $($field = $value),+
        );
        $crate::performance::PerformanceSpan::from_span(name, span, None)
    }};
}

/// Like [`perf_span!`] but only logs when the duration reaches `threshold_us`.
#[macro_export]
macro_rules! perf_span_threshold {
    ($name:expr, $threshold_us:expr) => {{
        $crate::performance::PerformanceSpan::new($name, $threshold_us)
    }};
    ($name:expr, $threshold_us:expr, $($field:tt = $value:expr),+ $(,)?) => {{
        let name = $name;
        let span = $crate::__private::tracing::debug_span!(
            "perf",
            name = %name,
            $($field = $value),+
        );
        $crate::performance::PerformanceSpan::from_span(name, span, $threshold_us)
    }};
}
