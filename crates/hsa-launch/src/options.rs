//! Launch options and their environment overrides

use std::env;

use hsa_kernarg::KernargAbi;
use hsa_launch_tracing::TracingConfig;
use tracing::warn;

/// Linkage marker prepended to kernel names in native images
pub const DEFAULT_SYMBOL_PREFIX: &str = "&";

/// Knobs for the binder that are not part of a kernel's configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Kernarg buffer ABI of the target device
    pub abi: KernargAbi,
    /// Prefix turning an entry name into its image symbol
    pub symbol_prefix: String,
    /// Wrap each launch in a performance span
    pub perf_tracing: bool,
    /// Only log launch timings at or above this many microseconds
    pub perf_threshold_us: Option<u64>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            abi: KernargAbi::default(),
            symbol_prefix: DEFAULT_SYMBOL_PREFIX.to_string(),
            perf_tracing: true,
            perf_threshold_us: None,
        }
    }
}

impl LaunchOptions {
    /// Defaults overridden by `HSA_LAUNCH_INJECTED_ARGS`,
    /// `HSA_LAUNCH_SYMBOL_PREFIX` and `HSA_LAUNCH_PERF_THRESHOLD_US`.
    pub fn from_env() -> Self {
        let mut options = Self {
            abi: KernargAbi::from_env(),
            ..Self::default()
        };

        if let Ok(prefix) = env::var("HSA_LAUNCH_SYMBOL_PREFIX") {
            options.symbol_prefix = prefix;
        }
        if let Ok(raw) = env::var("HSA_LAUNCH_PERF_THRESHOLD_US") {
            match raw.trim().parse::<u64>() {
                Ok(threshold) => options.perf_threshold_us = Some(threshold),
                Err(err) => warn!(value = %raw, error = %err, "ignoring invalid HSA_LAUNCH_PERF_THRESHOLD_US"),
            }
        }
        options
    }

    pub fn with_abi(mut self, abi: KernargAbi) -> Self {
        self.abi = abi;
        self
    }

    pub fn with_symbol_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.symbol_prefix = prefix.into();
        self
    }

    /// Take performance span settings from a tracing configuration.
    pub fn with_tracing(mut self, tracing: &TracingConfig) -> Self {
        self.perf_tracing = tracing.enable_performance_tracing;
        self.perf_threshold_us = tracing.performance_threshold_us;
        self
    }

    pub fn with_perf_threshold_us(mut self, threshold_us: Option<u64>) -> Self {
        self.perf_threshold_us = threshold_us;
        self
    }

    /// Fully-qualified symbol for `entry_name`
    pub fn entry_symbol(&self, entry_name: &str) -> String {
        format!("{}{}", self.symbol_prefix, entry_name)
    }
}
