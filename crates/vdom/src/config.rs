//! Configuration settings for the renderer.
//!
//! Configuration can be loaded from environment variables or constructed
//! programmatically.

use core::time::Duration;
use std::env;

/// Runtime configuration for an application shell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderConfig {
    /// Whether to log per-flush patch statistics at info level
    pub telemetry_enabled: bool,
    /// Optional delay before a deferred flush runs, in milliseconds
    pub flush_delay_ms: Option<u64>,
}

impl RenderConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `VDOM_TELEMETRY`: Set to "1" to enable telemetry (default: disabled)
    /// - `VDOM_FLUSH_DELAY_MS`: Delay before each flush; 0 or unset means the next turn
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let telemetry_enabled = lookup("VDOM_TELEMETRY").as_deref() == Some("1");
        let flush_delay_ms = lookup("VDOM_FLUSH_DELAY_MS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .and_then(|millis| (millis > 0).then_some(millis));
        Self {
            telemetry_enabled,
            flush_delay_ms,
        }
    }

    /// Get the flush delay as an optional `Duration`.
    #[inline]
    #[must_use]
    pub const fn flush_delay(&self) -> Option<Duration> {
        if let Some(millis) = self.flush_delay_ms {
            Some(Duration::from_millis(millis))
        } else {
            None
        }
    }
}
