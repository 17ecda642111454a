//! Store tuning.

use std::time::Duration;

/// Environment variable overriding [`StoreConfig::debounce`], in
/// milliseconds.
pub const DEBOUNCE_ENV: &str = "DAMAGE_MAP_VIEWPORT_DEBOUNCE_MS";

/// Default quiet period before a viewport change re-derives the visible
/// set.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Store tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Quiet period after the last viewport change.
    pub debounce: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl StoreConfig {
    /// Reads `DAMAGE_MAP_VIEWPORT_DEBOUNCE_MS`, falling back to the
    /// default when unset or not a number.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            debounce: parse_debounce(std::env::var(DEBOUNCE_ENV).ok().as_deref()),
        }
    }
}

fn parse_debounce(value: Option<&str>) -> Duration {
    let Some(value) = value else {
        return DEFAULT_DEBOUNCE;
    };
    value.trim().parse::<u64>().map_or_else(
        |_| {
            log::warn!("Ignoring invalid {DEBOUNCE_ENV}={value:?}; using {DEFAULT_DEBOUNCE:?}");
            DEFAULT_DEBOUNCE
        },
        Duration::from_millis,
    )
}
