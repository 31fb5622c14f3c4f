//! Blocking acquisition settings shared by the coordination providers.

use std::time::Duration;

/// Settings for blocking acquisition: retry every `interval` until success
/// or `time` total has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockingSettings {
    pub time: Duration,
    pub interval: Duration,
}

impl Default for BlockingSettings {
    fn default() -> Self {
        Self {
            time: Duration::from_secs(60),
            interval: Duration::from_secs(1),
        }
    }
}

impl BlockingSettings {
    /// Creates settings with an explicit total time and retry interval.
    pub fn new(time: Duration, interval: Duration) -> Self {
        Self { time, interval }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_one_minute_total_one_second_interval() {
        let settings = BlockingSettings::default();
        assert_eq!(settings.time, Duration::from_secs(60));
        assert_eq!(settings.interval, Duration::from_secs(1));
    }
}
