//! Tuning parameters for arrival resolution.

/// Configuration for the arrival resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// How many future service days to try when today has nothing left.
    pub forward_search_days: u32,

    /// Hours after midnight during which night trips may still be listed
    /// under the previous service day.
    pub midnight_window_end_hour: u32,

    /// Number of upcoming arrivals when the caller does not ask for a count.
    pub default_upcoming: usize,

    /// Upper bound on any requested count.
    pub max_upcoming: usize,

    /// Drop the earliest entry of a fallback day's pool.
    pub skip_first_fallback_entry: bool,
}

impl ResolverConfig {
    /// Clamp a requested upcoming count to the configured bounds.
    pub fn upcoming_count(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_upcoming)
            .min(self.max_upcoming)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            forward_search_days: 10,
            midnight_window_end_hour: 5,
            default_upcoming: 3,
            max_upcoming: 20,
            skip_first_fallback_entry: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.forward_search_days, 10);
        assert_eq!(config.midnight_window_end_hour, 5);
        assert_eq!(config.default_upcoming, 3);
        assert_eq!(config.max_upcoming, 20);
        assert!(config.skip_first_fallback_entry);
    }

    #[test]
    fn upcoming_count_is_clamped() {
        let config = ResolverConfig::default();
        assert_eq!(config.upcoming_count(None), 3);
        assert_eq!(config.upcoming_count(Some(5)), 5);
        assert_eq!(config.upcoming_count(Some(0)), 0);
        assert_eq!(config.upcoming_count(Some(500)), 20);
    }
}
