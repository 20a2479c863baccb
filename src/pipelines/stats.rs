use std::time::{Duration, Instant};

/// Statistics for encoder inference over a batch of texts.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Total execution time.
    pub total_time: Duration,
    /// Number of items processed.
    pub items_processed: usize,
}

impl PipelineStats {
    /// Create a new stats tracker (call at start of operation).
    pub(crate) fn start() -> PipelineStatsBuilder {
        PipelineStatsBuilder {
            start_time: Instant::now(),
        }
    }

    /// Average time spent per processed item.
    pub fn time_per_item(&self) -> Duration {
        match u32::try_from(self.items_processed) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_time / n,
        }
    }
}

/// Tracks timing from creation to `finish`.
pub(crate) struct PipelineStatsBuilder {
    start_time: Instant,
}

impl PipelineStatsBuilder {
    /// Finalize stats with the number of items processed.
    pub fn finish(self, items_processed: usize) -> PipelineStats {
        PipelineStats {
            total_time: self.start_time.elapsed(),
            items_processed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineStats;
    use std::time::Duration;

    #[test]
    fn averages_over_items() {
        let stats = PipelineStats {
            total_time: Duration::from_millis(300),
            items_processed: 3,
        };
        assert_eq!(stats.time_per_item(), Duration::from_millis(100));
    }

    #[test]
    fn zero_items_has_zero_average() {
        let stats = PipelineStats::start().finish(0);
        assert_eq!(stats.items_processed, 0);
        assert_eq!(stats.time_per_item(), Duration::ZERO);
    }
}
