use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;

/// How often throughput is reported.
pub const STATS_PERIOD: Duration = Duration::from_secs(60);

/// Counters fed by every publisher (on acknowledged sends) and every
/// subscriber handler.
#[derive(Debug, Default)]
pub struct RunningStats {
    sent: AtomicU64,
    received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn record_sent(&self, bytes: usize) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }
    pub fn record_received(&self, bytes: usize) {
        self.received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }
    pub fn total_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
    pub fn total_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsReport {
    pub total_sent: u64,
    pub total_received: u64,
    /// messages per second since the previous tick
    pub rate_sent: f64,
    pub rate_received: f64,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl StatsReport {
    pub fn log(&self) {
        info!(
            sent.total = self.total_sent,
            rcv.total = self.total_received,
            rate.sent = round2(self.rate_sent),
            rate.rcv = round2(self.rate_received),
            "throughput over the last {}s",
            STATS_PERIOD.as_secs()
        );
    }
}

/// Turns cumulative totals into per-period rates. Owned by the single stats
/// task, so the baselines need no synchronisation.
#[derive(Debug)]
pub struct StatsAggregator {
    period: Duration,
    sent_at_last_tick: u64,
    received_at_last_tick: u64,
}

impl StatsAggregator {
    pub fn new(period: Duration) -> Self {
        StatsAggregator {
            period,
            sent_at_last_tick: 0,
            received_at_last_tick: 0,
        }
    }

    pub fn tick(&mut self, total_sent: u64, total_received: u64) -> StatsReport {
        let secs = self.period.as_secs_f64();
        let report = StatsReport {
            total_sent,
            total_received,
            rate_sent: total_sent.saturating_sub(self.sent_at_last_tick) as f64 / secs,
            rate_received: total_received.saturating_sub(self.received_at_last_tick) as f64 / secs,
        };
        self.sent_at_last_tick = total_sent;
        self.received_at_last_tick = total_received;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let mut aggregator = StatsAggregator::new(STATS_PERIOD);
        let first = aggregator.tick(0, 0);
        assert_eq!(first.rate_sent, 0.0);
        let second = aggregator.tick(120, 30);
        assert_eq!(second.rate_sent, 2.0);
        assert_eq!(second.rate_received, 0.5);
        assert_eq!(second.total_sent, 120);
        let third = aggregator.tick(120, 90);
        assert_eq!(third.rate_sent, 0.0);
        assert_eq!(third.rate_received, 1.0);
    }

    #[test]
    fn test_counter_reset_does_not_underflow() {
        let mut aggregator = StatsAggregator::new(Duration::from_secs(10));
        aggregator.tick(100, 100);
        let report = aggregator.tick(5, 0);
        assert_eq!(report.rate_sent, 0.0);
        assert_eq!(report.rate_received, 0.0);
    }

    #[test]
    fn test_running_stats() {
        let stats = RunningStats::new();
        stats.record_sent(10);
        stats.record_sent(5);
        stats.record_received(7);
        assert_eq!(stats.total_sent(), 2);
        assert_eq!(stats.bytes_sent(), 15);
        assert_eq!(stats.total_received(), 1);
        assert_eq!(stats.bytes_received(), 7);
    }
}
