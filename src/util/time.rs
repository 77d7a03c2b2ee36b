//! Time utilities for the simulation and uptime tracking

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Server start time for uptime tracking
static SERVER_START: OnceLock<Instant> = OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Number of ticks covering `interval`, never less than one
pub fn ticks_per_interval(interval: Duration, tick: Duration) -> u32 {
    if tick.is_zero() {
        return 1;
    }

    let ticks = interval.as_micros() / tick.as_micros().max(1);
    u32::try_from(ticks).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_per_interval() {
        let tick = Duration::from_millis(20);
        assert_eq!(ticks_per_interval(Duration::from_millis(5_000), tick), 250);
        assert_eq!(ticks_per_interval(Duration::from_millis(10_000), tick), 500);
        assert_eq!(ticks_per_interval(Duration::from_millis(30), tick), 1);
        assert_eq!(ticks_per_interval(Duration::from_millis(5), tick), 1);
        assert_eq!(ticks_per_interval(Duration::from_secs(1), Duration::ZERO), 1);
    }

    #[test]
    fn test_uptime_starts_after_init() {
        init_server_time();
        assert!(uptime_secs() < 60);
    }
}
