//! Fixed-step simulation clock

use std::time::Duration;

/// Default simulation tick rate.
pub const TICK_RATE_HZ: u32 = 60;

/// Counts fixed simulation ticks.
#[derive(Debug, Clone)]
pub struct FrameClock {
    tick_count: u64,
    tick_duration: Duration,
    accumulated_time: Duration,
}

impl FrameClock {
    pub fn new(tick_rate_hz: u32) -> Self {
        let rate = tick_rate_hz.max(1);
        Self {
            tick_count: 0,
            tick_duration: Duration::from_secs(1) / rate,
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Length of one tick in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.tick_duration.as_secs_f32()
    }

    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
        self.accumulated_time += self.tick_duration;
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(TICK_RATE_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_accumulate() {
        let mut clock = FrameClock::new(50);
        for _ in 0..5 {
            clock.advance_tick();
        }
        assert_eq!(clock.tick_count(), 5);
        assert_eq!(clock.total_time(), Duration::from_millis(100));
        assert!((clock.delta_seconds() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn zero_rate_is_clamped() {
        assert_eq!(FrameClock::new(0).tick_duration(), Duration::from_secs(1));
    }
}
