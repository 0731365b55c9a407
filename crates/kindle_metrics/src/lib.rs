//! Kindle Metrics - per-frame counters and timing
//!
//! Everything in here is compiled out unless the `metrics` feature is
//! enabled. The stubs keep the same API so callers never need `cfg`.
//!
//! ```ignore
//! use kindle_metrics::{FrameCounters, FrameTimer};
//!
//! let mut timer = FrameTimer::new(60);
//! let mut counters = FrameCounters::new();
//! timer.begin();
//! counters.add("contacts", 3);
//! timer.end();
//! counters.end_frame();
//! ```

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod frame_timer;

#[cfg(feature = "metrics")]
pub use counter::FrameCounters;
#[cfg(feature = "metrics")]
pub use frame_timer::FrameTimer;

/// Execute code only when metrics are enabled
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct FrameTimer;

#[cfg(not(feature = "metrics"))]
impl FrameTimer {
    pub fn new(_window: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) {}
    pub fn frames(&self) -> u64 { 0 }
    pub fn average_ms(&self) -> f64 { 0.0 }
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct FrameCounters;

#[cfg(not(feature = "metrics"))]
impl FrameCounters {
    pub fn new() -> Self { Self }
    pub fn add(&mut self, _name: &'static str, _value: u64) {}
    pub fn current(&self, _name: &'static str) -> u64 { 0 }
    pub fn last_frame(&self, _name: &'static str) -> u64 { 0 }
    pub fn total(&self, _name: &'static str) -> u64 { 0 }
    pub fn end_frame(&mut self) {}
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ { std::iter::empty() }
}
