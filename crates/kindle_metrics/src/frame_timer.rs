//! Frame timing over a rolling window

use std::time::{Duration, Instant};

pub struct FrameTimer {
    frame_start: Instant,
    samples: Vec<Duration>,
    window: usize,
    cursor: usize,
    frames: u64,
}

impl FrameTimer {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            frame_start: Instant::now(),
            samples: Vec::with_capacity(window),
            window,
            cursor: 0,
            frames: 0,
        }
    }

    pub fn begin(&mut self) {
        self.frame_start = Instant::now();
    }

    pub fn end(&mut self) {
        let elapsed = self.frame_start.elapsed();
        if self.samples.len() < self.window {
            self.samples.push(elapsed);
        } else {
            self.samples[self.cursor] = elapsed;
        }
        self.cursor = (self.cursor + 1) % self.window;
        self.frames += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn average_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: Duration = self.samples.iter().sum();
        (sum / self.samples.len() as u32).as_secs_f64() * 1000.0
    }
}

impl std::fmt::Debug for FrameTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTimer")
            .field("frames", &self.frames)
            .field("average_ms", &self.average_ms())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_wraps() {
        let mut timer = FrameTimer::new(2);
        for _ in 0..5 {
            timer.begin();
            timer.end();
        }
        assert_eq!(timer.frames(), 5);
        assert_eq!(timer.samples.len(), 2);
        assert!(timer.average_ms() >= 0.0);
    }
}
