use std::time::Instant;

/// Monotonic seconds since the session started.
///
/// Shared by the network task (to stamp update arrival) and the render
/// side (to interpolate), so both read the same timeline.
#[derive(Debug, Clone, Copy)]
pub struct RenderClock {
    epoch: Instant,
}

impl RenderClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    pub fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

impl Default for RenderClock {
    fn default() -> Self {
        Self::new()
    }
}
