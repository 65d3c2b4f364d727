use std::{thread, time::Duration};

use rand::Rng;
use tracing::debug;

use crate::config::RunConfig;

/// Delay inserted between lifecycle stages.
pub trait Pacer {
    fn pause(&mut self);
}

/// Sleeps `base` plus a uniform jitter in `0..jitter`.
#[derive(Clone, Copy, Debug)]
pub struct RandomPacer {
    base: Duration,
    jitter: Duration,
}

impl RandomPacer {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    pub fn from_config(run: &RunConfig) -> Self {
        Self::new(
            Duration::from_millis(run.pacing_base_ms),
            Duration::from_millis(run.pacing_jitter_ms),
        )
    }

    pub(crate) fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..jitter_ms)
        };
        self.base + Duration::from_millis(extra)
    }
}

impl Default for RandomPacer {
    fn default() -> Self {
        Self::from_config(&RunConfig::default())
    }
}

impl Pacer for RandomPacer {
    fn pause(&mut self) {
        let delay = self.next_delay();
        debug!(delay_ms = delay.as_millis() as u64, "pausing");
        thread::sleep(delay);
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoPacing;

impl Pacer for NoPacing {
    fn pause(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_stays_within_bounds() {
        let pacer = RandomPacer::new(Duration::from_millis(500), Duration::from_millis(500));
        for _ in 0..100 {
            let delay = pacer.next_delay();
            assert!(delay >= Duration::from_millis(500));
            assert!(delay < Duration::from_millis(1000));
        }
    }

    #[test]
    fn zero_jitter_is_exact() {
        let pacer = RandomPacer::new(Duration::from_millis(3), Duration::ZERO);
        assert_eq!(pacer.next_delay(), Duration::from_millis(3));
    }
}
