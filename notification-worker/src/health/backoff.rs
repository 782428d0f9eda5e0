use std::time::Duration;

use rand::Rng;

/// Smallest base delay. A zero base would stay zero under doubling.
const MIN_DELAY: Duration = Duration::from_millis(1);

/// Capped exponential backoff that never runs out.
///
/// Each step doubles the base delay up to `cap`. The yielded delay keeps half
/// of the base and randomizes the other half, so replicas restarting together
/// do not poll in lockstep.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    cap: Duration,
    multiplier: u32,
}

impl Backoff {
    pub fn new(initial: Duration, cap: Duration) -> Self {
        let cap = cap.max(MIN_DELAY);
        Self {
            current: initial.clamp(MIN_DELAY, cap),
            cap,
            multiplier: 2,
        }
    }

    /// Base delay of the next step, before jitter.
    pub fn base(&self) -> Duration {
        self.current
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(250), Duration::from_secs(30))
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        let base = self.current;
        self.current = self
            .current
            .checked_mul(self.multiplier)
            .unwrap_or(self.cap)
            .min(self.cap);

        let half = base / 2;
        let jitter_ms = half.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };

        Some(half + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_base_doubles_until_cap() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(1000));
        let mut bases = Vec::new();

        for _ in 0..6 {
            bases.push(backoff.base());
            backoff.next();
        }

        assert_eq!(
            bases,
            [100, 200, 400, 800, 1000, 1000].map(Duration::from_millis)
        );
    }

    #[test]
    fn test_backoff_never_ends() {
        let backoff = Backoff::new(Duration::from_millis(1), Duration::from_millis(4));
        assert_eq!(backoff.take(1000).count(), 1000);
    }

    #[test]
    fn test_backoff_delay_stays_within_jitter_band() {
        let mut backoff = Backoff::new(Duration::from_millis(400), Duration::from_secs(10));

        for _ in 0..20 {
            let base = backoff.base();
            let delay = backoff.next().unwrap();
            assert!(delay >= base / 2);
            assert!(delay <= base);
        }
    }

    #[test]
    fn test_backoff_zero_initial_still_grows() {
        let mut backoff = Backoff::new(Duration::ZERO, Duration::from_millis(30_000));
        assert_eq!(backoff.base(), Duration::from_millis(1));

        for _ in 0..4 {
            backoff.next();
        }
        assert_eq!(backoff.base(), Duration::from_millis(16));
    }

    #[test]
    fn test_backoff_initial_is_clamped_to_cap() {
        let backoff = Backoff::new(Duration::from_secs(60), Duration::from_secs(5));
        assert_eq!(backoff.base(), Duration::from_secs(5));
    }
}
