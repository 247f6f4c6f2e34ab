//! How long a producer waits for the worker, and how often it looks.
use std::time::Duration;

/// Doubling wait intervals, capped by a total budget.
///
/// With the defaults the producer sleeps 0.2, 0.4, 0.8 and 1.6 seconds,
/// 3 seconds in total. The next interval (3.2s) would exceed the budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    interval: Duration,
    budget: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            budget: Duration::from_secs(3),
        }
    }
}

impl Backoff {
    pub fn new(interval: Duration, budget: Duration) -> Self {
        Self { interval, budget }
    }

    /// Don't wait at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// The sleeps, in order.
    pub fn intervals(&self) -> Intervals {
        Intervals {
            next: self.interval,
            total: Duration::ZERO,
            budget: self.budget,
        }
    }
}

/// Iterator over the sleeps of a [`Backoff`].
#[derive(Debug, Clone)]
pub struct Intervals {
    next: Duration,
    total: Duration,
    budget: Duration,
}

impl Iterator for Intervals {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.next.is_zero() || self.total + self.next > self.budget {
            return None;
        }

        let interval = self.next;
        self.total += interval;
        self.next = interval * 2;

        Some(interval)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let intervals = Backoff::default().intervals().collect::<Vec<_>>();
        assert_eq!(
            intervals,
            vec![
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
                Duration::from_millis(1600),
            ]
        );
        assert_eq!(
            intervals.iter().sum::<Duration>(),
            Backoff::default().budget()
        );
    }

    #[test]
    fn test_budget_caps_schedule() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(500));
        let intervals = backoff.intervals().collect::<Vec<_>>();
        // 100 + 200 = 300; adding 400 would go over.
        assert_eq!(
            intervals,
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );

        assert_eq!(Backoff::none().intervals().count(), 0);
        assert_eq!(
            Backoff::new(Duration::from_secs(1), Duration::from_millis(999))
                .intervals()
                .count(),
            0
        );
    }
}
