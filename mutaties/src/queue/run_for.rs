//! How long a worker runs before it exits.
//!
//! Workers are started by cron and stop on their own; the next one picks up where the
//! previous one left off.
use std::time::Duration;
use time::OffsetDateTime;

use super::Error;

/// Run lengths accepted on the command line, in minutes.
pub const DURATIONS: [u32; 10] = [1, 2, 5, 7, 10, 15, 20, 30, 45, 60];

/// Worker run time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunFor {
    duration: u32,
    stop_minute: Option<u8>,
    quick: bool,
    margin: Duration,
}

impl RunFor {
    /// Run for this many minutes.
    pub fn new(duration: u32) -> Result<Self, Error> {
        if !DURATIONS.contains(&duration) {
            return Err(Error::Duration(duration));
        }

        Ok(Self {
            duration,
            stop_minute: None,
            quick: false,
            margin: Duration::ZERO,
        })
    }

    /// Stop at the start of this minute of the hour, if that comes before the
    /// run time is up. Ignored if it's the minute the worker starts in.
    pub fn stop_exactly(mut self, minute: u8) -> Result<Self, Error> {
        if minute >= 60 {
            return Err(Error::StopMinute(minute));
        }

        self.stop_minute = Some(minute);
        Ok(self)
    }

    /// Count the duration in seconds instead of minutes. Margin and stop minute
    /// don't apply.
    pub fn quick(mut self) -> Self {
        self.quick = true;
        self
    }

    /// Stop this much earlier.
    pub fn margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// When a worker started at `now` should stop.
    pub fn stop_at(&self, now: OffsetDateTime) -> OffsetDateTime {
        if self.quick {
            return now + Duration::from_secs(self.duration as u64);
        }

        let mut stop_at = now + Duration::from_secs(self.duration as u64 * 60) - self.margin;

        if let Some(minute) = self.stop_minute {
            let delta = (minute as i64 - now.minute() as i64).rem_euclid(60);

            if delta != 0 {
                let exact = now + time::Duration::minutes(delta);
                let exact = exact
                    - time::Duration::new(exact.second() as i64, exact.nanosecond() as i32);

                if exact < stop_at {
                    stop_at = exact;
                }
            }
        }

        stop_at
    }

    /// How long a worker started at `now` runs.
    pub fn run_time(&self, now: OffsetDateTime) -> Duration {
        Duration::try_from(self.stop_at(now) - now).unwrap_or(Duration::ZERO)
    }
}

/// Current local time, or UTC if the local offset can't be determined.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
mod test {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_durations() {
        assert!(RunFor::new(7).is_ok());
        assert!(matches!(RunFor::new(3), Err(Error::Duration(3))));
        assert!(matches!(RunFor::new(0), Err(Error::Duration(0))));
        assert!(matches!(
            RunFor::new(5).unwrap().stop_exactly(60),
            Err(Error::StopMinute(60))
        ));
    }

    #[test]
    fn test_stop_at() {
        let now = datetime!(2024-03-01 10:12:34 UTC);

        assert_eq!(
            RunFor::new(60).unwrap().stop_at(now),
            datetime!(2024-03-01 11:12:34 UTC)
        );
        assert_eq!(
            RunFor::new(1)
                .unwrap()
                .margin(Duration::from_secs(15))
                .run_time(now),
            Duration::from_secs(45)
        );
        assert_eq!(
            RunFor::new(5).unwrap().quick().run_time(now),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_stop_exactly() {
        let now = datetime!(2024-03-01 10:12:34 UTC);

        // Minute comes before the run time is up.
        assert_eq!(
            RunFor::new(60).unwrap().stop_exactly(30).unwrap().stop_at(now),
            datetime!(2024-03-01 10:30:00 UTC)
        );

        // Wraps into the next hour.
        assert_eq!(
            RunFor::new(60).unwrap().stop_exactly(5).unwrap().stop_at(now),
            datetime!(2024-03-01 11:05:00 UTC)
        );

        // Run time is up first.
        assert_eq!(
            RunFor::new(5).unwrap().stop_exactly(30).unwrap().stop_at(now),
            datetime!(2024-03-01 10:17:34 UTC)
        );

        // Current minute is ignored.
        assert_eq!(
            RunFor::new(2).unwrap().stop_exactly(12).unwrap().stop_at(now),
            datetime!(2024-03-01 10:14:34 UTC)
        );

        // Quick ignores the stop minute.
        assert_eq!(
            RunFor::new(2)
                .unwrap()
                .stop_exactly(13)
                .unwrap()
                .quick()
                .stop_at(now),
            datetime!(2024-03-01 10:12:36 UTC)
        );
    }
}
