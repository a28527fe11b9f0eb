//! Cancellable scheduled tasks
//!
//! Timers are plain values driven by the host clock: the owner asks whether
//! a timer is due and, if so, the timer hands back the instant it fired at.

use chrono::{DateTime, Duration, Utc};

/// Fires once after a quiet period; re-arming discards the pending deadline
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<DateTime<Utc>>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: DateTime<Utc>) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarm and return the deadline if it has passed
    pub fn fire_if_due(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                Some(deadline)
            }
            _ => None,
        }
    }
}

/// Fires repeatedly with a fixed period once started
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    next: Option<DateTime<Utc>>,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.next = Some(now + self.period);
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.next
    }

    /// Return the next due tick and schedule the one after it
    pub fn fire_if_due(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.next {
            Some(tick) if tick <= now => {
                self.next = Some(tick + self.period);
                Some(tick)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn ms(n: i64) -> Duration {
        Duration::milliseconds(n)
    }

    #[test]
    fn test_debounce_fires_once_after_delay() {
        let mut debounce = Debounce::new(ms(50));
        debounce.arm(t0());

        assert!(debounce.fire_if_due(t0() + ms(49)).is_none());
        assert_eq!(debounce.fire_if_due(t0() + ms(60)), Some(t0() + ms(50)));
        assert!(debounce.fire_if_due(t0() + ms(100)).is_none());
    }

    #[test]
    fn test_debounce_rearm_replaces_deadline() {
        let mut debounce = Debounce::new(ms(50));
        debounce.arm(t0());
        debounce.arm(t0() + ms(30));

        assert!(debounce.fire_if_due(t0() + ms(60)).is_none());
        assert_eq!(debounce.deadline(), Some(t0() + ms(80)));
    }

    #[test]
    fn test_debounce_cancel() {
        let mut debounce = Debounce::new(ms(50));
        debounce.arm(t0());
        debounce.cancel();
        assert!(!debounce.is_armed());
        assert!(debounce.fire_if_due(t0() + ms(500)).is_none());
    }

    #[test]
    fn test_interval_catches_up_one_tick_at_a_time() {
        let mut interval = Interval::new(ms(1000));
        assert!(interval.fire_if_due(t0() + ms(5000)).is_none());

        interval.start(t0());
        let now = t0() + ms(2500);
        assert_eq!(interval.fire_if_due(now), Some(t0() + ms(1000)));
        assert_eq!(interval.fire_if_due(now), Some(t0() + ms(2000)));
        assert!(interval.fire_if_due(now).is_none());

        interval.stop();
        assert!(interval.deadline().is_none());
    }
}
