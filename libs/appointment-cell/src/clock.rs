// libs/appointment-cell/src/clock.rs
use chrono::{DateTime, Duration, Timelike, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Truncates `date` to the top of its hour.
pub fn start_of_hour(date: DateTime<Utc>) -> DateTime<Utc> {
    date - Duration::minutes(i64::from(date.minute()))
        - Duration::seconds(i64::from(date.second()))
        - Duration::nanoseconds(i64::from(date.nanosecond()))
}
