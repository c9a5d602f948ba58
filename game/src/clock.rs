use std::{cell::Cell, rc::Rc};

use chrono::{DateTime, TimeDelta, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// `YYYY-MM-DD` in UTC.
    fn today_key(&self) -> String {
        self.now().format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            millis: Rc::new(Cell::new(now.timestamp_millis())),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        self.millis.set(self.millis.get() + by.num_milliseconds());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.get()).unwrap_or_default()
    }
}
