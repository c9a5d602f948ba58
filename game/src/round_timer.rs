use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const TICK: Duration = Duration::from_secs(1);

/// Countdown for time-boxed sessions, advanced by whole one-second ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTimer {
    #[serde(with = "crate::serde_duration")]
    elapsed: Duration,
    #[serde(with = "crate::serde_duration")]
    limit: Duration,
    running: bool,
}

impl RoundTimer {
    pub fn new(limit: Duration) -> Self {
        Self {
            elapsed: Duration::ZERO,
            limit,
            running: true,
        }
    }

    /// Stop counting; later ticks are ignored until `resume`.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Continue from where `stop` left off.
    pub fn resume(&mut self) {
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed)
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining().as_secs()
    }

    pub fn is_up(&self) -> bool {
        self.elapsed >= self.limit
    }

    /// Advance one tick. Returns true only on the tick that runs the clock out.
    pub fn tick(&mut self) -> bool {
        if !self.running || self.is_up() {
            return false;
        }
        self.elapsed = self.elapsed.saturating_add(TICK);
        self.is_up()
    }
}

/// `m:ss`, the way the countdown is shown to the player.
pub fn format_clock(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_exactly_once_at_the_limit() {
        let mut t = RoundTimer::new(Duration::from_secs(3));
        assert!(!t.tick());
        assert!(!t.tick());
        assert_eq!(t.remaining_secs(), 1);
        assert!(t.tick());
        assert!(t.is_up());
        assert_eq!(t.remaining(), Duration::ZERO);

        // Once up, it stays up and doesn't keep accumulating.
        assert!(!t.tick());
        assert_eq!(t.elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn stopped_timer_ignores_ticks() {
        let mut t = RoundTimer::new(Duration::from_secs(20));
        t.tick();
        t.stop();
        t.tick();
        assert_eq!(t.elapsed(), Duration::from_secs(1));
        assert!(!t.is_running());

        t.resume();
        t.tick();
        assert_eq!(t.remaining(), Duration::from_secs(18));
    }

    #[test]
    fn clock_format_pads_seconds() {
        assert_eq!(format_clock(Duration::from_secs(300)), "5:00");
        assert_eq!(format_clock(Duration::from_secs(61)), "1:01");
        assert_eq!(format_clock(Duration::ZERO), "0:00");
    }
}
