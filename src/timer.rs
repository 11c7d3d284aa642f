//! Level-two countdown.

use std::time::Duration;

const SECOND: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { remaining: u32 },
    Expired,
}

/// Whole-second countdown driven by frame deltas.
#[derive(Debug, Clone, Default)]
pub struct RoundTimer {
    remaining: u32,
    active: bool,
    carry: Duration,
}

impl RoundTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, seconds: u32) {
        self.remaining = seconds;
        self.carry = Duration::ZERO;
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// One `Tick` per elapsed second; `Expired` once, when the count reaches zero.
    pub fn tick(&mut self, dt: Duration) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        if !self.active {
            return events;
        }
        if self.remaining == 0 {
            self.active = false;
            events.push(TimerEvent::Expired);
            return events;
        }
        self.carry += dt;
        while self.carry >= SECOND {
            self.carry -= SECOND;
            self.remaining -= 1;
            events.push(TimerEvent::Tick {
                remaining: self.remaining,
            });
            if self.remaining == 0 {
                self.active = false;
                events.push(TimerEvent::Expired);
                break;
            }
        }
        events
    }
}

/// `M:SS`.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_whole_seconds_across_frames() {
        let mut t = RoundTimer::new();
        t.start(3);
        assert!(t.tick(Duration::from_millis(600)).is_empty());
        assert_eq!(
            t.tick(Duration::from_millis(600)),
            vec![TimerEvent::Tick { remaining: 2 }]
        );
        assert_eq!(t.remaining(), 2);
    }

    #[test]
    fn expires_exactly_once() {
        let mut t = RoundTimer::new();
        t.start(2);
        let events = t.tick(Duration::from_secs(5));
        assert_eq!(
            events,
            vec![
                TimerEvent::Tick { remaining: 1 },
                TimerEvent::Tick { remaining: 0 },
                TimerEvent::Expired
            ]
        );
        assert!(!t.is_active());
        assert!(t.tick(Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn stopped_timer_is_silent() {
        let mut t = RoundTimer::new();
        t.start(60);
        t.stop();
        assert!(t.tick(Duration::from_secs(2)).is_empty());
        assert_eq!(t.remaining(), 60);
    }

    #[test]
    fn zero_second_round_expires_on_first_tick() {
        let mut t = RoundTimer::new();
        t.start(0);
        assert_eq!(t.tick(Duration::ZERO), vec![TimerEvent::Expired]);
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(60), "1:00");
        assert_eq!(format_clock(59), "0:59");
        assert_eq!(format_clock(5), "0:05");
        assert_eq!(format_clock(0), "0:00");
    }
}
