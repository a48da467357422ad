//! Timer chain and generation guard of a watch session.
//!
//! Every timer carries the generation it was issued under. Toggling the watch
//! advances the generation, which clears pending timers and makes any
//! continuation still in flight (a fetch, a countdown tick) refuse to run.
//!
//! The scheduler never reads the clock; callers pass `now` in.

use std::time::{Duration, Instant};

/// Countdown tick period
pub const TICK: Duration = Duration::from_secs(1);

/// A timer that came due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Start the next poll cycle
    Poll { generation: u64 },
    /// Countdown display update
    Tick { generation: u64, remaining: u64 },
}

#[derive(Debug, Clone, Copy)]
struct PendingPoll {
    generation: u64,
    at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Countdown {
    generation: u64,
    remaining: u64,
    next_tick: Instant,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    generation: u64,
    poll: Option<PendingPoll>,
    countdown: Option<Countdown>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Cancel everything pending and open a new generation
    pub fn start_generation(&mut self) -> u64 {
        self.cancel_all();
        self.generation
    }

    /// Clear both timers and invalidate in-flight work
    pub fn cancel_all(&mut self) {
        self.poll = None;
        self.countdown = None;
        self.generation += 1;
    }

    /// Arm the next poll after `interval` and a countdown towards it.
    ///
    /// Refused (returns false) when `generation` is stale or the deadline
    /// is not representable.
    pub fn schedule_poll(&mut self, generation: u64, interval: Duration, now: Instant) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        let Some(at) = now.checked_add(interval) else {
            return false;
        };
        self.poll = Some(PendingPoll { generation, at });
        let remaining = interval.as_secs();
        self.countdown = (remaining > 0).then(|| Countdown {
            generation,
            remaining,
            next_tick: now + TICK,
        });
        true
    }

    /// Seconds left on the visible countdown, if one is running
    pub fn remaining(&self) -> Option<u64> {
        self.countdown.map(|c| c.remaining)
    }

    /// Earliest instant at which a timer comes due
    pub fn next_deadline(&self) -> Option<Instant> {
        let poll = self.poll.map(|p| p.at);
        let tick = self.countdown.map(|c| c.next_tick);
        match (poll, tick) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Pop every timer due at `now`, countdown ticks first
    pub fn due(&mut self, now: Instant) -> Vec<Timer> {
        let mut fired = Vec::new();

        while let Some(mut countdown) = self.countdown {
            if countdown.next_tick > now || countdown.remaining == 0 {
                break;
            }
            countdown.remaining -= 1;
            countdown.next_tick += TICK;
            fired.push(Timer::Tick {
                generation: countdown.generation,
                remaining: countdown.remaining,
            });
            self.countdown = (countdown.remaining > 0).then_some(countdown);
        }

        if let Some(poll) = self.poll {
            if poll.at <= now {
                self.poll = None;
                self.countdown = None;
                fired.push(Timer::Poll { generation: poll.generation });
            }
        }

        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_starts_at_zero_and_increments() {
        let mut s = Scheduler::new();
        assert_eq!(s.generation(), 0);
        assert_eq!(s.start_generation(), 1);
        s.cancel_all();
        assert_eq!(s.generation(), 2);
        assert!(!s.is_current(1));
    }

    #[test]
    fn test_stale_generation_cannot_schedule() {
        let mut s = Scheduler::new();
        let old = s.start_generation();
        let new = s.start_generation();
        let now = Instant::now();
        assert!(!s.schedule_poll(old, Duration::from_secs(30), now));
        assert!(s.next_deadline().is_none());
        assert!(s.schedule_poll(new, Duration::from_secs(30), now));
        assert_eq!(s.next_deadline(), Some(now + TICK));
    }

    #[test]
    fn test_countdown_then_poll() {
        let mut s = Scheduler::new();
        let gen = s.start_generation();
        let now = Instant::now();
        s.schedule_poll(gen, Duration::from_secs(3), now);
        assert_eq!(s.remaining(), Some(3));
        assert_eq!(s.next_deadline(), Some(now + TICK));

        assert_eq!(s.due(now + TICK), vec![Timer::Tick { generation: gen, remaining: 2 }]);
        assert_eq!(s.due(now + TICK * 2), vec![Timer::Tick { generation: gen, remaining: 1 }]);
        assert_eq!(
            s.due(now + TICK * 3),
            vec![
                Timer::Tick { generation: gen, remaining: 0 },
                Timer::Poll { generation: gen },
            ]
        );
        assert!(s.next_deadline().is_none());
    }

    #[test]
    fn test_late_wakeup_catches_up() {
        let mut s = Scheduler::new();
        let gen = s.start_generation();
        let now = Instant::now();
        s.schedule_poll(gen, Duration::from_secs(5), now);
        let fired = s.due(now + Duration::from_secs(10));
        assert_eq!(fired.len(), 6);
        assert_eq!(fired.last(), Some(&Timer::Poll { generation: gen }));
    }

    #[test]
    fn test_unrepresentable_deadline_is_refused() {
        let mut s = Scheduler::new();
        let gen = s.start_generation();
        assert!(!s.schedule_poll(gen, Duration::MAX, Instant::now()));
        assert!(s.next_deadline().is_none());
        assert!(s.remaining().is_none());
    }

    #[test]
    fn test_cancel_clears_timers() {
        let mut s = Scheduler::new();
        let gen = s.start_generation();
        let now = Instant::now();
        s.schedule_poll(gen, Duration::from_secs(30), now);
        s.cancel_all();
        assert!(s.next_deadline().is_none());
        assert!(s.due(now + Duration::from_secs(60)).is_empty());
    }
}
