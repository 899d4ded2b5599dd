//! Tick playback clock.
//!
//! The clock owns the playback state machine and decides, for a given
//! instant, how many simulation ticks are due. It never sleeps or spawns:
//! the frame loop polls it and asks for a repaint after
//! [`PlaybackClock::time_until_next`].

use std::time::{Duration, Instant};
use tracing::debug;

/// Wall-clock interval between ticks at 1x
pub const BASE_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Ticks a single poll may catch up after a stalled frame
const MAX_CATCH_UP: u32 = 10;

/// Playback speed multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Speed {
    #[default]
    X1,
    X2,
    X5,
    X10,
}

impl Speed {
    pub const ALL: [Speed; 4] = [Speed::X1, Speed::X2, Speed::X5, Speed::X10];

    pub fn multiplier(self) -> u32 {
        match self {
            Speed::X1 => 1,
            Speed::X2 => 2,
            Speed::X5 => 5,
            Speed::X10 => 10,
        }
    }

    /// Closest supported speed; ties go to the slower one
    pub fn nearest(n: u32) -> Self {
        let mut best = Speed::X1;
        for speed in Self::ALL {
            if speed.multiplier().abs_diff(n) < best.multiplier().abs_diff(n) {
                best = speed;
            }
        }
        best
    }

    pub fn label(self) -> &'static str {
        match self {
            Speed::X1 => "1x",
            Speed::X2 => "2x",
            Speed::X5 => "5x",
            Speed::X10 => "10x",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockPhase {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

impl ClockPhase {
    pub fn label(self) -> &'static str {
        match self {
            ClockPhase::Idle => "Ready",
            ClockPhase::Running => "Playing",
            ClockPhase::Paused => "Paused",
            ClockPhase::Completed => "Finished",
        }
    }
}

/// Read-only snapshot handed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    pub current_tick: u32,
    pub max_ticks: u32,
    pub speed: Speed,
    pub playing: bool,
}

#[derive(Debug, Clone)]
pub struct PlaybackClock {
    current_tick: u32,
    max_ticks: u32,
    speed: Speed,
    phase: ClockPhase,
    /// Instant the last tick fired (or playback started)
    last_tick: Option<Instant>,
}

impl PlaybackClock {
    pub fn new(max_ticks: u32) -> Self {
        Self {
            current_tick: 0,
            max_ticks,
            speed: Speed::X1,
            phase: ClockPhase::Idle,
            last_tick: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            current_tick: self.current_tick,
            max_ticks: self.max_ticks,
            speed: self.speed,
            playing: self.is_playing(),
        }
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase == ClockPhase::Running
    }

    pub fn current_tick(&self) -> u32 {
        self.current_tick
    }

    pub fn max_ticks(&self) -> u32 {
        self.max_ticks
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    /// Start or resume playback. No-op once the last tick is reached.
    pub fn play(&mut self) {
        if self.current_tick >= self.max_ticks {
            self.phase = ClockPhase::Completed;
            return;
        }
        if self.phase != ClockPhase::Running {
            self.phase = ClockPhase::Running;
            self.last_tick = None;
            debug!(tick = self.current_tick, "playback started");
        }
    }

    pub fn pause(&mut self) {
        if self.phase == ClockPhase::Running {
            self.phase = ClockPhase::Paused;
            self.last_tick = None;
        }
    }

    pub fn toggle(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jump to `tick`, clamped into `[0, max_ticks]`
    pub fn seek(&mut self, tick: i64) {
        self.current_tick = tick.clamp(0, self.max_ticks as i64) as u32;
        if self.current_tick >= self.max_ticks {
            self.phase = ClockPhase::Completed;
        } else if self.phase == ClockPhase::Completed {
            self.phase = ClockPhase::Paused;
        }
        self.last_tick = None;
    }

    /// Set the multiplier, snapping to the nearest of 1, 2, 5 or 10
    pub fn set_speed(&mut self, n: u32) {
        self.speed = Speed::nearest(n);
    }

    pub fn reset(&mut self) {
        self.current_tick = 0;
        self.phase = ClockPhase::Idle;
        self.last_tick = None;
    }

    /// Wall-clock time between ticks at the current speed
    pub fn interval(&self) -> Duration {
        BASE_TICK_INTERVAL / self.speed.multiplier()
    }

    /// Advance the clock to `now` and return how many ticks fired.
    ///
    /// The first poll after `play` only arms the timer. Reaching
    /// `max_ticks` completes playback.
    pub fn poll(&mut self, now: Instant) -> u32 {
        if !self.is_playing() {
            return 0;
        }
        let Some(last) = self.last_tick else {
            self.last_tick = Some(now);
            return 0;
        };

        let interval = self.interval();
        let elapsed = now.saturating_duration_since(last);
        let due = (elapsed.as_nanos() / interval.as_nanos()) as u32;
        if due == 0 {
            return 0;
        }

        let remaining = self.max_ticks - self.current_tick;
        let fired = due.min(MAX_CATCH_UP).min(remaining);
        self.current_tick += fired;
        self.last_tick = if due > MAX_CATCH_UP {
            Some(now)
        } else {
            Some(last + interval * fired)
        };

        if self.current_tick >= self.max_ticks {
            self.phase = ClockPhase::Completed;
            debug!(max_ticks = self.max_ticks, "playback completed");
        }
        fired
    }

    /// Delay until the next tick is due, `None` while not playing
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        if !self.is_playing() {
            return None;
        }
        let interval = self.interval();
        Some(match self.last_tick {
            Some(last) => interval.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    /// Poll at 60 fps until playback stops, returning the frame count
    fn frames_to_complete(clock: &mut PlaybackClock) -> u32 {
        let mut now = Instant::now();
        let mut frames = 0;
        clock.play();
        while clock.is_playing() && frames < 100_000 {
            clock.poll(now);
            now += FRAME;
            frames += 1;
        }
        frames
    }

    #[test]
    fn play_at_max_ticks_is_noop() {
        let mut clock = PlaybackClock::new(50);
        clock.seek(50);
        clock.play();
        assert!(!clock.state().playing);
        assert_eq!(clock.current_tick(), 50);
        assert_eq!(clock.phase(), ClockPhase::Completed);
    }

    #[test]
    fn faster_speed_completes_in_fewer_frames() {
        let mut slow = PlaybackClock::new(50);
        let mut fast = PlaybackClock::new(50);
        fast.set_speed(10);

        let slow_frames = frames_to_complete(&mut slow);
        let fast_frames = frames_to_complete(&mut fast);
        assert!(fast_frames < slow_frames, "{fast_frames} vs {slow_frames}");
        assert_eq!(slow.current_tick(), 50);
        assert_eq!(fast.current_tick(), 50);
    }

    #[test]
    fn completion_stops_playback() {
        let mut clock = PlaybackClock::new(3);
        frames_to_complete(&mut clock);
        assert_eq!(clock.phase(), ClockPhase::Completed);
        assert!(!clock.is_playing());
        assert_eq!(clock.poll(Instant::now() + Duration::from_secs(5)), 0);
    }

    #[test]
    fn ticks_are_throttled_by_interval() {
        let mut clock = PlaybackClock::new(50);
        let start = Instant::now();
        clock.play();
        assert_eq!(clock.poll(start), 0);
        assert_eq!(clock.poll(start + Duration::from_millis(30)), 0);
        assert_eq!(clock.poll(start + Duration::from_millis(50)), 1);
        assert_eq!(clock.poll(start + Duration::from_millis(160)), 2);
        assert_eq!(clock.current_tick(), 3);
    }

    #[test]
    fn stalled_frame_catch_up_is_bounded() {
        let mut clock = PlaybackClock::new(500);
        let start = Instant::now();
        clock.play();
        clock.poll(start);
        assert_eq!(clock.poll(start + Duration::from_secs(10)), MAX_CATCH_UP);
    }

    #[test]
    fn seek_clamps_into_range() {
        let mut clock = PlaybackClock::new(50);
        clock.seek(-7);
        assert_eq!(clock.current_tick(), 0);
        clock.seek(999);
        assert_eq!(clock.current_tick(), 50);
        clock.seek(20);
        assert_eq!(clock.current_tick(), 20);
        assert_eq!(clock.phase(), ClockPhase::Paused);
    }

    #[test]
    fn pause_keeps_tick() {
        let mut clock = PlaybackClock::new(50);
        let start = Instant::now();
        clock.play();
        clock.poll(start);
        clock.poll(start + Duration::from_millis(120));
        clock.pause();
        let tick = clock.current_tick();
        assert_eq!(clock.poll(start + Duration::from_secs(3)), 0);
        assert_eq!(clock.current_tick(), tick);
        assert_eq!(clock.phase(), ClockPhase::Paused);
        assert_eq!(clock.time_until_next(start), None);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut clock = PlaybackClock::new(10);
        frames_to_complete(&mut clock);
        clock.reset();
        assert_eq!(clock.current_tick(), 0);
        assert_eq!(clock.phase(), ClockPhase::Idle);
        clock.play();
        assert!(clock.is_playing());
    }

    #[test]
    fn speed_snaps_to_supported_values() {
        assert_eq!(Speed::nearest(0), Speed::X1);
        assert_eq!(Speed::nearest(3), Speed::X2);
        assert_eq!(Speed::nearest(4), Speed::X5);
        assert_eq!(Speed::nearest(8), Speed::X10);
        assert_eq!(Speed::nearest(100), Speed::X10);
    }

    #[test]
    fn interval_scales_with_speed() {
        let mut clock = PlaybackClock::new(10);
        assert_eq!(clock.interval(), Duration::from_millis(50));
        clock.set_speed(5);
        assert_eq!(clock.interval(), Duration::from_millis(10));
    }
}
