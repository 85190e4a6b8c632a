//! The day and year clock.
//!
//! Wall time drains a carry-over countdown; every crossing is one simulated
//! day. The remainder always carries into the next frame, so the day count
//! depends only on total elapsed time, never on how finely the frames slice
//! it.

use serde::{Deserialize, Serialize};
use sim_core::GameConfig;

/// Lifecycle of the clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockPhase {
    /// Pre-game gate; time does not pass until the narrative releases it.
    Idle,
    /// Days are counting.
    Running,
    /// End condition reached. Terminal.
    Finished,
}

/// Snapshot of the clock for display.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClockState {
    /// Seconds of running time consumed so far.
    pub elapsed_seconds: f64,
    /// Last begun day; 0 before the first.
    pub current_day: u64,
    /// Current year, rendered as the player's age.
    pub current_year: u32,
    /// Seconds left until the next day boundary.
    pub seconds_until_next_day: f64,
    /// Whether the end condition was reached.
    pub finished: bool,
}

/// What closing a day changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DayOutcome {
    /// Set when the day closed out a year.
    pub year_advanced: Option<u32>,
    /// Set when the day reached the end condition.
    pub finished: bool,
}

/// Carry-over day counter with a year schedule and an end condition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameClock {
    phase: ClockPhase,
    elapsed_seconds: f64,
    current_day: u64,
    current_year: u32,
    seconds_until_next_day: f64,
    seconds_per_day: f64,
    days_per_year: u64,
    final_year: u32,
    max_game_days: u64,
}

impl GameClock {
    /// Idle clock set up from the config; [`GameClock::start`] releases it.
    pub fn new(config: &GameConfig) -> Self {
        GameClock {
            phase: ClockPhase::Idle,
            elapsed_seconds: 0.0,
            current_day: 0,
            current_year: config.starting_year,
            seconds_until_next_day: config.seconds_per_day,
            seconds_per_day: config.seconds_per_day,
            days_per_year: config.days_per_year.max(1),
            final_year: config.final_year,
            max_game_days: config.max_game_days,
        }
    }

    /// Idle → Running. Any other phase is left alone.
    pub fn start(&mut self) {
        if self.phase == ClockPhase::Idle {
            self.phase = ClockPhase::Running;
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    /// Whether days are counting.
    pub fn is_running(&self) -> bool {
        self.phase == ClockPhase::Running
    }

    /// Whether the end condition was reached.
    pub fn is_finished(&self) -> bool {
        self.phase == ClockPhase::Finished
    }

    /// Last begun day.
    pub fn current_day(&self) -> u64 {
        self.current_day
    }

    /// Current year.
    pub fn current_year(&self) -> u32 {
        self.current_year
    }

    /// Feed `delta` seconds of wall time and return how many day boundaries
    /// were crossed. The whole backlog settles in one call, however large
    /// `delta` is. Counts nothing while not Running; negative or non-finite
    /// deltas are ignored.
    pub fn accumulate(&mut self, delta: f64) -> u64 {
        if self.phase != ClockPhase::Running || !delta.is_finite() || delta <= 0.0 {
            return 0;
        }
        self.elapsed_seconds += delta;
        self.seconds_until_next_day -= delta;
        if self.seconds_until_next_day > 0.0 {
            return 0;
        }
        // One arithmetic step covers any backlog; the remainder re-arms the
        // countdown in (0, seconds_per_day].
        let deficit = -self.seconds_until_next_day;
        let crossings = (deficit / self.seconds_per_day).floor() + 1.0;
        self.seconds_until_next_day =
            self.seconds_per_day - deficit.rem_euclid(self.seconds_per_day);
        crossings as u64
    }

    /// Open the next day and return its number. Only moves while Running.
    pub fn begin_day(&mut self) -> u64 {
        if self.phase == ClockPhase::Running {
            self.current_day += 1;
        }
        self.current_day
    }

    /// Close the day: roll the year on its boundary, then check the end
    /// condition. Once Finished, no counter ever changes again.
    pub fn end_day(&mut self) -> DayOutcome {
        let mut outcome = DayOutcome::default();
        if self.phase != ClockPhase::Running {
            return outcome;
        }
        if self.current_day > 0 && self.current_day % self.days_per_year == 0 {
            self.current_year += 1;
            outcome.year_advanced = Some(self.current_year);
        }
        if self.current_year >= self.final_year || self.current_day >= self.max_game_days {
            self.phase = ClockPhase::Finished;
            outcome.finished = true;
        }
        outcome
    }

    /// Snapshot for display.
    pub fn state(&self) -> ClockState {
        ClockState {
            elapsed_seconds: self.elapsed_seconds,
            current_day: self.current_day,
            current_year: self.current_year,
            seconds_until_next_day: self.seconds_until_next_day,
            finished: self.is_finished(),
        }
    }
}
