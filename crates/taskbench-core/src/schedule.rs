//! Repetition and rate settings for task sequences, plus the fixed-delay
//! pacer used to enforce a rate.

use crate::error::ConfigError;
use crate::stop::StopSignal;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Repetitions
// ---------------------------------------------------------------------------

/// How many times a sequence runs its children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Repetitions {
    /// A fixed number of passes. Zero is allowed and runs nothing.
    Count(u32),
    /// Repeat until a child reports that its content source is drained.
    Exhaust,
    /// Repeat until the wall-clock duration has elapsed.
    RunTime(Duration),
}

impl Default for Repetitions {
    fn default() -> Self {
        Repetitions::Count(1)
    }
}

impl Repetitions {
    /// Number of passes for count-based repetitions. `None` for the
    /// open-ended variants.
    pub fn count(&self) -> Option<u32> {
        match self {
            Repetitions::Count(n) => Some(*n),
            _ => None,
        }
    }
}

impl FromStr for Repetitions {
    type Err = ConfigError;

    /// Accepts `N`, `*` / `EXHAUST`, or a duration in seconds such as
    /// `2.5s` or `.5s`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ConfigError::InvalidRepetitions(s.to_string());

        if trimmed == "*" || trimmed.eq_ignore_ascii_case("exhaust") {
            return Ok(Repetitions::Exhaust);
        }
        if let Some(secs) = trimmed.strip_suffix('s') {
            let secs: f64 = secs.trim().parse().map_err(|_| invalid())?;
            if secs <= 0.0 {
                return Err(invalid());
            }
            let run_time = Duration::try_from_secs_f64(secs).map_err(|_| invalid())?;
            return Ok(Repetitions::RunTime(run_time));
        }
        trimmed.parse::<u32>().map(Repetitions::Count).map_err(|_| invalid())
    }
}

// ---------------------------------------------------------------------------
// Rate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    PerSecond,
    PerMinute,
}

impl RateUnit {
    fn period(self) -> Duration {
        match self {
            RateUnit::PerSecond => Duration::from_secs(1),
            RateUnit::PerMinute => Duration::from_secs(60),
        }
    }

    fn label(self) -> &'static str {
        match self {
            RateUnit::PerSecond => "sec",
            RateUnit::PerMinute => "min",
        }
    }
}

/// A throttle on how often a sequence starts work: `count` starts per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    pub count: u32,
    pub unit: RateUnit,
}

impl Rate {
    pub fn per_second(count: u32) -> Result<Self, ConfigError> {
        Self::new(count, RateUnit::PerSecond)
    }

    pub fn per_minute(count: u32) -> Result<Self, ConfigError> {
        Self::new(count, RateUnit::PerMinute)
    }

    pub fn new(count: u32, unit: RateUnit) -> Result<Self, ConfigError> {
        if count == 0 {
            return Err(ConfigError::InvalidRate(format!("{count}/{}", unit.label())));
        }
        Ok(Self { count, unit })
    }

    /// Fixed delay between consecutive starts.
    pub fn step(&self) -> Duration {
        self.unit.period() / self.count
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.count, self.unit.label())
    }
}

impl FromStr for Rate {
    type Err = ConfigError;

    /// Accepts `N`, `N/sec` or `N/min`; a bare number is per second.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidRate(s.to_string());
        let trimmed = s.trim();
        let (count, unit) = match trimmed.split_once('/') {
            None => (trimmed, RateUnit::PerSecond),
            Some((count, unit)) => {
                let unit = match unit.trim().to_ascii_lowercase().as_str() {
                    "sec" | "s" => RateUnit::PerSecond,
                    "min" | "m" => RateUnit::PerMinute,
                    _ => return Err(invalid()),
                };
                (count, unit)
            }
        };
        let count: u32 = count.trim().parse().map_err(|_| invalid())?;
        Rate::new(count, unit).map_err(|_| invalid())
    }
}

// ---------------------------------------------------------------------------
// Pacer
// ---------------------------------------------------------------------------

const PACE_POLL: Duration = Duration::from_millis(1);

/// Fixed-delay scheduler. The first turn is granted immediately; every
/// later turn is `step` after the previous *scheduled* start, however long
/// the work in between took.
#[derive(Debug)]
pub struct Pacer {
    step: Duration,
    next_start: Instant,
}

impl Pacer {
    pub fn new(rate: Rate) -> Self {
        Self {
            step: rate.step(),
            next_start: Instant::now(),
        }
    }

    /// Block until the next start is allowed. Returns `false` if `stop` was
    /// raised while waiting.
    pub fn wait_turn(&mut self, stop: &StopSignal) -> bool {
        loop {
            if stop.is_raised() {
                return false;
            }
            let now = Instant::now();
            if now >= self.next_start {
                break;
            }
            std::thread::sleep((self.next_start - now).min(PACE_POLL));
        }
        self.next_start += self.step;
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
