use chrono::{DateTime, Utc};
use std::fmt;

/// Time left until the countdown target, as shown to riders and drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Remaining {
    /// No target is set.
    #[default]
    Unknown,
    /// Whole seconds left; pinned at zero once the target has passed.
    Seconds(u64),
}

impl Remaining {
    /// Compute the remaining time from a target and the current instant.
    ///
    /// Rounds toward negative infinity, then clamps at zero.
    pub fn between(target: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match target {
            None => Remaining::Unknown,
            Some(target) => {
                let secs = (target - now).num_milliseconds().div_euclid(1000);
                Remaining::Seconds(u64::try_from(secs).unwrap_or(0))
            }
        }
    }

    pub fn as_secs(&self) -> Option<u64> {
        match self {
            Remaining::Unknown => None,
            Remaining::Seconds(s) => Some(*s),
        }
    }

    /// True once a target exists and has been reached.
    pub fn is_elapsed(&self) -> bool {
        matches!(self, Remaining::Seconds(0))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Remaining::Unknown)
    }
}

/// `8 mins 30 sec`, `1 hr 2 mins 3 sec`, `45 sec`, or `--` when unknown.
impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Remaining::Seconds(total) = *self else {
            return write!(f, "--");
        };

        let hours = total / 3600;
        let mins = (total % 3600) / 60;
        let secs = total % 60;
        let min_unit = if mins == 1 { "min" } else { "mins" };

        if hours > 0 {
            write!(f, "{} hr {} {} {} sec", hours, mins, min_unit, secs)
        } else if mins > 0 {
            write!(f, "{} {} {} sec", mins, min_unit, secs)
        } else {
            write!(f, "{} sec", secs)
        }
    }
}
