//! Relative time spans for windowed queries

use chrono::{DateTime, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar unit of a [`Duration`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl DurationUnit {
    /// Get the unit keyword
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
            Self::Years => "years",
        }
    }
}

/// A signed time span relative to a reference date.
///
/// The sign decides direction: a negative magnitude reaches into the past,
/// a positive one into the future. Month and year offsets are calendar
/// aware rather than fixed-length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Duration {
    magnitude: i64,
    unit: DurationUnit,
}

impl Duration {
    /// A span of seconds
    pub const fn seconds(magnitude: i64) -> Self {
        Self {
            magnitude,
            unit: DurationUnit::Seconds,
        }
    }

    /// A span of minutes
    pub const fn minutes(magnitude: i64) -> Self {
        Self {
            magnitude,
            unit: DurationUnit::Minutes,
        }
    }

    /// A span of hours
    pub const fn hours(magnitude: i64) -> Self {
        Self {
            magnitude,
            unit: DurationUnit::Hours,
        }
    }

    /// A span of days
    pub const fn days(magnitude: i64) -> Self {
        Self {
            magnitude,
            unit: DurationUnit::Days,
        }
    }

    /// A span of weeks
    pub const fn weeks(magnitude: i64) -> Self {
        Self {
            magnitude,
            unit: DurationUnit::Weeks,
        }
    }

    /// A span of calendar months
    pub const fn months(magnitude: i64) -> Self {
        Self {
            magnitude,
            unit: DurationUnit::Months,
        }
    }

    /// A span of calendar years
    pub const fn years(magnitude: i64) -> Self {
        Self {
            magnitude,
            unit: DurationUnit::Years,
        }
    }

    /// Signed magnitude in this duration's unit
    pub const fn magnitude(&self) -> i64 {
        self.magnitude
    }

    /// Unit of the magnitude
    pub const fn unit(&self) -> DurationUnit {
        self.unit
    }

    /// Whether this span points into the past
    pub const fn is_negative(&self) -> bool {
        self.magnitude < 0
    }

    /// The instant this span away from `origin`, saturating at the
    /// representable date range instead of overflowing.
    pub fn offset_from(&self, origin: DateTime<Utc>) -> DateTime<Utc> {
        let saturated = if self.magnitude < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        };
        match self.unit {
            DurationUnit::Seconds => origin
                .checked_add_signed(TimeDelta::seconds(self.magnitude))
                .unwrap_or(saturated),
            DurationUnit::Minutes => origin
                .checked_add_signed(TimeDelta::minutes(self.magnitude))
                .unwrap_or(saturated),
            DurationUnit::Hours => origin
                .checked_add_signed(TimeDelta::hours(self.magnitude))
                .unwrap_or(saturated),
            DurationUnit::Days => origin
                .checked_add_signed(TimeDelta::days(self.magnitude))
                .unwrap_or(saturated),
            DurationUnit::Weeks => origin
                .checked_add_signed(TimeDelta::weeks(self.magnitude))
                .unwrap_or(saturated),
            DurationUnit::Months => Self::offset_months(origin, self.magnitude).unwrap_or(saturated),
            DurationUnit::Years => {
                Self::offset_months(origin, self.magnitude.saturating_mul(12)).unwrap_or(saturated)
            }
        }
    }

    fn offset_months(origin: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
        let span = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
        if months < 0 {
            origin.checked_sub_months(span)
        } else {
            origin.checked_add_months(span)
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit.keyword())
    }
}
