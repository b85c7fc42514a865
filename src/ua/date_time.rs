use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// OPC UA date/time: 100-nanosecond ticks since 1601-01-01 (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DateTime(i64);

/// Offset between the OPC UA epoch (1601) and the Unix epoch (1970), in
/// 100-nanosecond ticks.
const EPOCH_DIFF_TICKS: i64 = 116_444_736_000_000_000;

const TICKS_PER_SECOND: i64 = 10_000_000;

impl DateTime {
    /// The zero date/time (no timestamp).
    #[must_use]
    pub const fn null() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    #[must_use]
    pub const fn ticks(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let Ok(since_unix) = SystemTime::now().duration_since(UNIX_EPOCH) else {
            return Self::null();
        };
        let ticks = i64::try_from(since_unix.as_nanos() / 100).unwrap_or(i64::MAX);
        Self(ticks.saturating_add(EPOCH_DIFF_TICKS))
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[cfg(feature = "time")]
        if let Ok(odt) = time::OffsetDateTime::try_from(*self) {
            return write!(f, "{odt}");
        }
        write!(f, "{} ticks", self.0)
    }
}

#[cfg(feature = "time")]
impl TryFrom<DateTime> for time::OffsetDateTime {
    type Error = time::error::ComponentRange;

    fn try_from(date_time: DateTime) -> Result<Self, Self::Error> {
        let unix_ticks = date_time.0 - EPOCH_DIFF_TICKS;
        let nanos = i128::from(unix_ticks) * 100;
        time::OffsetDateTime::from_unix_timestamp_nanos(nanos)
    }
}

#[cfg(feature = "time")]
impl From<time::OffsetDateTime> for DateTime {
    fn from(odt: time::OffsetDateTime) -> Self {
        let ticks = odt.unix_timestamp_nanos() / 100 + i128::from(EPOCH_DIFF_TICKS);
        Self(i64::try_from(ticks).unwrap_or(0))
    }
}

impl std::ops::Add<std::time::Duration> for DateTime {
    type Output = Self;

    fn add(self, duration: std::time::Duration) -> Self {
        let ticks = i64::try_from(duration.as_nanos() / 100).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(ticks))
    }
}

impl DateTime {
    /// Difference in whole seconds, saturating.
    #[must_use]
    pub const fn seconds_since(self, earlier: Self) -> i64 {
        (self.0.saturating_sub(earlier.0)) / TICKS_PER_SECOND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_after_unix_epoch() {
        assert!(DateTime::now().ticks() > EPOCH_DIFF_TICKS);
    }

    #[cfg(feature = "time")]
    #[test]
    fn time_round_trip() {
        let odt = time::macros::datetime!(2024-02-01 12:30:00 UTC);
        let dt = DateTime::from(odt);
        let back = time::OffsetDateTime::try_from(dt).unwrap();
        assert_eq!(odt, back);
    }
}
