//! Day keys — the unit of the daily task reset.
//!
//! Tasks reset at local midnight in the platform's home region, not at UTC
//! midnight and not in the client's timezone. The home region does not
//! observe daylight saving, so a fixed UTC offset is exact.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Default home offset: UTC+3 (East Africa Time).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;

/// Converts wall-clock instants into day keys for a fixed civil offset.
#[derive(Debug, Clone, Copy)]
pub struct DayClock {
    offset: FixedOffset,
}

impl DayClock {
    /// Build a clock for a whole-hour UTC offset. Rejects offsets outside ±14h.
    pub fn from_offset_hours(hours: i32) -> anyhow::Result<Self> {
        if !(-14..=14).contains(&hours) {
            anyhow::bail!("UTC offset must be within -14..=14 hours, got {}", hours);
        }
        let offset = FixedOffset::east_opt(hours * 3600)
            .ok_or_else(|| anyhow::anyhow!("invalid UTC offset: {} hours", hours))?;
        Ok(DayClock { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Day key for a given instant.
    pub fn day_key_at(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Day key for now.
    pub fn today(&self) -> NaiveDate {
        self.day_key_at(Utc::now())
    }
}

impl Default for DayClock {
    fn default() -> Self {
        DayClock {
            offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600)
                .expect("default offset is within range"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn default_clock_is_utc_plus_three() {
        let clock = DayClock::default();
        assert_eq!(clock.offset().local_minus_utc(), 3 * 3600);
    }

    #[test]
    fn day_rolls_over_at_local_midnight() {
        let clock = DayClock::default();
        // 20:59 UTC is 23:59 local: still the same day
        assert_eq!(
            clock.day_key_at(utc(2026, 3, 10, 20, 59)),
            NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
        );
        // 21:00 UTC is 00:00 local next day
        assert_eq!(
            clock.day_key_at(utc(2026, 3, 10, 21, 0)),
            NaiveDate::from_ymd_opt(2026, 3, 11).unwrap()
        );
    }

    #[test]
    fn utc_midnight_does_not_reset() {
        let clock = DayClock::default();
        let before = clock.day_key_at(utc(2026, 3, 10, 23, 59));
        let after = clock.day_key_at(utc(2026, 3, 11, 0, 1));
        assert_eq!(before, after);
    }

    #[test]
    fn negative_offsets_supported() {
        let clock = DayClock::from_offset_hours(-5).unwrap();
        assert_eq!(
            clock.day_key_at(utc(2026, 1, 1, 3, 0)),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
    }

    #[test]
    fn out_of_range_offset_rejected() {
        assert!(DayClock::from_offset_hours(15).is_err());
        assert!(DayClock::from_offset_hours(-15).is_err());
    }
}
