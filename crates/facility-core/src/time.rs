//! Day and time-of-day types for weekly facility schedules.
//!
//! A schedule covers one week of seven days (0 = Sunday .. 6 = Saturday).
//! Times are written `D/HH/mm` on the wire and on the command line, and are
//! held internally as minutes since midnight so interval checks stay integer
//! arithmetic.
//!
//! [`DayTime`] is a point in the week; [`TimeSpan`] is a half-open interval
//! `[start, end)` within a single day.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of days in a schedule week.
pub const DAYS_PER_WEEK: u8 = 7;

/// Minutes in a day; also the minute-of-day value of 24:00.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Errors raised while parsing or validating days and times.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// Input is not of the form `D/HH/mm`.
    #[error("expected D/HH/mm, got {0:?}")]
    InvalidFormat(String),

    /// Day outside 0..=6.
    #[error("day {0} out of range (0-6)")]
    DayOutOfRange(i64),

    /// Hour outside 0..=23.
    #[error("hour {0} out of range (0-23)")]
    HourOutOfRange(i64),

    /// Minute outside 0..=59.
    #[error("minute {0} out of range (0-59)")]
    MinuteOutOfRange(i64),

    /// Start and end fall on different days.
    #[error("start day {start} and end day {end} differ")]
    DifferentDays { start: u8, end: u8 },

    /// End is not after start.
    #[error("end {end} is not after start {start}")]
    EmptySpan { start: u16, end: u16 },

    /// A shifted span left its day.
    #[error("shifting by {offset} minutes leaves the day")]
    OutsideDay { offset: i32 },
}

/// Validates a day index and narrows it to `u8`.
pub fn validate_day(day: i64) -> Result<u8, TimeError> {
    if (0..DAYS_PER_WEEK as i64).contains(&day) {
        Ok(day as u8)
    } else {
        Err(TimeError::DayOutOfRange(day))
    }
}

/// Returns the weekday for a schedule day (0 = Sunday).
pub fn weekday(day: u8) -> Result<Weekday, TimeError> {
    Ok(match validate_day(day as i64)? {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    })
}

/// A point in the schedule week.
///
/// `minute` may equal [`MINUTES_PER_DAY`] to express the end of a day
/// (24:00); the parser never produces that value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayTime {
    day: u8,
    minute: u16,
}

impl DayTime {
    /// Creates a validated day time.
    pub fn new(day: i64, hour: i64, minute: i64) -> Result<Self, TimeError> {
        let day = validate_day(day)?;
        if !(0..24).contains(&hour) {
            return Err(TimeError::HourOutOfRange(hour));
        }
        if !(0..60).contains(&minute) {
            return Err(TimeError::MinuteOutOfRange(minute));
        }
        Ok(Self {
            day,
            minute: (hour * 60 + minute) as u16,
        })
    }

    /// Creates a day time from a minute of day, which may be 24:00.
    pub fn from_minute(day: u8, minute: u16) -> Self {
        Self {
            day,
            minute: minute.min(MINUTES_PER_DAY),
        }
    }

    /// Parses `D/HH/mm`.
    pub fn parse(input: &str) -> Result<Self, TimeError> {
        let invalid = || TimeError::InvalidFormat(input.to_string());

        let mut parts = input.trim().split('/');
        let (Some(day), Some(hour), Some(minute), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let number = |s: &str| s.trim().parse::<i64>().map_err(|_| invalid());
        Self::new(number(day)?, number(hour)?, number(minute)?)
    }

    /// Day of the week (0 = Sunday).
    pub fn day(&self) -> u8 {
        self.day
    }

    /// Minutes since midnight.
    pub fn minute_of_day(&self) -> u16 {
        self.minute
    }

    /// Hour component (24 for end of day).
    pub fn hour(&self) -> u16 {
        self.minute / 60
    }

    /// Minute-of-hour component.
    pub fn minute(&self) -> u16 {
        self.minute % 60
    }
}

impl fmt::Display for DayTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:02}/{:02}", self.day, self.hour(), self.minute())
    }
}

impl FromStr for DayTime {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A half-open interval `[start, end)` of minutes within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSpan {
    start: u16,
    end: u16,
}

impl TimeSpan {
    /// Creates a span; `start < end <= 24:00` must hold.
    pub fn new(start: u16, end: u16) -> Result<Self, TimeError> {
        if start >= end || end > MINUTES_PER_DAY {
            return Err(TimeError::EmptySpan { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds a span from two day times on the same day.
    ///
    /// Returns the day alongside the span.
    pub fn between(start: DayTime, end: DayTime) -> Result<(u8, Self), TimeError> {
        if start.day != end.day {
            return Err(TimeError::DifferentDays {
                start: start.day,
                end: end.day,
            });
        }
        Ok((start.day, Self::new(start.minute, end.minute)?))
    }

    /// The whole day, 00:00 to 24:00.
    pub fn full_day() -> Self {
        Self {
            start: 0,
            end: MINUTES_PER_DAY,
        }
    }

    /// Start minute of day.
    pub fn start(&self) -> u16 {
        self.start
    }

    /// End minute of day (exclusive).
    pub fn end(&self) -> u16 {
        self.end
    }

    /// Returns true if the two half-open intervals share any minute.
    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Moves both ends by `offset` minutes, staying within the same day.
    pub fn shifted(&self, offset: i32) -> Result<Self, TimeError> {
        let start = self.start as i64 + offset as i64;
        let end = self.end as i64 + offset as i64;
        if start < 0 || end > MINUTES_PER_DAY as i64 {
            return Err(TimeError::OutsideDay { offset });
        }
        Ok(Self {
            start: start as u16,
            end: end as u16,
        })
    }

    /// Formats the span on `day` as `D/HH/mm - D/HH/mm`.
    pub fn display_on(&self, day: u8) -> String {
        format!(
            "{} - {}",
            DayTime::from_minute(day, self.start),
            DayTime::from_minute(day, self.end)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod day_time {
        use super::*;

        #[test]
        fn parse_valid() {
            let t = DayTime::parse("3/09/30").unwrap();
            assert_eq!(t.day(), 3);
            assert_eq!(t.hour(), 9);
            assert_eq!(t.minute(), 30);
            assert_eq!(t.minute_of_day(), 570);
        }

        #[test]
        fn parse_accepts_unpadded_fields() {
            assert_eq!(
                DayTime::parse("0/9/5").unwrap(),
                DayTime::new(0, 9, 5).unwrap()
            );
        }

        #[test]
        fn parse_rejects_out_of_range() {
            assert_eq!(DayTime::parse("7/09/00"), Err(TimeError::DayOutOfRange(7)));
            assert_eq!(DayTime::parse("-1/09/00"), Err(TimeError::DayOutOfRange(-1)));
            assert_eq!(DayTime::parse("0/24/00"), Err(TimeError::HourOutOfRange(24)));
            assert_eq!(DayTime::parse("0/10/60"), Err(TimeError::MinuteOutOfRange(60)));
        }

        #[test]
        fn parse_rejects_malformed() {
            for input in ["", "0/09", "0/09/00/00", "a/09/00", "0:09:00"] {
                assert!(
                    matches!(DayTime::parse(input), Err(TimeError::InvalidFormat(_))),
                    "{input:?} should be rejected"
                );
            }
        }

        #[test]
        fn display_roundtrip() {
            let t = DayTime::new(6, 7, 5).unwrap();
            assert_eq!(t.to_string(), "6/07/05");
            assert_eq!(t.to_string().parse::<DayTime>().unwrap(), t);
        }

        #[test]
        fn end_of_day_displays_as_24() {
            assert_eq!(DayTime::from_minute(2, MINUTES_PER_DAY).to_string(), "2/24/00");
        }

        #[test]
        fn weekday_mapping() {
            assert_eq!(weekday(0).unwrap(), Weekday::Sun);
            assert_eq!(weekday(1).unwrap(), Weekday::Mon);
            assert_eq!(weekday(6).unwrap(), Weekday::Sat);
            assert!(weekday(7).is_err());
            for day in 0..DAYS_PER_WEEK {
                assert_eq!(weekday(day).unwrap().num_days_from_sunday(), u32::from(day));
            }
        }
    }

    mod time_span {
        use super::*;

        fn at(s: &str) -> DayTime {
            DayTime::parse(s).unwrap()
        }

        #[test]
        fn between_same_day() {
            let (day, span) = TimeSpan::between(at("2/09/00"), at("2/10/30")).unwrap();
            assert_eq!(day, 2);
            assert_eq!(span.start(), 540);
            assert_eq!(span.end(), 630);
        }

        #[test]
        fn between_rejects_different_days() {
            let result = TimeSpan::between(at("1/23/00"), at("2/01/00"));
            assert_eq!(result, Err(TimeError::DifferentDays { start: 1, end: 2 }));
        }

        #[test]
        fn between_rejects_empty_or_reversed() {
            assert!(TimeSpan::between(at("0/10/00"), at("0/10/00")).is_err());
            assert!(TimeSpan::between(at("0/10/00"), at("0/09/00")).is_err());
        }

        #[test]
        fn overlap_is_half_open() {
            let a = TimeSpan::new(540, 600).unwrap();
            let b = TimeSpan::new(570, 630).unwrap();
            let c = TimeSpan::new(600, 660).unwrap();
            assert!(a.overlaps(&b));
            assert!(b.overlaps(&a));
            assert!(!a.overlaps(&c));
            assert!(!c.overlaps(&a));
        }

        #[test]
        fn shifted_within_day() {
            let span = TimeSpan::new(540, 600).unwrap();
            assert_eq!(span.shifted(-30).unwrap(), TimeSpan::new(510, 570).unwrap());
            assert_eq!(span.shifted(840).unwrap(), TimeSpan::new(1380, 1440).unwrap());
        }

        #[test]
        fn shifted_across_midnight_fails() {
            let span = TimeSpan::new(540, 600).unwrap();
            assert_eq!(span.shifted(-541), Err(TimeError::OutsideDay { offset: -541 }));
            assert_eq!(span.shifted(841), Err(TimeError::OutsideDay { offset: 841 }));
        }

        #[test]
        fn display_on_day() {
            let span = TimeSpan::new(600, MINUTES_PER_DAY).unwrap();
            assert_eq!(span.display_on(0), "0/10/00 - 0/24/00");
        }
    }
}
