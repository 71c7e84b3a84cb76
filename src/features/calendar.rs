//! Calendar fields derived from the observation date

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Day-of-week and day-of-year for a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFields {
    /// 1=Sunday .. 7=Saturday
    pub day_of_week: u32,
    /// 1-366
    pub day_of_year: u32,
}

impl CalendarFields {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            day_of_week: sunday_first_weekday(date),
            day_of_year: date.ordinal(),
        }
    }

    pub fn derive(year: i32, month: u32, day: u32) -> Option<Self> {
        resolve_date(year, month, day).map(Self::from_date)
    }
}

/// Resolve (year, month, day) into a proleptic Gregorian date.
pub fn resolve_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Monday=0 shifted by two puts Monday at 2 and Saturday at 7; Sunday lands on
/// 8 and wraps to 1.
fn sunday_first_weekday(date: NaiveDate) -> u32 {
    match date.weekday().num_days_from_monday() + 2 {
        8 => 1,
        dow => dow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2024, 6, 9, 1)] // Sunday
    #[case(2024, 6, 10, 2)] // Monday
    #[case(2024, 6, 12, 4)] // Wednesday
    #[case(2024, 6, 15, 7)] // Saturday
    #[case(2000, 1, 1, 7)] // Saturday
    #[case(1970, 1, 1, 5)] // Thursday
    fn test_day_of_week_is_sunday_first(
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
        #[case] expected: u32,
    ) {
        let date = resolve_date(year, month, day).unwrap();
        assert_eq!(CalendarFields::from_date(date).day_of_week, expected);
    }

    #[rstest]
    #[case(2024, 1, 1, 1)]
    #[case(2024, 3, 1, 61)] // leap year
    #[case(2023, 3, 1, 60)]
    #[case(2024, 6, 9, 161)]
    #[case(2024, 12, 31, 366)]
    #[case(2023, 12, 31, 365)]
    fn test_day_of_year_is_ordinal(
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
        #[case] expected: u32,
    ) {
        let date = resolve_date(year, month, day).unwrap();
        assert_eq!(CalendarFields::from_date(date).day_of_year, expected);
    }

    #[rstest]
    #[case(2024, 2, 30)]
    #[case(2023, 2, 29)]
    #[case(2024, 13, 1)]
    #[case(2024, 0, 1)]
    #[case(2024, 4, 31)]
    #[case(2024, 1, 0)]
    fn test_invalid_dates_are_rejected(#[case] year: i32, #[case] month: u32, #[case] day: u32) {
        assert_eq!(resolve_date(year, month, day), None);
        assert!(CalendarFields::derive(year, month, day).is_none());
    }

    #[test]
    fn test_derive_from_parts() {
        let fields = CalendarFields::derive(2024, 6, 15).unwrap();
        assert_eq!(fields, CalendarFields { day_of_week: 7, day_of_year: 167 });
    }

    #[test]
    fn test_every_day_of_a_year_is_in_range() {
        let mut date = resolve_date(2024, 1, 1).unwrap();
        let mut seen_sundays = 0;
        while date.year() == 2024 {
            let fields = CalendarFields::from_date(date);
            assert!((1..=7).contains(&fields.day_of_week));
            assert!((1..=366).contains(&fields.day_of_year));
            if date.weekday() == chrono::Weekday::Sun {
                assert_eq!(fields.day_of_week, 1);
                seen_sundays += 1;
            }
            if date.weekday() == chrono::Weekday::Sat {
                assert_eq!(fields.day_of_week, 7);
            }
            date = date.succ_opt().unwrap();
        }
        assert_eq!(seen_sundays, 52);
    }
}
