//! Calendar date arithmetic shared across the engine.
//!
//! Month math uses real calendar months (chrono's `Months`, which clamps to
//! the last day of shorter months), never a fixed 30-day approximation.

use chrono::{Months, NaiveDate};

/// Add `months` calendar months to `date`.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// The day before `date`; saturates at the calendar minimum.
pub fn day_before(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_add_months_calendar_semantics() {
        assert_eq!(add_months(d(2024, 1, 15), 3), d(2024, 4, 15));
        // Clamps to the last day of shorter months.
        assert_eq!(add_months(d(2024, 1, 31), 1), d(2024, 2, 29));
        assert_eq!(add_months(d(2023, 1, 31), 1), d(2023, 2, 28));
        // A 12-month extension is a full year, not 360 days.
        assert_eq!(add_months(d(2024, 3, 1), 12), d(2025, 3, 1));
    }

    #[test]
    fn test_day_before() {
        assert_eq!(day_before(d(2024, 3, 1)), d(2024, 2, 29));
        assert_eq!(day_before(d(2024, 1, 1)), d(2023, 12, 31));
    }
}
