use chrono::{Datelike, Days, NaiveDate};
use std::collections::BTreeSet;

use super::{PlanError, TimingTable};

/// Batch holidays plus the search horizon for teaching dates.
#[derive(Debug, Clone)]
pub struct HolidayCalendar<'a> {
    holidays: &'a BTreeSet<NaiveDate>,
    horizon_days: u32,
}

impl<'a> HolidayCalendar<'a> {
    pub fn new(holidays: &'a BTreeSet<NaiveDate>, horizon_days: u32) -> Self {
        Self {
            holidays,
            horizon_days,
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// First date on or after `from` that is not a holiday and falls on a
    /// weekday the module is taught.
    pub fn next_teaching_date(
        &self,
        from: NaiveDate,
        table: &TimingTable,
    ) -> Result<NaiveDate, PlanError> {
        let exhausted = || PlanError::NoTeachingDate {
            module_id: table.module_id,
            from,
            days: self.horizon_days,
        };
        let mut date = from;
        for _ in 0..self.horizon_days {
            if table.teaches_on(date.weekday()) && !self.is_holiday(date) {
                return Ok(date);
            }
            date = date.checked_add_days(Days::new(1)).ok_or_else(exhausted)?;
        }
        Err(exhausted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BatchModule, ModuleTiming};
    use crate::planner::ModulePlan;
    use chrono::{NaiveTime, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mon_wed_table() -> TimingTable {
        let window = |day| ModuleTiming {
            id: 0,
            batch_module_id: 3,
            faculty_id: 1,
            day,
            from_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            to_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        };
        TimingTable::for_module(&ModulePlan {
            module: BatchModule {
                id: 3,
                batch_id: 1,
                course_module_id: 1,
                name: "Go".into(),
                order: 1,
                faculty_id: Some(1),
                start_date: None,
                estimated_end_date: None,
                is_completed: false,
            },
            timings: vec![window(Weekday::Mon), window(Weekday::Wed)],
            topics: vec![],
        })
        .unwrap()
    }

    #[test]
    fn skips_non_teaching_weekdays() {
        let holidays = BTreeSet::new();
        let cal = HolidayCalendar::new(&holidays, 30);
        // 2024-01-02 is a Tuesday
        let next = cal.next_teaching_date(date(2024, 1, 2), &mon_wed_table()).unwrap();
        assert_eq!(next, date(2024, 1, 3));
    }

    #[test]
    fn returns_from_when_valid() {
        let holidays = BTreeSet::new();
        let cal = HolidayCalendar::new(&holidays, 30);
        let next = cal.next_teaching_date(date(2024, 1, 1), &mon_wed_table()).unwrap();
        assert_eq!(next, date(2024, 1, 1));
    }

    #[test]
    fn skips_holidays() {
        let holidays: BTreeSet<_> = [date(2024, 1, 1), date(2024, 1, 3)].into_iter().collect();
        let cal = HolidayCalendar::new(&holidays, 30);
        let next = cal.next_teaching_date(date(2024, 1, 1), &mon_wed_table()).unwrap();
        assert_eq!(next, date(2024, 1, 8));
        assert!(cal.is_holiday(date(2024, 1, 3)));
    }

    #[test]
    fn horizon_exhausted() {
        let holidays: BTreeSet<_> = [date(2024, 1, 1), date(2024, 1, 3)].into_iter().collect();
        let cal = HolidayCalendar::new(&holidays, 5);
        let err = cal
            .next_teaching_date(date(2024, 1, 1), &mon_wed_table())
            .unwrap_err();
        assert_eq!(
            err,
            PlanError::NoTeachingDate {
                module_id: 3,
                from: date(2024, 1, 1),
                days: 5
            }
        );
    }
}
