use chrono::{Datelike, NaiveDate, Weekday};

use super::{ModulePlan, PlanError};
use crate::model::ModuleTiming;

/// Weekly teaching windows of the faculty responsible for one module.
#[derive(Debug, Clone)]
pub struct TimingTable {
    pub module_id: i64,
    pub faculty_id: i64,
    windows: Vec<ModuleTiming>,
    minutes_by_day: [i64; 7],
}

impl TimingTable {
    pub fn for_module(plan: &ModulePlan) -> Result<Self, PlanError> {
        let module_id = plan.module.id;
        let faculty_id = plan
            .module
            .faculty_id
            .ok_or(PlanError::MissingFaculty { module_id })?;

        let mut windows: Vec<ModuleTiming> = plan
            .timings
            .iter()
            .filter(|t| t.batch_module_id == module_id && t.faculty_id == faculty_id)
            .cloned()
            .collect();
        if windows.is_empty() {
            return Err(PlanError::MissingTiming {
                module_id,
                faculty_id,
            });
        }
        windows.sort_by_key(|t| (t.day.num_days_from_monday(), t.from_time));

        let mut minutes_by_day = [0_i64; 7];
        for window in &windows {
            minutes_by_day[window.day.num_days_from_monday() as usize] += window.minutes();
        }
        if minutes_by_day.iter().all(|m| *m == 0) {
            return Err(PlanError::ZeroTiming { module_id });
        }

        Ok(Self {
            module_id,
            faculty_id,
            windows,
            minutes_by_day,
        })
    }

    pub fn windows(&self) -> &[ModuleTiming] {
        &self.windows
    }

    pub fn minutes_on(&self, day: Weekday) -> i64 {
        self.minutes_by_day[day.num_days_from_monday() as usize]
    }

    pub fn teaches_on(&self, day: Weekday) -> bool {
        self.minutes_on(day) > 0
    }

    /// Teaching minutes available on `date`, before anything is allocated.
    pub fn available_minutes(&self, date: NaiveDate) -> i64 {
        self.minutes_on(date.weekday())
    }

    pub fn weekly_minutes(&self) -> i64 {
        self.minutes_by_day.iter().sum()
    }
}
