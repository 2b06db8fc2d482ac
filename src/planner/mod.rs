//! Batch session auto-allocation.
//!
//! The planner works on plain data loaded up front and never touches the
//! database:
//! - `calendar`: next valid teaching date, skipping batch holidays.
//! - `timing`: weekly teaching windows of a module's faculty.
//! - `topics`: pending content units of a module, in curriculum order.
//! - `allocator`: the loop that turns all of the above into sessions.
//! - `validate`: input checks run before allocation starts.

pub mod allocator;
pub mod calendar;
pub mod timing;
pub mod topics;
pub mod validate;

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

use crate::model::{BatchModule, ContentRef, ModuleTiming, Topic};

pub use allocator::{allocate, verify_plan};
pub use calendar::HolidayCalendar;
pub use timing::TimingTable;
pub use topics::TopicQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    Inconsistency,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("module {module_id} has no faculty assigned")]
    MissingFaculty { module_id: i64 },
    #[error("module {module_id} has no timing for faculty {faculty_id}")]
    MissingTiming { module_id: i64, faculty_id: i64 },
    #[error("module {module_id} timings provide no teaching minutes")]
    ZeroTiming { module_id: i64 },
    #[error("no teaching date for module {module_id} within {days} days of {from}")]
    NoTeachingDate {
        module_id: i64,
        from: NaiveDate,
        days: u32,
    },
    #[error("invalid plan input: {0}")]
    Validation(String),
    #[error("{content} allocated {allocated} of {declared} minutes")]
    Inconsistency {
        content: ContentRef,
        allocated: i64,
        declared: i64,
    },
    #[error("plan invariant violated: {0}")]
    Invariant(String),
}

impl PlanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanError::MissingFaculty { .. }
            | PlanError::MissingTiming { .. }
            | PlanError::ZeroTiming { .. }
            | PlanError::NoTeachingDate { .. } => ErrorKind::Configuration,
            PlanError::Validation(_) => ErrorKind::Validation,
            PlanError::Inconsistency { .. } | PlanError::Invariant(_) => ErrorKind::Inconsistency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorOptions {
    pub min_carry_minutes: i64,
    pub horizon_days: u32,
}

impl Default for AllocatorOptions {
    fn default() -> Self {
        Self {
            min_carry_minutes: 5,
            horizon_days: 730,
        }
    }
}

/// One batch module with everything needed to schedule it.
#[derive(Debug, Clone)]
pub struct ModulePlan {
    pub module: BatchModule,
    pub timings: Vec<ModuleTiming>,
    pub topics: Vec<Topic>,
}

/// What completed sessions already covered.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    pub allocated: HashMap<ContentRef, i64>,
    pub first_dates: HashMap<ContentRef, NaiveDate>,
    pub completed: HashSet<ContentRef>,
    pub last_session_date: Option<NaiveDate>,
}

impl Progress {
    /// Fold one taught session topic into the totals.
    pub fn record(&mut self, content: ContentRef, minutes: i64, date: NaiveDate, completed: bool) {
        *self.allocated.entry(content).or_insert(0) += minutes;
        let first = self.first_dates.entry(content).or_insert(date);
        if date < *first {
            *first = date;
        }
        if completed {
            self.completed.insert(content);
        }
        if self.last_session_date.map_or(true, |last| date > last) {
            self.last_session_date = Some(date);
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanInput {
    pub batch_id: i64,
    pub start_date: NaiveDate,
    pub holidays: BTreeSet<NaiveDate>,
    pub modules: Vec<ModulePlan>,
    pub progress: Progress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTopic {
    pub content: ContentRef,
    pub order: i64,
    pub minutes: i64,
    pub initial_date: NaiveDate,
    pub completed_date: Option<NaiveDate>,
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSession {
    pub date: NaiveDate,
    pub batch_module_id: i64,
    pub faculty_id: i64,
    pub topics: Vec<PlannedTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSpan {
    pub batch_module_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionPlan {
    pub batch_id: i64,
    pub sessions: Vec<PlannedSession>,
}

impl SessionPlan {
    /// First and last session date per module, in plan order.
    pub fn module_spans(&self) -> Vec<ModuleSpan> {
        let mut spans: Vec<ModuleSpan> = Vec::new();
        for session in &self.sessions {
            match spans
                .iter_mut()
                .find(|s| s.batch_module_id == session.batch_module_id)
            {
                Some(span) => span.end_date = session.date,
                None => spans.push(ModuleSpan {
                    batch_module_id: session.batch_module_id,
                    start_date: session.date,
                    end_date: session.date,
                }),
            }
        }
        spans
    }

    pub fn estimated_end_date(&self) -> Option<NaiveDate> {
        self.sessions.last().map(|s| s.date)
    }

    pub fn total_minutes(&self) -> i64 {
        self.sessions
            .iter()
            .flat_map(|s| s.topics.iter())
            .map(|t| t.minutes)
            .sum()
    }
}
