use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BatchStatus {
    Active,
    Completed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Active => "ACTIVE",
            BatchStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse_status(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(BatchStatus::Active),
            "COMPLETED" => Some(BatchStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub course_name: String,
    pub start_date: Option<NaiveDate>,
    pub estimated_end_date: Option<NaiveDate>,
    pub final_end_date: Option<NaiveDate>,
    pub status: BatchStatus,
    pub total_intake: i64,
    pub total_students: i64,
    pub sales_person: Option<String>,
    pub eligibility: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Faculty {
    pub id: i64,
    pub name: String,
}

/// A course module as instantiated for one batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchModule {
    pub id: i64,
    pub batch_id: i64,
    pub course_module_id: i64,
    pub name: String,
    pub order: i64,
    pub faculty_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub estimated_end_date: Option<NaiveDate>,
    pub is_completed: bool,
}

/// Weekly window in which a faculty teaches a batch module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleTiming {
    pub id: i64,
    pub batch_module_id: i64,
    pub faculty_id: i64,
    pub day: Weekday,
    pub from_time: NaiveTime,
    pub to_time: NaiveTime,
}

impl ModuleTiming {
    /// Length of the window in minutes; inverted windows count as zero.
    pub fn minutes(&self) -> i64 {
        if self.to_time <= self.from_time {
            return 0;
        }
        (self.to_time - self.from_time).num_minutes()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Topic {
    pub id: i64,
    pub course_module_id: i64,
    pub name: String,
    pub order: i64,
    pub total_time: i64,
    pub sub_topics: Vec<SubTopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubTopic {
    pub id: i64,
    pub topic_id: i64,
    pub name: String,
    pub order: i64,
    pub total_time: i64,
}

/// The unit the planner schedules: a whole topic, or one of its subtopics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentRef {
    pub topic_id: i64,
    pub sub_topic_id: Option<i64>,
}

impl ContentRef {
    pub fn topic(topic_id: i64) -> Self {
        Self {
            topic_id,
            sub_topic_id: None,
        }
    }

    pub fn sub_topic(topic_id: i64, sub_topic_id: i64) -> Self {
        Self {
            topic_id,
            sub_topic_id: Some(sub_topic_id),
        }
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_topic_id {
            Some(sub) => write!(f, "topic {}/sub-topic {}", self.topic_id, sub),
            None => write!(f, "topic {}", self.topic_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub id: i64,
    pub batch_id: i64,
    pub batch_module_id: i64,
    pub faculty_id: i64,
    pub date: NaiveDate,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub topics: Vec<SessionTopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTopic {
    pub id: i64,
    pub session_id: i64,
    pub content: ContentRef,
    pub order: i64,
    pub total_time: i64,
    pub initial_date: NaiveDate,
    pub completed_date: Option<NaiveDate>,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchSessionHoliday {
    pub batch_id: i64,
    pub date: NaiveDate,
    pub description: Option<String>,
}
