use chrono::NaiveDate;
use std::collections::VecDeque;
use tracing::warn;

use super::{ModulePlan, PlanError, Progress};
use crate::model::ContentRef;

/// A content unit waiting for teaching time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTopic {
    pub content: ContentRef,
    pub name: String,
    pub remaining: i64,
    /// Set once any part of the unit has been scheduled.
    pub initial_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct TopicQueue {
    entries: VecDeque<QueuedTopic>,
}

impl TopicQueue {
    /// Pending units of a module in curriculum order, minus what completed
    /// sessions already covered.
    pub fn build(plan: &ModulePlan, progress: &Progress) -> Result<Self, PlanError> {
        let mut topics: Vec<_> = plan.topics.iter().collect();
        topics.sort_by_key(|t| (t.order, t.id));

        let mut entries = VecDeque::new();
        for topic in topics {
            if topic.sub_topics.is_empty() {
                push_unit(
                    &mut entries,
                    progress,
                    ContentRef::topic(topic.id),
                    &topic.name,
                    topic.total_time,
                )?;
                continue;
            }
            let mut subs: Vec<_> = topic.sub_topics.iter().collect();
            subs.sort_by_key(|s| (s.order, s.id));
            for sub in subs {
                push_unit(
                    &mut entries,
                    progress,
                    ContentRef::sub_topic(topic.id, sub.id),
                    &sub.name,
                    sub.total_time,
                )?;
            }
        }
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn front_mut(&mut self) -> Option<&mut QueuedTopic> {
        self.entries.front_mut()
    }

    pub fn pop_front(&mut self) -> Option<QueuedTopic> {
        self.entries.pop_front()
    }

    pub fn remaining_minutes(&self) -> i64 {
        self.entries.iter().map(|e| e.remaining).sum()
    }
}

fn push_unit(
    entries: &mut VecDeque<QueuedTopic>,
    progress: &Progress,
    content: ContentRef,
    name: &str,
    declared: i64,
) -> Result<(), PlanError> {
    if declared <= 0 {
        warn!(%content, unit = name, declared, "skipping content unit without duration");
        return Ok(());
    }
    if progress.completed.contains(&content) {
        return Ok(());
    }
    let allocated = progress.allocated.get(&content).copied().unwrap_or(0);
    if allocated > declared {
        return Err(PlanError::Inconsistency {
            content,
            allocated,
            declared,
        });
    }
    if allocated == declared {
        return Ok(());
    }
    entries.push_back(QueuedTopic {
        content,
        name: name.to_string(),
        remaining: declared - allocated,
        initial_date: progress.first_dates.get(&content).copied(),
    });
    Ok(())
}
