use std::collections::HashSet;

use super::{PlanError, PlanInput};

/// Reject inputs the allocator must never see: non-positive or duplicate
/// module order, negative durations, and sub-topics that add up to more than
/// their topic.
pub fn validate_input(input: &PlanInput) -> Result<(), PlanError> {
    let mut orders = HashSet::new();
    for plan in &input.modules {
        let module = &plan.module;
        if module.order <= 0 {
            return Err(PlanError::Validation(format!(
                "module {} has non-positive order {}",
                module.id, module.order
            )));
        }
        if !orders.insert(module.order) {
            return Err(PlanError::Validation(format!(
                "duplicate module order {} in batch {}",
                module.order, input.batch_id
            )));
        }
        for topic in &plan.topics {
            if topic.total_time < 0 {
                return Err(PlanError::Validation(format!(
                    "topic {} has negative duration {}",
                    topic.id, topic.total_time
                )));
            }
            if let Some(sub) = topic.sub_topics.iter().find(|s| s.total_time < 0) {
                return Err(PlanError::Validation(format!(
                    "sub-topic {} has negative duration {}",
                    sub.id, sub.total_time
                )));
            }
            let sub_total: i64 = topic.sub_topics.iter().map(|s| s.total_time).sum();
            if sub_total > topic.total_time {
                return Err(PlanError::Validation(format!(
                    "sub-topics of topic {} add up to {} minutes, topic declares {}",
                    topic.id, sub_total, topic.total_time
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BatchModule, SubTopic, Topic};
    use crate::planner::{ErrorKind, ModulePlan, Progress};
    use chrono::NaiveDate;

    fn module(id: i64, order: i64, topics: Vec<Topic>) -> ModulePlan {
        ModulePlan {
            module: BatchModule {
                id,
                batch_id: 1,
                course_module_id: id,
                name: format!("module-{id}"),
                order,
                faculty_id: Some(1),
                start_date: None,
                estimated_end_date: None,
                is_completed: false,
            },
            timings: vec![],
            topics,
        }
    }

    fn input(modules: Vec<ModulePlan>) -> PlanInput {
        PlanInput {
            batch_id: 1,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            holidays: Default::default(),
            modules,
            progress: Progress::default(),
        }
    }

    #[test]
    fn accepts_distinct_positive_orders() {
        validate_input(&input(vec![module(1, 1, vec![]), module(2, 2, vec![])])).unwrap();
    }

    #[test]
    fn rejects_duplicate_order() {
        let err = validate_input(&input(vec![module(1, 1, vec![]), module(2, 1, vec![])]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("duplicate module order 1"));
    }

    #[test]
    fn rejects_zero_order() {
        let err = validate_input(&input(vec![module(1, 0, vec![])])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn rejects_negative_duration() {
        let topic = Topic {
            id: 9,
            course_module_id: 1,
            name: "bad".into(),
            order: 1,
            total_time: -10,
            sub_topics: vec![],
        };
        let err = validate_input(&input(vec![module(1, 1, vec![topic])])).unwrap_err();
        assert!(err.to_string().contains("topic 9"));
    }

    fn sub(id: i64, minutes: i64) -> SubTopic {
        SubTopic {
            id,
            topic_id: 9,
            name: format!("sub-{id}"),
            order: id,
            total_time: minutes,
        }
    }

    #[test]
    fn rejects_sub_topics_exceeding_topic() {
        let topic = Topic {
            id: 9,
            course_module_id: 1,
            name: "overbooked".into(),
            order: 1,
            total_time: 100,
            sub_topics: vec![sub(1, 100), sub(2, 50)],
        };
        let err = validate_input(&input(vec![module(1, 1, vec![topic])])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("topic 9 add up to 150"));
    }

    #[test]
    fn accepts_sub_topics_within_topic() {
        let topic = Topic {
            id: 9,
            course_module_id: 1,
            name: "split".into(),
            order: 1,
            total_time: 100,
            sub_topics: vec![sub(1, 60), sub(2, 40)],
        };
        validate_input(&input(vec![module(1, 1, vec![topic])])).unwrap();
    }
}
