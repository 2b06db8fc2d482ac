use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use super::validate::validate_input;
use super::{
    AllocatorOptions, HolidayCalendar, ModulePlan, PlanError, PlanInput, PlannedSession,
    PlannedTopic, Progress, SessionPlan, TimingTable, TopicQueue,
};
use crate::model::ContentRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    AdvancingDate,
    AllocatingTopic,
    EmittingSession,
    CheckingModuleBoundary,
    Done,
}

struct ActiveModule<'a> {
    plan: &'a ModulePlan,
    table: TimingTable,
    queue: TopicQueue,
}

/// Turn a batch's pending curriculum into dated sessions.
///
/// Modules are taught one after another by `order`; each date carries at
/// most one session and never falls on a holiday. The returned plan has been
/// checked with [`verify_plan`].
#[instrument(skip_all, fields(batch_id = input.batch_id))]
pub fn allocate(input: &PlanInput, options: &AllocatorOptions) -> Result<SessionPlan, PlanError> {
    validate_input(input)?;
    let calendar = HolidayCalendar::new(&input.holidays, options.horizon_days);

    let mut pending_modules: Vec<&ModulePlan> = input
        .modules
        .iter()
        .filter(|m| !m.module.is_completed)
        .collect();
    pending_modules.sort_by_key(|m| m.module.order);
    let mut pending_modules = pending_modules.into_iter();

    let mut active = next_module(&mut pending_modules, &input.progress)?;
    let mut step = if active.is_some() {
        Step::AdvancingDate
    } else {
        Step::Done
    };

    let mut sessions: Vec<PlannedSession> = Vec::new();
    let mut cursor = input.start_date;
    let mut date = cursor;
    let mut budget = 0_i64;
    let mut day_topics: Vec<PlannedTopic> = Vec::new();

    loop {
        step = match step {
            Step::AdvancingDate => {
                let Some(module) = active.as_ref() else {
                    break;
                };
                date = calendar.next_teaching_date(cursor, &module.table)?;
                budget = module.table.available_minutes(date);
                Step::AllocatingTopic
            }
            Step::AllocatingTopic => {
                let Some(module) = active.as_mut() else {
                    break;
                };
                fill_day(
                    &mut module.queue,
                    date,
                    &mut budget,
                    options.min_carry_minutes,
                    &mut day_topics,
                );
                Step::EmittingSession
            }
            Step::EmittingSession => {
                let Some(module) = active.as_ref() else {
                    break;
                };
                if day_topics.is_empty() {
                    return Err(PlanError::Invariant(format!(
                        "no content allocated on {date} for module {}",
                        module.plan.module.id
                    )));
                }
                sessions.push(PlannedSession {
                    date,
                    batch_module_id: module.plan.module.id,
                    faculty_id: module.table.faculty_id,
                    topics: std::mem::take(&mut day_topics),
                });
                cursor = date
                    .checked_add_days(Days::new(1))
                    .ok_or_else(|| PlanError::Invariant(format!("date overflow after {date}")))?;
                Step::CheckingModuleBoundary
            }
            Step::CheckingModuleBoundary => {
                if let Some(module) = active.as_ref().filter(|m| m.queue.is_empty()) {
                    debug!(module_id = module.plan.module.id, "module fully allocated");
                    active = next_module(&mut pending_modules, &input.progress)?;
                }
                if active.is_some() {
                    Step::AdvancingDate
                } else {
                    Step::Done
                }
            }
            Step::Done => break,
        };
    }

    let plan = SessionPlan {
        batch_id: input.batch_id,
        sessions,
    };
    verify_plan(input, &plan)?;
    info!(
        sessions = plan.sessions.len(),
        minutes = plan.total_minutes(),
        end = ?plan.estimated_end_date(),
        "session plan allocated"
    );
    Ok(plan)
}

/// Next module in order that still has content to teach. Modules whose
/// queue is already empty are passed over without checking their timings.
fn next_module<'a>(
    modules: &mut impl Iterator<Item = &'a ModulePlan>,
    progress: &Progress,
) -> Result<Option<ActiveModule<'a>>, PlanError> {
    for plan in modules.by_ref() {
        let queue = TopicQueue::build(plan, progress)?;
        if queue.is_empty() {
            debug!(module_id = plan.module.id, "module has nothing left to allocate");
            continue;
        }
        let table = TimingTable::for_module(plan)?;
        debug!(
            module_id = plan.module.id,
            faculty_id = table.faculty_id,
            windows = table.windows().len(),
            weekly_minutes = table.weekly_minutes(),
            pending_minutes = queue.remaining_minutes(),
            "module activated"
        );
        return Ok(Some(ActiveModule { plan, table, queue }));
    }
    Ok(None)
}

/// Consume the day's budget from the front of the queue.
///
/// Remainders below `min_carry` are taught the same day, and a unit that
/// would not finish is not started once less than `min_carry` minutes are
/// left in an already started day.
fn fill_day(
    queue: &mut TopicQueue,
    date: NaiveDate,
    budget: &mut i64,
    min_carry: i64,
    day_topics: &mut Vec<PlannedTopic>,
) {
    while *budget > 0 {
        let Some(front) = queue.front_mut() else {
            break;
        };
        let mut portion = front.remaining.min(*budget);
        let tail = front.remaining - portion;
        if tail > 0 && tail < min_carry {
            portion = front.remaining;
        } else if tail > 0 && portion < min_carry && !day_topics.is_empty() {
            break;
        }

        let initial_date = *front.initial_date.get_or_insert(date);
        front.remaining -= portion;
        *budget -= portion;
        let completed = front.remaining == 0;
        day_topics.push(PlannedTopic {
            content: front.content,
            order: day_topics.len() as i64 + 1,
            minutes: portion,
            initial_date,
            completed_date: completed.then_some(date),
            is_completed: completed,
        });

        if !completed {
            break;
        }
        debug!(%date, unit = %front.name, "content unit completed");
        queue.pop_front();
    }
}

/// Check a plan against its input: dates strictly increase and avoid
/// holidays, modules never go back in order, and no unit or topic receives
/// more minutes than declared.
pub fn verify_plan(input: &PlanInput, plan: &SessionPlan) -> Result<(), PlanError> {
    let mut declared: HashMap<ContentRef, i64> = HashMap::new();
    let mut topic_declared: HashMap<i64, i64> = HashMap::new();
    let mut module_order: HashMap<i64, i64> = HashMap::new();
    for module in &input.modules {
        module_order.insert(module.module.id, module.module.order);
        for topic in &module.topics {
            topic_declared.insert(topic.id, topic.total_time);
            if topic.sub_topics.is_empty() {
                declared.insert(ContentRef::topic(topic.id), topic.total_time);
            }
            for sub in &topic.sub_topics {
                declared.insert(ContentRef::sub_topic(topic.id, sub.id), sub.total_time);
            }
        }
    }

    let mut previous: Option<(NaiveDate, i64)> = None;
    let mut totals: HashMap<ContentRef, i64> = input.progress.allocated.clone();
    let mut topic_totals: HashMap<i64, i64> = HashMap::new();
    for (content, minutes) in &input.progress.allocated {
        *topic_totals.entry(content.topic_id).or_insert(0) += minutes;
    }
    for session in &plan.sessions {
        if input.holidays.contains(&session.date) {
            return Err(PlanError::Invariant(format!(
                "session scheduled on holiday {}",
                session.date
            )));
        }
        let order = module_order
            .get(&session.batch_module_id)
            .copied()
            .ok_or_else(|| {
                PlanError::Invariant(format!("unknown module {}", session.batch_module_id))
            })?;
        if let Some((prev_date, prev_order)) = previous {
            if session.date <= prev_date {
                return Err(PlanError::Invariant(format!(
                    "session on {} does not follow {}",
                    session.date, prev_date
                )));
            }
            if order < prev_order {
                return Err(PlanError::Invariant(format!(
                    "module {} scheduled after a later module",
                    session.batch_module_id
                )));
            }
        }
        previous = Some((session.date, order));

        for topic in &session.topics {
            let total = totals.entry(topic.content).or_insert(0);
            *total += topic.minutes;
            let limit = declared.get(&topic.content).copied().ok_or_else(|| {
                PlanError::Invariant(format!("{} is not in the curriculum", topic.content))
            })?;
            if *total > limit {
                return Err(PlanError::Inconsistency {
                    content: topic.content,
                    allocated: *total,
                    declared: limit,
                });
            }
            let topic_total = topic_totals.entry(topic.content.topic_id).or_insert(0);
            *topic_total += topic.minutes;
            let topic_limit = topic_declared
                .get(&topic.content.topic_id)
                .copied()
                .unwrap_or(limit);
            if *topic_total > topic_limit {
                return Err(PlanError::Inconsistency {
                    content: ContentRef::topic(topic.content.topic_id),
                    allocated: *topic_total,
                    declared: topic_limit,
                });
            }
        }
    }
    Ok(())
}
