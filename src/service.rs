//! The "generate / regenerate session plan" operation.
//!
//! Everything the allocator needs is read through [`PlanStore`] before the
//! allocation loop starts, and the resulting plan is handed back to the store
//! in a single write.
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{info, instrument};

use crate::clock::Clock;
use crate::model::{Batch, BatchStatus};
use crate::planner::{allocate, AllocatorOptions, ModulePlan, PlanInput, Progress, SessionPlan};

#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn load_batch(&self, batch_id: i64) -> Result<Batch>;

    /// Batch modules with their timings and curriculum topics.
    async fn load_modules(&self, batch_id: i64) -> Result<Vec<ModulePlan>>;

    async fn load_holidays(&self, batch_id: i64) -> Result<BTreeSet<NaiveDate>>;

    /// Content covered by sessions already marked complete.
    async fn load_progress(&self, batch_id: i64) -> Result<Progress>;

    /// Replace the batch's pending sessions with `plan`, atomically.
    async fn save_plan(&self, plan: &SessionPlan) -> Result<()>;
}

/// Generate the session plan of a batch, replacing any pending sessions.
///
/// Completed sessions are kept: their content is not scheduled again and
/// the plan never starts on or before the last of them.
#[instrument(skip(store, clock, options))]
pub async fn generate_session_plan(
    store: &dyn PlanStore,
    clock: &dyn Clock,
    options: &AllocatorOptions,
    batch_id: i64,
    from: Option<NaiveDate>,
) -> Result<SessionPlan> {
    let batch = store.load_batch(batch_id).await?;
    if batch.status == BatchStatus::Completed {
        bail!("batch {} is already completed", batch_id);
    }
    let modules = store.load_modules(batch_id).await?;
    let holidays = store.load_holidays(batch_id).await?;
    let progress = store.load_progress(batch_id).await?;

    let start_date = resolve_start_date(&batch, &progress, clock, from);
    let input = PlanInput {
        batch_id,
        start_date,
        holidays,
        modules,
        progress,
    };
    let plan = allocate(&input, options)
        .with_context(|| format!("failed to allocate sessions for batch {}", batch.code))?;

    store.save_plan(&plan).await?;
    info!(
        batch_id,
        %start_date,
        sessions = plan.sessions.len(),
        "session plan saved"
    );
    Ok(plan)
}

/// `from`, else the batch start date, else today; never on or before the
/// last completed session.
pub fn resolve_start_date(
    batch: &Batch,
    progress: &Progress,
    clock: &dyn Clock,
    from: Option<NaiveDate>,
) -> NaiveDate {
    let base = from.or(batch.start_date).unwrap_or_else(|| clock.today());
    match progress.last_session_date {
        Some(last) if last >= base => last.succ_opt().unwrap_or(last),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::ContentRef;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn batch(start: Option<NaiveDate>) -> Batch {
        Batch {
            id: 1,
            name: "b".into(),
            code: "B".into(),
            course_name: "c".into(),
            start_date: start,
            estimated_end_date: None,
            final_end_date: None,
            status: BatchStatus::Active,
            total_intake: 0,
            total_students: 0,
            sales_person: None,
            eligibility: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn start_date_precedence() {
        let clock = FixedClock(date(2024, 3, 1));
        let none = Progress::default();
        let from = Some(date(2024, 2, 1));
        assert_eq!(
            resolve_start_date(&batch(Some(date(2024, 1, 1))), &none, &clock, from),
            date(2024, 2, 1)
        );
        assert_eq!(
            resolve_start_date(&batch(Some(date(2024, 1, 1))), &none, &clock, None),
            date(2024, 1, 1)
        );
        assert_eq!(resolve_start_date(&batch(None), &none, &clock, None), date(2024, 3, 1));
    }

    #[test]
    fn start_date_after_last_completed_session() {
        let clock = FixedClock(date(2024, 3, 1));
        let mut progress = Progress::default();
        progress.record(ContentRef::topic(1), 60, date(2024, 1, 10), true);
        assert_eq!(
            resolve_start_date(&batch(Some(date(2024, 1, 1))), &progress, &clock, None),
            date(2024, 1, 11)
        );
        let from = Some(date(2024, 2, 1));
        assert_eq!(
            resolve_start_date(&batch(Some(date(2024, 1, 1))), &progress, &clock, from),
            date(2024, 2, 1)
        );
    }
}
