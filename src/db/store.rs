use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use super::repo::{self, Pool};
use crate::model::Batch;
use crate::planner::{ModulePlan, Progress, SessionPlan};
use crate::service::PlanStore;

/// [`PlanStore`] over the SQLite repositories.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl PlanStore for SqliteStore {
    async fn load_batch(&self, batch_id: i64) -> Result<Batch> {
        repo::fetch_batch(&self.pool, batch_id).await
    }

    async fn load_modules(&self, batch_id: i64) -> Result<Vec<ModulePlan>> {
        let modules = repo::fetch_batch_modules(&self.pool, batch_id).await?;
        let timings = repo::fetch_module_timings(&self.pool, batch_id).await?;

        let mut plans = Vec::with_capacity(modules.len());
        for module in modules {
            let topics = repo::fetch_topics(&self.pool, module.course_module_id).await?;
            let module_timings = timings
                .iter()
                .filter(|t| t.batch_module_id == module.id)
                .cloned()
                .collect();
            plans.push(ModulePlan {
                module,
                timings: module_timings,
                topics,
            });
        }
        Ok(plans)
    }

    async fn load_holidays(&self, batch_id: i64) -> Result<BTreeSet<NaiveDate>> {
        repo::fetch_holiday_dates(&self.pool, batch_id).await
    }

    async fn load_progress(&self, batch_id: i64) -> Result<Progress> {
        repo::fetch_progress(&self.pool, batch_id).await
    }

    async fn save_plan(&self, plan: &SessionPlan) -> Result<()> {
        let write = repo::replace_pending_plan(&self.pool, plan).await?;
        debug!(
            removed = write.removed_sessions,
            inserted = write.inserted_sessions,
            topics = write.inserted_topics,
            "plan written"
        );
        Ok(())
    }
}
