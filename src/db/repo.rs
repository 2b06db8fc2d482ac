use super::model::{PlanWrite, SessionCompletion};
use crate::fixture::BatchFixture;
use crate::model::{
    Batch, BatchModule, BatchSessionHoliday, BatchStatus, ContentRef, Faculty, ModuleTiming,
    Session, SessionTopic, SubTopic, Topic,
};
use crate::planner::{PlannedSession, Progress, SessionPlan};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::collections::{BTreeSet, HashMap};
use tracing::{info, instrument, warn};

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    // sqlx only creates missing database files when asked to.
    let mut rebuilt = format!("sqlite://{}", expanded_path);
    match query_part {
        Some(q) => {
            rebuilt.push('?');
            rebuilt.push_str(q);
        }
        None => rebuilt.push_str("?mode=rwc"),
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Insert a whole batch fixture in one transaction. Returns the batch id.
#[instrument(skip_all, fields(code = %fixture.batch.code))]
pub async fn import_batch(pool: &Pool, fixture: &BatchFixture) -> Result<i64> {
    fixture.validate()?;
    let mut tx = pool.begin().await?;

    let mut faculty_ids: HashMap<&str, i64> = HashMap::new();
    for name in &fixture.faculty {
        let id: i64 = sqlx::query("INSERT INTO faculty (name) VALUES (?) RETURNING id")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?
            .get("id");
        faculty_ids.insert(name.as_str(), id);
    }
    let faculty_id = |name: &str| -> Result<i64> {
        faculty_ids
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("unknown faculty '{}'", name))
    };

    let b = &fixture.batch;
    let batch_id: i64 = sqlx::query(
        "INSERT INTO batches (name, code, course_name, start_date, status, total_intake, total_students, sales_person, eligibility) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&b.name)
    .bind(&b.code)
    .bind(&b.course_name)
    .bind(b.start_date)
    .bind(BatchStatus::Active.as_str())
    .bind(b.total_intake)
    .bind(b.total_students)
    .bind(b.sales_person.as_deref())
    .bind(b.eligibility.as_deref())
    .fetch_one(&mut *tx)
    .await
    .with_context(|| format!("failed to insert batch {}", b.code))?
    .get("id");

    for module in &fixture.modules {
        let course_module_id: i64 =
            sqlx::query("INSERT INTO course_modules (course_name, name) VALUES (?, ?) RETURNING id")
                .bind(&b.course_name)
                .bind(&module.name)
                .fetch_one(&mut *tx)
                .await?
                .get("id");

        for (i, topic) in module.topics.iter().enumerate() {
            let topic_id: i64 = sqlx::query(
                "INSERT INTO topics (course_module_id, name, topic_order, total_time) VALUES (?, ?, ?, ?) RETURNING id",
            )
            .bind(course_module_id)
            .bind(&topic.name)
            .bind(i as i64 + 1)
            .bind(topic.minutes)
            .fetch_one(&mut *tx)
            .await?
            .get("id");
            for (j, sub) in topic.sub_topics.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO sub_topics (topic_id, name, sub_topic_order, total_time) VALUES (?, ?, ?, ?)",
                )
                .bind(topic_id)
                .bind(&sub.name)
                .bind(j as i64 + 1)
                .bind(sub.minutes)
                .execute(&mut *tx)
                .await?;
            }
        }

        let module_faculty = module
            .faculty
            .as_deref()
            .map(|name| faculty_id(name))
            .transpose()?;
        let batch_module_id: i64 = sqlx::query(
            "INSERT INTO batch_modules (batch_id, course_module_id, faculty_id, module_order) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(batch_id)
        .bind(course_module_id)
        .bind(module_faculty)
        .bind(module.order)
        .fetch_one(&mut *tx)
        .await?
        .get("id");

        for timing in &module.timings {
            let owner = timing
                .faculty
                .as_deref()
                .or(module.faculty.as_deref())
                .ok_or_else(|| anyhow!("timing of module '{}' has no faculty", module.name))?;
            let (from, to) = timing.window()?;
            sqlx::query(
                "INSERT INTO module_timings (batch_module_id, faculty_id, day, from_time, to_time) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(batch_module_id)
            .bind(faculty_id(owner)?)
            .bind(timing.weekday()?.to_string())
            .bind(from)
            .bind(to)
            .execute(&mut *tx)
            .await?;
        }
    }

    for holiday in &fixture.holidays {
        insert_holiday_tx(&mut tx, batch_id, holiday.date, holiday.description.as_deref()).await?;
    }

    tx.commit().await?;
    info!(batch_id, modules = fixture.modules.len(), "batch imported");
    Ok(batch_id)
}

// ---------------------------------------------------------------------------
// Batches and curriculum
// ---------------------------------------------------------------------------

fn batch_from_row(row: &SqliteRow) -> Result<Batch> {
    let id: i64 = row.get("id");
    let status_str: String = row.get("status");
    let status = BatchStatus::parse_status(&status_str)
        .ok_or_else(|| anyhow!("batch {} has unknown status {}", id, status_str))?;
    let created_at: NaiveDateTime = row.get("created_at");
    Ok(Batch {
        id,
        name: row.get("name"),
        code: row.get("code"),
        course_name: row.get("course_name"),
        start_date: row.get("start_date"),
        estimated_end_date: row.get("estimated_end_date"),
        final_end_date: row.get("final_end_date"),
        status,
        total_intake: row.get("total_intake"),
        total_students: row.get("total_students"),
        sales_person: row.get("sales_person"),
        eligibility: row.get("eligibility"),
        created_at: created_at.and_utc(),
    })
}

/// Fetch a batch that has not been soft-deleted.
#[instrument(skip_all)]
pub async fn fetch_batch(pool: &Pool, batch_id: i64) -> Result<Batch> {
    let row = sqlx::query(
        "SELECT id, name, code, course_name, start_date, estimated_end_date, final_end_date, status, \
                total_intake, total_students, sales_person, eligibility, created_at \
         FROM batches WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(batch_id)
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else {
        return Err(anyhow!("batch {} not found", batch_id));
    };
    batch_from_row(&row)
}

#[instrument(skip_all)]
pub async fn soft_delete_batch(pool: &Pool, batch_id: i64) -> Result<()> {
    let res = sqlx::query(
        "UPDATE batches SET deleted_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP \
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(batch_id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        bail!("batch {} not found", batch_id);
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn fetch_batch_modules(pool: &Pool, batch_id: i64) -> Result<Vec<BatchModule>> {
    let rows = sqlx::query(
        "SELECT bm.id, bm.batch_id, bm.course_module_id, cm.name, bm.module_order, bm.faculty_id, \
                bm.start_date, bm.estimated_end_date, bm.is_completed \
         FROM batch_modules bm JOIN course_modules cm ON cm.id = bm.course_module_id \
         WHERE bm.batch_id = ? AND bm.deleted_at IS NULL \
         ORDER BY bm.module_order, bm.id",
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| BatchModule {
            id: row.get("id"),
            batch_id: row.get("batch_id"),
            course_module_id: row.get("course_module_id"),
            name: row.get("name"),
            order: row.get("module_order"),
            faculty_id: row.get("faculty_id"),
            start_date: row.get("start_date"),
            estimated_end_date: row.get("estimated_end_date"),
            is_completed: row.get("is_completed"),
        })
        .collect())
}

#[instrument(skip_all)]
pub async fn fetch_module_timings(pool: &Pool, batch_id: i64) -> Result<Vec<ModuleTiming>> {
    let rows = sqlx::query(
        "SELECT mt.id, mt.batch_module_id, mt.faculty_id, mt.day, mt.from_time, mt.to_time \
         FROM module_timings mt JOIN batch_modules bm ON bm.id = mt.batch_module_id \
         WHERE bm.batch_id = ? AND mt.deleted_at IS NULL \
         ORDER BY mt.batch_module_id, mt.id",
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let id: i64 = row.get("id");
            let day: String = row.get("day");
            let day = day
                .parse::<Weekday>()
                .map_err(|_| anyhow!("module timing {} has invalid day '{}'", id, day))?;
            let from_time: NaiveTime = row.get("from_time");
            let to_time: NaiveTime = row.get("to_time");
            Ok(ModuleTiming {
                id,
                batch_module_id: row.get("batch_module_id"),
                faculty_id: row.get("faculty_id"),
                day,
                from_time,
                to_time,
            })
        })
        .collect()
}

/// Topics of a course module with their subtopics, in curriculum order.
#[instrument(skip_all)]
pub async fn fetch_topics(pool: &Pool, course_module_id: i64) -> Result<Vec<Topic>> {
    let topic_rows = sqlx::query(
        "SELECT id, course_module_id, name, topic_order, total_time FROM topics \
         WHERE course_module_id = ? ORDER BY topic_order, id",
    )
    .bind(course_module_id)
    .fetch_all(pool)
    .await?;

    let sub_rows = sqlx::query(
        "SELECT s.id, s.topic_id, s.name, s.sub_topic_order, s.total_time \
         FROM sub_topics s JOIN topics t ON t.id = s.topic_id \
         WHERE t.course_module_id = ? ORDER BY s.sub_topic_order, s.id",
    )
    .bind(course_module_id)
    .fetch_all(pool)
    .await?;

    let mut subs: HashMap<i64, Vec<SubTopic>> = HashMap::new();
    for row in sub_rows {
        let topic_id: i64 = row.get("topic_id");
        subs.entry(topic_id).or_default().push(SubTopic {
            id: row.get("id"),
            topic_id,
            name: row.get("name"),
            order: row.get("sub_topic_order"),
            total_time: row.get("total_time"),
        });
    }

    Ok(topic_rows
        .into_iter()
        .map(|row| {
            let id: i64 = row.get("id");
            Topic {
                id,
                course_module_id: row.get("course_module_id"),
                name: row.get("name"),
                order: row.get("topic_order"),
                total_time: row.get("total_time"),
                sub_topics: subs.remove(&id).unwrap_or_default(),
            }
        })
        .collect())
}

#[instrument(skip_all)]
pub async fn fetch_faculty(pool: &Pool) -> Result<Vec<Faculty>> {
    let rows = sqlx::query("SELECT id, name FROM faculty WHERE deleted_at IS NULL ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| Faculty {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Holidays
// ---------------------------------------------------------------------------

#[instrument(skip_all)]
pub async fn fetch_holidays(pool: &Pool, batch_id: i64) -> Result<Vec<BatchSessionHoliday>> {
    let rows = sqlx::query(
        "SELECT batch_id, holiday_date, description FROM batch_session_holidays \
         WHERE batch_id = ? ORDER BY holiday_date",
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| BatchSessionHoliday {
            batch_id: row.get("batch_id"),
            date: row.get("holiday_date"),
            description: row.get("description"),
        })
        .collect())
}

pub async fn fetch_holiday_dates(pool: &Pool, batch_id: i64) -> Result<BTreeSet<NaiveDate>> {
    Ok(fetch_holidays(pool, batch_id)
        .await?
        .into_iter()
        .map(|h| h.date)
        .collect())
}

/// Add a holiday. A pending session already planned on that date is left in
/// place until the plan is regenerated.
#[instrument(skip_all)]
pub async fn add_holiday(
    pool: &Pool,
    batch_id: i64,
    date: NaiveDate,
    description: Option<&str>,
) -> Result<()> {
    fetch_batch(pool, batch_id).await?;
    let mut tx = pool.begin().await?;
    insert_holiday_tx(&mut tx, batch_id, date, description).await?;
    let clashing: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sessions WHERE batch_id = ? AND session_date = ? AND is_completed = 0",
    )
    .bind(batch_id)
    .bind(date)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    if clashing > 0 {
        warn!(batch_id, %date, "holiday falls on a planned session; regenerate the plan");
    }
    Ok(())
}

async fn insert_holiday_tx(
    tx: &mut Transaction<'_, Sqlite>,
    batch_id: i64,
    date: NaiveDate,
    description: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO batch_session_holidays (batch_id, holiday_date, description) VALUES (?, ?, ?)",
    )
    .bind(batch_id)
    .bind(date)
    .bind(description)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("failed to add holiday {} for batch {}", date, batch_id))?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn remove_holiday(pool: &Pool, batch_id: i64, date: NaiveDate) -> Result<()> {
    let res = sqlx::query(
        "DELETE FROM batch_session_holidays WHERE batch_id = ? AND holiday_date = ?",
    )
    .bind(batch_id)
    .bind(date)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        bail!("batch {} has no holiday on {}", batch_id, date);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Minutes already taught per content unit, from completed sessions only.
#[instrument(skip_all)]
pub async fn fetch_progress(pool: &Pool, batch_id: i64) -> Result<Progress> {
    let rows = sqlx::query(
        "SELECT st.topic_id, st.sub_topic_id, st.total_time, st.is_completed, s.session_date \
         FROM session_topics st JOIN sessions s ON s.id = st.session_id \
         WHERE s.batch_id = ? AND s.is_completed = 1 \
         ORDER BY s.session_date, st.topic_order",
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    let mut progress = Progress::default();
    for row in rows {
        let content = ContentRef {
            topic_id: row.get("topic_id"),
            sub_topic_id: row.get("sub_topic_id"),
        };
        progress.record(
            content,
            row.get("total_time"),
            row.get("session_date"),
            row.get("is_completed"),
        );
    }
    Ok(progress)
}

/// Replace every not-yet-completed session of the plan's batch with the
/// plan, and stamp module spans and the batch's estimated end date. All or
/// nothing.
#[instrument(skip_all, fields(batch_id = plan.batch_id))]
pub async fn replace_pending_plan(pool: &Pool, plan: &SessionPlan) -> Result<PlanWrite> {
    let batch_id = plan.batch_id;
    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM session_topics WHERE session_id IN \
         (SELECT id FROM sessions WHERE batch_id = ? AND is_completed = 0)",
    )
    .bind(batch_id)
    .execute(&mut *tx)
    .await?;
    let removed = sqlx::query("DELETE FROM sessions WHERE batch_id = ? AND is_completed = 0")
        .bind(batch_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let mut write = PlanWrite {
        removed_sessions: removed,
        ..PlanWrite::default()
    };
    for session in &plan.sessions {
        write.inserted_topics += insert_session_tx(&mut tx, batch_id, session).await?;
        write.inserted_sessions += 1;
    }

    for span in plan.module_spans() {
        sqlx::query(
            "UPDATE batch_modules SET start_date = COALESCE( \
                 (SELECT MIN(session_date) FROM sessions WHERE batch_module_id = ? AND is_completed = 1), ?), \
             estimated_end_date = ? WHERE id = ?",
        )
        .bind(span.batch_module_id)
        .bind(span.start_date)
        .bind(span.end_date)
        .bind(span.batch_module_id)
        .execute(&mut *tx)
        .await?;
    }
    if let Some(end) = plan.estimated_end_date() {
        sqlx::query(
            "UPDATE batches SET estimated_end_date = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(end)
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(write)
}

async fn insert_session_tx(
    tx: &mut Transaction<'_, Sqlite>,
    batch_id: i64,
    session: &PlannedSession,
) -> Result<u64> {
    let session_id: i64 = sqlx::query(
        "INSERT INTO sessions (batch_id, batch_module_id, faculty_id, session_date) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(batch_id)
    .bind(session.batch_module_id)
    .bind(session.faculty_id)
    .bind(session.date)
    .fetch_one(&mut **tx)
    .await?
    .get("id");

    for topic in &session.topics {
        sqlx::query(
            "INSERT INTO session_topics (session_id, topic_id, sub_topic_id, topic_order, total_time, initial_date, completed_date, is_completed) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(topic.content.topic_id)
        .bind(topic.content.sub_topic_id)
        .bind(topic.order)
        .bind(topic.minutes)
        .bind(topic.initial_date)
        .bind(topic.completed_date)
        .bind(topic.is_completed)
        .execute(&mut **tx)
        .await?;
    }
    Ok(session.topics.len() as u64)
}

/// All sessions of a batch, by date, with their topics.
#[instrument(skip_all)]
pub async fn fetch_sessions(pool: &Pool, batch_id: i64) -> Result<Vec<Session>> {
    let session_rows = sqlx::query(
        "SELECT id, batch_id, batch_module_id, faculty_id, session_date, is_completed, completed_at \
         FROM sessions WHERE batch_id = ? ORDER BY session_date, id",
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    let topic_rows = sqlx::query(
        "SELECT st.id, st.session_id, st.topic_id, st.sub_topic_id, st.topic_order, st.total_time, \
                st.initial_date, st.completed_date, st.is_completed \
         FROM session_topics st JOIN sessions s ON s.id = st.session_id \
         WHERE s.batch_id = ? ORDER BY st.session_id, st.topic_order",
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    let mut topics: HashMap<i64, Vec<SessionTopic>> = HashMap::new();
    for row in topic_rows {
        let session_id: i64 = row.get("session_id");
        topics.entry(session_id).or_default().push(SessionTopic {
            id: row.get("id"),
            session_id,
            content: ContentRef {
                topic_id: row.get("topic_id"),
                sub_topic_id: row.get("sub_topic_id"),
            },
            order: row.get("topic_order"),
            total_time: row.get("total_time"),
            initial_date: row.get("initial_date"),
            completed_date: row.get("completed_date"),
            is_completed: row.get("is_completed"),
        });
    }

    Ok(session_rows
        .into_iter()
        .map(|row| {
            let id: i64 = row.get("id");
            Session {
                id,
                batch_id: row.get("batch_id"),
                batch_module_id: row.get("batch_module_id"),
                faculty_id: row.get("faculty_id"),
                date: row.get("session_date"),
                is_completed: row.get("is_completed"),
                completed_at: row.get("completed_at"),
                topics: topics.remove(&id).unwrap_or_default(),
            }
        })
        .collect())
}

/// Mark a session as taught. Earlier pending sessions of the batch must be
/// completed first. Completes its module once no pending session of that
/// module remains, and the batch once every module is complete.
#[instrument(skip_all)]
pub async fn complete_session(pool: &Pool, session_id: i64) -> Result<SessionCompletion> {
    let mut tx = pool.begin().await?;
    let row = sqlx::query(
        "SELECT batch_id, batch_module_id, session_date, is_completed FROM sessions WHERE id = ?",
    )
    .bind(session_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(row) = row else {
        return Err(anyhow!("session {} not found", session_id));
    };
    let batch_id: i64 = row.get("batch_id");
    let batch_module_id: i64 = row.get("batch_module_id");
    let session_date: NaiveDate = row.get("session_date");
    let already: bool = row.get("is_completed");
    if already {
        bail!("session {} is already completed", session_id);
    }

    // Sessions are taught in date order.
    let earlier: Option<NaiveDate> = sqlx::query_scalar(
        "SELECT MIN(session_date) FROM sessions \
         WHERE batch_id = ? AND is_completed = 0 AND session_date < ?",
    )
    .bind(batch_id)
    .bind(session_date)
    .fetch_one(&mut *tx)
    .await?;
    if let Some(earlier) = earlier {
        bail!(
            "session {} on {} cannot be completed before the pending session on {}",
            session_id,
            session_date,
            earlier
        );
    }

    sqlx::query("UPDATE sessions SET is_completed = 1, completed_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    let pending_in_module: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sessions WHERE batch_module_id = ? AND is_completed = 0",
    )
    .bind(batch_module_id)
    .fetch_one(&mut *tx)
    .await?;
    let module_completed = pending_in_module == 0;
    if module_completed {
        sqlx::query("UPDATE batch_modules SET is_completed = 1 WHERE id = ?")
            .bind(batch_module_id)
            .execute(&mut *tx)
            .await?;
    }

    let open_modules: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM batch_modules WHERE batch_id = ? AND is_completed = 0 AND deleted_at IS NULL",
    )
    .bind(batch_id)
    .fetch_one(&mut *tx)
    .await?;
    let batch_completed = open_modules == 0;
    if batch_completed {
        sqlx::query(
            "UPDATE batches SET status = ?, final_end_date = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(BatchStatus::Completed.as_str())
        .bind(session_date)
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(session_id, batch_id, module_completed, batch_completed, "session completed");
    Ok(SessionCompletion {
        session_id,
        batch_id,
        batch_module_id,
        module_completed,
        batch_completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    async fn setup_pool() -> Pool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[test]
    fn sqlite_url_normalisation() {
        assert_eq!(prepare_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(prepare_sqlite_url("postgres://x"), "postgres://x");
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("nested").join("tsam.db");
        let url = prepare_sqlite_url(&format!("sqlite://{}", path.display()));
        assert_eq!(url, format!("sqlite://{}?mode=rwc", path.display()));
        assert!(path.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn import_and_read_back() {
        let pool = setup_pool().await;
        let fx = fixture::parse(fixture::example()).unwrap();
        let batch_id = import_batch(&pool, &fx).await.unwrap();

        let batch = fetch_batch(&pool, batch_id).await.unwrap();
        assert_eq!(batch.code, "GO-2024-01");
        assert_eq!(batch.status, BatchStatus::Active);
        assert_eq!(batch.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));

        let modules = fetch_batch_modules(&pool, batch_id).await.unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].name, "Basics");
        assert!(modules[0].faculty_id.is_some());

        let timings = fetch_module_timings(&pool, batch_id).await.unwrap();
        assert_eq!(timings.len(), 3);
        assert_eq!(timings[0].day, Weekday::Mon);
        assert_eq!(timings[0].minutes(), 120);

        let topics = fetch_topics(&pool, modules[0].course_module_id).await.unwrap();
        assert_eq!(topics.len(), 3);
        assert_eq!(topics[2].sub_topics.len(), 2);
        assert_eq!(topics[2].sub_topics[1].name, "Switch");

        let holidays = fetch_holiday_dates(&pool, batch_id).await.unwrap();
        assert!(holidays.contains(&NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()));
        assert_eq!(fetch_faculty(&pool).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_batch_code_rolls_back_import() {
        let pool = setup_pool().await;
        let fx = fixture::parse(fixture::example()).unwrap();
        import_batch(&pool, &fx).await.unwrap();
        assert!(import_batch(&pool, &fx).await.is_err());
        let faculty: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM faculty")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(faculty, 2);
    }

    #[tokio::test]
    async fn holiday_add_remove() {
        let pool = setup_pool().await;
        let fx = fixture::parse(fixture::example()).unwrap();
        let batch_id = import_batch(&pool, &fx).await.unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 1, 26).unwrap();

        add_holiday(&pool, batch_id, d, Some("Republic Day")).await.unwrap();
        assert!(add_holiday(&pool, batch_id, d, None).await.is_err());
        assert_eq!(fetch_holidays(&pool, batch_id).await.unwrap().len(), 2);

        remove_holiday(&pool, batch_id, d).await.unwrap();
        assert!(remove_holiday(&pool, batch_id, d).await.is_err());
        assert!(add_holiday(&pool, 999, d, None).await.is_err());
    }

    #[tokio::test]
    async fn soft_deleted_batch_is_not_found() {
        let pool = setup_pool().await;
        let fx = fixture::parse(fixture::example()).unwrap();
        let batch_id = import_batch(&pool, &fx).await.unwrap();
        soft_delete_batch(&pool, batch_id).await.unwrap();
        let err = fetch_batch(&pool, batch_id).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(soft_delete_batch(&pool, batch_id).await.is_err());
    }
}
