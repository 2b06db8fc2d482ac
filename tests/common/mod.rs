#![allow(dead_code)]

use chrono::NaiveDate;
use tsam_sessions::clock::FixedClock;
use tsam_sessions::db::{self, SqliteStore};
use tsam_sessions::fixture::{self, BatchFixture};
use tsam_sessions::planner::{AllocatorOptions, SessionPlan};
use tsam_sessions::service;

pub async fn setup_pool() -> sqlx::SqlitePool {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn example_fixture() -> BatchFixture {
    fixture::parse(fixture::example()).unwrap()
}

pub async fn import(pool: &sqlx::SqlitePool, fx: &BatchFixture) -> i64 {
    db::import_batch(pool, fx).await.unwrap()
}

pub async fn generate(
    pool: &sqlx::SqlitePool,
    batch_id: i64,
    from: Option<NaiveDate>,
) -> anyhow::Result<SessionPlan> {
    let store = SqliteStore::new(pool.clone());
    service::generate_session_plan(
        &store,
        &FixedClock(date(2024, 1, 1)),
        &AllocatorOptions::default(),
        batch_id,
        from,
    )
    .await
}

/// (date, [(topic_id, sub_topic_id, minutes, is_completed)]) per stored session.
pub async fn stored_plan(
    pool: &sqlx::SqlitePool,
    batch_id: i64,
) -> Vec<(NaiveDate, Vec<(i64, Option<i64>, i64, bool)>)> {
    db::fetch_sessions(pool, batch_id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| {
            (
                s.date,
                s.topics
                    .iter()
                    .map(|t| {
                        (
                            t.content.topic_id,
                            t.content.sub_topic_id,
                            t.total_time,
                            t.is_completed,
                        )
                    })
                    .collect(),
            )
        })
        .collect()
}
