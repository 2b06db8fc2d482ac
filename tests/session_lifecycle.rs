mod common;

use common::*;
use tsam_sessions::db;
use tsam_sessions::model::BatchStatus;

#[tokio::test]
async fn regenerating_after_completion_keeps_taught_sessions() {
    let pool = setup_pool().await;
    let batch_id = import(&pool, &example_fixture()).await;
    generate(&pool, batch_id, None).await.unwrap();

    let sessions = db::fetch_sessions(&pool, batch_id).await.unwrap();
    let done = db::complete_session(&pool, sessions[0].id).await.unwrap();
    assert!(!done.module_completed);
    assert!(!done.batch_completed);

    // Shift the rest of the plan by a holiday on the next Wednesday.
    db::add_holiday(&pool, batch_id, date(2024, 1, 3), None)
        .await
        .unwrap();
    let plan = generate(&pool, batch_id, None).await.unwrap();
    assert_eq!(plan.sessions[0].date, date(2024, 1, 8));

    let sessions = db::fetch_sessions(&pool, batch_id).await.unwrap();
    let dates: Vec<_> = sessions.iter().map(|s| s.date).collect();
    assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 8), date(2024, 1, 9)]);
    assert!(sessions[0].is_completed);
    assert!(sessions[0].completed_at.is_some());

    // The carried-over topic keeps the date it was first taught.
    let carried = &sessions[1].topics[0];
    assert_eq!(carried.total_time, 30);
    assert_eq!(carried.initial_date, date(2024, 1, 1));
    assert_eq!(carried.content, sessions[0].topics[1].content);
}

#[tokio::test]
async fn completing_every_session_completes_the_batch() {
    let pool = setup_pool().await;
    let batch_id = import(&pool, &example_fixture()).await;
    generate(&pool, batch_id, None).await.unwrap();
    let sessions = db::fetch_sessions(&pool, batch_id).await.unwrap();
    assert_eq!(sessions.len(), 3);

    let first = db::complete_session(&pool, sessions[0].id).await.unwrap();
    assert!(!first.module_completed);
    let second = db::complete_session(&pool, sessions[1].id).await.unwrap();
    assert!(second.module_completed);
    assert!(!second.batch_completed);
    let last = db::complete_session(&pool, sessions[2].id).await.unwrap();
    assert!(last.module_completed);
    assert!(last.batch_completed);

    let batch = db::fetch_batch(&pool, batch_id).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.final_end_date, Some(date(2024, 1, 9)));
    assert!(db::fetch_batch_modules(&pool, batch_id)
        .await
        .unwrap()
        .iter()
        .all(|m| m.is_completed));

    let err = generate(&pool, batch_id, None).await.unwrap_err();
    assert!(err.to_string().contains("already completed"));
}

#[tokio::test]
async fn completing_twice_fails() {
    let pool = setup_pool().await;
    let batch_id = import(&pool, &example_fixture()).await;
    generate(&pool, batch_id, None).await.unwrap();
    let sessions = db::fetch_sessions(&pool, batch_id).await.unwrap();

    db::complete_session(&pool, sessions[0].id).await.unwrap();
    let err = db::complete_session(&pool, sessions[0].id).await.unwrap_err();
    assert!(err.to_string().contains("already completed"));
    assert!(db::complete_session(&pool, 9999).await.is_err());
}

#[tokio::test]
async fn sessions_complete_in_date_order() {
    let pool = setup_pool().await;
    let batch_id = import(&pool, &example_fixture()).await;
    generate(&pool, batch_id, None).await.unwrap();
    let sessions = db::fetch_sessions(&pool, batch_id).await.unwrap();

    let err = db::complete_session(&pool, sessions[1].id).await.unwrap_err();
    assert!(err.to_string().contains("pending session on 2024-01-01"));
    let stored = db::fetch_sessions(&pool, batch_id).await.unwrap();
    assert!(stored.iter().all(|s| !s.is_completed));

    // The rejected completion leaves the curriculum intact on regeneration.
    generate(&pool, batch_id, None).await.unwrap();
    let minutes: i64 = stored_plan(&pool, batch_id)
        .await
        .iter()
        .flat_map(|(_, topics)| topics.iter())
        .filter(|(topic_id, _, _, _)| *topic_id == sessions[0].topics[1].content.topic_id)
        .map(|(_, _, minutes, _)| minutes)
        .sum();
    assert_eq!(minutes, 60);

    let fresh = db::fetch_sessions(&pool, batch_id).await.unwrap();
    db::complete_session(&pool, fresh[0].id).await.unwrap();
    db::complete_session(&pool, fresh[1].id).await.unwrap();
}

#[tokio::test]
async fn progress_reflects_completed_sessions_only() {
    let pool = setup_pool().await;
    let batch_id = import(&pool, &example_fixture()).await;
    generate(&pool, batch_id, None).await.unwrap();

    let progress = db::fetch_progress(&pool, batch_id).await.unwrap();
    assert!(progress.allocated.is_empty());
    assert_eq!(progress.last_session_date, None);

    let sessions = db::fetch_sessions(&pool, batch_id).await.unwrap();
    db::complete_session(&pool, sessions[0].id).await.unwrap();
    let progress = db::fetch_progress(&pool, batch_id).await.unwrap();
    assert_eq!(progress.allocated.len(), 2);
    assert_eq!(progress.completed.len(), 1);
    assert_eq!(progress.last_session_date, Some(date(2024, 1, 1)));
}
