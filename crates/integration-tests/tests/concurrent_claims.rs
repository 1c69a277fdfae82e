//! Exactly-once claiming under concurrent fetchers

mod common;

use std::collections::HashSet;

use erp_intake_core::domain::RegistrationStatus;
use erp_intake_core::port::RegistrationRepository;

#[tokio::test]
async fn test_concurrent_fetch_claims_each_row_once() {
    let db = test_db!();

    const ROWS: usize = 5;
    const FETCHERS: usize = 8;

    for i in 0..ROWS {
        db.repo.insert_registration(&common::numbered(i)).await.unwrap();
    }

    let handles: Vec<_> = (0..FETCHERS)
        .map(|_| {
            let repo = db.repo.clone();
            tokio::spawn(async move { repo.fetch_pending_job().await })
        })
        .collect();

    let mut claimed = Vec::new();
    let mut empty = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap().unwrap() {
            Some(record) => {
                assert_eq!(record.status, RegistrationStatus::Processing);
                claimed.push(record.id);
            }
            None => empty += 1,
        }
    }

    let distinct: HashSet<_> = claimed.iter().copied().collect();
    assert_eq!(claimed.len(), ROWS);
    assert_eq!(distinct.len(), ROWS);
    assert_eq!(empty, FETCHERS - ROWS);

    assert_eq!(
        db.repo.count_by_status(RegistrationStatus::Processing).await.unwrap(),
        ROWS as i64
    );
    assert_eq!(
        db.repo.count_by_status(RegistrationStatus::Pending).await.unwrap(),
        0
    );

    db.teardown().await;
}

#[tokio::test]
async fn test_claims_follow_creation_order() {
    let db = test_db!();

    let mut inserted = Vec::new();
    for i in 0..3 {
        inserted.push(db.repo.insert_registration(&common::numbered(i)).await.unwrap().id);
    }

    let mut claimed = Vec::new();
    while let Some(record) = db.repo.fetch_pending_job().await.unwrap() {
        claimed.push(record.id);
    }
    assert_eq!(claimed, inserted);

    db.teardown().await;
}

#[tokio::test]
async fn test_parallel_inserts_get_distinct_codes() {
    let db = test_db!();

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let repo = db.repo.clone();
            tokio::spawn(async move { repo.insert_registration(&common::numbered(i)).await })
        })
        .collect();

    let codes: HashSet<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap().erp_code)
        .collect();
    assert_eq!(codes.len(), 20);
    assert!(codes.iter().all(|code| (50001..=50020).contains(code)));

    db.teardown().await;
}
