//! Shared harness: one fresh PostgreSQL schema per test.
//!
//! Tests run only when `ERP_INTAKE_TEST_DATABASE_URL` points at a server
//! the test user may create schemas on. Without it each test prints a
//! notice and returns early.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use erp_intake_core::domain::NewRegistration;
use erp_intake_core::port::RegistrationRepository;
use erp_intake_infra_postgres::{run_migrations, PgRegistrationRepository};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

pub const DATABASE_URL_ENV: &str = "ERP_INTAKE_TEST_DATABASE_URL";

pub struct TestDb {
    pub pool: PgPool,
    pub repo: Arc<PgRegistrationRepository>,
    admin: PgPool,
    schema: String,
}

impl TestDb {
    /// `None` when no test database is configured
    pub async fn start() -> Option<Self> {
        let url = match std::env::var(DATABASE_URL_ENV) {
            Ok(url) if !url.is_empty() => url,
            _ => {
                eprintln!("⚠ {} not set, skipping PostgreSQL test", DATABASE_URL_ENV);
                return None;
            }
        };

        let base = PgConnectOptions::from_str(&url).expect("invalid test database url");
        let schema = format!("test_{}", uuid::Uuid::new_v4().simple());

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(base.clone())
            .await
            .expect("connect to test database");
        sqlx::query(&format!("CREATE SCHEMA {}", schema))
            .execute(&admin)
            .await
            .expect("create test schema");

        let pool = PgPoolOptions::new()
            .max_connections(16)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(base.options([("search_path", schema.as_str())]))
            .await
            .expect("connect with test schema");
        run_migrations(&pool).await.expect("migrations");

        let repo = Arc::new(PgRegistrationRepository::new(pool.clone()));
        Some(Self {
            pool,
            repo,
            admin,
            schema,
        })
    }

    pub fn dyn_repo(&self) -> Arc<dyn RegistrationRepository> {
        self.repo.clone()
    }

    /// Drop the schema; skipped when a test panics before reaching it
    pub async fn teardown(self) {
        self.pool.close().await;
        let _ = sqlx::query(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .execute(&self.admin)
            .await;
        self.admin.close().await;
    }
}

/// Bind a `TestDb` or return from the test when none is configured
#[macro_export]
macro_rules! test_db {
    () => {
        match common::TestDb::start().await {
            Some(db) => db,
            None => return,
        }
    };
}

pub fn acme() -> NewRegistration {
    let mut new = NewRegistration::new("Acme", "Acme Co").with_business_number("123-45-67890");
    new.client_type = Some("I".to_string());
    new.price_grade = Some("O".to_string());
    new.confidence = Some(0.97);
    new
}

pub fn numbered(i: usize) -> NewRegistration {
    NewRegistration::new(format!("Client {}", i), format!("Business {} Ltd", i))
        .with_business_number(format!("{:03}-00-{:05}", i % 1000, i))
}
