//! Local relational cache.
//!
//! Normalized SQLite tables mirroring the remote user document tree. Every
//! write goes through one of the repositories below, which bump the
//! [`ChangeNotifier`] so that open [`LiveQuery`] subscriptions re-run.

mod exercise_repo;
mod notify;
mod progress_repo;
mod routine_repo;
mod user_repo;

pub use exercise_repo::ExerciseRepository;
pub use notify::{ChangeNotifier, LiveQuery, Table, TableVersions};
pub use progress_repo::ProgressRepository;
pub use routine_repo::RoutineRepository;
pub use user_repo::UserRepository;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Initialize the database connection pool and run migrations
pub async fn init_db(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Handle to the local cache shared by the write path, the sync engine and
/// the read views.
#[derive(Clone)]
pub struct Cache {
    pool: SqlitePool,
    notifier: ChangeNotifier,
}

impl Cache {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Opens (creating if needed) the cache database at `path`.
    pub async fn open(path: &Path) -> Result<Self, sqlx::Error> {
        Ok(Self::new(init_db(path).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone(), self.notifier.clone())
    }

    pub fn exercises(&self) -> ExerciseRepository {
        ExerciseRepository::new(self.pool.clone(), self.notifier.clone())
    }

    pub fn routines(&self) -> RoutineRepository {
        RoutineRepository::new(self.pool.clone(), self.notifier.clone())
    }

    pub fn progress(&self) -> ProgressRepository {
        ProgressRepository::new(self.pool.clone(), self.notifier.clone())
    }
}

/// Parses a stored RFC 3339 column. A corrupt value is logged and read as
/// the current time.
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            warn!(value = %s, error = %e, "Corrupt timestamp in cache, using now");
            Utc::now()
        }
    }
}
