use sqlx::SqlitePool;

use super::notify::{ChangeNotifier, LiveQuery, Table};
use super::parse_timestamp;
use crate::models::Progress;

const PROGRESS_TABLES: &[Table] = &[Table::Progress];

#[derive(Clone)]
pub struct ProgressRepository {
    pool: SqlitePool,
    notifier: ChangeNotifier,
}

#[derive(sqlx::FromRow)]
struct ProgressRow {
    id: i64,
    user_id: String,
    routine_id: i64,
    completed_at: String,
    total_duration: f64,
    completed_exercises: String,
}

impl From<ProgressRow> for Progress {
    fn from(row: ProgressRow) -> Self {
        Progress {
            id: row.id,
            user_id: row.user_id,
            routine_id: row.routine_id,
            completed_at: parse_timestamp(&row.completed_at),
            total_duration: row.total_duration,
            completed_exercises: Progress::decode_exercise_ids(&row.completed_exercises),
        }
    }
}

// One progress row per routine; a later completion replaces the earlier one.
const UPSERT_PROGRESS: &str = r#"
    INSERT INTO progress (user_id, routine_id, completed_at, total_duration, completed_exercises)
    VALUES (?, ?, ?, ?, ?)
    ON CONFLICT(routine_id) DO UPDATE SET
        user_id = excluded.user_id,
        completed_at = excluded.completed_at,
        total_duration = excluded.total_duration,
        completed_exercises = excluded.completed_exercises
    RETURNING id
"#;

impl ProgressRepository {
    pub fn new(pool: SqlitePool, notifier: ChangeNotifier) -> Self {
        Self { pool, notifier }
    }

    pub async fn upsert(&self, progress: &Progress) -> Result<i64, sqlx::Error> {
        let (id,): (i64,) = sqlx::query_as(UPSERT_PROGRESS)
            .bind(&progress.user_id)
            .bind(progress.routine_id)
            .bind(progress.completed_at.to_rfc3339())
            .bind(progress.total_duration)
            .bind(Progress::encode_exercise_ids(&progress.completed_exercises))
            .fetch_one(&self.pool)
            .await?;

        self.notifier.notify(PROGRESS_TABLES);
        Ok(id)
    }

    pub async fn upsert_all(&self, records: &[Progress]) -> Result<Vec<i64>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(records.len());

        for progress in records {
            let (id,): (i64,) = sqlx::query_as(UPSERT_PROGRESS)
                .bind(&progress.user_id)
                .bind(progress.routine_id)
                .bind(progress.completed_at.to_rfc3339())
                .bind(progress.total_duration)
                .bind(Progress::encode_exercise_ids(&progress.completed_exercises))
                .fetch_one(&mut *tx)
                .await?;
            ids.push(id);
        }

        tx.commit().await?;
        if !ids.is_empty() {
            self.notifier.notify(PROGRESS_TABLES);
        }
        Ok(ids)
    }

    /// Progress records for a user, most recent first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Progress>, sqlx::Error> {
        let rows: Vec<ProgressRow> = sqlx::query_as(
            "SELECT * FROM progress WHERE user_id = ? ORDER BY completed_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Progress::from).collect())
    }

    pub async fn get_for_routine(&self, routine_id: i64) -> Result<Option<Progress>, sqlx::Error> {
        let row: Option<ProgressRow> =
            sqlx::query_as("SELECT * FROM progress WHERE routine_id = ?")
                .bind(routine_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Progress::from))
    }

    /// Number of routines the user completed in a calendar month (UTC).
    pub async fn completed_in_month(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
    ) -> Result<i64, sqlx::Error> {
        let month = format!("{:04}-{:02}", year, month);
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM progress WHERE user_id = ? AND substr(completed_at, 1, 7) = ?",
        )
        .bind(user_id)
        .bind(month)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub fn observe_for_user(&self, user_id: &str) -> LiveQuery<Progress> {
        let repo = self.clone();
        let user_id = user_id.to_string();
        LiveQuery::new(&self.notifier, PROGRESS_TABLES, move || {
            let repo = repo.clone();
            let user_id = user_id.clone();
            async move { repo.list_for_user(&user_id).await }
        })
    }
}
