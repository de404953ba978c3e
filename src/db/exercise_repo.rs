use sqlx::SqlitePool;

use super::notify::{ChangeNotifier, Table};
use crate::models::Exercise;

const EXERCISE_TABLES: &[Table] = &[Table::Exercises];

#[derive(Clone)]
pub struct ExerciseRepository {
    pool: SqlitePool,
    notifier: ChangeNotifier,
}

#[derive(sqlx::FromRow)]
pub(super) struct ExerciseRow {
    id: i64,
    name: String,
    category: Option<String>,
    description: Option<String>,
    gif_url: Option<String>,
}

impl From<ExerciseRow> for Exercise {
    fn from(row: ExerciseRow) -> Self {
        Exercise {
            id: row.id,
            name: row.name,
            category: row.category,
            description: row.description,
            gif_url: row.gif_url,
        }
    }
}

impl ExerciseRepository {
    pub fn new(pool: SqlitePool, notifier: ChangeNotifier) -> Self {
        Self { pool, notifier }
    }

    /// Inserts a new exercise unless one with the same name already exists.
    ///
    /// Returns the generated key, or `None` if the name was taken.
    pub async fn insert_ignore(&self, exercise: &Exercise) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO exercises (name, category, description, gif_url)
            VALUES (?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&exercise.name)
        .bind(&exercise.category)
        .bind(&exercise.description)
        .bind(&exercise.gif_url)
        .fetch_optional(&self.pool)
        .await?;

        if row.is_some() {
            self.notifier.notify(EXERCISE_TABLES);
        }
        Ok(row.map(|(id,)| id))
    }

    /// Inserts the exercise or replaces the optional fields of the row with
    /// the same name. The stored name keeps its original casing.
    pub async fn upsert(&self, exercise: &Exercise) -> Result<i64, sqlx::Error> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO exercises (name, category, description, gif_url)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                category = excluded.category,
                description = excluded.description,
                gif_url = excluded.gif_url
            RETURNING id
            "#,
        )
        .bind(&exercise.name)
        .bind(&exercise.category)
        .bind(&exercise.description)
        .bind(&exercise.gif_url)
        .fetch_one(&self.pool)
        .await?;

        self.notifier.notify(EXERCISE_TABLES);
        Ok(id)
    }

    /// Stores an exercise, deduplicating by case-insensitive name.
    ///
    /// If a row with the same name exists, the incoming non-null fields are
    /// merged into it in place and its key is returned. Otherwise a new row
    /// is inserted. The merge is a single statement, so concurrent callers
    /// serialize on the write lock.
    pub async fn merge_by_name(&self, incoming: &Exercise) -> Result<i64, sqlx::Error> {
        // No row comes back when the name exists and nothing would change.
        let written: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO exercises (name, category, description, gif_url)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                category = COALESCE(excluded.category, exercises.category),
                description = COALESCE(excluded.description, exercises.description),
                gif_url = COALESCE(excluded.gif_url, exercises.gif_url)
            WHERE (excluded.category IS NOT NULL
                    AND excluded.category IS NOT exercises.category)
                OR (excluded.description IS NOT NULL
                    AND excluded.description IS NOT exercises.description)
                OR (excluded.gif_url IS NOT NULL
                    AND excluded.gif_url IS NOT exercises.gif_url)
            RETURNING id
            "#,
        )
        .bind(&incoming.name)
        .bind(&incoming.category)
        .bind(&incoming.description)
        .bind(&incoming.gif_url)
        .fetch_optional(&self.pool)
        .await?;

        match written {
            Some((id,)) => {
                self.notifier.notify(EXERCISE_TABLES);
                Ok(id)
            }
            None => {
                let (id,): (i64,) =
                    sqlx::query_as("SELECT id FROM exercises WHERE name = ? COLLATE NOCASE")
                        .bind(&incoming.name)
                        .fetch_one(&self.pool)
                        .await?;
                Ok(id)
            }
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Exercise>, sqlx::Error> {
        let row: Option<ExerciseRow> = sqlx::query_as("SELECT * FROM exercises WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Exercise::from))
    }

    /// Finds an exercise by name, ignoring case.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Exercise>, sqlx::Error> {
        let row: Option<ExerciseRow> =
            sqlx::query_as("SELECT * FROM exercises WHERE name = ? COLLATE NOCASE LIMIT 1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Exercise::from))
    }

    pub async fn list(&self) -> Result<Vec<Exercise>, sqlx::Error> {
        let rows: Vec<ExerciseRow> =
            sqlx::query_as("SELECT * FROM exercises ORDER BY name COLLATE NOCASE")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Exercise::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::setup_cache;
    use crate::db::Table;
    use crate::models::Exercise;

    #[tokio::test]
    async fn test_insert_ignore_returns_key_once() {
        let ctx = setup_cache().await;
        let repo = ctx.cache.exercises();

        let first = repo
            .insert_ignore(&Exercise::new("Bench Press"))
            .await
            .unwrap();
        assert!(first.is_some());

        let second = repo
            .insert_ignore(&Exercise::new("BENCH PRESS"))
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_name_case_insensitive() {
        let ctx = setup_cache().await;
        let repo = ctx.cache.exercises();

        repo.insert_ignore(&Exercise::new("Pull Up")).await.unwrap();

        let found = repo.find_by_name("pull up").await.unwrap().unwrap();
        assert_eq!(found.name, "Pull Up");
        assert!(repo.find_by_name("PULL UP").await.unwrap().is_some());
        assert!(repo.find_by_name("Pull Ups").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_by_name_updates_in_place() {
        let ctx = setup_cache().await;
        let repo = ctx.cache.exercises();

        let id = repo
            .merge_by_name(&Exercise::new("Squat").with_description("back squat"))
            .await
            .unwrap();
        let again = repo
            .merge_by_name(&Exercise::new("squat").with_category("legs"))
            .await
            .unwrap();
        assert_eq!(id, again);

        let stored = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Squat");
        assert_eq!(stored.category.as_deref(), Some("legs"));
        assert_eq!(stored.description.as_deref(), Some("back squat"));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_merge_by_name_many_casings_single_row() {
        let ctx = setup_cache().await;
        let repo = ctx.cache.exercises();

        let names = ["deadlift", "Deadlift", "DEADLIFT", "DeadLift"];
        let mut ids = Vec::new();
        for name in names {
            ids.push(repo.merge_by_name(&Exercise::new(name)).await.unwrap());
        }

        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_merge_by_name_unchanged_keeps_version() {
        let ctx = setup_cache().await;
        let repo = ctx.cache.exercises();

        repo.merge_by_name(&Exercise::new("Row").with_category("back"))
            .await
            .unwrap();
        let before = ctx.cache.notifier().subscribe().borrow().get(Table::Exercises);
        repo.merge_by_name(&Exercise::new("ROW").with_category("back"))
            .await
            .unwrap();
        repo.merge_by_name(&Exercise::new("row")).await.unwrap();
        assert_eq!(ctx.cache.notifier().subscribe().borrow().get(Table::Exercises), before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_merge_by_name_never_fails_or_duplicates() {
        let ctx = setup_cache().await;
        let names = [
            "Squat", "Bench Press", "Deadlift", "Row", "Curl", "Dip", "Lunge", "Plank",
        ];

        let mut handles = Vec::new();
        for i in 0..64 {
            let repo = ctx.cache.exercises();
            let base = names[i % names.len()];
            let name = match i % 3 {
                0 => base.to_string(),
                1 => base.to_uppercase(),
                _ => base.to_lowercase(),
            };
            let exercise = if i % 2 == 0 {
                Exercise::new(name).with_category(format!("c{}", i % 4))
            } else {
                Exercise::new(name)
            };
            handles.push(tokio::spawn(async move {
                let id = repo.merge_by_name(&exercise).await?;
                Ok::<_, sqlx::Error>((exercise.name.to_lowercase(), id))
            }));
        }

        let mut keys = std::collections::HashMap::new();
        for handle in handles {
            let (name, id) = handle.await.unwrap().unwrap();
            assert_eq!(*keys.entry(name).or_insert(id), id);
        }

        assert_eq!(keys.len(), names.len());
        assert_eq!(ctx.cache.exercises().list().await.unwrap().len(), names.len());
    }

    #[tokio::test]
    async fn test_upsert_replaces_optional_fields() {
        let ctx = setup_cache().await;
        let repo = ctx.cache.exercises();

        let id = repo
            .upsert(&Exercise::new("Plank").with_category("core"))
            .await
            .unwrap();
        let again = repo
            .upsert(&Exercise::new("PLANK").with_description("hold"))
            .await
            .unwrap();
        assert_eq!(id, again);

        let stored = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Plank");
        assert!(stored.category.is_none());
        assert_eq!(stored.description.as_deref(), Some("hold"));
    }
}
