use sqlx::SqlitePool;

use super::exercise_repo::ExerciseRow;
use super::notify::{ChangeNotifier, LiveQuery, Table};
use super::parse_timestamp;
use crate::models::{Exercise, Routine, RoutineExercise, RoutineWithExercises};

const ROUTINE_TABLES: &[Table] = &[Table::Routines, Table::RoutineExercises, Table::Exercises];
const ROUTINE_EXERCISE_TABLES: &[Table] = &[Table::RoutineExercises, Table::Exercises];

#[derive(Clone)]
pub struct RoutineRepository {
    pool: SqlitePool,
    notifier: ChangeNotifier,
}

#[derive(sqlx::FromRow)]
struct RoutineRow {
    id: i64,
    remote_id: String,
    user_id: String,
    name: String,
    created_at: String,
}

impl From<RoutineRow> for Routine {
    fn from(row: RoutineRow) -> Self {
        Routine {
            id: row.id,
            remote_id: row.remote_id,
            user_id: row.user_id,
            name: row.name,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct RelationRow {
    routine_id: i64,
    exercise_id: i64,
    series: i32,
    reps: i32,
    duration: Option<f64>,
}

impl From<RelationRow> for RoutineExercise {
    fn from(row: RelationRow) -> Self {
        RoutineExercise {
            routine_id: row.routine_id,
            exercise_id: row.exercise_id,
            series: row.series,
            reps: row.reps,
            duration: row.duration,
        }
    }
}

const UPSERT_ROUTINE: &str = r#"
    INSERT INTO routines (remote_id, user_id, name, created_at)
    VALUES (?, ?, ?, ?)
    ON CONFLICT(remote_id) DO UPDATE SET
        user_id = excluded.user_id,
        name = excluded.name,
        created_at = excluded.created_at
    RETURNING id
"#;

const UPSERT_RELATION: &str = r#"
    INSERT INTO routine_exercises (routine_id, exercise_id, series, reps, duration)
    VALUES (?, ?, ?, ?, ?)
    ON CONFLICT(routine_id, exercise_id) DO UPDATE SET
        series = excluded.series,
        reps = excluded.reps,
        duration = excluded.duration
"#;

impl RoutineRepository {
    pub fn new(pool: SqlitePool, notifier: ChangeNotifier) -> Self {
        Self { pool, notifier }
    }

    /// Inserts the routine or replaces the row with the same remote id.
    ///
    /// The local key of an existing row is kept so that junction and progress
    /// rows pointing at it stay valid. Returns the local key.
    pub async fn upsert(&self, routine: &Routine) -> Result<i64, sqlx::Error> {
        let (id,): (i64,) = sqlx::query_as(UPSERT_ROUTINE)
            .bind(&routine.remote_id)
            .bind(&routine.user_id)
            .bind(&routine.name)
            .bind(routine.created_at.to_rfc3339())
            .fetch_one(&self.pool)
            .await?;

        self.notifier.notify(&[Table::Routines]);
        Ok(id)
    }

    /// Upserts a batch of routines in one transaction, returning their keys
    /// in input order.
    pub async fn upsert_all(&self, routines: &[Routine]) -> Result<Vec<i64>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(routines.len());

        for routine in routines {
            let (id,): (i64,) = sqlx::query_as(UPSERT_ROUTINE)
                .bind(&routine.remote_id)
                .bind(&routine.user_id)
                .bind(&routine.name)
                .bind(routine.created_at.to_rfc3339())
                .fetch_one(&mut *tx)
                .await?;
            ids.push(id);
        }

        tx.commit().await?;
        if !ids.is_empty() {
            self.notifier.notify(&[Table::Routines]);
        }
        Ok(ids)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Routine>, sqlx::Error> {
        let row: Option<RoutineRow> = sqlx::query_as("SELECT * FROM routines WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Routine::from))
    }

    pub async fn get_by_remote_id(&self, remote_id: &str) -> Result<Option<Routine>, sqlx::Error> {
        let row: Option<RoutineRow> =
            sqlx::query_as("SELECT * FROM routines WHERE remote_id = ?")
                .bind(remote_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Routine::from))
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Routine>, sqlx::Error> {
        let rows: Vec<RoutineRow> =
            sqlx::query_as("SELECT * FROM routines WHERE user_id = ? ORDER BY created_at, id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Routine::from).collect())
    }

    /// Exercises linked to a routine, in the order they were linked.
    pub async fn exercises_for_routine(
        &self,
        routine_id: i64,
    ) -> Result<Vec<Exercise>, sqlx::Error> {
        let rows: Vec<ExerciseRow> = sqlx::query_as(
            r#"
            SELECT e.id, e.name, e.category, e.description, e.gif_url
            FROM routine_exercises re
            JOIN exercises e ON e.id = re.exercise_id
            WHERE re.routine_id = ?
            ORDER BY re.rowid
            "#,
        )
        .bind(routine_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Exercise::from).collect())
    }

    pub async fn list_with_exercises(
        &self,
        user_id: &str,
    ) -> Result<Vec<RoutineWithExercises>, sqlx::Error> {
        let routines = self.list_for_user(user_id).await?;
        let mut result = Vec::with_capacity(routines.len());
        for routine in routines {
            let exercises = self.exercises_for_routine(routine.id).await?;
            result.push(RoutineWithExercises { routine, exercises });
        }
        Ok(result)
    }

    pub async fn relation(
        &self,
        routine_id: i64,
        exercise_id: i64,
    ) -> Result<Option<RoutineExercise>, sqlx::Error> {
        let row: Option<RelationRow> = sqlx::query_as(
            "SELECT * FROM routine_exercises WHERE routine_id = ? AND exercise_id = ?",
        )
        .bind(routine_id)
        .bind(exercise_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RoutineExercise::from))
    }

    pub async fn relations_for_routine(
        &self,
        routine_id: i64,
    ) -> Result<Vec<RoutineExercise>, sqlx::Error> {
        let rows: Vec<RelationRow> = sqlx::query_as(
            "SELECT * FROM routine_exercises WHERE routine_id = ? ORDER BY rowid",
        )
        .bind(routine_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RoutineExercise::from).collect())
    }

    /// Links an exercise to a routine, replacing the parameters of an
    /// existing link.
    pub async fn link(&self, relation: &RoutineExercise) -> Result<(), sqlx::Error> {
        sqlx::query(UPSERT_RELATION)
            .bind(relation.routine_id)
            .bind(relation.exercise_id)
            .bind(relation.series)
            .bind(relation.reps)
            .bind(relation.duration)
            .execute(&self.pool)
            .await?;

        self.notifier.notify(&[Table::RoutineExercises]);
        Ok(())
    }

    pub async fn link_all(&self, relations: &[RoutineExercise]) -> Result<(), sqlx::Error> {
        if relations.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for relation in relations {
            sqlx::query(UPSERT_RELATION)
                .bind(relation.routine_id)
                .bind(relation.exercise_id)
                .bind(relation.series)
                .bind(relation.reps)
                .bind(relation.duration)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        self.notifier.notify(&[Table::RoutineExercises]);
        Ok(())
    }

    pub async fn count_exercises(&self, routine_id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM routine_exercises WHERE routine_id = ?")
                .bind(routine_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Deletes a routine. Its junction and progress rows go with it.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM routines WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            self.notifier
                .notify(&[Table::Routines, Table::RoutineExercises, Table::Progress]);
        }
        Ok(deleted)
    }

    /// Watches a user's routines together with their linked exercises.
    pub fn observe_with_exercises(&self, user_id: &str) -> LiveQuery<RoutineWithExercises> {
        let repo = self.clone();
        let user_id = user_id.to_string();
        LiveQuery::new(&self.notifier, ROUTINE_TABLES, move || {
            let repo = repo.clone();
            let user_id = user_id.clone();
            async move { repo.list_with_exercises(&user_id).await }
        })
    }

    /// Watches the exercises linked to one routine.
    pub fn observe_exercises(&self, routine_id: i64) -> LiveQuery<Exercise> {
        let repo = self.clone();
        LiveQuery::new(&self.notifier, ROUTINE_EXERCISE_TABLES, move || {
            let repo = repo.clone();
            async move { repo.exercises_for_routine(routine_id).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::db::test_support::{setup_cache, TestCache};
    use crate::models::{Exercise, Progress, Routine, RoutineExercise, User};

    async fn seed_user(ctx: &TestCache) {
        ctx.cache
            .users()
            .upsert(&User::new("uid-1", "Ana"))
            .await
            .unwrap();
    }

    fn routine(remote_id: &str, name: &str) -> Routine {
        Routine::new(
            remote_id,
            "uid-1",
            name,
            Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_upsert_keeps_local_key() {
        let ctx = setup_cache().await;
        seed_user(&ctx).await;
        let repo = ctx.cache.routines();

        let id = repo.upsert(&routine("r1", "Push")).await.unwrap();
        let again = repo.upsert(&routine("r1", "Push Day")).await.unwrap();
        assert_eq!(id, again);

        let stored = repo.get_by_remote_id("r1").await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.name, "Push Day");
        assert_eq!(repo.list_for_user("uid-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_all_returns_keys_in_order() {
        let ctx = setup_cache().await;
        seed_user(&ctx).await;
        let repo = ctx.cache.routines();

        let ids = repo
            .upsert_all(&[routine("r1", "Push"), routine("r2", "Pull")])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);

        let r2 = repo.get_by_id(ids[1]).await.unwrap().unwrap();
        assert_eq!(r2.remote_id, "r2");
    }

    #[tokio::test]
    async fn test_link_and_list_exercises_in_order() {
        let ctx = setup_cache().await;
        seed_user(&ctx).await;
        let repo = ctx.cache.routines();
        let exercises = ctx.cache.exercises();

        let rid = repo.upsert(&routine("r1", "Legs")).await.unwrap();
        let squat = exercises.merge_by_name(&Exercise::new("Squat")).await.unwrap();
        let lunge = exercises.merge_by_name(&Exercise::new("Lunge")).await.unwrap();

        repo.link(&RoutineExercise::new(rid, squat, 4, 8))
            .await
            .unwrap();
        repo.link(&RoutineExercise::new(rid, lunge, 3, 12).with_duration(2.0))
            .await
            .unwrap();

        let names: Vec<String> = repo
            .exercises_for_routine(rid)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Squat", "Lunge"]);
        assert_eq!(repo.count_exercises(rid).await.unwrap(), 2);

        let rel = repo.relation(rid, lunge).await.unwrap().unwrap();
        assert_eq!(rel.duration, Some(2.0));
    }

    #[tokio::test]
    async fn test_link_replaces_parameters() {
        let ctx = setup_cache().await;
        seed_user(&ctx).await;
        let repo = ctx.cache.routines();

        let rid = repo.upsert(&routine("r1", "Legs")).await.unwrap();
        let squat = ctx
            .cache
            .exercises()
            .merge_by_name(&Exercise::new("Squat"))
            .await
            .unwrap();

        repo.link_all(&[RoutineExercise::new(rid, squat, 4, 8)])
            .await
            .unwrap();
        repo.link_all(&[RoutineExercise::new(rid, squat, 5, 5)])
            .await
            .unwrap();

        let relations = repo.relations_for_routine(rid).await.unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].series, 5);
        assert_eq!(relations[0].reps, 5);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let ctx = setup_cache().await;
        seed_user(&ctx).await;
        let repo = ctx.cache.routines();

        let rid = repo.upsert(&routine("r1", "Legs")).await.unwrap();
        let squat = ctx
            .cache
            .exercises()
            .merge_by_name(&Exercise::new("Squat"))
            .await
            .unwrap();
        repo.link(&RoutineExercise::new(rid, squat, 4, 8))
            .await
            .unwrap();
        ctx.cache
            .progress()
            .upsert(&Progress::new("uid-1", rid, Utc::now(), 10.0))
            .await
            .unwrap();

        assert!(repo.delete(rid).await.unwrap());
        assert!(!repo.delete(rid).await.unwrap());

        assert_eq!(repo.count_exercises(rid).await.unwrap(), 0);
        assert!(ctx.cache.progress().get_for_routine(rid).await.unwrap().is_none());
        // The exercise itself is shared and survives.
        assert!(ctx.cache.exercises().get_by_id(squat).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_observe_with_exercises_reacts_to_links() {
        let ctx = setup_cache().await;
        seed_user(&ctx).await;
        let repo = ctx.cache.routines();

        let rid = repo.upsert(&routine("r1", "Legs")).await.unwrap();
        let mut live = repo.observe_with_exercises("uid-1");

        let first = live.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert!(first[0].exercises.is_empty());

        let squat = ctx
            .cache
            .exercises()
            .merge_by_name(&Exercise::new("Squat"))
            .await
            .unwrap();
        repo.link(&RoutineExercise::new(rid, squat, 4, 8))
            .await
            .unwrap();

        let next = live.next().await.unwrap().unwrap();
        assert_eq!(next[0].exercises.len(), 1);
        assert_eq!(next[0].exercises[0].name, "Squat");
    }

    #[tokio::test]
    async fn test_observe_exercises_for_routine() {
        let ctx = setup_cache().await;
        seed_user(&ctx).await;
        let repo = ctx.cache.routines();

        let rid = repo.upsert(&routine("r1", "Legs")).await.unwrap();
        let mut live = repo.observe_exercises(rid);
        assert!(live.next().await.unwrap().unwrap().is_empty());

        let squat = ctx
            .cache
            .exercises()
            .merge_by_name(&Exercise::new("Squat"))
            .await
            .unwrap();
        repo.link(&RoutineExercise::new(rid, squat, 4, 8))
            .await
            .unwrap();

        // The exercise insert and the link may be observed together or
        // separately; wait until the link shows up.
        let mut rows = live.next().await.unwrap().unwrap();
        if rows.is_empty() {
            rows = live.next().await.unwrap().unwrap();
        }
        assert_eq!(rows.len(), 1);
    }
}
