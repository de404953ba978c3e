use sqlx::SqlitePool;

use super::notify::{ChangeNotifier, LiveQuery, Table};
use crate::models::User;

const USER_TABLES: &[Table] = &[Table::Users];

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
    notifier: ChangeNotifier,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    age: i32,
    weight: f64,
    height: f64,
    experience_level: String,
    goal: String,
    photo_url: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            age: row.age,
            weight: row.weight,
            height: row.height,
            experience_level: row.experience_level,
            goal: row.goal,
            photo_url: row.photo_url,
        }
    }
}

impl UserRepository {
    pub fn new(pool: SqlitePool, notifier: ChangeNotifier) -> Self {
        Self { pool, notifier }
    }

    /// Inserts the user or replaces every attribute of the existing row.
    pub async fn upsert(&self, user: &User) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, age, weight, height, experience_level, goal, photo_url)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                age = excluded.age,
                weight = excluded.weight,
                height = excluded.height,
                experience_level = excluded.experience_level,
                goal = excluded.goal,
                photo_url = excluded.photo_url
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(user.age)
        .bind(user.weight)
        .bind(user.height)
        .bind(&user.experience_level)
        .bind(&user.goal)
        .bind(&user.photo_url)
        .execute(&self.pool)
        .await?;

        self.notifier.notify(USER_TABLES);
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Watches the user row; yields an empty list while it does not exist.
    pub fn observe(&self, id: &str) -> LiveQuery<User> {
        let repo = self.clone();
        let id = id.to_string();
        LiveQuery::new(&self.notifier, USER_TABLES, move || {
            let repo = repo.clone();
            let id = id.clone();
            async move { repo.get_by_id(&id).await.map(|u| u.into_iter().collect()) }
        })
    }
}
