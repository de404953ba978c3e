//! Builders for the field maps written to the remote store.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::schema::*;
use crate::models::{Exercise, User};
use crate::remote::Fields;

fn put_opt(fields: &mut Fields, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        fields.insert(key.to_string(), Value::from(v.as_str()));
    }
}

pub fn profile_fields(user: &User) -> Fields {
    let mut fields = Fields::new();
    fields.insert(NAME.into(), json!(user.name));
    fields.insert(AGE.into(), json!(user.age));
    fields.insert(WEIGHT.into(), json!(user.weight));
    fields.insert(HEIGHT.into(), json!(user.height));
    fields.insert(EXPERIENCE_LEVEL.into(), json!(user.experience_level));
    fields.insert(GOAL.into(), json!(user.goal));
    put_opt(&mut fields, PHOTO_URL, &user.photo_url);
    fields
}

pub fn routine_fields(name: &str, created_at: DateTime<Utc>) -> Fields {
    let mut fields = Fields::new();
    fields.insert(NAME.into(), json!(name));
    fields.insert(CREATED_AT.into(), json!(created_at.to_rfc3339()));
    fields
}

/// Exercise sub-document: the exercise itself plus its relation to the
/// routine it is nested under.
pub fn exercise_fields(
    exercise: &Exercise,
    series: i32,
    reps: i32,
    duration: Option<f64>,
) -> Fields {
    let mut fields = Fields::new();
    fields.insert(NAME.into(), json!(exercise.name));
    put_opt(&mut fields, CATEGORY, &exercise.category);
    put_opt(&mut fields, DESCRIPTION, &exercise.description);
    put_opt(&mut fields, GIF_URL, &exercise.gif_url);
    fields.insert(SERIES.into(), json!(series));
    fields.insert(REPS.into(), json!(reps));
    if let Some(minutes) = duration {
        fields.insert(DURATION.into(), json!(minutes));
    }
    fields
}

pub fn progress_fields(
    completed_at: DateTime<Utc>,
    total_duration: f64,
    exercise_ids: &[i64],
) -> Fields {
    let mut fields = Fields::new();
    fields.insert(COMPLETED_AT.into(), json!(completed_at.to_rfc3339()));
    fields.insert(TOTAL_DURATION.into(), json!(total_duration));
    fields.insert(COMPLETED_EXERCISES.into(), json!(exercise_ids));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exercise_fields_skip_missing_optionals() {
        let fields = exercise_fields(&Exercise::new("Plank").with_category("core"), 3, 1, None);
        assert_eq!(fields[NAME], json!("Plank"));
        assert_eq!(fields[CATEGORY], json!("core"));
        assert_eq!(fields[SERIES], json!(3));
        assert!(!fields.contains_key(DESCRIPTION));
        assert!(!fields.contains_key(DURATION));
    }

    #[test]
    fn test_progress_fields() {
        let fields = progress_fields(Utc::now(), 12.5, &[4, 7]);
        assert_eq!(fields[TOTAL_DURATION], json!(12.5));
        assert_eq!(fields[COMPLETED_EXERCISES], json!([4, 7]));
    }
}
