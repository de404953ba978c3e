//! Defensive readers for remote documents.
//!
//! The remote tree is schema-less, so every field is treated as optional.
//! Record parsers return `None` for documents missing a required field; the
//! caller skips those instead of failing.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use super::schema::*;
use crate::models::{Exercise, User};
use crate::remote::{Document, Fields};

/// A routine document, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineRecord {
    pub remote_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An exercise sub-document: the exercise and its relation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseRecord {
    pub exercise: Exercise,
    pub series: i32,
    pub reps: i32,
    pub duration: Option<f64>,
}

/// A progress document. Its id is the remote id of the routine.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub routine_remote_id: String,
    pub completed_at: DateTime<Utc>,
    pub total_duration: f64,
    pub completed_exercises: Vec<i64>,
}

/// Requires a non-blank `name` and a readable `created_at`.
pub fn parse_routine(doc: &Document) -> Option<RoutineRecord> {
    let name = get_string(&doc.fields, NAME).filter(|n| !n.trim().is_empty())?;
    let created_at = get_timestamp(&doc.fields, CREATED_AT)?;
    Some(RoutineRecord {
        remote_id: doc.id.clone(),
        name,
        created_at,
    })
}

/// Requires a non-blank `name`; relation numbers default to 0.
pub fn parse_exercise(doc: &Document) -> Option<ExerciseRecord> {
    let name = get_string(&doc.fields, NAME).filter(|n| !n.trim().is_empty())?;
    let exercise = Exercise {
        id: 0,
        name,
        category: get_string(&doc.fields, CATEGORY),
        description: get_string(&doc.fields, DESCRIPTION),
        gif_url: get_string(&doc.fields, GIF_URL),
    };
    Some(ExerciseRecord {
        exercise,
        series: get_i32(&doc.fields, SERIES).unwrap_or(0),
        reps: get_i32(&doc.fields, REPS).unwrap_or(0),
        duration: get_f64(&doc.fields, DURATION),
    })
}

/// Requires a readable `completed_at`.
pub fn parse_progress(doc: &Document) -> Option<ProgressRecord> {
    let completed_at = get_timestamp(&doc.fields, COMPLETED_AT)?;
    Some(ProgressRecord {
        routine_remote_id: doc.id.clone(),
        completed_at,
        total_duration: get_f64(&doc.fields, TOTAL_DURATION).unwrap_or(0.0),
        completed_exercises: get_i64_list(&doc.fields, COMPLETED_EXERCISES),
    })
}

/// Builds a user from a profile document. Every field has a default, so
/// this never fails; `fallback_name` is used when the document has none.
pub fn parse_profile(user_id: &str, fields: &Fields, fallback_name: &str) -> User {
    User {
        id: user_id.to_string(),
        name: get_string(fields, NAME)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| fallback_name.to_string()),
        age: get_i32(fields, AGE).unwrap_or(0),
        weight: get_f64(fields, WEIGHT).unwrap_or(0.0),
        height: get_f64(fields, HEIGHT).unwrap_or(0.0),
        experience_level: get_string(fields, EXPERIENCE_LEVEL).unwrap_or_default(),
        goal: get_string(fields, GOAL).unwrap_or_default(),
        photo_url: get_string(fields, PHOTO_URL),
    }
}

fn get_string(fields: &Fields, key: &str) -> Option<String> {
    fields.get(key)?.as_str().map(str::to_string)
}

fn get_i64(fields: &Fields, key: &str) -> Option<i64> {
    value_to_i64(fields.get(key)?)
}

fn get_i32(fields: &Fields, key: &str) -> Option<i32> {
    get_i64(fields, key).and_then(|v| i32::try_from(v).ok())
}

fn get_f64(fields: &Fields, key: &str) -> Option<f64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts an RFC 3339 string, epoch milliseconds, or a
/// `{"seconds", "nanoseconds"}` map.
fn get_timestamp(fields: &Fields, key: &str) -> Option<DateTime<Utc>> {
    match fields.get(key)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
        Value::Object(map) => {
            let seconds = map.get("seconds").and_then(value_to_i64)?;
            let nanos = map
                .get("nanoseconds")
                .and_then(value_to_i64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, nanos).single()
        }
        _ => None,
    }
}

/// Reads a list of integer keys, skipping entries that are not integers.
/// A delimited string is accepted too.
fn get_i64_list(fields: &Fields, key: &str) -> Vec<i64> {
    match fields.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(value_to_i64).collect(),
        Some(Value::String(s)) => crate::models::Progress::decode_exercise_ids(s),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> Document {
        Document::new(id, fields.as_object().cloned().unwrap())
    }

    #[test]
    fn test_parse_routine() {
        let record = parse_routine(&doc(
            "r1",
            json!({"name": "Push Day", "created_at": "2025-03-01T08:00:00+00:00"}),
        ))
        .unwrap();
        assert_eq!(record.remote_id, "r1");
        assert_eq!(record.name, "Push Day");
        assert_eq!(
            record.created_at,
            Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_routine_skips_missing_required_fields() {
        assert!(parse_routine(&doc("r1", json!({"name": "Push"}))).is_none());
        assert!(parse_routine(&doc("r1", json!({"created_at": 1740816000000i64}))).is_none());
        assert!(parse_routine(&doc("r1", json!({"name": "  ", "created_at": 0}))).is_none());
        assert!(parse_routine(&doc("r1", json!({"name": 7, "created_at": 0}))).is_none());
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let millis = expected.timestamp_millis();
        let seconds = expected.timestamp();

        let from_millis = parse_routine(&doc("r", json!({"name": "a", "created_at": millis})));
        let from_map = parse_routine(&doc(
            "r",
            json!({"name": "a", "created_at": {"seconds": seconds, "nanoseconds": 0}}),
        ));
        assert_eq!(from_millis.unwrap().created_at, expected);
        assert_eq!(from_map.unwrap().created_at, expected);
    }

    #[test]
    fn test_parse_exercise_defaults() {
        let record = parse_exercise(&doc("e1", json!({"name": "Bench Press"}))).unwrap();
        assert_eq!(record.exercise.name, "Bench Press");
        assert_eq!(record.series, 0);
        assert_eq!(record.reps, 0);
        assert!(record.duration.is_none());
        assert!(record.exercise.category.is_none());

        let record = parse_exercise(&doc(
            "e2",
            json!({"name": "Row", "series": 3.0, "reps": "10", "duration": 1.5, "category": "back"}),
        ))
        .unwrap();
        assert_eq!(record.series, 3);
        assert_eq!(record.reps, 10);
        assert_eq!(record.duration, Some(1.5));
        assert_eq!(record.exercise.category.as_deref(), Some("back"));

        assert!(parse_exercise(&doc("e3", json!({"series": 3}))).is_none());
    }

    #[test]
    fn test_parse_progress() {
        let record = parse_progress(&doc(
            "r1",
            json!({
                "completed_at": "2025-03-01T09:00:00Z",
                "total_duration": 12,
                "completed_exercises": [1, "x", 3, 2.0]
            }),
        ))
        .unwrap();
        assert_eq!(record.routine_remote_id, "r1");
        assert_eq!(record.total_duration, 12.0);
        assert_eq!(record.completed_exercises, vec![1, 3, 2]);

        assert!(parse_progress(&doc("r1", json!({"total_duration": 1}))).is_none());
    }

    #[test]
    fn test_parse_profile_defaults() {
        let fields = json!({"age": 31, "goal": "strength"})
            .as_object()
            .cloned()
            .unwrap();
        let user = parse_profile("u1", &fields, "Ana");
        assert_eq!(user.id, "u1");
        assert_eq!(user.name, "Ana");
        assert_eq!(user.age, 31);
        assert_eq!(user.goal, "strength");
        assert_eq!(user.weight, 0.0);
        assert!(user.photo_url.is_none());
    }
}
