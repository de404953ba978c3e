use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const ID_DELIMITER: char = ',';

/// A completed workout session for a routine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Progress {
    pub id: i64,
    pub user_id: String,
    pub routine_id: i64,
    pub completed_at: DateTime<Utc>,
    pub total_duration: f64, // minutes
    pub completed_exercises: Vec<i64>,
}

impl Progress {
    pub fn new(
        user_id: impl Into<String>,
        routine_id: i64,
        completed_at: DateTime<Utc>,
        total_duration: f64,
    ) -> Self {
        Self {
            id: 0,
            user_id: user_id.into(),
            routine_id,
            completed_at,
            total_duration,
            completed_exercises: Vec::new(),
        }
    }

    pub fn with_completed_exercises(mut self, ids: Vec<i64>) -> Self {
        self.completed_exercises = ids;
        self
    }

    /// Serializes exercise keys as the delimited list stored in the cache.
    pub fn encode_exercise_ids(ids: &[i64]) -> String {
        ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(&ID_DELIMITER.to_string())
    }

    /// Parses a delimited list of exercise keys, skipping unparsable entries.
    pub fn decode_exercise_ids(s: &str) -> Vec<i64> {
        s.split(ID_DELIMITER)
            .filter_map(|part| part.trim().parse().ok())
            .collect()
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  routine {}  {:.1} min  {} exercise(s)",
            self.completed_at.format("%Y-%m-%d %H:%M"),
            self.routine_id,
            self.total_duration,
            self.completed_exercises.len()
        )
    }
}
