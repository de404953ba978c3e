//! Field names of the remote user document tree.
//!
//! ```text
//! users/{uid}                                   profile
//!   name, age, weight, height, experience_level, goal, photo_url?
//! users/{uid}/routines/{rid}                    routine
//!   name, created_at (iso8601)
//! users/{uid}/routines/{rid}/exercises/{eid}    exercise + relation
//!   name, category?, description?, gif_url?, series, reps, duration? (minutes)
//! users/{uid}/progress/{rid}                    last completion of routine {rid}
//!   completed_at (iso8601), total_duration (minutes), completed_exercises [int]
//! ```

pub const NAME: &str = "name";

pub const AGE: &str = "age";
pub const WEIGHT: &str = "weight";
pub const HEIGHT: &str = "height";
pub const EXPERIENCE_LEVEL: &str = "experience_level";
pub const GOAL: &str = "goal";
pub const PHOTO_URL: &str = "photo_url";

pub const CREATED_AT: &str = "created_at";

pub const CATEGORY: &str = "category";
pub const DESCRIPTION: &str = "description";
pub const GIF_URL: &str = "gif_url";
pub const SERIES: &str = "series";
pub const REPS: &str = "reps";
pub const DURATION: &str = "duration";

pub const COMPLETED_AT: &str = "completed_at";
pub const TOTAL_DURATION: &str = "total_duration";
pub const COMPLETED_EXERCISES: &str = "completed_exercises";
