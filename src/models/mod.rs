mod exercise;
mod progress;
mod routine;
mod user;
mod workout;

pub use exercise::Exercise;
pub use progress::Progress;
pub use routine::{Routine, RoutineExercise, RoutineWithExercises};
pub use user::User;
pub use workout::{WorkoutPlan, WorkoutStep};
