//! Sync-aware routine repository.
//!
//! Each intent is an ordered sequence of remote-then-local writes. A remote
//! failure aborts before the matching local write; a local failure after a
//! successful remote write leaves a divergence the next sync pass repairs.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::profile_sync::SyncProfileRepository;
use super::writer::{exercise_fields, progress_fields, routine_fields};
use super::SyncError;
use crate::db::{Cache, LiveQuery};
use crate::models::{
    Exercise, Progress, Routine, RoutineExercise, RoutineWithExercises, WorkoutPlan, WorkoutStep,
};
use crate::remote::DocumentStore;
use crate::session::Session;

/// An exercise to attach to a routine, with its relation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseEntry {
    pub exercise: Exercise,
    pub series: i32,
    pub reps: i32,
    pub duration: Option<f64>, // minutes
}

impl ExerciseEntry {
    pub fn new(exercise: Exercise, series: i32, reps: i32) -> Self {
        Self {
            exercise,
            series,
            reps,
            duration: None,
        }
    }

    pub fn with_duration(mut self, minutes: f64) -> Self {
        self.duration = Some(minutes);
        self
    }
}

#[derive(Clone)]
pub struct SyncRoutineRepository {
    store: Arc<dyn DocumentStore>,
    cache: Cache,
    session: Session,
    profiles: SyncProfileRepository,
}

impl SyncRoutineRepository {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Cache, session: Session) -> Self {
        let profiles = SyncProfileRepository::new(store.clone(), cache.clone(), session.clone());
        Self {
            store,
            cache,
            session,
            profiles,
        }
    }

    /// Creates a routine and returns the remote id the store assigned.
    pub async fn create_routine(
        &self,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<String, SyncError> {
        let identity = self.session.require()?;
        self.profiles.ensure_user_local().await?;

        let scope = self.session.scope()?;
        let remote_id = self
            .store
            .add(&scope.routines(), routine_fields(name, created_at))
            .await?;

        let routine = Routine::new(&remote_id, &identity.user_id, name, created_at);
        if let Err(e) = self.cache.routines().upsert(&routine).await {
            warn!(
                remote_id = %remote_id,
                error = %e,
                "Remote routine created but local insert failed; next sync will restore it"
            );
            return Err(e.into());
        }

        info!(remote_id = %remote_id, name, "Created routine");
        Ok(remote_id)
    }

    /// Adds an exercise to a routine and returns the exercise's local key.
    ///
    /// The exercise is deduplicated by case-insensitive name; re-adding an
    /// exercise already in the routine replaces its series/reps/duration.
    pub async fn add_exercise_with_relation(
        &self,
        routine_remote_id: &str,
        exercise: &Exercise,
        series: i32,
        reps: i32,
        duration: Option<f64>,
    ) -> Result<i64, SyncError> {
        self.session.require()?;
        self.profiles.ensure_user_local().await?;

        let exercise_id = self.cache.exercises().merge_by_name(exercise).await?;

        let scope = self.session.scope()?;
        self.store
            .add(
                &scope.exercises(routine_remote_id),
                exercise_fields(exercise, series, reps, duration),
            )
            .await?;

        let routine = self.local_routine(routine_remote_id).await?;
        let mut relation = RoutineExercise::new(routine.id, exercise_id, series, reps);
        relation.duration = duration;
        self.cache.routines().link(&relation).await?;

        debug!(
            routine = %routine_remote_id,
            exercise = %exercise.name,
            series,
            reps,
            "Added exercise to routine"
        );
        Ok(exercise_id)
    }

    /// Creates a routine and adds every entry to it, in order.
    pub async fn create_routine_with_exercises(
        &self,
        name: &str,
        created_at: DateTime<Utc>,
        entries: &[ExerciseEntry],
    ) -> Result<String, SyncError> {
        let remote_id = self.create_routine(name, created_at).await?;
        for entry in entries {
            self.add_exercise_with_relation(
                &remote_id,
                &entry.exercise,
                entry.series,
                entry.reps,
                entry.duration,
            )
            .await?;
        }
        Ok(remote_id)
    }

    /// Records a completed workout for a routine.
    ///
    /// There is one progress document per routine, so a later completion
    /// overwrites the earlier one both remotely and locally.
    pub async fn log_progress(
        &self,
        routine_remote_id: &str,
        total_duration: f64,
        exercise_ids: &[i64],
    ) -> Result<Progress, SyncError> {
        let identity = self.session.require()?;
        self.profiles.ensure_user_local().await?;

        let completed_at = Utc::now();
        let scope = self.session.scope()?;
        self.store
            .set(
                &scope.progress(routine_remote_id),
                progress_fields(completed_at, total_duration, exercise_ids),
            )
            .await?;

        let routine = self.local_routine(routine_remote_id).await?;
        let mut progress =
            Progress::new(&identity.user_id, routine.id, completed_at, total_duration)
                .with_completed_exercises(exercise_ids.to_vec());
        progress.id = self.cache.progress().upsert(&progress).await?;

        info!(routine = %routine_remote_id, total_duration, "Logged progress");
        Ok(progress)
    }

    /// Deletes a routine remotely (with its exercises and progress), then
    /// locally, cascading to its junction and progress rows.
    pub async fn delete_routine(&self, routine_id: i64) -> Result<(), SyncError> {
        self.session.require()?;
        let routine = self
            .cache
            .routines()
            .get_by_id(routine_id)
            .await?
            .ok_or(SyncError::RoutineNotFound(routine_id))?;

        let scope = self.session.scope()?;
        self.store.delete(&scope.routine(&routine.remote_id)).await?;
        self.store.delete(&scope.progress(&routine.remote_id)).await?;

        self.cache.routines().delete(routine.id).await?;
        info!(remote_id = %routine.remote_id, name = %routine.name, "Deleted routine");
        Ok(())
    }

    /// The ordered steps of a routine for the session runner.
    pub async fn workout_plan(&self, routine_id: i64) -> Result<WorkoutPlan, SyncError> {
        let routines = self.cache.routines();
        let routine = routines
            .get_by_id(routine_id)
            .await?
            .ok_or(SyncError::RoutineNotFound(routine_id))?;

        let exercises = routines.exercises_for_routine(routine.id).await?;
        let relations: HashMap<i64, RoutineExercise> = routines
            .relations_for_routine(routine.id)
            .await?
            .into_iter()
            .map(|r| (r.exercise_id, r))
            .collect();

        let steps = exercises
            .iter()
            .map(|e| WorkoutStep::new(e, relations.get(&e.id)))
            .collect();
        Ok(WorkoutPlan { routine, steps })
    }

    /// Runs a routine's plan to completion and logs it.
    pub async fn complete_workout(&self, routine_id: i64) -> Result<Progress, SyncError> {
        let plan = self.workout_plan(routine_id).await?;
        self.log_progress(
            &plan.routine.remote_id,
            plan.total_minutes(),
            &plan.exercise_ids(),
        )
        .await
    }

    // Read views

    pub async fn routine(&self, routine_id: i64) -> Result<RoutineWithExercises, SyncError> {
        let routines = self.cache.routines();
        let routine = routines
            .get_by_id(routine_id)
            .await?
            .ok_or(SyncError::RoutineNotFound(routine_id))?;
        let exercises = routines.exercises_for_routine(routine.id).await?;
        Ok(RoutineWithExercises { routine, exercises })
    }

    pub async fn routines(&self) -> Result<Vec<RoutineWithExercises>, SyncError> {
        let identity = self.session.require()?;
        Ok(self
            .cache
            .routines()
            .list_with_exercises(&identity.user_id)
            .await?)
    }

    pub fn observe_routines(&self) -> Result<LiveQuery<RoutineWithExercises>, SyncError> {
        let identity = self.session.require()?;
        Ok(self
            .cache
            .routines()
            .observe_with_exercises(&identity.user_id))
    }

    pub fn observe_exercises(&self, routine_id: i64) -> LiveQuery<Exercise> {
        self.cache.routines().observe_exercises(routine_id)
    }

    pub async fn progress(&self) -> Result<Vec<Progress>, SyncError> {
        let identity = self.session.require()?;
        Ok(self.cache.progress().list_for_user(&identity.user_id).await?)
    }

    pub fn observe_progress(&self) -> Result<LiveQuery<Progress>, SyncError> {
        let identity = self.session.require()?;
        Ok(self.cache.progress().observe_for_user(&identity.user_id))
    }

    pub async fn completed_in_month(&self, year: i32, month: u32) -> Result<i64, SyncError> {
        let identity = self.session.require()?;
        Ok(self
            .cache
            .progress()
            .completed_in_month(&identity.user_id, year, month)
            .await?)
    }

    async fn local_routine(&self, remote_id: &str) -> Result<Routine, SyncError> {
        self.cache
            .routines()
            .get_by_remote_id(remote_id)
            .await?
            .ok_or_else(|| SyncError::MissingLocalRoutine(remote_id.to_string()))
    }
}
