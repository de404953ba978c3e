//! Reconciliation pass: pulls the user's remote tree into the local cache.
//!
//! Steps run in order, each committing on its own:
//!
//! 1. fetch and parse routine documents (malformed ones are skipped)
//! 2. upsert all routines by remote id
//! 3. per routine, fetch its exercise sub-documents and merge each exercise
//!    by name
//! 4. per routine, link all exercises in one batch
//! 5. fetch progress documents, dropping those whose routine is unknown
//! 6. upsert all progress rows
//!
//! Every step replaces on conflict, so re-running a pass is idempotent and
//! finishes whatever an interrupted pass left undone.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cancel::CancelToken;
use super::profile_sync::SyncProfileRepository;
use super::reader::{parse_exercise, parse_progress, parse_routine};
use super::SyncError;
use crate::db::Cache;
use crate::models::{Progress, Routine, RoutineExercise};
use crate::remote::{DocumentStore, UserScope};
use crate::session::Session;

/// Counts of what one pass reconciled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub routines: usize,
    pub exercises: usize,
    pub relations: usize,
    pub progress: usize,
    pub skipped_routines: usize,
    pub skipped_exercises: usize,
    pub skipped_progress: usize,
    pub orphaned_progress: usize,
}

impl SyncReport {
    pub fn skipped(&self) -> usize {
        self.skipped_routines + self.skipped_exercises + self.skipped_progress
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Routines:  {}", self.routines)?;
        writeln!(f, "Exercises: {} ({} links)", self.exercises, self.relations)?;
        writeln!(f, "Progress:  {}", self.progress)?;
        if self.skipped() > 0 {
            writeln!(
                f,
                "Skipped:   {} malformed ({} routines, {} exercises, {} progress)",
                self.skipped(),
                self.skipped_routines,
                self.skipped_exercises,
                self.skipped_progress
            )?;
        }
        if self.orphaned_progress > 0 {
            writeln!(f, "Dropped:   {} orphaned progress", self.orphaned_progress)?;
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct SyncEngine {
    store: Arc<dyn DocumentStore>,
    cache: Cache,
    session: Session,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Cache, session: Session) -> Self {
        Self {
            store,
            cache,
            session,
        }
    }

    /// Runs one reconciliation pass.
    ///
    /// `cancel` is checked between steps and between routines; a write that
    /// has started always completes.
    pub async fn run(&self, cancel: &CancelToken) -> Result<SyncReport, SyncError> {
        let identity = self.session.require()?;
        let scope = UserScope::new(&identity.user_id);
        let mut report = SyncReport::default();

        cancel.check()?;
        SyncProfileRepository::new(self.store.clone(), self.cache.clone(), self.session.clone())
            .ensure_user_local()
            .await?;

        // 1. Routine documents
        cancel.check()?;
        let docs = self.store.list_children(&scope.routines()).await?;
        let mut routines = Vec::with_capacity(docs.len());
        for doc in &docs {
            match parse_routine(doc) {
                Some(record) => routines.push(Routine::new(
                    record.remote_id,
                    &identity.user_id,
                    record.name,
                    record.created_at,
                )),
                None => {
                    warn!(remote_id = %doc.id, "Skipping malformed routine document");
                    report.skipped_routines += 1;
                }
            }
        }

        // 2. Upsert routines
        cancel.check()?;
        let keys = self.cache.routines().upsert_all(&routines).await?;
        report.routines = keys.len();
        debug!(count = keys.len(), "Upserted routines");

        // 3 + 4. Exercises and junction rows, one routine at a time
        for (routine, routine_id) in routines.iter().zip(keys) {
            cancel.check()?;
            self.sync_routine_exercises(&scope, routine, routine_id, &mut report)
                .await?;
        }

        // 5. Progress documents
        cancel.check()?;
        let docs = self.store.list_children(&scope.progress_collection()).await?;
        let mut progress = Vec::with_capacity(docs.len());
        for doc in &docs {
            let Some(record) = parse_progress(doc) else {
                warn!(remote_id = %doc.id, "Skipping malformed progress document");
                report.skipped_progress += 1;
                continue;
            };
            let Some(routine) = self
                .cache
                .routines()
                .get_by_remote_id(&record.routine_remote_id)
                .await?
            else {
                warn!(remote_id = %doc.id, "Dropping progress for unknown routine");
                report.orphaned_progress += 1;
                continue;
            };
            progress.push(
                Progress::new(
                    &identity.user_id,
                    routine.id,
                    record.completed_at,
                    record.total_duration,
                )
                .with_completed_exercises(record.completed_exercises),
            );
        }

        // 6. Upsert progress
        cancel.check()?;
        report.progress = self.cache.progress().upsert_all(&progress).await?.len();

        info!(
            user_id = %identity.user_id,
            routines = report.routines,
            exercises = report.exercises,
            progress = report.progress,
            skipped = report.skipped(),
            "Sync pass complete"
        );
        Ok(report)
    }

    async fn sync_routine_exercises(
        &self,
        scope: &UserScope,
        routine: &Routine,
        routine_id: i64,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let docs = self
            .store
            .list_children(&scope.exercises(&routine.remote_id))
            .await?;

        // Sequential: every merge writes the same table.
        let mut relations = Vec::with_capacity(docs.len());
        let exercises = self.cache.exercises();
        for doc in &docs {
            let Some(record) = parse_exercise(doc) else {
                warn!(
                    routine = %routine.remote_id,
                    remote_id = %doc.id,
                    "Skipping malformed exercise document"
                );
                report.skipped_exercises += 1;
                continue;
            };
            let exercise_id = exercises.merge_by_name(&record.exercise).await?;
            relations.push(RoutineExercise {
                routine_id,
                exercise_id,
                series: record.series,
                reps: record.reps,
                duration: record.duration,
            });
            report.exercises += 1;
        }

        self.cache.routines().link_all(&relations).await?;
        report.relations += relations.len();
        debug!(
            routine = %routine.remote_id,
            links = relations.len(),
            "Linked routine exercises"
        );
        Ok(())
    }

    /// Runs a pass on a background task.
    pub fn spawn(self) -> SyncHandle {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(&token).await });
        SyncHandle { cancel, task }
    }
}

/// Handle to a pass running in the background.
pub struct SyncHandle {
    cancel: CancelToken,
    task: JoinHandle<Result<SyncReport, SyncError>>,
}

impl SyncHandle {
    /// Asks the pass to stop at the next step boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this pass, usable after the handle is joined.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub async fn join(self) -> Result<SyncReport, SyncError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(SyncError::Cancelled),
        }
    }
}
