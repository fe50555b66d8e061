//! Turns filled grid cells into persisted timetable sessions.
//!
//! Two write paths exist:
//! - [`AutoSaver`]: one debounced upsert per edited cell. A newer edit of the
//!   same cell supersedes a pending one, and writes for one cell never overlap.
//! - [`SessionResolver::commit`]: one upsert per filled cell of the whole grid.
//!
//! Neither path is transactional. Each write is tallied on its own and a
//! failed write is left for the operator to redo.

use dashmap::DashMap;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cache::IdempotencyKey;
use super::error::ScheduleError;
use super::grid::TimetableGrid;
use super::period::Period;
use super::types::{Day, SectionContext, SessionIdentity};
use crate::api::{ApiError, Backend, BatchReport, SessionId, SessionSaved, SessionUpsert, Subject};

/// Looks up a subject code by exact subject name.
pub fn resolve_subject_code(subjects: &[Subject], subject_name: &str) -> Option<String> {
    subjects
        .iter()
        .find(|s| s.subject_name == subject_name)
        .map(|s| s.subject_code.clone())
}

/// Default room for a committed session, `R101` for period 1.
pub fn default_room(period_number: u32) -> String {
    format!("R{period_number}01")
}

/// Builds the upsert body for one cell. Fails if the context is incomplete.
pub fn build_upsert(
    ctx: &SectionContext,
    subjects: &[Subject],
    day: Day,
    period_index: usize,
    period: &Period,
    subject_name: &str,
    room_number: Option<String>,
) -> Result<(SessionIdentity, SessionUpsert), ScheduleError> {
    let semester = ctx.require_complete()?;
    let period_number = period_index as u32 + 1;
    let subject_code = resolve_subject_code(subjects, subject_name);
    if subject_code.is_none() {
        debug!(subject = %subject_name, "No subject code for name, sending null");
    }

    let identity = SessionIdentity {
        department: ctx.department.clone(),
        semester,
        section: ctx.section.clone(),
        day,
        period_number,
    };
    let body = SessionUpsert {
        day,
        period_number,
        start_time: period.start,
        end_time: period.end,
        department: ctx.department.clone(),
        semester,
        section: ctx.section.clone(),
        subject_code,
        staff_code: None,
        room_number,
    };
    Ok((identity, body))
}

/// Result of committing a whole grid.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub report: BatchReport<SessionIdentity>,
    /// Session ids handed back by the server for the writes that succeeded
    pub session_ids: HashMap<SessionIdentity, SessionId>,
}

/// Writes sessions through a [`Backend`].
pub struct SessionResolver<B: Backend + ?Sized> {
    backend: Arc<B>,
}

impl<B: Backend + ?Sized> Clone for SessionResolver<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: Backend + ?Sized> SessionResolver<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Sends one upsert, keyed by the session's identity and payload.
    pub async fn upsert(
        &self,
        identity: &SessionIdentity,
        body: &SessionUpsert,
    ) -> Result<SessionSaved, ApiError> {
        let key = IdempotencyKey::for_upsert(identity, body);
        debug!(session = %identity, idempotency_key = %key, "Upserting session");
        self.backend.upsert_session(body, key.as_str()).await
    }

    /// Persists every filled cell of `grid`.
    ///
    /// Refuses to start without a complete selection. Once started, every
    /// cell is attempted; failures are collected in the report.
    pub async fn commit(
        &self,
        grid: &TimetableGrid,
        ctx: &SectionContext,
        subjects: &[Subject],
    ) -> Result<CommitOutcome, ScheduleError> {
        ctx.require_complete()?;

        let mut writes = Vec::new();
        for (day, index, period, name) in grid.filled_cells() {
            let room = default_room(index as u32 + 1);
            writes.push(build_upsert(ctx, subjects, day, index, period, name, Some(room))?);
        }

        info!(
            department = %ctx.department,
            section = %ctx.section,
            sessions = writes.len(),
            "Committing timetable"
        );

        let results = join_all(writes.iter().map(|(identity, body)| self.upsert(identity, body))).await;

        let mut outcome = CommitOutcome {
            report: BatchReport::new(),
            session_ids: HashMap::new(),
        };
        for ((identity, _), result) in writes.into_iter().zip(results) {
            match result {
                Ok(saved) => {
                    outcome.report.record_success();
                    if let Some(id) = saved.session_id {
                        outcome.session_ids.insert(identity, id);
                    }
                }
                Err(e) => {
                    warn!(session = %identity, error = %e, "Failed to save session");
                    outcome.report.record_failure(identity, e);
                }
            }
        }

        info!("Timetable commit finished: {}", outcome.report.summary());
        Ok(outcome)
    }
}

/// Debounced, per-cell session writer.
pub struct AutoSaver<B: Backend + ?Sized> {
    resolver: SessionResolver<B>,
    debounce: Duration,
    generation: Arc<AtomicU64>,
    latest: Arc<DashMap<SessionIdentity, u64>>,
    /// Per-cell locks so writes for one cell never overlap
    locks: Arc<DashMap<SessionIdentity, Arc<tokio::sync::Mutex<()>>>>,
}

impl<B: Backend + ?Sized + 'static> AutoSaver<B> {
    pub fn new(resolver: SessionResolver<B>, debounce: Duration) -> Self {
        Self {
            resolver,
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
            latest: Arc::new(DashMap::new()),
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Number of cells with a write scheduled or in flight.
    pub fn pending(&self) -> usize {
        self.latest.len()
    }

    /// Schedules a write for one cell, superseding any pending write for it.
    ///
    /// The returned task resolves to [`ApiError::Superseded`] if a newer edit
    /// of the same cell arrived before this one was sent.
    pub fn schedule(
        &self,
        identity: SessionIdentity,
        body: SessionUpsert,
    ) -> JoinHandle<Result<SessionSaved, ApiError>> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.latest.insert(identity.clone(), generation);

        let resolver = self.resolver.clone();
        let debounce = self.debounce;
        let latest = Arc::clone(&self.latest);
        let lock = self
            .locks
            .entry(identity.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();

        tokio::spawn(async move {
            if !debounce.is_zero() {
                tokio::time::sleep(debounce).await;
            }
            let is_current = || latest.get(&identity).map(|g| *g) == Some(generation);
            if !is_current() {
                debug!(session = %identity, generation, "Edit superseded before send");
                return Err(ApiError::Superseded);
            }

            let _guard = lock.lock().await;

            // A newer edit may have arrived while waiting for the lock
            if !is_current() {
                debug!(session = %identity, generation, "Edit superseded while queued");
                return Err(ApiError::Superseded);
            }

            let result = resolver.upsert(&identity, &body).await;
            latest.remove_if(&identity, |_, g| *g == generation);
            match &result {
                Ok(_) => info!(session = %identity, "Session auto-saved"),
                Err(e) => warn!(session = %identity, error = %e, "Session auto-save failed"),
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeBackend;
    use crate::schedule::period::PeriodModel;
    use crate::schedule::types::CellValue;

    fn subjects() -> Vec<Subject> {
        vec![Subject {
            id: Some(1),
            subject_code: "CS101".into(),
            subject_name: "Data Structures".into(),
            department: "Computer Science".into(),
            semester: 1,
            credits: 4,
            is_elective: false,
        }]
    }

    fn ctx() -> SectionContext {
        SectionContext::new("Computer Science", Some(1), "A")
    }

    #[test]
    fn test_build_upsert_resolves_code() {
        let periods = PeriodModel::default();
        let (identity, body) = build_upsert(
            &ctx(),
            &subjects(),
            Day::Monday,
            2,
            periods.get(2).unwrap(),
            "Data Structures",
            None,
        )
        .unwrap();
        assert_eq!(identity.period_number, 3);
        assert_eq!(body.subject_code.as_deref(), Some("CS101"));
        assert_eq!(body.start_time.format("%H:%M").to_string(), "10:45");

        let (_, body) = build_upsert(
            &ctx(),
            &subjects(),
            Day::Monday,
            0,
            periods.get(0).unwrap(),
            "data structures",
            None,
        )
        .unwrap();
        assert_eq!(body.subject_code, None);
    }

    #[tokio::test]
    async fn test_commit_requires_semester() {
        let backend = Arc::new(FakeBackend::default());
        let resolver = SessionResolver::new(backend.clone());
        let mut grid = TimetableGrid::default();
        grid.set_cell(Day::Monday, 0, CellValue::subject("Data Structures"))
            .unwrap();
        let no_semester = SectionContext::new("Computer Science", None, "A");
        let result = resolver.commit(&grid, &no_semester, &subjects()).await;
        assert!(matches!(result, Err(ScheduleError::NoSemesterSelected)));
        assert_eq!(backend.upsert_count().await, 0);
    }

    #[tokio::test]
    async fn test_commit_writes_only_filled_cells() {
        let backend = Arc::new(FakeBackend::default());
        let resolver = SessionResolver::new(backend.clone());
        let mut grid = TimetableGrid::default();
        grid.set_cell(Day::Monday, 0, CellValue::subject("Data Structures"))
            .unwrap();
        grid.set_cell(Day::Tuesday, 1, CellValue::Free).unwrap();
        grid.set_cell(Day::Saturday, 5, CellValue::subject("Lab")).unwrap();

        let outcome = resolver.commit(&grid, &ctx(), &subjects()).await.unwrap();
        assert_eq!(outcome.report.summary(), "2 of 2 succeeded");
        assert_eq!(outcome.session_ids.len(), 2);

        let log = backend.upsert_log.lock().await;
        let rooms: Vec<_> = log.iter().map(|(b, _)| b.room_number.clone()).collect();
        assert!(rooms.contains(&Some("R101".to_string())));
        assert!(rooms.contains(&Some("R601".to_string())));
    }

    #[tokio::test]
    async fn test_autosave_collapses_rapid_edits() {
        let backend = Arc::new(FakeBackend::default());
        let saver = AutoSaver::new(
            SessionResolver::new(backend.clone()),
            Duration::from_millis(30),
        );
        let periods = PeriodModel::default();
        let period = periods.get(0).unwrap();

        let mut handles = Vec::new();
        for name in ["Data Structures", "Lab", "Data Structures"] {
            let (identity, body) =
                build_upsert(&ctx(), &subjects(), Day::Monday, 0, period, name, None).unwrap();
            handles.push(saver.schedule(identity, body));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        assert!(matches!(results[0], Err(ApiError::Superseded)));
        assert!(matches!(results[1], Err(ApiError::Superseded)));
        assert!(results[2].is_ok());
        assert_eq!(backend.upsert_count().await, 1);
        assert_eq!(saver.pending(), 0);
    }

    #[tokio::test]
    async fn test_autosave_distinct_cells_all_written() {
        let backend = Arc::new(FakeBackend::default());
        let saver = AutoSaver::new(SessionResolver::new(backend.clone()), Duration::ZERO);
        let periods = PeriodModel::default();

        let handles: Vec<_> = (0..3)
            .map(|i| {
                let (identity, body) = build_upsert(
                    &ctx(),
                    &subjects(),
                    Day::Thursday,
                    i,
                    periods.get(i).unwrap(),
                    "Data Structures",
                    None,
                )
                .unwrap();
                saver.schedule(identity, body)
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(backend.upsert_count().await, 3);
    }
}
