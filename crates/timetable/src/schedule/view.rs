//! The two timetable variants: an editable authoring grid for administrators
//! and a read-only, server-driven grid for staff.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::cache::{SubjectCache, SubjectKey};
use super::conflict::{self, Conflict};
use super::error::ScheduleError;
use super::grid::TimetableGrid;
use super::period::{Period, PeriodField};
use super::semester::{self, MAX_SEMESTER};
use super::sessions::{build_upsert, AutoSaver, CommitOutcome, SessionResolver};
use super::types::{parse_clock, CellValue, Day, SectionContext};
use crate::api::{ApiError, Backend, SessionRecord, SessionSaved, Subject, SubjectDraft};
use crate::attendance::SessionTarget;
use crate::config::ClientConfig;
use crate::context::OperatorContext;

/// Pending autosave for one cell edit.
pub type AutosaveHandle = JoinHandle<Result<SessionSaved, ApiError>>;

/// Checks and normalizes a subject form before it is sent.
pub fn normalize_subject_draft(draft: &SubjectDraft) -> Result<SubjectDraft, ScheduleError> {
    let invalid = |message: &str| ScheduleError::InvalidSubject {
        message: message.to_string(),
    };

    let subject_code = draft.subject_code.trim().to_uppercase();
    let subject_name = draft.subject_name.trim().to_string();
    if subject_code.is_empty() {
        return Err(invalid("subject code is required"));
    }
    if subject_name.is_empty() {
        return Err(invalid("subject name is required"));
    }
    if draft.department.trim().is_empty() {
        return Err(invalid("department is required"));
    }
    if !(1..=MAX_SEMESTER).contains(&draft.semester) {
        return Err(ScheduleError::InvalidSemester {
            value: draft.semester.to_string(),
        });
    }
    if draft.credits == 0 {
        return Err(invalid("credits must be positive"));
    }

    Ok(SubjectDraft {
        subject_code,
        subject_name,
        department: draft.department.trim().to_string(),
        semester: draft.semester,
        credits: draft.credits,
        is_elective: draft.is_elective,
    })
}

/// Editable timetable for one department/semester/section.
pub struct AuthoringTimetable<B: Backend + ?Sized + 'static> {
    backend: Arc<B>,
    operator: OperatorContext,
    grid: TimetableGrid,
    context: SectionContext,
    year: Option<u8>,
    subjects: Vec<Subject>,
    subject_error: Option<ApiError>,
    subject_cache: SubjectCache,
    resolver: SessionResolver<B>,
    autosaver: AutoSaver<B>,
}

impl<B: Backend + ?Sized + 'static> AuthoringTimetable<B> {
    pub fn new(backend: Arc<B>, operator: OperatorContext, config: &ClientConfig) -> Self {
        let department = if operator.department.trim().is_empty() {
            config.default_department.clone()
        } else {
            operator.department.clone()
        };
        let resolver = SessionResolver::new(Arc::clone(&backend));
        Self {
            autosaver: AutoSaver::new(resolver.clone(), config.autosave_debounce()),
            resolver,
            backend,
            operator,
            grid: TimetableGrid::new(config.period_model()),
            context: SectionContext::new(department, None, config.default_section.clone()),
            year: None,
            subjects: Vec::new(),
            subject_error: None,
            subject_cache: SubjectCache::new(config.subject_cache_ttl()),
        }
    }

    pub fn operator(&self) -> &OperatorContext {
        &self.operator
    }

    pub fn grid(&self) -> &TimetableGrid {
        &self.grid
    }

    pub fn context(&self) -> &SectionContext {
        &self.context
    }

    pub fn year(&self) -> Option<u8> {
        self.year
    }

    /// Subjects offered for the selected semester.
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Error from the last subject fetch, if it failed.
    pub fn subject_error(&self) -> Option<&ApiError> {
        self.subject_error.as_ref()
    }

    pub fn pending_saves(&self) -> usize {
        self.autosaver.pending()
    }

    /// Selects a year and returns the semesters it offers.
    ///
    /// A selected semester outside the new year is cleared.
    pub fn select_year(&mut self, year: u8) -> &'static [u8] {
        let semesters = semester::year_to_semesters(year);
        self.year = Some(year);
        if let Some(current) = self.context.semester {
            if !semesters.contains(&current) {
                self.context.semester = None;
                self.subjects.clear();
            }
        }
        semesters
    }

    /// Selects a semester, clears the grid and loads its subjects.
    pub async fn select_semester(&mut self, semester: u8) -> Result<(), ScheduleError> {
        if !(1..=MAX_SEMESTER).contains(&semester) {
            return Err(ScheduleError::InvalidSemester {
                value: semester.to_string(),
            });
        }
        self.context.semester = Some(semester);
        self.year = Some(semester::semester_to_year(semester));
        self.grid.fill(CellValue::Unassigned);
        self.load_subjects(semester).await;
        info!(
            department = %self.context.department,
            semester,
            subjects = self.subjects.len(),
            "Semester selected"
        );
        Ok(())
    }

    /// Switches department. With a semester selected, the grid is cleared
    /// and that department's subjects are loaded.
    pub async fn set_department(&mut self, department: impl Into<String>) {
        let department = department.into();
        if department == self.context.department {
            return;
        }
        self.context.department = department;
        match self.context.semester {
            Some(semester) => {
                self.grid.fill(CellValue::Unassigned);
                self.load_subjects(semester).await;
                info!(
                    department = %self.context.department,
                    semester,
                    subjects = self.subjects.len(),
                    "Department selected"
                );
            }
            None => self.subjects.clear(),
        }
    }

    pub fn set_section(&mut self, section: impl Into<String>) {
        self.context.section = section.into();
    }

    async fn load_subjects(&mut self, semester: u8) {
        let key = SubjectKey::new(self.context.department.clone(), semester);
        if let Some(cached) = self.subject_cache.get(&key) {
            debug!(department = %key.department, semester, "Subject list served from cache");
            self.subjects = cached;
            self.subject_error = None;
            return;
        }

        match self.backend.list_subjects(&key.department, semester).await {
            Ok(subjects) => {
                self.subject_cache.insert(key, subjects.clone());
                self.subjects = subjects;
                self.subject_error = None;
            }
            Err(e) => {
                error!(department = %key.department, semester, error = %e, "Failed to load subjects");
                self.subjects.clear();
                self.subject_error = Some(e);
            }
        }
    }

    /// Overwrites one cell.
    ///
    /// A concrete subject with a complete context schedules an autosave and
    /// returns its handle. Sentinels and incomplete contexts stay local.
    pub fn set_cell(
        &mut self,
        day: Day,
        period_index: usize,
        value: CellValue,
    ) -> Result<Option<AutosaveHandle>, ScheduleError> {
        self.grid.set_cell(day, period_index, value.clone())?;

        let Some(name) = value.subject_name() else {
            return Ok(None);
        };
        if !self.context.is_complete() {
            debug!(day = %day, period = period_index + 1, "Context incomplete, edit kept local");
            return Ok(None);
        }
        let Some(period) = self.grid.periods().get(period_index) else {
            return Ok(None);
        };

        let (identity, body) = build_upsert(
            &self.context,
            &self.subjects,
            day,
            period_index,
            period,
            name,
            None,
        )?;
        Ok(Some(self.autosaver.schedule(identity, body)))
    }

    pub fn add_period(&mut self) -> String {
        self.grid.add_period()
    }

    pub fn remove_period(&mut self, id: &str) -> Result<Period, ScheduleError> {
        self.grid.remove_period(id)
    }

    pub fn update_period(
        &mut self,
        id: &str,
        field: PeriodField,
        value: &str,
    ) -> Result<(), ScheduleError> {
        self.grid.update_period(id, field, value)
    }

    pub fn reset_periods(&mut self) {
        self.grid.reset_periods();
    }

    pub fn has_conflict(&self, day: Day, subject: &str) -> bool {
        self.grid.has_conflict(day, subject)
    }

    pub fn conflicts(&self) -> Vec<Conflict> {
        conflict::grid_conflicts(&self.grid)
    }

    /// Persists every filled cell. Conflicts do not block the commit.
    pub async fn commit(&self) -> Result<CommitOutcome, ScheduleError> {
        let conflicts = self.conflicts();
        if !conflicts.is_empty() {
            warn!(conflicts = conflicts.len(), "Committing timetable with conflicts");
        }
        self.resolver
            .commit(&self.grid, &self.context, &self.subjects)
            .await
    }

    pub async fn create_subject(&mut self, draft: &SubjectDraft) -> Result<Subject, ScheduleError> {
        let draft = normalize_subject_draft(draft)?;
        let created = self.backend.create_subject(&draft).await?;
        info!(code = %created.subject_code, "Subject created");
        self.refresh_subjects(&draft.department, draft.semester).await;
        Ok(created)
    }

    pub async fn update_subject(
        &mut self,
        id: i64,
        draft: &SubjectDraft,
    ) -> Result<Subject, ScheduleError> {
        let draft = normalize_subject_draft(draft)?;
        let previous = self.subject_key_of(id);
        let updated = self.backend.update_subject(id, &draft).await?;
        info!(id, code = %updated.subject_code, "Subject updated");
        if let Some(key) = previous {
            self.subject_cache.invalidate(&key);
        }
        self.refresh_subjects(&draft.department, draft.semester).await;
        Ok(updated)
    }

    pub async fn delete_subject(&mut self, id: i64) -> Result<(), ScheduleError> {
        let key = self.subject_key_of(id);
        self.backend.delete_subject(id).await?;
        info!(id, "Subject deleted");
        match key {
            Some(key) => self.refresh_subjects(&key.department, key.semester).await,
            None => self.subject_cache.clear(),
        }
        Ok(())
    }

    fn subject_key_of(&self, id: i64) -> Option<SubjectKey> {
        self.subjects
            .iter()
            .find(|s| s.id == Some(id))
            .map(|s| SubjectKey::new(s.department.clone(), s.semester))
    }

    async fn refresh_subjects(&mut self, department: &str, semester: u8) {
        self.subject_cache
            .invalidate(&SubjectKey::new(department, semester));
        if self.context.department == department && self.context.semester == Some(semester) {
            self.load_subjects(semester).await;
        }
    }
}

/// A schedule response tagged with the request that produced it.
#[derive(Debug)]
pub struct ScheduleFetch {
    ticket: u64,
    context: SectionContext,
    result: Result<Vec<SessionRecord>, ApiError>,
}

impl ScheduleFetch {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

/// What happened when a schedule response was applied.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub placed: usize,
    /// Sessions whose day or start time matched no grid cell
    pub unplaced: Vec<SessionRecord>,
    /// Sessions overwritten by a later session for the same cell
    pub replaced: Vec<SessionRecord>,
    /// The response belonged to a superseded request and was ignored
    pub stale: bool,
    pub error: Option<ApiError>,
}

/// Read-only timetable populated from the server.
pub struct StaffTimetable<B: Backend + ?Sized> {
    backend: Arc<B>,
    operator: OperatorContext,
    grid: TimetableGrid,
    context: Option<SectionContext>,
    sessions: HashMap<(Day, usize), SessionRecord>,
    loading: AtomicBool,
    latest_ticket: AtomicU64,
}

impl<B: Backend + ?Sized> StaffTimetable<B> {
    pub fn new(backend: Arc<B>, operator: OperatorContext, config: &ClientConfig) -> Self {
        let mut grid = TimetableGrid::new(config.period_model());
        grid.fill(CellValue::Free);
        Self {
            backend,
            operator,
            grid,
            context: None,
            sessions: HashMap::new(),
            loading: AtomicBool::new(false),
            latest_ticket: AtomicU64::new(0),
        }
    }

    pub fn grid(&self) -> &TimetableGrid {
        &self.grid
    }

    pub fn context(&self) -> Option<&SectionContext> {
        self.context.as_ref()
    }

    /// True while a schedule request is outstanding.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Relaxed)
    }

    pub fn has_conflict(&self, day: Day, subject: &str) -> bool {
        self.grid.has_conflict(day, subject)
    }

    /// Years with classes in the operator's department. Empty on failure.
    pub async fn available_years(&self) -> Vec<u8> {
        match self.backend.teacher_years(&self.operator.department).await {
            Ok(years) => years,
            Err(e) => {
                error!(department = %self.operator.department, error = %e, "Failed to load years");
                Vec::new()
            }
        }
    }

    /// Section labels for a semester in the operator's department. Empty on failure.
    pub async fn classes(&self, semester: u8) -> Vec<String> {
        match self
            .backend
            .teacher_classes(&self.operator.department, semester)
            .await
        {
            Ok(classes) => classes,
            Err(e) => {
                error!(semester, error = %e, "Failed to load classes");
                Vec::new()
            }
        }
    }

    /// Requests the schedule for `ctx` without touching the grid.
    ///
    /// Every call takes a new ticket; only the newest ticket is applied.
    pub async fn fetch_schedule(&self, ctx: &SectionContext) -> Result<ScheduleFetch, ScheduleError> {
        let semester = ctx.require_complete()?;
        let ticket = self.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        self.loading.store(true, Ordering::Relaxed);

        debug!(ticket, department = %ctx.department, semester, section = %ctx.section, "Fetching schedule");
        let result = self
            .backend
            .teacher_schedule(&ctx.department, semester, &ctx.section)
            .await;

        if self.latest_ticket.load(Ordering::SeqCst) == ticket {
            self.loading.store(false, Ordering::Relaxed);
        }
        Ok(ScheduleFetch {
            ticket,
            context: ctx.clone(),
            result,
        })
    }

    /// Replaces the grid with a fetched schedule, unless a newer fetch exists.
    pub fn apply(&mut self, fetch: ScheduleFetch) -> LoadReport {
        let mut report = LoadReport::default();
        if fetch.ticket != self.latest_ticket.load(Ordering::SeqCst) {
            debug!(ticket = fetch.ticket, "Ignoring stale schedule response");
            report.stale = true;
            return report;
        }

        self.grid.fill(CellValue::Free);
        self.sessions.clear();
        let ctx = fetch.context;

        let records = match fetch.result {
            Ok(records) => records,
            Err(e) => {
                error!(department = %ctx.department, section = %ctx.section, error = %e, "Failed to load schedule");
                self.context = Some(ctx);
                report.error = Some(e);
                return report;
            }
        };

        let year = ctx.semester.map(semester::semester_to_year).unwrap_or(0);
        let default_context = format!("Year {} {} - {}", year, ctx.section, ctx.department);

        for record in records {
            let Some((day, index)) = self.locate(&record) else {
                warn!(
                    day = %record.day,
                    start_time = %record.start_time,
                    "Session matches no period, dropped from grid"
                );
                report.unplaced.push(record);
                continue;
            };
            let name = record
                .subject_name
                .clone()
                .or_else(|| record.subject_code.clone())
                .unwrap_or_default();
            let cell = CellValue::Subject {
                name,
                context: Some(
                    record
                        .class_context
                        .clone()
                        .unwrap_or_else(|| default_context.clone()),
                ),
            };
            if self.grid.set_cell(day, index, cell).is_err() {
                report.unplaced.push(record);
                continue;
            }
            match self.sessions.insert((day, index), record) {
                Some(previous) => {
                    warn!(
                        day = %day,
                        period = index + 1,
                        "Two sessions share a cell, keeping the later one"
                    );
                    report.replaced.push(previous);
                }
                None => report.placed += 1,
            }
        }

        info!(
            department = %ctx.department,
            section = %ctx.section,
            placed = report.placed,
            unplaced = report.unplaced.len(),
            replaced = report.replaced.len(),
            "Schedule loaded"
        );
        self.context = Some(ctx);
        report
    }

    /// Fetches and applies in one step.
    pub async fn load_for_context(&mut self, ctx: &SectionContext) -> Result<LoadReport, ScheduleError> {
        let fetch = self.fetch_schedule(ctx).await?;
        Ok(self.apply(fetch))
    }

    /// Loads by year instead of semester. A year covers two semesters, so the
    /// semester is picked explicitly and checked against the year.
    pub async fn load_for_year(
        &mut self,
        year: u8,
        semester: u8,
        section: &str,
    ) -> Result<LoadReport, ScheduleError> {
        if !semester::year_to_semesters(year).contains(&semester) {
            return Err(ScheduleError::InvalidSemester {
                value: format!("{semester} (year {year})"),
            });
        }
        let ctx = SectionContext::new(self.operator.department.clone(), Some(semester), section);
        self.load_for_context(&ctx).await
    }

    /// The persisted session shown in a cell, if any.
    pub fn session_at(&self, day: Day, period_index: usize) -> Option<&SessionRecord> {
        self.sessions.get(&(day, period_index))
    }

    /// Builds the quick attendance target for a loaded cell.
    pub fn attendance_target(&self, day: Day, period_index: usize) -> Option<SessionTarget> {
        let record = self.session_at(day, period_index)?;
        let ctx = self.context.as_ref()?;
        let session_id = record.session_id.clone()?;
        let period = self.grid.periods().get(period_index)?;
        Some(SessionTarget {
            session_id,
            subject_name: record.subject_name.clone().unwrap_or_default(),
            department: ctx.department.clone(),
            semester: ctx.semester?,
            section: ctx.section.clone(),
            class_id: None,
            session_time: Some(period.display_range()),
        })
    }

    fn locate(&self, record: &SessionRecord) -> Option<(Day, usize)> {
        let day: Day = record.day.parse().ok()?;
        let start = parse_clock(&record.start_time).ok()?;
        let index = self.grid.periods().index_of_start(start)?;
        Some((day, index))
    }
}

/// The grid variant an operator gets. This is the only place role decides
/// what can be edited.
pub enum TimetableView<B: Backend + ?Sized + 'static> {
    Authoring(AuthoringTimetable<B>),
    ReadOnly(StaffTimetable<B>),
}

impl<B: Backend + ?Sized + 'static> TimetableView<B> {
    pub fn for_operator(backend: Arc<B>, operator: OperatorContext, config: &ClientConfig) -> Self {
        if operator.can_author() {
            TimetableView::Authoring(AuthoringTimetable::new(backend, operator, config))
        } else {
            TimetableView::ReadOnly(StaffTimetable::new(backend, operator, config))
        }
    }

    pub fn grid(&self) -> &TimetableGrid {
        match self {
            TimetableView::Authoring(view) => view.grid(),
            TimetableView::ReadOnly(view) => view.grid(),
        }
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, TimetableView::Authoring(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeBackend;
    use crate::api::SessionId;
    use crate::context::Role;

    fn admin() -> OperatorContext {
        OperatorContext::new("admin-1", "Admin", Role::Admin, "Computer Science")
    }

    fn staff() -> OperatorContext {
        OperatorContext::new("staff-1", "R. Iyer", Role::Staff, "Computer Science")
    }

    fn config() -> ClientConfig {
        ClientConfig {
            autosave_debounce_ms: 0,
            ..ClientConfig::default()
        }
    }

    fn record(day: &str, start: &str, name: &str, id: i64) -> SessionRecord {
        SessionRecord {
            session_id: Some(SessionId::from(id)),
            day: day.to_string(),
            period_number: None,
            start_time: start.to_string(),
            end_time: None,
            department: Some("Computer Science".into()),
            semester: Some(3),
            section: Some("B".into()),
            subject_code: None,
            subject_name: Some(name.to_string()),
            staff_code: None,
            room_number: None,
            class_context: None,
        }
    }

    fn draft(code: &str, name: &str) -> SubjectDraft {
        SubjectDraft {
            subject_code: code.to_string(),
            subject_name: name.to_string(),
            department: "Computer Science".into(),
            semester: 1,
            credits: 3,
            is_elective: false,
        }
    }

    #[test]
    fn test_normalize_subject_draft() {
        let normalized = normalize_subject_draft(&draft(" cs201 ", " Algorithms ")).unwrap();
        assert_eq!(normalized.subject_code, "CS201");
        assert_eq!(normalized.subject_name, "Algorithms");

        assert!(normalize_subject_draft(&draft("", "Algorithms")).is_err());
        let mut bad = draft("CS201", "Algorithms");
        bad.semester = 7;
        assert!(matches!(
            normalize_subject_draft(&bad),
            Err(ScheduleError::InvalidSemester { .. })
        ));
        bad.semester = 2;
        bad.credits = 0;
        assert!(normalize_subject_draft(&bad).is_err());
    }

    #[test]
    fn test_role_picks_variant() {
        let backend = Arc::new(FakeBackend::default());
        assert!(TimetableView::for_operator(backend.clone(), admin(), &config()).is_editable());
        assert!(!TimetableView::for_operator(backend, staff(), &config()).is_editable());
    }

    #[tokio::test]
    async fn test_select_year_clears_foreign_semester() {
        let backend = Arc::new(FakeBackend::default());
        let mut view = AuthoringTimetable::new(backend, admin(), &config());
        view.select_semester(3).await.unwrap();
        assert_eq!(view.year(), Some(2));
        assert_eq!(view.select_year(1), &[1u8, 2]);
        assert_eq!(view.context().semester, None);
        assert!(view.select_semester(9).await.is_err());
    }

    #[tokio::test]
    async fn test_edits_without_semester_stay_local() {
        let backend = Arc::new(FakeBackend::default());
        let mut view = AuthoringTimetable::new(backend.clone(), admin(), &config());
        let handle = view
            .set_cell(Day::Monday, 0, CellValue::subject("Data Structures"))
            .unwrap();
        assert!(handle.is_none());
        assert_eq!(backend.upsert_count().await, 0);
    }

    #[tokio::test]
    async fn test_sentinel_edit_is_not_persisted() {
        let backend = Arc::new(FakeBackend::default());
        let mut view = AuthoringTimetable::new(backend.clone(), admin(), &config());
        view.select_semester(1).await.unwrap();
        assert!(view.set_cell(Day::Monday, 0, CellValue::Free).unwrap().is_none());

        let handle = view
            .set_cell(Day::Monday, 1, CellValue::subject("Data Structures"))
            .unwrap()
            .unwrap();
        handle.await.unwrap().unwrap();
        let log = backend.upsert_log.lock().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0.period_number, 2);
        assert_eq!(log[0].0.room_number, None);
    }

    #[tokio::test]
    async fn test_subject_list_is_cached_and_invalidated() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .add_subject("CS101", "Data Structures", "Computer Science", 1)
            .await;
        let mut view = AuthoringTimetable::new(backend.clone(), admin(), &config());
        view.select_semester(1).await.unwrap();
        view.select_semester(1).await.unwrap();
        assert_eq!(backend.subject_calls.load(Ordering::Relaxed), 1);

        view.create_subject(&draft("cs102", "Discrete Maths")).await.unwrap();
        assert_eq!(view.subjects().len(), 2);
        assert_eq!(backend.subject_calls.load(Ordering::Relaxed), 2);

        let duplicate = view.create_subject(&draft("CS102", "Again")).await;
        assert!(matches!(duplicate, Err(ScheduleError::Api(ApiError::Envelope { .. }))));
    }

    #[tokio::test]
    async fn test_referenced_subject_delete_fails() {
        let backend = Arc::new(FakeBackend::default());
        let subject = backend
            .add_subject("CS101", "Data Structures", "Computer Science", 1)
            .await;
        let id = subject.id.unwrap();
        backend.referenced_subjects.lock().await.insert(id);

        let mut view = AuthoringTimetable::new(backend.clone(), admin(), &config());
        view.select_semester(1).await.unwrap();
        assert!(view.delete_subject(id).await.is_err());
        assert_eq!(view.subjects().len(), 1);

        backend.referenced_subjects.lock().await.clear();
        view.delete_subject(id).await.unwrap();
        assert!(view.subjects().is_empty());
    }

    #[tokio::test]
    async fn test_staff_load_places_sessions() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .set_schedule(
                "Computer Science",
                3,
                "B",
                vec![
                    record("MONDAY", "09:00:00", "Operating Systems", 10),
                    record("Wednesday", "10:45", "Networks", 11),
                    record("Friday", "08:15:00", "Early Lab", 12),
                ],
            )
            .await;
        let mut view = StaffTimetable::new(backend, staff(), &config());
        let ctx = SectionContext::new("Computer Science", Some(3), "B");
        let report = view.load_for_context(&ctx).await.unwrap();

        assert_eq!(report.placed, 2);
        assert_eq!(report.unplaced.len(), 1);
        assert_eq!(
            view.grid().cell(Day::Monday, 0).map(CellValue::display).as_deref(),
            Some("Operating Systems\nYear 2 B - Computer Science")
        );
        assert_eq!(view.grid().cell(Day::Monday, 1), Some(&CellValue::Free));

        let target = view.attendance_target(Day::Wednesday, 2).unwrap();
        assert_eq!(target.session_id, SessionId::from(11));
        assert_eq!(target.session_time.as_deref(), Some("10:45 AM - 11:30 AM"));
    }

    #[tokio::test]
    async fn test_department_switch_reloads_subjects() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .add_subject("CS101", "Data Structures", "Computer Science", 1)
            .await;
        backend
            .add_subject("ME101", "Thermodynamics", "Mechanical", 1)
            .await;
        let mut view = AuthoringTimetable::new(backend.clone(), admin(), &config());
        view.select_semester(1).await.unwrap();
        view.set_cell(Day::Monday, 0, CellValue::Free).unwrap();

        view.set_department("Mechanical").await;
        let names: Vec<_> = view.subjects().iter().map(|s| s.subject_name.as_str()).collect();
        assert_eq!(names, ["Thermodynamics"]);
        assert_eq!(view.grid().cell(Day::Monday, 0), Some(&CellValue::Unassigned));

        for (index, name) in [(0, "Data Structures"), (1, "Thermodynamics")] {
            view.set_cell(Day::Tuesday, index, CellValue::subject(name))
                .unwrap()
                .unwrap()
                .await
                .unwrap()
                .unwrap();
        }
        let log = backend.upsert_log.lock().await;
        assert!(log.iter().all(|(b, _)| b.department == "Mechanical"));
        assert_eq!(log[0].0.subject_code, None);
        assert_eq!(log[1].0.subject_code.as_deref(), Some("ME101"));
    }

    #[tokio::test]
    async fn test_department_switch_without_semester_clears_subjects() {
        let backend = Arc::new(FakeBackend::default());
        let mut view = AuthoringTimetable::new(backend.clone(), admin(), &config());
        view.set_department("Mechanical").await;
        assert_eq!(view.context().department, "Mechanical");
        assert!(view.subjects().is_empty());
        assert_eq!(backend.subject_calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_sessions_sharing_a_cell_are_reported() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .set_schedule(
                "Computer Science",
                3,
                "B",
                vec![
                    record("Monday", "09:00", "Operating Systems", 10),
                    record("Monday", "09:00:00", "Compilers", 11),
                ],
            )
            .await;
        let mut view = StaffTimetable::new(backend, staff(), &config());
        let ctx = SectionContext::new("Computer Science", Some(3), "B");
        let report = view.load_for_context(&ctx).await.unwrap();

        assert_eq!(report.placed, 1);
        assert_eq!(report.replaced.len(), 1);
        assert_eq!(report.replaced[0].subject_name.as_deref(), Some("Operating Systems"));
        assert_eq!(
            view.grid().cell(Day::Monday, 0).and_then(CellValue::subject_name),
            Some("Compilers")
        );
        assert_eq!(
            view.session_at(Day::Monday, 0).and_then(|r| r.session_id.clone()),
            Some(SessionId::from(11))
        );
    }

    #[tokio::test]
    async fn test_staff_load_failure_shows_free_grid() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .set_schedule("Computer Science", 3, "B", vec![record("Monday", "09:00", "OS", 1)])
            .await;
        let mut view = StaffTimetable::new(backend.clone(), staff(), &config());
        let ctx = SectionContext::new("Computer Science", Some(3), "B");
        view.load_for_context(&ctx).await.unwrap();
        assert_eq!(view.grid().cell(Day::Monday, 0).and_then(CellValue::subject_name), Some("OS"));

        backend.set_reads_fail(true).await;
        let report = view.load_for_context(&ctx).await.unwrap();
        assert!(report.error.is_some());
        assert!(view.grid().cells().all(|(_, _, c)| *c == CellValue::Free));
        assert!(view.available_years().await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_response_is_ignored() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .set_schedule("Computer Science", 1, "A", vec![record("Monday", "09:00", "Old", 1)])
            .await;
        backend
            .set_schedule("Computer Science", 1, "B", vec![record("Monday", "09:00", "New", 2)])
            .await;
        let mut view = StaffTimetable::new(backend, staff(), &config());

        let first = view
            .fetch_schedule(&SectionContext::new("Computer Science", Some(1), "A"))
            .await
            .unwrap();
        let second = view
            .fetch_schedule(&SectionContext::new("Computer Science", Some(1), "B"))
            .await
            .unwrap();
        assert!(second.ticket() > first.ticket());

        assert!(!view.apply(second).stale);
        assert!(view.apply(first).stale);
        assert_eq!(
            view.grid().cell(Day::Monday, 0).and_then(CellValue::subject_name),
            Some("New")
        );
        assert!(!view.is_loading());
    }

    #[tokio::test]
    async fn test_load_for_year_checks_semester() {
        let backend = Arc::new(FakeBackend::default());
        let mut view = StaffTimetable::new(backend, staff(), &config());
        assert!(view.load_for_year(1, 3, "A").await.is_err());
        assert!(view.load_for_year(2, 3, "A").await.is_ok());
    }
}
