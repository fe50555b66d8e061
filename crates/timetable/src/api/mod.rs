//! REST collaborator for the attendance backend.
//!
//! [`Backend`] lists every endpoint the timetable and attendance code
//! consumes. [`RestClient`] talks to the real server; [`fake::FakeBackend`]
//! keeps everything in memory for tests.

mod client;
mod error;
pub mod fake;
mod types;

pub use client::RestClient;
pub use error::ApiError;
pub use types::*;

use async_trait::async_trait;
use rand::Rng;
use std::fmt;

/// Every backend endpoint used by this crate.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /teacher/years?department=`
    async fn teacher_years(&self, department: &str) -> Result<Vec<u8>, ApiError>;

    /// `GET /teacher/classes?department=&semester=`
    async fn teacher_classes(&self, department: &str, semester: u8)
        -> Result<Vec<String>, ApiError>;

    /// `GET /teacher/schedule?department=&semester=&className=`
    async fn teacher_schedule(
        &self,
        department: &str,
        semester: u8,
        class_name: &str,
    ) -> Result<Vec<SessionRecord>, ApiError>;

    /// `GET /admin/subjects?department=&semester=`
    async fn list_subjects(&self, department: &str, semester: u8)
        -> Result<Vec<Subject>, ApiError>;

    /// `POST /admin/subjects`
    async fn create_subject(&self, draft: &SubjectDraft) -> Result<Subject, ApiError>;

    /// `PUT /admin/subjects/:id`
    async fn update_subject(&self, id: i64, draft: &SubjectDraft) -> Result<Subject, ApiError>;

    /// `DELETE /admin/subjects/:id`
    async fn delete_subject(&self, id: i64) -> Result<(), ApiError>;

    /// `POST /admin/timetable/session`
    ///
    /// `idempotency_key` identifies this exact write so a repeated submission
    /// can be recognised by the server.
    async fn upsert_session(
        &self,
        session: &SessionUpsert,
        idempotency_key: &str,
    ) -> Result<SessionSaved, ApiError>;

    /// `GET /students?classId=` or `GET /students?department=&semester=&section=`
    async fn list_roster(&self, query: &RosterQuery) -> Result<Vec<RosterStudent>, ApiError>;

    /// `POST /attendance/session`
    async fn mark_attendance(&self, mark: &AttendanceWrite) -> Result<(), ApiError>;
}

/// Outcome of a best-effort batch of independent writes.
///
/// Writes that succeeded stay applied even when later ones fail.
#[derive(Debug, Clone)]
pub struct BatchReport<K> {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<(K, ApiError)>,
}

impl<K> BatchReport<K> {
    pub fn new() -> Self {
        Self {
            attempted: 0,
            succeeded: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, key: K, error: ApiError) {
        self.attempted += 1;
        self.failures.push((key, error));
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// `"3 of 4 succeeded"`
    pub fn summary(&self) -> String {
        format!("{} of {} succeeded", self.succeeded, self.attempted)
    }
}

impl<K> Default for BatchReport<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Display for BatchReport<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Generates a unique correlation ID for request tracing.
pub(crate) fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}
