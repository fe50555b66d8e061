//! In-memory [`Backend`] used by tests and offline demos.
//!
//! Sessions are upserted by natural identity and attendance marks by
//! `(student, session, date)`, mirroring what the real server does.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::error::ApiError;
use super::types::*;
use super::Backend;
use crate::attendance::AttendanceStatus;
use crate::schedule::types::Day;

type SessionKey = (String, u8, String, Day, u32);

pub struct FakeBackend {
    pub years: Mutex<HashMap<String, Vec<u8>>>,
    pub classes: Mutex<HashMap<(String, u8), Vec<String>>>,
    pub schedules: Mutex<HashMap<(String, u8, String), Vec<SessionRecord>>>,
    pub subjects: Mutex<Vec<Subject>>,
    /// Subject ids the server refuses to delete (referenced by a session)
    pub referenced_subjects: Mutex<HashSet<i64>>,
    pub sessions: Mutex<HashMap<SessionKey, (SessionId, SessionUpsert)>>,
    /// Every upsert in arrival order, with its idempotency key
    pub upsert_log: Mutex<Vec<(SessionUpsert, String)>>,
    pub rosters: Mutex<HashMap<String, Vec<RosterStudent>>>,
    pub marks: Mutex<HashMap<(i64, SessionId, chrono::NaiveDate), AttendanceStatus>>,
    /// Students whose attendance write fails with a network error
    pub failing_students: Mutex<HashSet<i64>>,
    /// When set, every read endpoint fails with a network error
    pub reads_fail: Mutex<bool>,
    pub schedule_calls: AtomicU64,
    pub subject_calls: AtomicU64,
    pub attendance_calls: AtomicU64,
    next_id: AtomicU64,
    pub latency: Duration,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            years: Mutex::new(HashMap::new()),
            classes: Mutex::new(HashMap::new()),
            schedules: Mutex::new(HashMap::new()),
            subjects: Mutex::new(Vec::new()),
            referenced_subjects: Mutex::new(HashSet::new()),
            sessions: Mutex::new(HashMap::new()),
            upsert_log: Mutex::new(Vec::new()),
            rosters: Mutex::new(HashMap::new()),
            marks: Mutex::new(HashMap::new()),
            failing_students: Mutex::new(HashSet::new()),
            reads_fail: Mutex::new(false),
            schedule_calls: AtomicU64::new(0),
            subject_calls: AtomicU64::new(0),
            attendance_calls: AtomicU64::new(0),
            next_id: AtomicU64::new(1),
            latency: Duration::from_millis(0),
        }
    }
}

impl FakeBackend {
    /// A fake whose every call sleeps for `latency` first.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Roster lookup key shared by class-id and section queries.
    pub fn roster_key(query: &RosterQuery) -> String {
        match query {
            RosterQuery::Class(id) => format!("class:{id}"),
            RosterQuery::Section {
                department,
                semester,
                section,
            } => format!("{department}/{semester}/{section}"),
        }
    }

    pub async fn add_subject(&self, code: &str, name: &str, department: &str, semester: u8) -> Subject {
        let subject = Subject {
            id: Some(self.next_id.fetch_add(1, Ordering::Relaxed) as i64),
            subject_code: code.to_string(),
            subject_name: name.to_string(),
            department: department.to_string(),
            semester,
            credits: 3,
            is_elective: false,
        };
        self.subjects.lock().await.push(subject.clone());
        subject
    }

    pub async fn set_roster(&self, query: &RosterQuery, students: Vec<RosterStudent>) {
        self.rosters
            .lock()
            .await
            .insert(Self::roster_key(query), students);
    }

    pub async fn set_schedule(
        &self,
        department: &str,
        semester: u8,
        class_name: &str,
        sessions: Vec<SessionRecord>,
    ) {
        self.schedules.lock().await.insert(
            (department.to_string(), semester, class_name.to_string()),
            sessions,
        );
    }

    pub async fn fail_student(&self, student_id: i64) {
        self.failing_students.lock().await.insert(student_id);
    }

    pub async fn set_reads_fail(&self, fail: bool) {
        *self.reads_fail.lock().await = fail;
    }

    pub async fn upsert_count(&self) -> usize {
        self.upsert_log.lock().await.len()
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    async fn check_reads(&self) -> Result<(), ApiError> {
        if *self.reads_fail.lock().await {
            return Err(ApiError::Network {
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn teacher_years(&self, department: &str) -> Result<Vec<u8>, ApiError> {
        self.pause().await;
        self.check_reads().await?;
        Ok(self
            .years
            .lock()
            .await
            .get(department)
            .cloned()
            .unwrap_or_default())
    }

    async fn teacher_classes(&self, department: &str, semester: u8) -> Result<Vec<String>, ApiError> {
        self.pause().await;
        self.check_reads().await?;
        Ok(self
            .classes
            .lock()
            .await
            .get(&(department.to_string(), semester))
            .cloned()
            .unwrap_or_default())
    }

    async fn teacher_schedule(
        &self,
        department: &str,
        semester: u8,
        class_name: &str,
    ) -> Result<Vec<SessionRecord>, ApiError> {
        self.schedule_calls.fetch_add(1, Ordering::Relaxed);
        self.pause().await;
        self.check_reads().await?;
        Ok(self
            .schedules
            .lock()
            .await
            .get(&(department.to_string(), semester, class_name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_subjects(&self, department: &str, semester: u8) -> Result<Vec<Subject>, ApiError> {
        self.subject_calls.fetch_add(1, Ordering::Relaxed);
        self.pause().await;
        self.check_reads().await?;
        Ok(self
            .subjects
            .lock()
            .await
            .iter()
            .filter(|s| s.department == department && s.semester == semester)
            .cloned()
            .collect())
    }

    async fn create_subject(&self, draft: &SubjectDraft) -> Result<Subject, ApiError> {
        self.pause().await;
        let mut subjects = self.subjects.lock().await;
        if subjects
            .iter()
            .any(|s| s.department == draft.department && s.subject_code == draft.subject_code)
        {
            return Err(ApiError::Envelope {
                message: format!("Subject code {} already exists", draft.subject_code),
            });
        }
        let subject = Subject {
            id: Some(self.next_id.fetch_add(1, Ordering::Relaxed) as i64),
            subject_code: draft.subject_code.clone(),
            subject_name: draft.subject_name.clone(),
            department: draft.department.clone(),
            semester: draft.semester,
            credits: draft.credits,
            is_elective: draft.is_elective,
        };
        subjects.push(subject.clone());
        Ok(subject)
    }

    async fn update_subject(&self, id: i64, draft: &SubjectDraft) -> Result<Subject, ApiError> {
        self.pause().await;
        let mut subjects = self.subjects.lock().await;
        let subject = subjects
            .iter_mut()
            .find(|s| s.id == Some(id))
            .ok_or_else(|| ApiError::Status {
                status: 404,
                message: format!("Subject {id} not found"),
            })?;
        subject.subject_code = draft.subject_code.clone();
        subject.subject_name = draft.subject_name.clone();
        subject.department = draft.department.clone();
        subject.semester = draft.semester;
        subject.credits = draft.credits;
        subject.is_elective = draft.is_elective;
        Ok(subject.clone())
    }

    async fn delete_subject(&self, id: i64) -> Result<(), ApiError> {
        self.pause().await;
        if self.referenced_subjects.lock().await.contains(&id) {
            return Err(ApiError::Envelope {
                message: "Subject is referenced by an active session".to_string(),
            });
        }
        let mut subjects = self.subjects.lock().await;
        let before = subjects.len();
        subjects.retain(|s| s.id != Some(id));
        if subjects.len() == before {
            return Err(ApiError::Status {
                status: 404,
                message: format!("Subject {id} not found"),
            });
        }
        Ok(())
    }

    async fn upsert_session(
        &self,
        session: &SessionUpsert,
        idempotency_key: &str,
    ) -> Result<SessionSaved, ApiError> {
        self.pause().await;
        self.upsert_log
            .lock()
            .await
            .push((session.clone(), idempotency_key.to_string()));
        let key = (
            session.department.clone(),
            session.semester,
            session.section.clone(),
            session.day,
            session.period_number,
        );
        let mut sessions = self.sessions.lock().await;
        let id = match sessions.get(&key) {
            Some((id, _)) => id.clone(),
            None => SessionId::from(self.next_id.fetch_add(1, Ordering::Relaxed) as i64),
        };
        sessions.insert(key, (id.clone(), session.clone()));
        Ok(SessionSaved {
            session_id: Some(id),
        })
    }

    async fn list_roster(&self, query: &RosterQuery) -> Result<Vec<RosterStudent>, ApiError> {
        self.pause().await;
        self.check_reads().await?;
        Ok(self
            .rosters
            .lock()
            .await
            .get(&Self::roster_key(query))
            .cloned()
            .unwrap_or_default())
    }

    async fn mark_attendance(&self, mark: &AttendanceWrite) -> Result<(), ApiError> {
        self.attendance_calls.fetch_add(1, Ordering::Relaxed);
        self.pause().await;
        if self.failing_students.lock().await.contains(&mark.student_id) {
            return Err(ApiError::Network {
                message: format!("connection reset while saving student {}", mark.student_id),
            });
        }
        self.marks.lock().await.insert(
            (mark.student_id, mark.timetable_session_id.clone(), mark.date),
            mark.status,
        );
        Ok(())
    }
}
