//! Quick attendance for a single timetable session.
//!
//! Opening a marker fetches the roster and marks everyone present. The
//! operator toggles individual students, then [`QuickAttendance::save`] writes
//! one mark per student, in roster order, one request at a time. A failed
//! write is counted and skipped; it is never retried and earlier writes are
//! not rolled back. Dropping or cancelling the marker discards unsaved
//! toggles.

mod types;

pub use types::*;

use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::{ApiError, AttendanceWrite, Backend, BatchReport, RosterQuery, RosterStudent};
use crate::context::OperatorContext;

pub struct QuickAttendance<B: Backend + ?Sized> {
    backend: Arc<B>,
    operator: OperatorContext,
    target: SessionTarget,
    roster: Vec<RosterStudent>,
    statuses: HashMap<i64, AttendanceStatus>,
    load_error: Option<ApiError>,
}

impl<B: Backend + ?Sized> QuickAttendance<B> {
    /// Fetches the roster for `target` and defaults every student to present.
    ///
    /// A failed fetch leaves an empty roster; the error is kept in
    /// [`QuickAttendance::load_error`].
    pub async fn open(backend: Arc<B>, operator: OperatorContext, target: SessionTarget) -> Self {
        let query = match target.class_id {
            Some(class_id) => RosterQuery::Class(class_id),
            None => RosterQuery::Section {
                department: target.department.clone(),
                semester: target.semester,
                section: target.section.clone(),
            },
        };

        let (roster, load_error) = match backend.list_roster(&query).await {
            Ok(roster) => (roster, None),
            Err(e) => {
                error!(
                    session = %target.session_id,
                    error = %e,
                    "Failed to fetch roster for quick attendance"
                );
                (Vec::new(), Some(e))
            }
        };

        let statuses = roster
            .iter()
            .map(|s| (s.student_id, AttendanceStatus::Present))
            .collect();

        info!(
            session = %target.session_id,
            subject = %target.subject_name,
            students = roster.len(),
            operator = %operator.user_id,
            "Opened quick attendance"
        );

        Self {
            backend,
            operator,
            target,
            roster,
            statuses,
            load_error,
        }
    }

    pub fn target(&self) -> &SessionTarget {
        &self.target
    }

    pub fn roster(&self) -> &[RosterStudent] {
        &self.roster
    }

    pub fn load_error(&self) -> Option<&ApiError> {
        self.load_error.as_ref()
    }

    pub fn status_of(&self, student_id: i64) -> Option<AttendanceStatus> {
        self.statuses.get(&student_id).copied()
    }

    pub fn set_status(
        &mut self,
        student_id: i64,
        status: AttendanceStatus,
    ) -> Result<(), AttendanceError> {
        match self.statuses.get_mut(&student_id) {
            Some(current) => {
                *current = status;
                Ok(())
            }
            None => Err(AttendanceError::UnknownStudent { id: student_id }),
        }
    }

    /// Sets the same status for the whole roster.
    pub fn mark_all(&mut self, status: AttendanceStatus) {
        for current in self.statuses.values_mut() {
            *current = status;
        }
    }

    pub fn tally(&self) -> AttendanceTally {
        self.statuses.values().fold(
            AttendanceTally {
                total: self.roster.len(),
                ..AttendanceTally::default()
            },
            |mut tally, status| {
                match status {
                    AttendanceStatus::Present => tally.present += 1,
                    AttendanceStatus::Absent => tally.absent += 1,
                    AttendanceStatus::OnDuty => tally.on_duty += 1,
                }
                tally
            },
        )
    }

    /// Writes today's marks for the whole roster.
    pub async fn save(&self) -> BatchReport<i64> {
        self.save_for_date(Local::now().date_naive()).await
    }

    /// Writes marks for `date`, one request per student, in roster order.
    pub async fn save_for_date(&self, date: NaiveDate) -> BatchReport<i64> {
        let mut report = BatchReport::new();

        for student in &self.roster {
            let status = self
                .statuses
                .get(&student.student_id)
                .copied()
                .unwrap_or_default();
            let mark = AttendanceWrite {
                student_id: student.student_id,
                timetable_session_id: self.target.session_id.clone(),
                date,
                status,
                subject_name: self.target.subject_name.clone(),
                department: self.target.department.clone(),
                semester: self.target.semester,
                section: self.target.section.clone(),
            };

            match self.backend.mark_attendance(&mark).await {
                Ok(()) => report.record_success(),
                Err(e) => {
                    warn!(
                        session = %self.target.session_id,
                        student_id = student.student_id,
                        error = %e,
                        "Failed to save attendance for student"
                    );
                    report.record_failure(student.student_id, e);
                }
            }
        }

        info!(
            session = %self.target.session_id,
            operator = %self.operator.user_id,
            date = %date,
            "Saved attendance for {}",
            report.summary()
        );
        report
    }

    /// Closes the marker without writing anything.
    pub fn cancel(self) {
        info!(session = %self.target.session_id, "Quick attendance discarded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeBackend;
    use crate::api::SessionId;
    use crate::context::Role;

    fn student(id: i64, name: &str) -> RosterStudent {
        RosterStudent {
            student_id: id,
            student_name: name.to_string(),
            roll_number: format!("CS{id:03}"),
        }
    }

    fn target() -> SessionTarget {
        SessionTarget {
            session_id: SessionId::from(77),
            subject_name: "Data Structures".into(),
            department: "Computer Science".into(),
            semester: 1,
            section: "A".into(),
            class_id: None,
            session_time: Some("09:00 AM - 09:45 AM".into()),
        }
    }

    fn operator() -> OperatorContext {
        OperatorContext::new("staff-1", "R. Iyer", Role::Staff, "Computer Science")
    }

    async fn backend_with_roster(n: i64) -> Arc<FakeBackend> {
        let backend = Arc::new(FakeBackend::default());
        backend
            .set_roster(
                &RosterQuery::Section {
                    department: "Computer Science".into(),
                    semester: 1,
                    section: "A".into(),
                },
                (1..=n).map(|i| student(i, &format!("Student {i}"))).collect(),
            )
            .await;
        backend
    }

    #[tokio::test]
    async fn test_everyone_starts_present() {
        let backend = backend_with_roster(4).await;
        let marker = QuickAttendance::open(backend, operator(), target()).await;
        assert_eq!(
            marker.tally(),
            AttendanceTally {
                present: 4,
                absent: 0,
                on_duty: 0,
                total: 4
            }
        );
    }

    #[tokio::test]
    async fn test_toggles_update_tally() {
        let backend = backend_with_roster(5).await;
        let mut marker = QuickAttendance::open(backend, operator(), target()).await;
        marker.set_status(2, AttendanceStatus::Absent).unwrap();
        marker.set_status(3, AttendanceStatus::OnDuty).unwrap();
        marker.set_status(3, AttendanceStatus::Absent).unwrap();
        let tally = marker.tally();
        assert_eq!((tally.present, tally.absent, tally.on_duty), (3, 2, 0));
        assert_eq!(
            marker.set_status(99, AttendanceStatus::Absent),
            Err(AttendanceError::UnknownStudent { id: 99 })
        );
        marker.mark_all(AttendanceStatus::OnDuty);
        assert_eq!(marker.tally().on_duty, 5);
    }

    #[tokio::test]
    async fn test_failed_student_does_not_stop_batch() {
        let backend = backend_with_roster(5).await;
        backend.fail_student(3).await;
        let mut marker = QuickAttendance::open(backend.clone(), operator(), target()).await;
        marker.set_status(5, AttendanceStatus::Absent).unwrap();

        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let report = marker.save_for_date(date).await;

        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.summary(), "4 of 5 succeeded");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, 3);

        let marks = backend.marks.lock().await;
        assert_eq!(marks.len(), 4);
        assert_eq!(
            marks.get(&(5, SessionId::from(77), date)),
            Some(&AttendanceStatus::Absent)
        );
        assert!(!marks.contains_key(&(3, SessionId::from(77), date)));
    }

    #[tokio::test]
    async fn test_roster_failure_yields_empty_marker() {
        let backend = backend_with_roster(3).await;
        backend.set_reads_fail(true).await;
        let marker = QuickAttendance::open(backend.clone(), operator(), target()).await;
        assert!(marker.roster().is_empty());
        assert!(marker.load_error().is_some());
        let report = marker.save().await;
        assert_eq!(report.attempted, 0);
        assert_eq!(
            backend
                .attendance_calls
                .load(std::sync::atomic::Ordering::Relaxed),
            0
        );
    }

    #[tokio::test]
    async fn test_class_id_is_preferred() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .set_roster(&RosterQuery::Class(12), vec![student(1, "Asha")])
            .await;
        let marker = QuickAttendance::open(
            backend,
            operator(),
            SessionTarget {
                class_id: Some(12),
                ..target()
            },
        )
        .await;
        assert_eq!(marker.roster().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_writes_nothing() {
        let backend = backend_with_roster(2).await;
        let mut marker = QuickAttendance::open(backend.clone(), operator(), target()).await;
        marker.set_status(1, AttendanceStatus::Absent).unwrap();
        marker.cancel();
        assert!(backend.marks.lock().await.is_empty());
    }
}
