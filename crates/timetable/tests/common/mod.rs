#![allow(dead_code)]

use campus_timetable::api::fake::FakeBackend;
use campus_timetable::api::{SessionId, SessionRecord};
use campus_timetable::{ClientConfig, OperatorContext, Role};
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn admin() -> OperatorContext {
    OperatorContext::new("admin-1", "Dean's Office", Role::Admin, "Computer Science")
}

pub fn staff() -> OperatorContext {
    OperatorContext::new("staff-7", "R. Iyer", Role::Staff, "Computer Science")
}

pub fn config(debounce_ms: u64) -> ClientConfig {
    ClientConfig {
        autosave_debounce_ms: debounce_ms,
        ..ClientConfig::default()
    }
}

pub async fn seeded_backend() -> Arc<FakeBackend> {
    let backend = Arc::new(FakeBackend::default());
    backend
        .add_subject("CS101", "Data Structures", "Computer Science", 1)
        .await;
    backend
        .add_subject("CS102", "Digital Logic", "Computer Science", 1)
        .await;
    backend
        .add_subject("CS201", "Operating Systems", "Computer Science", 3)
        .await;
    backend
}

pub fn session(id: i64, day: &str, start: &str, subject: &str) -> SessionRecord {
    SessionRecord {
        session_id: Some(SessionId::from(id)),
        day: day.to_string(),
        period_number: None,
        start_time: start.to_string(),
        end_time: None,
        department: Some("Computer Science".into()),
        semester: Some(1),
        section: Some("A".into()),
        subject_code: None,
        subject_name: Some(subject.to_string()),
        staff_code: None,
        room_number: None,
        class_context: None,
    }
}
