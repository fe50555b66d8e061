//! Timetable grid, conflict detection and quick attendance for an
//! institutional attendance backend.

pub mod api;
pub mod attendance;
pub mod config;
pub mod context;
pub mod schedule;

pub use api::{ApiError, Backend, BatchReport, RestClient};
pub use attendance::{AttendanceStatus, QuickAttendance};
pub use config::ClientConfig;
pub use context::{OperatorContext, Role};
pub use schedule::{AuthoringTimetable, ScheduleError, StaffTimetable, TimetableView};
