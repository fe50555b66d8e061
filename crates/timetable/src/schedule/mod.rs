//! Timetable authoring and viewing.
//!
//! A timetable is a [`TimetableGrid`] of six days by an editable list of
//! periods. Administrators edit it through [`AuthoringTimetable`], which
//! persists cells as timetable sessions; staff see it through
//! [`StaffTimetable`], which is filled from the server and never edited.

pub mod cache;
pub mod conflict;
mod error;
pub mod grid;
pub mod period;
pub mod semester;
pub mod sessions;
pub mod types;
pub mod view;

pub use conflict::Conflict;
pub use error::ScheduleError;
pub use grid::TimetableGrid;
pub use period::{Period, PeriodField, PeriodModel};
pub use sessions::{AutoSaver, CommitOutcome, SessionResolver};
pub use types::{CellValue, Day, SectionContext, SessionIdentity};
pub use view::{AuthoringTimetable, LoadReport, ScheduleFetch, StaffTimetable, TimetableView};
