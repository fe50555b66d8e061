//! Error types for the timetable subsystem.

use crate::api::ApiError;
use thiserror::Error;

use super::types::Day;

/// Errors raised by the period model, the grid and the session resolver.
#[derive(Debug, Error, Clone)]
pub enum ScheduleError {
    /// A save was requested before a semester was chosen
    #[error("Please select a semester before committing changes")]
    NoSemesterSelected,

    /// Department or section is blank
    #[error("Selection is incomplete: {missing} is required")]
    IncompleteContext { missing: &'static str },

    /// No period with this id exists
    #[error("Unknown period: {id}")]
    UnknownPeriod { id: String },

    /// Removing the only remaining period
    #[error("The timetable must keep at least one period")]
    LastPeriod,

    /// A time value was not `HH:MM`
    #[error("Invalid time value: {value:?}")]
    InvalidTime { value: String },

    /// A day name outside Monday..Saturday
    #[error("Invalid day: {value:?}")]
    InvalidDay { value: String },

    /// Cell index past the end of the day's row
    #[error("Period index {index} out of range for {day} ({len} periods)")]
    CellOutOfRange { day: Day, index: usize, len: usize },

    /// Semester outside 1..=6
    #[error("Invalid semester: {value}")]
    InvalidSemester { value: String },

    /// Subject form failed validation
    #[error("Invalid subject: {message}")]
    InvalidSubject { message: String },

    /// Backend call failed
    #[error(transparent)]
    Api(#[from] ApiError),
}
