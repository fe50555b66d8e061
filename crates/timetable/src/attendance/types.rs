/// Types for quick attendance marking
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::api::SessionId;

/// Per-student outcome for one session on one date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[default]
    #[serde(rename = "PRESENT")]
    Present,
    #[serde(rename = "ABSENT")]
    Absent,
    /// On duty: away on institution business, counted separately from absent
    #[serde(rename = "OD")]
    OnDuty,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::OnDuty => "OD",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live counts derived from the current selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceTally {
    pub present: usize,
    pub absent: usize,
    pub on_duty: usize,
    pub total: usize,
}

/// The session attendance is being taken for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    pub session_id: SessionId,
    pub subject_name: String,
    pub department: String,
    pub semester: u8,
    pub section: String,
    /// Preferred roster lookup when known
    pub class_id: Option<i64>,
    /// Display only, e.g. `"09:00 AM - 09:45 AM"`
    pub session_time: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttendanceError {
    /// The student is not on this session's roster
    #[error("Student {id} is not on the roster for this session")]
    UnknownStudent { id: i64 },
}
