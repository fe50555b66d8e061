/// Wire types exchanged with the attendance backend
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::error::ApiError;
use crate::attendance::AttendanceStatus;
use crate::schedule::types::{clock, Day};

/// Standard response envelope: `{ success, message, data, error? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: String::new(),
            data: Some(data),
            error: None,
        }
    }

    /// Unwraps `data`, turning `success = false` into [`ApiError::Envelope`].
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            let message = self
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or(self.message);
            Err(ApiError::Envelope { message })
        }
    }
}

/// Opaque identifier of a persisted timetable session.
///
/// The backend hands out numeric ids; anything else is carried as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for SessionId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<i64>() {
            Ok(n) => s.serialize_i64(n),
            Err(_) => s.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }
        Ok(match RawId::deserialize(d)? {
            RawId::Number(n) => SessionId::from(n),
            RawId::Text(t) => SessionId(t),
        })
    }
}

/// Registered subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(default)]
    pub id: Option<i64>,
    pub subject_code: String,
    pub subject_name: String,
    pub department: String,
    pub semester: u8,
    #[serde(default = "default_credits")]
    pub credits: u8,
    #[serde(default)]
    pub is_elective: bool,
}

fn default_credits() -> u8 {
    3
}

/// Body for creating or updating a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDraft {
    pub subject_code: String,
    pub subject_name: String,
    pub department: String,
    pub semester: u8,
    pub credits: u8,
    pub is_elective: bool,
}

/// A session as returned by the schedule endpoint.
///
/// Times are kept as sent; the grid parses them when placing cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default, alias = "id")]
    pub session_id: Option<SessionId>,
    #[serde(alias = "dayOfWeek")]
    pub day: String,
    #[serde(default)]
    pub period_number: Option<u32>,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub semester: Option<u8>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub subject_code: Option<String>,
    #[serde(default)]
    pub subject_name: Option<String>,
    #[serde(default)]
    pub staff_code: Option<String>,
    #[serde(default)]
    pub room_number: Option<String>,
    #[serde(default)]
    pub class_context: Option<String>,
}

/// Body of `POST /admin/timetable/session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpsert {
    pub day: Day,
    pub period_number: u32,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(with = "clock")]
    pub end_time: NaiveTime,
    pub department: String,
    pub semester: u8,
    pub section: String,
    pub subject_code: Option<String>,
    pub staff_code: Option<String>,
    pub room_number: Option<String>,
}

/// Payload returned by a successful session upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSaved {
    #[serde(default, alias = "id")]
    pub session_id: Option<SessionId>,
}

/// One enrolled student as listed for quick attendance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterStudent {
    pub student_id: i64,
    pub student_name: String,
    #[serde(default)]
    pub roll_number: String,
}

/// How to look up a roster. A class id is preferred when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterQuery {
    Class(i64),
    Section {
        department: String,
        semester: u8,
        section: String,
    },
}

/// Body of `POST /attendance/session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceWrite {
    pub student_id: i64,
    pub timetable_session_id: SessionId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub subject_name: String,
    pub department: String,
    pub semester: u8,
    pub section: String,
}
