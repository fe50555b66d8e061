/// Types shared by the timetable grid, period model and session resolver
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ScheduleError;

/// Label shown for a cell nobody has touched yet.
pub const UNASSIGNED_LABEL: &str = "Select Subject";

/// Label shown for a deliberately empty slot.
pub const FREE_PERIOD_LABEL: &str = "Free Period";

/// A teaching day. Sunday is not part of the editable week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Day {
    /// All six days in grid order.
    pub const ALL: [Day; 6] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
        }
    }

    /// Position of the day in [`Day::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Day {
    type Err = ScheduleError;

    /// Accepts full English names in any case (`"monday"`, `"MONDAY"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Day::ALL
            .iter()
            .copied()
            .find(|d| d.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ScheduleError::InvalidDay {
                value: s.to_string(),
            })
    }
}

/// The content of one grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellValue {
    /// Nothing chosen yet
    Unassigned,
    /// Deliberately left free
    Free,
    /// A concrete subject, optionally with a class context line (read-only views)
    Subject {
        name: String,
        context: Option<String>,
    },
}

impl CellValue {
    /// Creates a subject cell without a context line.
    pub fn subject(name: impl Into<String>) -> Self {
        CellValue::Subject {
            name: name.into(),
            context: None,
        }
    }

    /// Interprets a selector value the way the authoring grid offers them.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "" | UNASSIGNED_LABEL => CellValue::Unassigned,
            FREE_PERIOD_LABEL => CellValue::Free,
            other => CellValue::subject(other),
        }
    }

    /// Subject name, or `None` for either sentinel.
    pub fn subject_name(&self) -> Option<&str> {
        match self {
            CellValue::Subject { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, CellValue::Subject { .. })
    }

    /// Text as rendered in a card: subject name, then the context on a second line.
    pub fn display(&self) -> String {
        match self {
            CellValue::Unassigned => UNASSIGNED_LABEL.to_string(),
            CellValue::Free => FREE_PERIOD_LABEL.to_string(),
            CellValue::Subject {
                name,
                context: Some(ctx),
            } => format!("{name}\n{ctx}"),
            CellValue::Subject { name, context: None } => name.clone(),
        }
    }
}

/// The department/semester/section an authoring or viewing session is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionContext {
    pub department: String,
    pub semester: Option<u8>,
    pub section: String,
}

impl SectionContext {
    pub fn new(department: impl Into<String>, semester: Option<u8>, section: impl Into<String>) -> Self {
        Self {
            department: department.into(),
            semester,
            section: section.into(),
        }
    }

    /// Returns the selected semester if every part of the context is filled in.
    pub fn require_complete(&self) -> Result<u8, ScheduleError> {
        let semester = self.semester.ok_or(ScheduleError::NoSemesterSelected)?;
        if self.department.trim().is_empty() {
            return Err(ScheduleError::IncompleteContext {
                missing: "department",
            });
        }
        if self.section.trim().is_empty() {
            return Err(ScheduleError::IncompleteContext { missing: "section" });
        }
        Ok(semester)
    }

    pub fn is_complete(&self) -> bool {
        self.require_complete().is_ok()
    }
}

/// Natural identity of a persisted session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionIdentity {
    pub department: String,
    pub semester: u8,
    pub section: String,
    pub day: Day,
    pub period_number: u32,
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/S{}/{}/{}/P{}",
            self.department, self.semester, self.section, self.day, self.period_number
        )
    }
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_clock(value: &str) -> Result<NaiveTime, ScheduleError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ScheduleError::InvalidTime {
            value: value.to_string(),
        })
}

/// Serde adapter for times on the wire: written as `HH:MM:SS`, read from either
/// `HH:MM` or `HH:MM:SS`.
pub mod clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_clock(&raw).map_err(serde::de::Error::custom)
    }
}
