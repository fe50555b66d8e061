//! Year <-> semester mapping.
//!
//! Two semesters per academic year: year 1 is semesters 1 and 2, year 2 is
//! 3 and 4, year 3 is 5 and 6. Every conversion between the two numbering
//! schemes goes through this module.

use super::error::ScheduleError;

/// Highest semester number in the programme.
pub const MAX_SEMESTER: u8 = 6;

/// Semesters belonging to `year`, or an empty slice for anything but 1..=3.
pub fn year_to_semesters(year: u8) -> &'static [u8] {
    match year {
        1 => &[1, 2],
        2 => &[3, 4],
        3 => &[5, 6],
        _ => &[],
    }
}

/// Year a semester belongs to; 0 when the semester is past the last year.
pub fn semester_to_year(semester: u8) -> u8 {
    if semester <= 2 {
        1
    } else if semester <= 4 {
        2
    } else if semester <= MAX_SEMESTER {
        3
    } else {
        0
    }
}

pub fn all_years() -> [u8; 3] {
    [1, 2, 3]
}

/// `"YEAR 1"` .. `"YEAR 3"`, otherwise `"Unknown"`.
pub fn year_label(year: u8) -> String {
    match year {
        1..=3 => format!("YEAR {year}"),
        _ => "Unknown".to_string(),
    }
}

pub fn semester_label(semester: u8) -> String {
    format!("Semester {semester}")
}

/// Long form, e.g. `"Second Semester of Year 2"` for semester 4.
pub fn semester_description(semester: u8) -> String {
    let term = if semester % 2 == 1 { "First" } else { "Second" };
    format!("{term} Semester of Year {}", semester_to_year(semester))
}

/// Parses a selector label such as `"Semester 3"` (a bare `"3"` is accepted too).
pub fn parse_semester_label(label: &str) -> Result<u8, ScheduleError> {
    let trimmed = label.trim();
    let number = trimmed
        .strip_prefix("Semester")
        .unwrap_or(trimmed)
        .trim();
    match number.parse::<u8>() {
        Ok(n) if (1..=MAX_SEMESTER).contains(&n) => Ok(n),
        _ => Err(ScheduleError::InvalidSemester {
            value: label.to_string(),
        }),
    }
}
