//! Same-day duplicate subject detection.
//!
//! Conflicts are advisory. Nothing here blocks a save; callers decide how to
//! surface them. Both sentinels are exempt however often they repeat.

use std::collections::BTreeMap;

use super::grid::TimetableGrid;
use super::types::{CellValue, Day, FREE_PERIOD_LABEL, UNASSIGNED_LABEL};

/// A subject placed in more than one period of the same day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub day: Day,
    pub subject: String,
    pub period_indices: Vec<usize>,
}

/// True when `subject` appears in more than one cell of `row`.
pub fn has_conflict(row: &[CellValue], subject: &str) -> bool {
    if subject == UNASSIGNED_LABEL || subject == FREE_PERIOD_LABEL {
        return false;
    }
    row.iter()
        .filter(|cell| cell.subject_name() == Some(subject))
        .count()
        > 1
}

/// Every conflicting subject in one row, in first-occurrence order.
pub fn day_conflicts(day: Day, row: &[CellValue]) -> Vec<Conflict> {
    let mut seen: Vec<(&str, Vec<usize>)> = Vec::new();
    for (index, cell) in row.iter().enumerate() {
        let Some(name) = cell.subject_name() else {
            continue;
        };
        match seen.iter_mut().find(|(n, _)| *n == name) {
            Some((_, indices)) => indices.push(index),
            None => seen.push((name, vec![index])),
        }
    }
    seen.into_iter()
        .filter(|(_, indices)| indices.len() > 1)
        .map(|(name, period_indices)| Conflict {
            day,
            subject: name.to_string(),
            period_indices,
        })
        .collect()
}

/// Conflicts across the whole grid, Monday first.
pub fn grid_conflicts(grid: &TimetableGrid) -> Vec<Conflict> {
    Day::ALL
        .iter()
        .flat_map(|&day| day_conflicts(day, grid.row(day)))
        .collect()
}

/// Number of conflicts per day, omitting clean days.
pub fn conflict_counts(grid: &TimetableGrid) -> BTreeMap<Day, usize> {
    grid_conflicts(grid)
        .into_iter()
        .fold(BTreeMap::new(), |mut acc, c| {
            *acc.entry(c.day).or_insert(0) += 1;
            acc
        })
}
