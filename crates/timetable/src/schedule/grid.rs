//! The day x period assignment matrix.
//!
//! Every row is kept exactly as long as the period list. Changing the number
//! of periods pads rows with [`CellValue::Unassigned`] or truncates them from
//! the end; truncated assignments are gone for good.

use std::collections::BTreeMap;

use super::conflict;
use super::error::ScheduleError;
use super::period::{Period, PeriodField, PeriodModel};
use super::types::{CellValue, Day};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableGrid {
    periods: PeriodModel,
    rows: BTreeMap<Day, Vec<CellValue>>,
}

impl TimetableGrid {
    /// Creates a grid with every cell unassigned.
    pub fn new(periods: PeriodModel) -> Self {
        let mut grid = Self {
            periods,
            rows: BTreeMap::new(),
        };
        grid.fill(CellValue::Unassigned);
        grid
    }

    pub fn periods(&self) -> &PeriodModel {
        &self.periods
    }

    pub fn row(&self, day: Day) -> &[CellValue] {
        self.rows.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, day: Day, period_index: usize) -> Option<&CellValue> {
        self.rows.get(&day).and_then(|row| row.get(period_index))
    }

    /// Iterates over every `(day, period index, cell)`.
    pub fn cells(&self) -> impl Iterator<Item = (Day, usize, &CellValue)> {
        self.rows
            .iter()
            .flat_map(|(day, row)| row.iter().enumerate().map(move |(i, c)| (*day, i, c)))
    }

    /// Cells holding a concrete subject, paired with their period.
    pub fn filled_cells(&self) -> impl Iterator<Item = (Day, usize, &Period, &str)> {
        self.cells().filter_map(|(day, index, cell)| {
            let name = cell.subject_name()?;
            let period = self.periods.get(index)?;
            Some((day, index, period, name))
        })
    }

    /// Overwrites one cell, returning the previous value.
    pub fn set_cell(
        &mut self,
        day: Day,
        period_index: usize,
        value: CellValue,
    ) -> Result<CellValue, ScheduleError> {
        let len = self.periods.len();
        let row = self.rows.entry(day).or_default();
        let cell = row.get_mut(period_index).ok_or(ScheduleError::CellOutOfRange {
            day,
            index: period_index,
            len,
        })?;
        Ok(std::mem::replace(cell, value))
    }

    /// Sets every cell to `value`.
    pub fn fill(&mut self, value: CellValue) {
        let len = self.periods.len();
        for day in Day::ALL {
            self.rows.insert(day, vec![value.clone(); len]);
        }
    }

    pub fn add_period(&mut self) -> String {
        let id = self.periods.add();
        self.reshape();
        id
    }

    pub fn remove_period(&mut self, id: &str) -> Result<Period, ScheduleError> {
        let removed = self.periods.remove(id)?;
        self.reshape();
        Ok(removed)
    }

    pub fn update_period(
        &mut self,
        id: &str,
        field: PeriodField,
        value: &str,
    ) -> Result<(), ScheduleError> {
        self.periods.update(id, field, value)
    }

    /// Replaces the period list with the institutional default.
    pub fn reset_periods(&mut self) {
        self.periods = PeriodModel::institutional_default();
        self.reshape();
    }

    /// True when `subject` occurs more than once on `day`.
    pub fn has_conflict(&self, day: Day, subject: &str) -> bool {
        conflict::has_conflict(self.row(day), subject)
    }

    fn reshape(&mut self) {
        let len = self.periods.len();
        for day in Day::ALL {
            self.rows
                .entry(day)
                .or_default()
                .resize(len, CellValue::Unassigned);
        }
    }
}

impl Default for TimetableGrid {
    fn default() -> Self {
        Self::new(PeriodModel::default())
    }
}
