//! Ordered list of period intervals that make up the columns of a day.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::ScheduleError;
use super::types::{clock, parse_clock};

/// Start time of the first period when the list is empty.
const FIRST_PERIOD_START: (u32, u32) = (9, 0);

/// Placeholder end time for a freshly added period.
const NEW_PERIOD_END: (u32, u32) = (16, 0);

/// One time slot. Display order is list order, not start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub id: String,
    #[serde(with = "clock")]
    pub start: NaiveTime,
    #[serde(with = "clock")]
    pub end: NaiveTime,
}

impl Period {
    pub fn new(id: impl Into<String>, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            id: id.into(),
            start,
            end,
        }
    }

    /// True when the interval is non-empty.
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    /// Canonical 24-hour start, `HH:MM`.
    pub fn start_hhmm(&self) -> String {
        self.start.format("%H:%M").to_string()
    }

    pub fn end_hhmm(&self) -> String {
        self.end.format("%H:%M").to_string()
    }

    /// `"09:00 AM - 09:45 AM"`
    pub fn display_range(&self) -> String {
        format!("{} - {}", format_12h(self.start), format_12h(self.end))
    }
}

/// Renders a time on the 12-hour clock with a zero-padded hour.
pub fn format_12h(time: NaiveTime) -> String {
    time.format("%I:%M %p").to_string()
}

/// Which end of a period an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodField {
    Start,
    End,
}

/// The ordered, never-empty list of periods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodModel {
    periods: Vec<Period>,
    next_seq: u64,
}

impl PeriodModel {
    /// Builds a model from an explicit list, falling back to the institutional
    /// default when `periods` is empty.
    pub fn new(periods: Vec<Period>) -> Self {
        if periods.is_empty() {
            return Self::institutional_default();
        }
        let next_seq = periods.len() as u64 + 1;
        Self { periods, next_seq }
    }

    /// The standard six-period day.
    pub fn institutional_default() -> Self {
        Self {
            periods: default_periods(),
            next_seq: 7,
        }
    }

    pub fn list(&self) -> &[Period] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Period> {
        self.periods.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.periods.iter().position(|p| p.id == id)
    }

    /// Column label, `"Period 1"` for index 0.
    pub fn label(index: usize) -> String {
        format!("Period {}", index + 1)
    }

    /// Index of the period starting at `start`, compared to the minute.
    pub fn index_of_start(&self, start: NaiveTime) -> Option<usize> {
        let wanted = start.format("%H:%M").to_string();
        self.periods.iter().position(|p| p.start_hhmm() == wanted)
    }

    /// Appends a period starting where the last one ends. Returns its id.
    pub fn add(&mut self) -> String {
        let start = self
            .periods
            .last()
            .map(|p| p.end)
            .unwrap_or_else(|| hm(FIRST_PERIOD_START));
        let id = self.fresh_id();
        debug!(period = %id, start = %start, "Adding period");
        self.periods
            .push(Period::new(id.clone(), start, hm(NEW_PERIOD_END)));
        id
    }

    /// Removes a period. Refuses to remove the last one left.
    pub fn remove(&mut self, id: &str) -> Result<Period, ScheduleError> {
        if self.periods.len() <= 1 {
            return Err(ScheduleError::LastPeriod);
        }
        let index = self
            .position(id)
            .ok_or_else(|| ScheduleError::UnknownPeriod { id: id.to_string() })?;
        Ok(self.periods.remove(index))
    }

    /// Sets one end of a period from an `HH:MM` string.
    ///
    /// An interval that ends up with `start >= end` is accepted and logged.
    pub fn update(&mut self, id: &str, field: PeriodField, value: &str) -> Result<(), ScheduleError> {
        let time = parse_clock(value)?;
        let period = self
            .periods
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ScheduleError::UnknownPeriod { id: id.to_string() })?;
        match field {
            PeriodField::Start => period.start = time,
            PeriodField::End => period.end = time,
        }
        if !period.is_well_formed() {
            warn!(
                period = %period.id,
                start = %period.start_hhmm(),
                end = %period.end_hhmm(),
                "Period does not end after it starts"
            );
        }
        Ok(())
    }

    /// Periods whose start is not before their end.
    pub fn malformed(&self) -> Vec<&Period> {
        self.periods.iter().filter(|p| !p.is_well_formed()).collect()
    }

    fn fresh_id(&mut self) -> String {
        loop {
            let candidate = format!("p{}", self.next_seq);
            self.next_seq += 1;
            if self.position(&candidate).is_none() {
                return candidate;
            }
        }
    }
}

impl Default for PeriodModel {
    fn default() -> Self {
        Self::institutional_default()
    }
}

fn hm((h, m): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

/// 09:00-09:45, 09:45-10:30, 10:45-11:30, 11:30-12:00, 13:00-13:50, 14:00-15:00
pub fn default_periods() -> Vec<Period> {
    [
        ((9, 0), (9, 45)),
        ((9, 45), (10, 30)),
        ((10, 45), (11, 30)),
        ((11, 30), (12, 0)),
        ((13, 0), (13, 50)),
        ((14, 0), (15, 0)),
    ]
    .iter()
    .enumerate()
    .map(|(i, &(start, end))| Period::new(format!("p{}", i + 1), hm(start), hm(end)))
    .collect()
}
