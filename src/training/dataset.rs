//! Traffic CSV loading and sequence building
//!
//! Expected columns (others are ignored):
//! `Time` (`12:15:00 AM`), `Day of the week` (`Tuesday`), `Total`,
//! `Traffic Situation`.

use std::io::Read;
use std::path::Path;

use chrono::{NaiveTime, Timelike};
use serde::Deserialize;

use crate::features::TimeContext;

use super::TrainingError;

const TIME_FORMAT: &str = "%I:%M:%S %p";

const DAY_NAMES: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

#[derive(Debug, Deserialize)]
struct TrafficRecord {
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Day of the week")]
    day: String,
    #[serde(rename = "Total")]
    total: f32,
    #[serde(rename = "Traffic Situation")]
    situation: String,
}

/// One row of the traffic dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub time: TimeContext,
    pub total: f32,
    pub situation: String,
}

/// Window of counts labelled with the situation of the point right after it
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub counts: Vec<f32>,
    pub time: TimeContext,
    pub label: String,
}

pub fn load_csv(path: &Path) -> Result<Vec<Observation>, TrainingError> {
    let file = std::fs::File::open(path).map_err(|source| TrainingError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_observations(file)
}

pub fn read_observations<R: Read>(reader: R) -> Result<Vec<Observation>, TrainingError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut observations = Vec::new();

    for (line, record) in reader.deserialize::<TrafficRecord>().enumerate() {
        let record = record?;
        let hour = parse_hour(&record.time).ok_or_else(|| TrainingError::Record {
            line: line + 2,
            reason: format!("bad time '{}'", record.time),
        })?;
        let day = parse_day(&record.day).ok_or_else(|| TrainingError::Record {
            line: line + 2,
            reason: format!("bad day '{}'", record.day),
        })?;

        observations.push(Observation {
            time: TimeContext::new(hour, day)?,
            total: record.total,
            situation: record.situation,
        });
    }

    tracing::info!("Loaded {} records", observations.len());
    Ok(observations)
}

/// Hour of a `%I:%M:%S %p` timestamp
pub fn parse_hour(value: &str) -> Option<u32> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
        .ok()
        .map(|t| t.hour())
}

/// Monday = 0 ... Sunday = 6
pub fn parse_day(value: &str) -> Option<u32> {
    let value = value.trim();
    DAY_NAMES
        .iter()
        .position(|d| d.eq_ignore_ascii_case(value))
        .map(|i| i as u32)
}

/// Slide a window of `sequence_length` totals over the observations
pub fn build_samples(observations: &[Observation], sequence_length: usize) -> Vec<Sample> {
    if sequence_length == 0 || observations.len() <= sequence_length {
        return Vec::new();
    }

    (0..observations.len() - sequence_length)
        .map(|i| {
            let next = &observations[i + sequence_length];
            Sample {
                counts: observations[i..i + sequence_length].iter().map(|o| o.total).collect(),
                time: next.time,
                label: next.situation.clone(),
            }
        })
        .collect()
}
