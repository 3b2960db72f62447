//! The recorder boundary. The engine produces daily compartment counts and
//! per-agent transition events; file formats are the recorder's concern.
//! `CsvRecorder` writes the time-series and event files, `MemoryRecorder`
//! keeps everything in memory for library callers and tests.

use std::fmt::{self, Display, Formatter};
use std::fs;
use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::AgentId;
use crate::agent::{AgeGroup, Compartment};
use crate::error::EpinetError;

/// Number of agents in each compartment.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CompartmentCounts {
    pub susceptible: usize,
    pub exposed: usize,
    pub infected: usize,
    pub recovered: usize,
}

impl CompartmentCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.susceptible + self.exposed + self.infected + self.recovered
    }
}

impl Display for CompartmentCounts {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={} {}={} {}={} {}={}",
            Compartment::Susceptible.code(),
            self.susceptible,
            Compartment::Exposed.code(),
            self.exposed,
            Compartment::Infected.code(),
            self.infected,
            Compartment::Recovered.code(),
            self.recovered
        )
    }
}

/// Snapshot handed to the recorder at the end of each simulated day.
#[derive(Clone, Debug)]
pub struct DailySnapshot {
    pub day: u32,
    pub counts: CompartmentCounts,
    pub by_age: Vec<(AgeGroup, CompartmentCounts)>,
}

/// One applied compartment transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TransitionEvent {
    pub day: u32,
    pub agent: AgentId,
    pub age_group: AgeGroup,
    pub from: Compartment,
    pub to: Compartment,
}

pub trait Recorder {
    fn record_day(&mut self, snapshot: &DailySnapshot) -> Result<(), EpinetError>;
    fn record_event(&mut self, event: &TransitionEvent) -> Result<(), EpinetError>;
}

/// Accumulates snapshots and events in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    pub days: Vec<DailySnapshot>,
    pub events: Vec<TransitionEvent>,
}

impl MemoryRecorder {
    #[must_use]
    pub fn new() -> Self {
        MemoryRecorder::default()
    }
}

impl Recorder for MemoryRecorder {
    fn record_day(&mut self, snapshot: &DailySnapshot) -> Result<(), EpinetError> {
        self.days.push(snapshot.clone());
        Ok(())
    }

    fn record_event(&mut self, event: &TransitionEvent) -> Result<(), EpinetError> {
        self.events.push(*event);
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TimeseriesRow {
    day: u32,
    age_group: AgeGroup,
    susceptible: usize,
    exposed: usize,
    infected: usize,
    recovered: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct EventRow {
    day: u32,
    agent: AgentId,
    age_group: AgeGroup,
    from: Compartment,
    to: Compartment,
}

/// Writes `timeseries.csv` (daily counts per age group) and `events.csv`
/// (one row per compartment transition) into the output directory.
pub struct CsvRecorder {
    timeseries: csv::Writer<File>,
    events: csv::Writer<File>,
}

impl CsvRecorder {
    pub fn create<P: AsRef<Path>>(directory: P) -> Result<Self, EpinetError> {
        let directory = directory.as_ref();
        fs::create_dir_all(directory)?;
        let timeseries = csv::Writer::from_path(directory.join("timeseries.csv"))?;
        let events = csv::Writer::from_path(directory.join("events.csv"))?;
        Ok(CsvRecorder { timeseries, events })
    }

    /// Flushes both writers. Call once after the run completes.
    pub fn flush(&mut self) -> Result<(), EpinetError> {
        self.timeseries.flush()?;
        self.events.flush()?;
        Ok(())
    }
}

impl Recorder for CsvRecorder {
    fn record_day(&mut self, snapshot: &DailySnapshot) -> Result<(), EpinetError> {
        for (age_group, counts) in &snapshot.by_age {
            self.timeseries.serialize(TimeseriesRow {
                day: snapshot.day,
                age_group: *age_group,
                susceptible: counts.susceptible,
                exposed: counts.exposed,
                infected: counts.infected,
                recovered: counts.recovered,
            })?;
        }
        Ok(())
    }

    fn record_event(&mut self, event: &TransitionEvent) -> Result<(), EpinetError> {
        self.events.serialize(EventRow {
            day: event.day,
            agent: event.agent,
            age_group: event.age_group,
            from: event.from,
            to: event.to,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> DailySnapshot {
        DailySnapshot {
            day: 1,
            counts: CompartmentCounts {
                susceptible: 8,
                exposed: 1,
                infected: 1,
                recovered: 0,
            },
            by_age: vec![
                (
                    AgeGroup::Child,
                    CompartmentCounts {
                        susceptible: 3,
                        exposed: 1,
                        infected: 0,
                        recovered: 0,
                    },
                ),
                (
                    AgeGroup::Adult,
                    CompartmentCounts {
                        susceptible: 5,
                        exposed: 0,
                        infected: 1,
                        recovered: 0,
                    },
                ),
            ],
        }
    }

    #[test]
    fn counts_total() {
        assert_eq!(snapshot().counts.total(), 10);
    }

    #[test]
    fn memory_recorder_accumulates() {
        let mut recorder = MemoryRecorder::new();
        recorder.record_day(&snapshot()).unwrap();
        recorder
            .record_event(&TransitionEvent {
                day: 1,
                agent: AgentId(4),
                age_group: AgeGroup::Child,
                from: Compartment::Susceptible,
                to: Compartment::Exposed,
            })
            .unwrap();

        assert_eq!(recorder.days.len(), 1);
        assert_eq!(recorder.events.len(), 1);
        assert_eq!(recorder.events[0].agent, AgentId(4));
    }

    #[test]
    fn csv_recorder_writes_both_files() {
        let directory = tempfile::tempdir().unwrap();
        let mut recorder = CsvRecorder::create(directory.path()).unwrap();
        recorder.record_day(&snapshot()).unwrap();
        recorder
            .record_event(&TransitionEvent {
                day: 1,
                agent: AgentId(4),
                age_group: AgeGroup::Child,
                from: Compartment::Susceptible,
                to: Compartment::Exposed,
            })
            .unwrap();
        recorder.flush().unwrap();

        let timeseries = std::fs::read_to_string(directory.path().join("timeseries.csv")).unwrap();
        assert!(timeseries.starts_with("Day,AgeGroup,Susceptible,Exposed,Infected,Recovered"));
        assert!(timeseries.contains("1,child,3,1,0,0"));
        assert!(timeseries.contains("1,adult,5,0,1,0"));

        let events = std::fs::read_to_string(directory.path().join("events.csv")).unwrap();
        assert!(events.starts_with("Day,Agent,AgeGroup,From,To"));
        assert!(events.contains("1,4,child,SUSCEPTIBLE,EXPOSED"));
    }
}
