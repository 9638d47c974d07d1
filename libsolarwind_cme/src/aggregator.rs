use bitvec::slice::BitSlice;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

use super::criteria::{Aggregate, DetectionProfile, Quantity};
use super::derived::{quantity_value, DerivedParameters};
use super::sample::{Series, Timestamp};

/// The extremum of one criterion variable across an event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventPeak {
    pub quantity: Quantity,
    pub aggregate: Aggregate,
    pub value: Option<f64>,
}

impl EventPeak {
    /// Column label, e.g. max_proton_bulk_speed or min_t_ratio
    pub fn label(&self) -> String {
        format!("{}_{}", self.aggregate.prefix(), self.quantity)
    }
}

/// A contiguous run of flagged samples
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Number of samples in the run
    pub duration: usize,
    /// Index of the first sample of the run in the cleaned series
    pub start_index: usize,
    pub peaks: Vec<EventPeak>,
}

impl Event {
    pub fn peak(&self, quantity: Quantity) -> Option<f64> {
        self.peaks
            .iter()
            .find(|p| p.quantity == quantity)
            .and_then(|p| p.value)
    }

    /// Elapsed time between the first and last sample of the event
    pub fn span(&self) -> time::Duration {
        self.end_time - self.start_time
    }
}

/// Run-level statistics over all retained events
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventSummary {
    pub num_events: usize,
    pub flagged_samples: usize,
    pub avg_duration: f64,
    pub longest_duration: usize,
    /// Keyed by peak label, the extremum of that peak across every event
    pub global_peaks: BTreeMap<String, f64>,
}

/// EventAggregator turns the per-sample flag sequence into Events.
///
/// Every maximal run of set flags is a candidate; candidates shorter than the minimum
/// duration are discarded.
#[derive(Debug, Clone)]
pub struct EventAggregator {
    minimum_duration: usize,
    variables: Vec<(Quantity, Aggregate)>,
}

impl EventAggregator {
    pub fn new(minimum_duration: usize, profile: &DetectionProfile) -> Self {
        Self {
            minimum_duration: minimum_duration.max(1),
            variables: profile.variables(),
        }
    }

    /// Maximal runs of set flags, as index ranges, in order
    pub fn find_runs(flags: &BitSlice) -> Vec<Range<usize>> {
        let mut runs = Vec::new();
        let mut run_start: Option<usize> = None;
        for (idx, flagged) in flags.iter().by_vals().enumerate() {
            match (flagged, run_start) {
                (true, None) => run_start = Some(idx),
                (false, Some(start)) => {
                    runs.push(start..idx);
                    run_start = None;
                }
                _ => (),
            }
        }
        if let Some(start) = run_start {
            runs.push(start..flags.len());
        }
        runs
    }

    /// Build the confirmed events. `derived` and `flags` must be aligned with `series`.
    pub fn aggregate(
        &self,
        series: &Series,
        derived: &[DerivedParameters],
        flags: &BitSlice,
    ) -> Vec<Event> {
        let samples = series.samples();
        Self::find_runs(flags)
            .into_iter()
            .filter(|run| run.len() >= self.minimum_duration)
            .map(|run| {
                let peaks = self
                    .variables
                    .iter()
                    .map(|(quantity, aggregate)| EventPeak {
                        quantity: *quantity,
                        aggregate: *aggregate,
                        value: run.clone().fold(None, |acc, idx| {
                            aggregate.combine(
                                acc,
                                quantity_value(*quantity, &samples[idx], &derived[idx]),
                            )
                        }),
                    })
                    .collect();
                Event {
                    start_time: samples[run.start].time,
                    end_time: samples[run.end - 1].time,
                    duration: run.len(),
                    start_index: run.start,
                    peaks,
                }
            })
            .collect()
    }

    /// Count, average duration and global extrema of the retained events
    pub fn summarize(events: &[Event]) -> EventSummary {
        let mut summary = EventSummary {
            num_events: events.len(),
            ..Default::default()
        };
        if events.is_empty() {
            return summary;
        }
        summary.flagged_samples = events.iter().map(|e| e.duration).sum();
        summary.avg_duration = summary.flagged_samples as f64 / events.len() as f64;
        summary.longest_duration = events.iter().map(|e| e.duration).max().unwrap_or(0);
        for event in events.iter() {
            for peak in event.peaks.iter() {
                let label = peak.label();
                let current = summary.global_peaks.get(&label).copied();
                if let Some(value) = peak.aggregate.combine(current, peak.value) {
                    summary.global_peaks.insert(label, value);
                }
            }
        }
        summary
    }
}
