//! Trailing-window statistics over a single field of a Series.
//!
//! The window at sample `i` only ever covers samples *before* `i`, so a sample is
//! compared against a baseline it did not contribute to. State is carried across the
//! single pass as a bounded deque plus a running sum and sum of squares. Additions are
//! applied incrementally; whenever a value leaves the window the sums are rebuilt from the
//! deque, so they always equal a fresh sum over the values currently held.
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::constants::{
    DEFAULT_DURATION_MIN_PERIODS, DEFAULT_ROLLING_K, DEFAULT_ROLLING_SECONDS,
};
use super::field::Field;
use super::sample::{Series, Timestamp};

/// Extent of a trailing window: a fixed number of samples or a fixed span of time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RollingWindow {
    Samples { count: usize },
    Duration { seconds: f64 },
}

impl RollingWindow {
    /// Number of present values required before a statistic is reported
    pub fn default_min_periods(&self) -> usize {
        match self {
            RollingWindow::Samples { count } => *count,
            RollingWindow::Duration { .. } => DEFAULT_DURATION_MIN_PERIODS,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            RollingWindow::Samples { count } => *count > 0,
            RollingWindow::Duration { seconds } => seconds.is_finite() && *seconds > 0.0,
        }
    }
}

/// Settings for the baseline reported alongside every sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingConfig {
    pub field: Field,
    pub window: RollingWindow,
    pub k: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_periods: Option<usize>,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            field: Field::ProtonDensity,
            window: RollingWindow::Duration {
                seconds: DEFAULT_ROLLING_SECONDS,
            },
            k: DEFAULT_ROLLING_K,
            min_periods: None,
        }
    }
}

/// Mean and sample standard deviation of the window preceding one sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RollingStat {
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

impl RollingStat {
    /// mean + k * std, when both are known
    pub fn threshold(&self, k: f64) -> Option<f64> {
        Some(self.mean? + k * self.std?)
    }
}

/// Running accumulator over a bounded trailing window
#[derive(Debug, Clone)]
pub struct RollingAccumulator {
    window: RollingWindow,
    min_periods: usize,
    entries: VecDeque<(Timestamp, Option<f64>)>,
    sum: f64,
    sum_sq: f64,
    n_present: usize,
}

impl RollingAccumulator {
    pub fn new(window: RollingWindow, min_periods: Option<usize>) -> Self {
        let capacity = match window {
            RollingWindow::Samples { count } => count,
            RollingWindow::Duration { .. } => 0,
        };
        Self {
            window,
            min_periods: min_periods.unwrap_or(window.default_min_periods()).max(1),
            entries: VecDeque::with_capacity(capacity),
            sum: 0.0,
            sum_sq: 0.0,
            n_present: 0,
        }
    }

    /// Drop every entry that falls outside the window ending (exclusively) at `now`
    pub fn evict(&mut self, now: Timestamp) {
        let mut removed = false;
        match self.window {
            RollingWindow::Samples { count } => removed = self.trim_to(count),
            RollingWindow::Duration { seconds } => {
                while let Some((time, _)) = self.entries.front() {
                    if (now - *time).as_seconds_f64() >= seconds {
                        removed |= self.pop_front();
                    } else {
                        break;
                    }
                }
            }
        }
        if removed {
            self.resync();
        }
    }

    pub fn push(&mut self, time: Timestamp, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.sum_sq += v * v;
            self.n_present += 1;
        }
        self.entries.push_back((time, value));
        if let RollingWindow::Samples { count } = self.window {
            if self.trim_to(count) {
                self.resync();
            }
        }
    }

    fn trim_to(&mut self, count: usize) -> bool {
        let mut removed = false;
        while self.entries.len() > count {
            removed |= self.pop_front();
        }
        removed
    }

    /// Returns true if a present value left the window
    fn pop_front(&mut self) -> bool {
        match self.entries.pop_front() {
            Some((_, Some(_))) => {
                self.n_present -= 1;
                true
            }
            _ => false,
        }
    }

    fn resync(&mut self) {
        let (sum, sum_sq) = self
            .entries
            .iter()
            .filter_map(|(_, value)| *value)
            .fold((0.0, 0.0), |(sum, sum_sq), v| (sum + v, sum_sq + v * v));
        self.sum = sum;
        self.sum_sq = sum_sq;
    }

    /// Statistics of the values currently held
    pub fn stat(&self) -> RollingStat {
        if self.n_present == 0 || self.n_present < self.min_periods {
            return RollingStat::default();
        }
        let n = self.n_present as f64;
        let mean = self.sum / n;
        let std = if self.n_present >= 2 {
            let variance = ((self.sum_sq - self.sum * self.sum / n) / (n - 1.0)).max(0.0);
            Some(variance.sqrt())
        } else {
            None
        };
        RollingStat {
            mean: Some(mean),
            std,
        }
    }
}

/// Computes trailing baselines for named fields of a Series
#[derive(Debug, Clone)]
pub struct RollingStatisticsEngine {
    window: RollingWindow,
    min_periods: Option<usize>,
}

impl RollingStatisticsEngine {
    pub fn new(window: RollingWindow, min_periods: Option<usize>) -> Self {
        Self {
            window,
            min_periods,
        }
    }

    pub fn from_config(config: &RollingConfig) -> Self {
        Self::new(config.window, config.min_periods)
    }

    /// One RollingStat per sample, aligned with the series
    pub fn compute(&self, series: &Series, field: Field) -> Vec<RollingStat> {
        let mut acc = RollingAccumulator::new(self.window, self.min_periods);
        let mut stats = Vec::with_capacity(series.len());
        for sample in series.samples() {
            acc.evict(sample.time);
            stats.push(acc.stat());
            acc.push(sample.time, sample.get(field));
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;
    use time::macros::datetime;
    use time::Duration;

    fn density_series(values: &[Option<f64>], step_seconds: i64) -> Series {
        let start = datetime!(2025-06-30 00:00:00);
        let mut series = Series::new([Field::ProtonDensity]);
        for (idx, value) in values.iter().enumerate() {
            let mut sample = Sample::new(start + Duration::seconds(step_seconds * idx as i64));
            sample.set(Field::ProtonDensity, *value);
            series.push(sample);
        }
        series
    }

    #[test]
    fn test_zero_variance_baseline() {
        let series = density_series(
            &[Some(10.0), Some(10.0), Some(10.0), Some(10.0), Some(50.0)],
            60,
        );
        let engine = RollingStatisticsEngine::new(RollingWindow::Samples { count: 4 }, None);
        let stats = engine.compute(&series, Field::ProtonDensity);
        // Warm-up: fewer than four prior samples
        for stat in &stats[..4] {
            assert_eq!(stat.mean, None);
        }
        assert_eq!(stats[4].mean, Some(10.0));
        assert_eq!(stats[4].std, Some(0.0));
        assert_eq!(stats[4].threshold(2.0), Some(10.0));
    }

    #[test]
    fn test_flat_window_after_varied_history() {
        let mut values: Vec<Option<f64>> = (0..50)
            .map(|i| Some(((i * 37 + 11) % 100) as f64 + 0.1 * (i % 7) as f64))
            .collect();
        values.extend([Some(10.0); 5]);
        let series = density_series(&values, 60);
        let engine = RollingStatisticsEngine::new(RollingWindow::Samples { count: 4 }, None);
        let stats = engine.compute(&series, Field::ProtonDensity);
        let last = stats[54];
        assert_eq!(last.mean, Some(10.0));
        assert_eq!(last.std, Some(0.0));
        assert!(10.0 <= last.threshold(2.0).unwrap());

        let engine =
            RollingStatisticsEngine::new(RollingWindow::Duration { seconds: 300.0 }, Some(4));
        let stats = engine.compute(&series, Field::ProtonDensity);
        assert_eq!(stats[54].mean, Some(10.0));
        assert_eq!(stats[54].std, Some(0.0));
    }

    #[test]
    fn test_count_window_slides() {
        let series = density_series(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0)], 60);
        let engine = RollingStatisticsEngine::new(RollingWindow::Samples { count: 2 }, None);
        let stats = engine.compute(&series, Field::ProtonDensity);
        assert_eq!(stats[2].mean, Some(1.5));
        assert_eq!(stats[3].mean, Some(2.5));
        let std = stats[3].std.unwrap();
        assert!((std - 0.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_missing_values_do_not_count() {
        let series = density_series(&[Some(1.0), None, Some(3.0), Some(7.0)], 60);
        let engine = RollingStatisticsEngine::new(RollingWindow::Samples { count: 3 }, Some(2));
        let stats = engine.compute(&series, Field::ProtonDensity);
        assert_eq!(stats[2].mean, None);
        assert_eq!(stats[3].mean, Some(2.0));
    }

    #[test]
    fn test_duration_window_evicts_by_time() {
        // Samples one minute apart, a 150 s window holds at most the two previous samples
        let series = density_series(&[Some(1.0), Some(2.0), Some(3.0), Some(10.0)], 60);
        let engine =
            RollingStatisticsEngine::new(RollingWindow::Duration { seconds: 150.0 }, None);
        let stats = engine.compute(&series, Field::ProtonDensity);
        assert_eq!(stats[0].mean, None);
        assert_eq!(stats[1].mean, None);
        assert_eq!(stats[2].mean, Some(1.5));
        assert_eq!(stats[3].mean, Some(2.5));
    }

    #[test]
    fn test_duration_window_handles_gaps() {
        let start = datetime!(2025-06-30 00:00:00);
        let mut series = Series::new([Field::ProtonDensity]);
        for (offset, value) in [(0, 5.0), (30, 7.0), (4000, 100.0), (4030, 1.0)] {
            series.push(
                Sample::new(start + Duration::seconds(offset)).with(Field::ProtonDensity, value),
            );
        }
        let engine =
            RollingStatisticsEngine::new(RollingWindow::Duration { seconds: 1800.0 }, None);
        let stats = engine.compute(&series, Field::ProtonDensity);
        assert_eq!(stats[2].mean, None);
        assert_eq!(stats[3].mean, None);
    }
}
