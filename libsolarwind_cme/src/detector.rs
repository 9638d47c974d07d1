use bitvec::vec::BitVec;

use super::criteria::{Criterion, DetectionProfile, Quantity};
use super::derived::{quantity_value, DerivedParameters};
use super::field::Field;
use super::rolling::{RollingConfig, RollingStat, RollingStatisticsEngine, RollingWindow};
use super::sample::{Sample, Series};

/// One bit per sample of the cleaned series; set means "flagged"
pub type FlagSequence = BitVec;

/// EventDetector evaluates the active profile against every sample.
///
/// A sample is flagged only when every criterion of the profile holds. A criterion that
/// cannot be evaluated (missing value, baseline still warming up) does not hold, so
/// insufficient data always reads as "not flagged".
#[derive(Debug)]
pub struct EventDetector<'a> {
    profile: &'a DetectionProfile,
    default_window: RollingWindow,
    default_k: f64,
    min_periods: Option<usize>,
}

impl<'a> EventDetector<'a> {
    /// Create a detector for a profile. The rolling config supplies the window and k of
    /// any rolling criterion that does not set its own.
    pub fn new(profile: &'a DetectionProfile, rolling: &RollingConfig) -> Self {
        Self {
            profile,
            default_window: rolling.window,
            default_k: rolling.k,
            min_periods: rolling.min_periods,
        }
    }

    /// Trailing baselines for every rolling criterion, aligned with the profile's criteria
    pub fn baselines(&self, series: &Series) -> Vec<Option<Vec<RollingStat>>> {
        self.profile
            .criteria
            .iter()
            .map(|criterion| match criterion {
                Criterion::AboveRollingMean { field, .. }
                | Criterion::AboveRollingThreshold { field, .. } => {
                    let engine = match criterion.window_override() {
                        Some(window) => RollingStatisticsEngine::new(window, None),
                        None => RollingStatisticsEngine::new(self.default_window, self.min_periods),
                    };
                    Some(engine.compute(series, *field))
                }
                _ => None,
            })
            .collect()
    }

    /// Flag every sample of the series
    pub fn detect(&self, series: &Series, derived: &[DerivedParameters]) -> FlagSequence {
        if self.profile.uses_quantity(Quantity::Beta) && !series.has_field(Field::MagneticField)
        {
            log::warn!(
                "Profile uses plasma beta but the input has no {} column; no sample can be flagged",
                Field::MagneticField
            );
        }

        let baselines = self.baselines(series);
        let mut flags = FlagSequence::with_capacity(series.len());
        for (idx, (sample, params)) in series.samples().iter().zip(derived.iter()).enumerate() {
            let flagged = self
                .profile
                .criteria
                .iter()
                .zip(baselines.iter())
                .all(|(criterion, baseline)| {
                    let stat = baseline.as_ref().and_then(|b| b.get(idx));
                    self.criterion_holds(criterion, sample, params, stat)
                });
            flags.push(flagged);
        }
        flags
    }

    fn criterion_holds(
        &self,
        criterion: &Criterion,
        sample: &Sample,
        derived: &DerivedParameters,
        baseline: Option<&RollingStat>,
    ) -> bool {
        let value = match quantity_value(criterion.quantity(), sample, derived) {
            Some(v) => v,
            None => return false,
        };
        let limit = match criterion {
            Criterion::Above { threshold, .. } | Criterion::Below { threshold, .. } => {
                Some(*threshold)
            }
            Criterion::AboveRollingMean { factor, .. } => {
                baseline.and_then(|b| b.mean).map(|mean| mean * factor)
            }
            Criterion::AboveRollingThreshold { k, .. } => {
                baseline.and_then(|b| b.threshold(k.unwrap_or(self.default_k)))
            }
        };
        match (criterion, limit) {
            (_, None) => false,
            (Criterion::Below { .. }, Some(limit)) => value < limit,
            (_, Some(limit)) => value > limit,
        }
    }
}
