//! The end-to-end pipeline: six cleaning stages, derivation, detection and aggregation.
//!
//! Stages run in a fixed order and each one takes the Series produced by the one before.
//! The configuration is validated before the first sample is touched, so a bad profile or
//! parameter never produces partial output.
use super::aggregator::{Event, EventAggregator, EventSummary};
use super::config::PipelineConfig;
use super::derived::{derive_parameters, DerivedParameters};
use super::detector::{EventDetector, FlagSequence};
use super::error::PipelineError;
use super::kinematic_filter::KinematicConsistencyFilter;
use super::range_validator::PhysicsRangeValidator;
use super::rolling::{RollingStat, RollingStatisticsEngine};
use super::sample::Series;
use super::sanitizer::SentinelSanitizer;
use super::spatial_filter::SpatialJumpFilter;
use super::temporal_resolver::TemporalResolver;
use super::uncertainty_filter::UncertaintyFilter;

/// Per-stage counts of one cleaning run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleaningReport {
    pub input_samples: usize,
    pub sentinels_replaced: usize,
    pub values_out_of_range: usize,
    pub kinematic_dropped: usize,
    pub uncertainty_nulled: usize,
    pub spatial_dropped: usize,
    pub duplicates_removed: usize,
    pub values_interpolated: usize,
    pub output_samples: usize,
}

impl CleaningReport {
    /// Fraction of input samples that survived cleaning
    pub fn retained_fraction(&self) -> f64 {
        if self.input_samples == 0 {
            return 0.0;
        }
        self.output_samples as f64 / self.input_samples as f64
    }

    pub fn log(&self) {
        log::info!(
            "Sentinels replaced: {}, values out of range: {}",
            self.sentinels_replaced,
            self.values_out_of_range
        );
        log::info!(
            "Dropped {} kinematically inconsistent and {} spatial jump samples, nulled {} uncertain values",
            self.kinematic_dropped,
            self.spatial_dropped,
            self.uncertainty_nulled
        );
        log::info!(
            "Removed {} duplicate timestamps, interpolated {} values",
            self.duplicates_removed,
            self.values_interpolated
        );
        log::info!(
            "Retained {} of {} samples ({:.2}%)",
            self.output_samples,
            self.input_samples,
            self.retained_fraction() * 100.0
        );
    }
}

/// Everything a pipeline run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub cleaned: Series,
    pub report: CleaningReport,
    pub derived: Vec<DerivedParameters>,
    /// Rolling baseline of the configured field, one entry per cleaned sample
    pub baseline: Vec<RollingStat>,
    pub flags: FlagSequence,
    pub events: Vec<Event>,
    pub summary: EventSummary,
}

fn clean(series: Series, config: &PipelineConfig) -> Result<(Series, CleaningReport), PipelineError> {
    let mut report = CleaningReport {
        input_samples: series.len(),
        ..Default::default()
    };

    let sanitizer = SentinelSanitizer::new(&config.sentinel_codes, &config.required_fields);
    let (series, replaced) = sanitizer.sanitize(series)?;
    report.sentinels_replaced = replaced;

    let validator = PhysicsRangeValidator::new(&config.range_bounds, config.range_policy);
    let (series, adjusted) = validator.validate(series);
    report.values_out_of_range = adjusted;

    let kinematic = KinematicConsistencyFilter::new(config.consistency_tolerance);
    let (series, dropped) = kinematic.filter(series);
    report.kinematic_dropped = dropped;

    let uncertainty = UncertaintyFilter::new(config.uncertainty_fraction, &config.uncertainty_pairs);
    let (series, nulled) = uncertainty.filter(series);
    report.uncertainty_nulled = nulled;

    let spatial = SpatialJumpFilter::new(config.position_jump_threshold);
    let (series, dropped) = spatial.filter(series);
    report.spatial_dropped = dropped;

    let resolver = TemporalResolver::new(config.gap_limit);
    let (series, duplicates, interpolated) = resolver.resolve(series);
    report.duplicates_removed = duplicates;
    report.values_interpolated = interpolated;

    report.output_samples = series.len();
    Ok((series, report))
}

/// Run only the cleaning stages
pub fn clean_series(
    series: Series,
    config: &PipelineConfig,
) -> Result<(Series, CleaningReport), PipelineError> {
    config.validate()?;
    let (cleaned, report) = clean(series, config)?;
    report.log();
    Ok((cleaned, report))
}

/// Derive the physical parameters of an already cleaned series and detect events with the
/// active profile
pub fn detect_events(
    cleaned: Series,
    report: CleaningReport,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    let profile = config.detection.active()?;
    log::debug!(
        "Using detection profile {}: {}",
        config.detection.active_profile,
        profile.description
    );

    let derived = derive_parameters(&cleaned, &config.derivation_constants());
    let baseline =
        RollingStatisticsEngine::from_config(&config.rolling).compute(&cleaned, config.rolling.field);

    let detector = EventDetector::new(profile, &config.rolling);
    let flags = detector.detect(&cleaned, &derived);

    let aggregator = EventAggregator::new(config.detection.minimum_duration, profile);
    let events = aggregator.aggregate(&cleaned, &derived, &flags);
    let summary = EventAggregator::summarize(&events);
    log::info!(
        "Flagged {} samples, {} events with average duration {:.2} samples",
        flags.count_ones(),
        summary.num_events,
        summary.avg_duration
    );

    Ok(PipelineOutput {
        cleaned,
        report,
        derived,
        baseline,
        flags,
        events,
        summary,
    })
}

/// Clean a raw series, derive the physical parameters and detect events with the active
/// profile
pub fn run_pipeline(series: Series, config: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
    let (cleaned, report) = clean_series(series, config)?;
    detect_events(cleaned, report, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::Quantity;
    use crate::error::{ConfigError, SchemaError};
    use crate::field::Field;
    use crate::sample::Sample;
    use time::macros::datetime;
    use time::Duration;

    fn plasma(rows: &[(f64, f64, f64)]) -> Series {
        let start = datetime!(2025-06-30 00:00:00);
        let mut series = Series::new([
            Field::ProtonDensity,
            Field::ProtonBulkSpeed,
            Field::ProtonThermal,
            Field::AlphaDensity,
        ]);
        for (idx, (density, speed, alpha)) in rows.iter().enumerate() {
            series.push(
                Sample::new(start + Duration::minutes(idx as i64))
                    .with(Field::ProtonDensity, *density)
                    .with(Field::ProtonBulkSpeed, *speed)
                    .with(Field::ProtonThermal, 5.0e4)
                    .with(Field::AlphaDensity, *alpha),
            );
        }
        series
    }

    #[test]
    fn test_configuration_checked_before_schema() {
        let mut config = PipelineConfig::default();
        config.detection.active_profile = String::from("unknown");
        let series = Series::new([Field::ProtonDensity]);
        assert!(matches!(
            run_pipeline(series, &config),
            Err(PipelineError::ConfigError(ConfigError::UnknownProfile(_)))
        ));
    }

    #[test]
    fn test_missing_required_field() {
        let series = Series::new([Field::ProtonDensity, Field::ProtonBulkSpeed]);
        assert!(matches!(
            run_pipeline(series, &PipelineConfig::default()),
            Err(PipelineError::SchemaError(SchemaError::MissingField(
                Field::ProtonThermal
            )))
        ));
    }

    #[test]
    fn test_cleaning_report() {
        let mut series = plasma(&[(5.0, 400.0, 0.1), (-9999.0, 400.0, 0.1), (250.0, 400.0, 0.1)]);
        series.push(
            Sample::new(datetime!(2025-06-30 00:00:00))
                .with(Field::ProtonDensity, 7.0)
                .with(Field::ProtonBulkSpeed, 400.0)
                .with(Field::ProtonThermal, 5.0e4),
        );
        let (cleaned, report) = clean_series(series, &PipelineConfig::default()).unwrap();
        assert_eq!(report.input_samples, 4);
        assert_eq!(report.sentinels_replaced, 1);
        assert_eq!(report.values_out_of_range, 1);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.values_interpolated, 1);
        assert_eq!(report.output_samples, 3);
        assert_eq!(report.retained_fraction(), 0.75);
        assert_eq!(
            cleaned.column(Field::ProtonDensity),
            vec![Some(5.0), Some(52.5), Some(100.0)]
        );
    }

    fn resolve_stages(series: Series, config: &PipelineConfig) -> (Series, usize, usize, usize) {
        let sanitizer = SentinelSanitizer::new(&config.sentinel_codes, &config.required_fields);
        let (series, replaced) = sanitizer.sanitize(series).unwrap();
        let validator = PhysicsRangeValidator::new(&config.range_bounds, config.range_policy);
        let (series, adjusted) = validator.validate(series);
        let (series, _, interpolated) = TemporalResolver::new(config.gap_limit).resolve(series);
        (series, replaced, adjusted, interpolated)
    }

    #[test]
    fn test_cleaned_output_is_fixed_point() {
        let mut rows = vec![(5.0, 400.0, 0.2); 12];
        rows[2].0 = -1.0e31;
        rows[3].0 = 500.0;
        rows[7].1 = 9999.0;
        rows[8].1 = 9999.0;
        let xpos = [
            Some(0.0),
            None,
            Some(2500.0),
            Some(2501.0),
            Some(2502.0),
            Some(-1.0e31),
            Some(2504.0),
            Some(2505.0),
            Some(2506.0),
            Some(2507.0),
            Some(2508.0),
            Some(2509.0),
        ];
        let (mut fields, mut samples) = plasma(&rows).into_parts();
        fields.extend(Field::VELOCITY);
        fields.extend(Field::POSITION);
        for (sample, x) in samples.iter_mut().zip(xpos) {
            sample.set(Field::ProtonXvelocity, Some(-400.0));
            sample.set(Field::ProtonYvelocity, Some(3.0));
            sample.set(Field::SpacecraftXpos, x);
            sample.set(Field::SpacecraftYpos, Some(1.0e5));
            sample.set(Field::SpacecraftZpos, Some(-2.0e4));
        }
        let series = Series::from_parts(fields, samples);
        let config = PipelineConfig::default();
        let (once, report) = clean_series(series, &config).unwrap();
        assert_eq!(once.len(), 12);
        assert_eq!(report.spatial_dropped, 0);
        assert_eq!(once.column(Field::SpacecraftXpos)[1], Some(1250.0));

        let (twice, replaced, adjusted, interpolated) = resolve_stages(once.clone(), &config);
        assert_eq!(once, twice);
        assert_eq!(replaced, 0);
        assert_eq!(adjusted, 0);
        assert_eq!(interpolated, 0);
    }

    #[test]
    fn test_split_pipeline_matches_run() {
        let mut rows = vec![(5.0, 400.0, 0.5); 35];
        rows.extend(vec![(10.0, 500.0, 2.0); 5]);
        let mut config = PipelineConfig::default();
        config.detection.active_profile = String::from("halo_strict");
        let (cleaned, report) = clean_series(plasma(&rows), &config).unwrap();
        let split = detect_events(cleaned, report, &config).unwrap();
        let whole = run_pipeline(plasma(&rows), &config).unwrap();
        assert_eq!(split.events, whole.events);
        assert_eq!(split.flags, whole.flags);
    }

    #[test]
    fn test_halo_event_detected() {
        let mut rows = vec![(5.0, 400.0, 0.5); 35];
        rows.extend(vec![(10.0, 500.0, 2.0); 5]);
        let mut config = PipelineConfig::default();
        config.detection.active_profile = String::from("halo_strict");
        let output = run_pipeline(plasma(&rows), &config).unwrap();

        assert_eq!(output.flags.count_ones(), 5);
        assert_eq!(output.events.len(), 1);
        let event = &output.events[0];
        assert_eq!(event.start_index, 35);
        assert_eq!(event.duration, 5);
        assert_eq!(event.start_time, datetime!(2025-06-30 00:35:00));
        assert_eq!(event.end_time, datetime!(2025-06-30 00:39:00));
        assert_eq!(event.peak(Quantity::Raw(Field::ProtonBulkSpeed)), Some(500.0));
        assert_eq!(output.summary.num_events, 1);
        assert_eq!(output.baseline.len(), output.cleaned.len());
        assert_eq!(output.derived.len(), output.cleaned.len());
    }

    #[test]
    fn test_quiet_wind_has_no_events() {
        let rows = vec![(5.0, 400.0, 0.2); 40];
        let output = run_pipeline(plasma(&rows), &PipelineConfig::default()).unwrap();
        assert_eq!(output.flags.count_ones(), 0);
        assert!(output.events.is_empty());
        assert_eq!(output.summary.num_events, 0);
    }
}
