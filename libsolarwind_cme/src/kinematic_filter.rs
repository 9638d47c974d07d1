use super::field::Field;
use super::sample::{Sample, Series};

/// KinematicConsistencyFilter drops samples whose velocity vector disagrees with the
/// reported bulk speed.
#[derive(Debug, Clone, Copy)]
pub struct KinematicConsistencyFilter {
    tolerance: f64,
}

impl KinematicConsistencyFilter {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// True unless every input is present and the magnitude and speed differ by at least
    /// the tolerance
    pub fn is_consistent(&self, sample: &Sample) -> bool {
        let [vx, vy, vz] = sample.velocity();
        match (vx, vy, vz, sample.get(Field::ProtonBulkSpeed)) {
            (Some(vx), Some(vy), Some(vz), Some(speed)) => {
                let magnitude = (vx * vx + vy * vy + vz * vz).sqrt();
                (magnitude - speed).abs() < self.tolerance
            }
            _ => true,
        }
    }

    /// Returns the filtered series and the number of samples dropped
    pub fn filter(&self, series: Series) -> (Series, usize) {
        let (fields, samples) = series.into_parts();
        let before = samples.len();
        let kept: Vec<Sample> = samples
            .into_iter()
            .filter(|sample| self.is_consistent(sample))
            .collect();
        let dropped = before - kept.len();
        (Series::from_parts(fields, kept), dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample(speed: Option<f64>, vz: Option<f64>) -> Sample {
        let mut sample = Sample::new(datetime!(2025-06-30 00:00:00))
            .with(Field::ProtonXvelocity, 3.0)
            .with(Field::ProtonYvelocity, 4.0);
        sample.set(Field::ProtonZvelocity, vz);
        sample.set(Field::ProtonBulkSpeed, speed);
        sample
    }

    #[test]
    fn test_inconsistent_speed_dropped() {
        let filter = KinematicConsistencyFilter::new(100.0);
        assert!(!filter.is_consistent(&sample(Some(200.0), Some(0.0))));
        assert!(filter.is_consistent(&sample(Some(50.0), Some(0.0))));
    }

    #[test]
    fn test_missing_inputs_retained() {
        let filter = KinematicConsistencyFilter::new(100.0);
        assert!(filter.is_consistent(&sample(None, Some(0.0))));
        assert!(filter.is_consistent(&sample(Some(900.0), None)));
    }

    #[test]
    fn test_filter_counts_drops() {
        let mut series = Series::new(Field::VELOCITY.into_iter().chain([Field::ProtonBulkSpeed]));
        series.push(sample(Some(200.0), Some(0.0)));
        series.push(sample(Some(50.0), Some(0.0)));
        series.push(sample(None, None));
        let (series, dropped) = KinematicConsistencyFilter::new(100.0).filter(series);
        assert_eq!(dropped, 1);
        assert_eq!(series.len(), 2);
        assert_eq!(series.samples()[0].get(Field::ProtonBulkSpeed), Some(50.0));
    }
}
