use serde::{Deserialize, Serialize};

use super::field::Field;
use super::sample::Series;

/// A measured value and the column holding its reported uncertainty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncertaintyPair {
    pub value: Field,
    pub uncertainty: Field,
}

impl UncertaintyPair {
    /// Pair a field with its own uncertainty column, if the instrument reports one
    pub fn of(value: Field) -> Option<Self> {
        value.uncertainty().map(|uncertainty| Self { value, uncertainty })
    }

    pub fn is_valid(&self) -> bool {
        self.value.uncertainty() == Some(self.uncertainty)
    }
}

/// One pair for every scalar that carries an uncertainty
pub fn default_uncertainty_pairs() -> Vec<UncertaintyPair> {
    Field::ALL.iter().filter_map(|f| UncertaintyPair::of(*f)).collect()
}

/// UncertaintyFilter nulls estimates whose relative uncertainty is too large.
/// The uncertainty itself is kept.
#[derive(Debug, Clone)]
pub struct UncertaintyFilter {
    fraction: f64,
    pairs: Vec<UncertaintyPair>,
}

impl UncertaintyFilter {
    pub fn new(fraction: f64, pairs: &[UncertaintyPair]) -> Self {
        Self {
            fraction,
            pairs: pairs.to_vec(),
        }
    }

    /// Returns the filtered series and the number of values nulled
    pub fn filter(&self, series: Series) -> (Series, usize) {
        let (fields, mut samples) = series.into_parts();
        let mut nulled = 0;
        for sample in samples.iter_mut() {
            for pair in self.pairs.iter() {
                if let (Some(value), Some(uncertainty)) =
                    (sample.get(pair.value), sample.get(pair.uncertainty))
                {
                    if uncertainty > self.fraction * value.abs() {
                        sample.set(pair.value, None);
                        nulled += 1;
                    }
                }
            }
        }
        (Series::from_parts(fields, samples), nulled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;
    use time::macros::datetime;

    #[test]
    fn test_default_pairs() {
        let pairs = default_uncertainty_pairs();
        assert_eq!(pairs.len(), 6);
        assert!(pairs.iter().all(|p| p.is_valid()));
        assert_eq!(
            pairs[0],
            UncertaintyPair {
                value: Field::ProtonDensity,
                uncertainty: Field::NumdenPUncer
            }
        );
        assert!(UncertaintyPair::of(Field::SpacecraftXpos).is_none());
    }

    #[test]
    fn test_large_uncertainty_nulls_value() {
        let mut series = Series::new([Field::ProtonDensity, Field::NumdenPUncer]);
        let time = datetime!(2025-06-30 00:00:00);
        series.push(
            Sample::new(time)
                .with(Field::ProtonDensity, 10.0)
                .with(Field::NumdenPUncer, 6.0),
        );
        series.push(
            Sample::new(time)
                .with(Field::ProtonDensity, 10.0)
                .with(Field::NumdenPUncer, 5.0),
        );
        series.push(Sample::new(time).with(Field::NumdenPUncer, 50.0));
        let filter = UncertaintyFilter::new(0.5, &default_uncertainty_pairs());
        let (series, nulled) = filter.filter(series);
        assert_eq!(nulled, 1);
        assert_eq!(
            series.column(Field::ProtonDensity),
            vec![None, Some(10.0), None]
        );
        assert_eq!(
            series.column(Field::NumdenPUncer),
            vec![Some(6.0), Some(5.0), Some(50.0)]
        );
    }

    #[test]
    fn test_negative_value_uses_magnitude() {
        let mut series = Series::new([Field::ProtonBulkSpeed, Field::BulkPUncer]);
        series.push(
            Sample::new(datetime!(2025-06-30 00:00:00))
                .with(Field::ProtonBulkSpeed, -400.0)
                .with(Field::BulkPUncer, 100.0),
        );
        let filter = UncertaintyFilter::new(0.5, &default_uncertainty_pairs());
        let (series, nulled) = filter.filter(series);
        assert_eq!(nulled, 0);
        assert_eq!(series.samples()[0].get(Field::ProtonBulkSpeed), Some(-400.0));
    }
}
