use super::field::Field;
use super::sample::{Sample, Series};

/// TemporalResolver puts a series in strict time order and closes short gaps.
///
/// Samples are stably sorted by time and only the first sample of any repeated timestamp
/// is kept. Afterwards each field is linearly interpolated (weighted by elapsed time)
/// across runs of at most `gap_limit` consecutive missing values, provided both ends of
/// the run have a value. Longer runs, and runs touching either end of the series, stay
/// missing.
#[derive(Debug, Clone, Copy)]
pub struct TemporalResolver {
    gap_limit: usize,
}

impl TemporalResolver {
    pub fn new(gap_limit: usize) -> Self {
        Self { gap_limit }
    }

    /// Returns the resolved series, the number of duplicates removed and the number of
    /// values interpolated
    pub fn resolve(&self, series: Series) -> (Series, usize, usize) {
        let (fields, mut samples) = series.into_parts();
        samples.sort_by_key(|sample| sample.time);
        let before = samples.len();
        samples.dedup_by_key(|sample| sample.time);
        let duplicates = before - samples.len();

        let mut interpolated = 0;
        if self.gap_limit > 0 {
            for field in fields.iter() {
                interpolated += self.fill_gaps(&mut samples, *field);
            }
        }
        (Series::from_parts(fields, samples), duplicates, interpolated)
    }

    fn fill_gaps(&self, samples: &mut [Sample], field: Field) -> usize {
        let mut filled = 0;
        let mut last_valid: Option<usize> = None;
        for idx in 0..samples.len() {
            if samples[idx].get(field).is_none() {
                continue;
            }
            if let Some(left) = last_valid {
                let gap = idx - left - 1;
                if gap > 0 && gap <= self.gap_limit {
                    filled += interpolate_run(samples, field, left, idx);
                }
            }
            last_valid = Some(idx);
        }
        filled
    }
}

/// Fill the missing values strictly between `left` and `right`, both of which hold values
fn interpolate_run(
    samples: &mut [Sample],
    field: Field,
    left: usize,
    right: usize,
) -> usize {
    let (t0, t1) = (samples[left].time, samples[right].time);
    let (v0, v1) = match (samples[left].get(field), samples[right].get(field)) {
        (Some(v0), Some(v1)) => (v0, v1),
        _ => return 0,
    };
    let span = (t1 - t0).as_seconds_f64();
    if span <= 0.0 {
        return 0;
    }
    for sample in samples[left + 1..right].iter_mut() {
        let weight = (sample.time - t0).as_seconds_f64() / span;
        sample.set(field, Some(v0 + (v1 - v0) * weight));
    }
    right - left - 1
}
