use super::sample::{Sample, Series};

/// SpatialJumpFilter drops samples where the spacecraft position jumps implausibly.
///
/// Each sample is compared against the sample immediately before it in the input,
/// whether or not that one was kept, so a lasting step in position costs only the sample
/// where it happens. The first sample is always kept.
#[derive(Debug, Clone, Copy)]
pub struct SpatialJumpFilter {
    threshold: f64,
}

impl SpatialJumpFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// True if any component present in both samples moved by at least the threshold
    pub fn is_jump(&self, previous: &Sample, current: &Sample) -> bool {
        previous
            .position()
            .iter()
            .zip(current.position().iter())
            .any(|(prev, cur)| match (prev, cur) {
                (Some(prev), Some(cur)) => (cur - prev).abs() >= self.threshold,
                _ => false,
            })
    }

    /// Returns the filtered series and the number of samples dropped
    pub fn filter(&self, series: Series) -> (Series, usize) {
        let (fields, samples) = series.into_parts();
        let jumps: Vec<bool> = std::iter::once(false)
            .chain(samples.windows(2).map(|pair| self.is_jump(&pair[0], &pair[1])))
            .collect();
        let dropped = jumps.iter().filter(|jump| **jump).count();
        let kept: Vec<Sample> = samples
            .into_iter()
            .zip(jumps)
            .filter_map(|(sample, jump)| (!jump).then_some(sample))
            .collect();
        (Series::from_parts(fields, kept), dropped)
    }
}
