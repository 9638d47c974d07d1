use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::constants::{DEFAULT_FILL_VALUES, SENTINEL_RELATIVE_TOLERANCE};
use super::error::SchemaError;
use super::field::Field;
use super::sample::Series;

/// Fill codes: a list applied to every field plus per-field additions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentinelCodes {
    pub global: Vec<f64>,
    #[serde(default)]
    pub per_field: BTreeMap<Field, Vec<f64>>,
}

impl Default for SentinelCodes {
    fn default() -> Self {
        Self {
            global: DEFAULT_FILL_VALUES.to_vec(),
            per_field: BTreeMap::new(),
        }
    }
}

/// SentinelSanitizer replaces instrument fill codes with missing values.
///
/// A replacement only ever touches the field holding the code; the rest of the sample
/// is left as it is. Non-finite values are treated the same way.
#[derive(Debug, Clone)]
pub struct SentinelSanitizer {
    codes: FxHashMap<Field, Vec<f64>>,
    required: Vec<Field>,
}

impl SentinelSanitizer {
    /// Create a sanitizer from the configured codes and the fields the input must have
    pub fn new(sentinels: &SentinelCodes, required: &[Field]) -> Self {
        let mut codes = FxHashMap::default();
        for field in Field::ALL {
            let mut field_codes = sentinels.global.clone();
            if let Some(extra) = sentinels.per_field.get(&field) {
                field_codes.extend_from_slice(extra);
            }
            codes.insert(field, field_codes);
        }
        Self {
            codes,
            required: required.to_vec(),
        }
    }

    fn is_sentinel(&self, field: Field, value: f64) -> bool {
        if !value.is_finite() {
            return true;
        }
        match self.codes.get(&field) {
            Some(codes) => codes.iter().any(|code| {
                (value - code).abs() <= SENTINEL_RELATIVE_TOLERANCE * code.abs().max(1.0)
            }),
            None => false,
        }
    }

    /// Returns the sanitized series and the number of values replaced.
    ///
    /// Fails if the schema lacks a required field; nothing is emitted in that case.
    pub fn sanitize(&self, series: Series) -> Result<(Series, usize), SchemaError> {
        series.require(&self.required)?;
        let (fields, mut samples) = series.into_parts();
        let mut replaced = 0;
        for sample in samples.iter_mut() {
            for field in fields.iter() {
                if let Some(value) = sample.get(*field) {
                    if self.is_sentinel(*field, value) {
                        sample.set(*field, None);
                        replaced += 1;
                    }
                }
            }
        }
        Ok((Series::from_parts(fields, samples), replaced))
    }
}
