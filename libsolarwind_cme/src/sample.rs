use std::collections::BTreeSet;
use time::PrimitiveDateTime;

use super::error::SchemaError;
use super::field::Field;

/// Instants are naive UTC date-times, as produced by the upstream decoder
pub type Timestamp = PrimitiveDateTime;

/// One timestamped observation.
///
/// A fixed-shape record: every Field has a slot, and a slot holding `None` is a missing
/// value. Whether a column exists at all in the input is tracked by the owning Series.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: Timestamp,
    values: [Option<f64>; Field::COUNT],
}

impl Sample {
    /// Create a sample with every field missing
    pub fn new(time: Timestamp) -> Self {
        Self {
            time,
            values: [None; Field::COUNT],
        }
    }

    /// Builder-style setter, mostly useful when assembling series by hand
    pub fn with(mut self, field: Field, value: f64) -> Self {
        self.values[field.index()] = Some(value);
        self
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        self.values[field.index()]
    }

    pub fn set(&mut self, field: Field, value: Option<f64>) {
        self.values[field.index()] = value;
    }

    /// Proton velocity components (vx, vy, vz)
    pub fn velocity(&self) -> [Option<f64>; 3] {
        Field::VELOCITY.map(|field| self.get(field))
    }

    /// Spacecraft position components (x, y, z)
    pub fn position(&self) -> [Option<f64>; 3] {
        Field::POSITION.map(|field| self.get(field))
    }
}

/// An ordered sequence of Samples plus the set of fields present in its schema.
///
/// Every pipeline stage takes a Series by value and hands a new one to the next stage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    fields: BTreeSet<Field>,
    samples: Vec<Sample>,
}

impl Series {
    pub fn new<I: IntoIterator<Item = Field>>(fields: I) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            samples: Vec::new(),
        }
    }

    pub fn from_parts(fields: BTreeSet<Field>, samples: Vec<Sample>) -> Self {
        Self { fields, samples }
    }

    pub fn into_parts(self) -> (BTreeSet<Field>, Vec<Sample>) {
        (self.fields, self.samples)
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn fields(&self) -> &BTreeSet<Field> {
        &self.fields
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    /// Check that every required field exists in the schema
    pub fn require(&self, required: &[Field]) -> Result<(), SchemaError> {
        match required.iter().find(|field| !self.has_field(**field)) {
            Some(field) => Err(SchemaError::MissingField(*field)),
            None => Ok(()),
        }
    }

    /// A single column, missing values included
    pub fn column(&self, field: Field) -> Vec<Option<f64>> {
        self.samples.iter().map(|s| s.get(field)).collect()
    }
}
