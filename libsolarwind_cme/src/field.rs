use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::SchemaError;

/// Every numeric column a Sample can carry, named exactly as in the input schema.
///
/// The timestamp is not a Field; it is always present on a Sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ProtonDensity,
    NumdenPUncer,
    ProtonBulkSpeed,
    BulkPUncer,
    ProtonXvelocity,
    ProtonYvelocity,
    ProtonZvelocity,
    ProtonThermal,
    ThermalPUncer,
    AlphaDensity,
    NumdenAUncer,
    AlphaBulkSpeed,
    BulkAUncer,
    AlphaThermal,
    ThermalAUncer,
    SpacecraftXpos,
    SpacecraftYpos,
    SpacecraftZpos,
    MagneticField,
}

impl Field {
    pub const COUNT: usize = 19;

    /// All fields in input schema order
    pub const ALL: [Field; Field::COUNT] = [
        Field::ProtonDensity,
        Field::NumdenPUncer,
        Field::ProtonBulkSpeed,
        Field::BulkPUncer,
        Field::ProtonXvelocity,
        Field::ProtonYvelocity,
        Field::ProtonZvelocity,
        Field::ProtonThermal,
        Field::ThermalPUncer,
        Field::AlphaDensity,
        Field::NumdenAUncer,
        Field::AlphaBulkSpeed,
        Field::BulkAUncer,
        Field::AlphaThermal,
        Field::ThermalAUncer,
        Field::SpacecraftXpos,
        Field::SpacecraftYpos,
        Field::SpacecraftZpos,
        Field::MagneticField,
    ];

    pub const VELOCITY: [Field; 3] = [
        Field::ProtonXvelocity,
        Field::ProtonYvelocity,
        Field::ProtonZvelocity,
    ];

    pub const POSITION: [Field; 3] = [
        Field::SpacecraftXpos,
        Field::SpacecraftYpos,
        Field::SpacecraftZpos,
    ];

    /// Slot of this field inside a Sample
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The column name used in the input schema
    pub fn name(&self) -> &'static str {
        match self {
            Field::ProtonDensity => "proton_density",
            Field::NumdenPUncer => "numden_p_uncer",
            Field::ProtonBulkSpeed => "proton_bulk_speed",
            Field::BulkPUncer => "bulk_p_uncer",
            Field::ProtonXvelocity => "proton_xvelocity",
            Field::ProtonYvelocity => "proton_yvelocity",
            Field::ProtonZvelocity => "proton_zvelocity",
            Field::ProtonThermal => "proton_thermal",
            Field::ThermalPUncer => "thermal_p_uncer",
            Field::AlphaDensity => "alpha_density",
            Field::NumdenAUncer => "numden_a_uncer",
            Field::AlphaBulkSpeed => "alpha_bulk_speed",
            Field::BulkAUncer => "bulk_a_uncer",
            Field::AlphaThermal => "alpha_thermal",
            Field::ThermalAUncer => "thermal_a_uncer",
            Field::SpacecraftXpos => "spacecraft_xpos",
            Field::SpacecraftYpos => "spacecraft_ypos",
            Field::SpacecraftZpos => "spacecraft_zpos",
            Field::MagneticField => "magnetic_field",
        }
    }

    /// The uncertainty column the instrument reports for this estimate, if any
    pub fn uncertainty(&self) -> Option<Field> {
        match self {
            Field::ProtonDensity => Some(Field::NumdenPUncer),
            Field::ProtonBulkSpeed => Some(Field::BulkPUncer),
            Field::ProtonThermal => Some(Field::ThermalPUncer),
            Field::AlphaDensity => Some(Field::NumdenAUncer),
            Field::AlphaBulkSpeed => Some(Field::BulkAUncer),
            Field::AlphaThermal => Some(Field::ThermalAUncer),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Field {
    type Err = SchemaError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .find(|field| field.name() == s)
            .copied()
            .ok_or_else(|| SchemaError::UnknownColumn(s.to_string()))
    }
}
