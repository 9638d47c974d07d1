use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::constants::{
    CLEANED_SUFFIX, DEFAULT_CONSISTENCY_TOLERANCE, DEFAULT_DYNAMIC_PRESSURE_CONSTANT,
    DEFAULT_EPSILON, DEFAULT_GAP_LIMIT, DEFAULT_POSITION_JUMP_THRESHOLD,
    DEFAULT_UNCERTAINTY_FRACTION, EVENTS_SUFFIX, INPUT_EXTENSION, PARAMETERS_SUFFIX,
    SUMMARY_EXTENSION,
};
use super::criteria::{DetectionConfig, DetectionProfile};
use super::derived::{DerivationConstants, FitConstants, ScoreWeights};
use super::error::ConfigError;
use super::field::Field;
use super::range_validator::{default_range_bounds, RangeBound, RangePolicy};
use super::rolling::RollingConfig;
use super::sanitizer::SentinelCodes;
use super::uncertainty_filter::{default_uncertainty_pairs, UncertaintyPair};

/// Every tunable of the cleaning and detection pipeline.
///
/// Missing keys in a YAML file fall back to the defaults, so a configuration only needs
/// to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fields the input must carry; a run fails before any cleaning if one is absent
    pub required_fields: Vec<Field>,
    pub sentinel_codes: SentinelCodes,
    pub range_bounds: BTreeMap<Field, RangeBound>,
    pub range_policy: RangePolicy,
    pub consistency_tolerance: f64,
    pub uncertainty_fraction: f64,
    pub uncertainty_pairs: Vec<UncertaintyPair>,
    pub position_jump_threshold: f64,
    pub gap_limit: usize,
    pub rolling: RollingConfig,
    pub epsilon: f64,
    pub fit_constants: FitConstants,
    pub dynamic_pressure_constant: f64,
    pub score_weights: ScoreWeights,
    pub detection: DetectionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            required_fields: vec![
                Field::ProtonDensity,
                Field::ProtonBulkSpeed,
                Field::ProtonThermal,
            ],
            sentinel_codes: SentinelCodes::default(),
            range_bounds: default_range_bounds(),
            range_policy: RangePolicy::default(),
            consistency_tolerance: DEFAULT_CONSISTENCY_TOLERANCE,
            uncertainty_fraction: DEFAULT_UNCERTAINTY_FRACTION,
            uncertainty_pairs: default_uncertainty_pairs(),
            position_jump_threshold: DEFAULT_POSITION_JUMP_THRESHOLD,
            gap_limit: DEFAULT_GAP_LIMIT,
            rolling: RollingConfig::default(),
            epsilon: DEFAULT_EPSILON,
            fit_constants: FitConstants::default(),
            dynamic_pressure_constant: DEFAULT_DYNAMIC_PRESSURE_CONSTANT,
            score_weights: ScoreWeights::default(),
            detection: DetectionConfig::default(),
        }
    }
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name: name.to_string(),
            value,
        })
    }
}

fn finite(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name: name.to_string(),
            value,
        })
    }
}

impl PipelineConfig {
    /// Check every parameter against its domain and return the active detection profile
    pub fn validate(&self) -> Result<&DetectionProfile, ConfigError> {
        for (field, bound) in self.range_bounds.iter() {
            if !bound.is_valid() {
                return Err(ConfigError::InvalidRange(*field));
            }
        }
        for pair in self.uncertainty_pairs.iter() {
            if !pair.is_valid() {
                return Err(ConfigError::InvalidUncertaintyPair(pair.value, pair.uncertainty));
            }
        }
        positive("consistency_tolerance", self.consistency_tolerance)?;
        positive("uncertainty_fraction", self.uncertainty_fraction)?;
        positive("position_jump_threshold", self.position_jump_threshold)?;
        finite("epsilon", self.epsilon)?;
        if self.epsilon < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: String::from("epsilon"),
                value: self.epsilon,
            });
        }
        if !self.rolling.window.is_valid() {
            return Err(ConfigError::InvalidWindow(format!("{:?}", self.rolling.window)));
        }
        if self.rolling.min_periods == Some(0) {
            return Err(ConfigError::InvalidWindow(String::from(
                "min_periods must be at least 1",
            )));
        }
        finite("rolling.k", self.rolling.k)?;
        finite("fit_constants.a", self.fit_constants.a)?;
        finite("fit_constants.b", self.fit_constants.b)?;
        positive("dynamic_pressure_constant", self.dynamic_pressure_constant)?;

        let weights = &self.score_weights;
        finite("score_weights.density", weights.density)?;
        finite("score_weights.temperature", weights.temperature)?;
        finite("score_weights.alpha", weights.alpha)?;
        finite("score_weights.speed_change", weights.speed_change)?;
        positive("score_weights.density_scale", weights.density_scale)?;
        positive("score_weights.alpha_scale", weights.alpha_scale)?;
        positive("score_weights.speed_change_scale", weights.speed_change_scale)?;

        self.detection.validate()
    }

    pub fn derivation_constants(&self) -> DerivationConstants {
        DerivationConstants {
            fit: self.fit_constants,
            dynamic_pressure_constant: self.dynamic_pressure_constant,
            epsilon: self.epsilon,
            score: self.score_weights,
        }
    }
}

/// Structure representing the application configuration. Contains pathing, threading and
/// the pipeline parameters.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// A single series file or a directory of them
    pub input_path: PathBuf,
    /// Directory the cleaned series, parameter tables and event lists are written to
    pub output_path: PathBuf,
    pub n_threads: i32,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be empty/invalid
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("None"),
            output_path: PathBuf::from("None"),
            n_threads: 1,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }

    /// Check the whole configuration; nothing is processed unless this passes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_n_threads_valid() {
            return Err(ConfigError::InvalidParameter {
                name: String::from("n_threads"),
                value: self.n_threads as f64,
            });
        }
        self.pipeline.validate()?;
        Ok(())
    }

    fn output_file(&self, input: &Path, suffix: &str, extension: &str) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.output_path.join(format!("{stem}{suffix}.{extension}"))
    }

    /// Get the path to the cleaned series written for an input file
    pub fn get_cleaned_file_name(&self, input: &Path) -> PathBuf {
        self.output_file(input, CLEANED_SUFFIX, INPUT_EXTENSION)
    }

    /// Get the path to the derived parameter table written for an input file
    pub fn get_parameters_file_name(&self, input: &Path) -> PathBuf {
        self.output_file(input, PARAMETERS_SUFFIX, INPUT_EXTENSION)
    }

    /// Get the path to the event list written for an input file
    pub fn get_events_file_name(&self, input: &Path) -> PathBuf {
        self.output_file(input, EVENTS_SUFFIX, INPUT_EXTENSION)
    }

    /// Get the path to the event summary written for an input file
    pub fn get_summary_file_name(&self, input: &Path) -> PathBuf {
        self.output_file(input, EVENTS_SUFFIX, SUMMARY_EXTENSION)
    }
}
