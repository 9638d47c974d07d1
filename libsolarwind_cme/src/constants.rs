// Column name of the timestamp in every tabular input and output
pub const TIME_COLUMN: &str = "time";

// Physical constants (SI)
pub const VACUUM_PERMEABILITY: f64 = 4.0 * std::f64::consts::PI * 1.0e-7;
pub const BOLTZMANN_CONSTANT: f64 = 1.380649e-23;

// Unit conversions from instrument units to SI
pub const PER_CM3_TO_PER_M3: f64 = 1.0e6;
pub const NANOTESLA_TO_TESLA: f64 = 1.0e-9;

/// Fill codes the instrument writes when it has no valid measurement
pub const DEFAULT_FILL_VALUES: [f64; 6] = [-1.0e31, 1.0e31, -9999.0, -999.99, 999.99, 9999.0];

/// Fill codes are frequently stored in single precision, so they are matched relatively
pub const SENTINEL_RELATIVE_TOLERANCE: f64 = 1.0e-6;

pub const DEFAULT_DENSITY_BOUNDS: (f64, f64) = (0.0, 100.0);
pub const DEFAULT_THERMAL_BOUNDS: (f64, f64) = (0.0, 1.0e5);

pub const DEFAULT_CONSISTENCY_TOLERANCE: f64 = 100.0;
pub const DEFAULT_UNCERTAINTY_FRACTION: f64 = 0.5;
pub const DEFAULT_POSITION_JUMP_THRESHOLD: f64 = 1000.0;
pub const DEFAULT_GAP_LIMIT: usize = 5;
pub const DEFAULT_EPSILON: f64 = 1.0e-9;

/// 30 minutes
pub const DEFAULT_ROLLING_SECONDS: f64 = 1800.0;
pub const DEFAULT_ROLLING_K: f64 = 2.0;
/// Minimum number of present values a duration window needs before it reports a baseline
pub const DEFAULT_DURATION_MIN_PERIODS: usize = 2;

/// Converts n [cm^-3] * v^2 [(km/s)^2] into nPa
pub const DEFAULT_DYNAMIC_PRESSURE_CONSTANT: f64 = 1.67e-6;

// Output file suffixes, appended to the input file stem
pub const CLEANED_SUFFIX: &str = "_cleaned";
pub const PARAMETERS_SUFFIX: &str = "_cme";
pub const EVENTS_SUFFIX: &str = "_events";
pub const INPUT_EXTENSION: &str = "csv";
pub const SUMMARY_EXTENSION: &str = "yml";
