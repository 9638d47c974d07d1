//! # solarwind_cme
//!
//! solarwind_cme cleans solar-wind plasma time series from a particle spectrometer and
//! searches them for coronal mass ejection (CME) signatures, written in Rust. It takes
//! tabular series of proton and alpha moments (density, bulk speed, velocity components,
//! thermal speed, their reported uncertainties and the spacecraft position), produces a
//! cleaned series, a table of derived physical parameters and a list of detected events.
//!
//! ## Installation
//!
//! The only method of install is from source.
//!
//! ### Rust
//!
//! If you have not used Rust before, you will most likely need to install the Rust tool
//! chain. See the [Rust docs](https://www.rust-lang.org/tools/install) for installation
//! instructions.
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./solarwind_cme_cli` from the
//! top level repository. The binary is installed to your cargo install location
//! (typically `~/.cargo/bin/`).
//!
//! ## Pipeline
//!
//! Every series goes through the same stages, in order:
//!
//! 1. Sentinel sanitizing: instrument fill codes (and NaN/inf) become missing values.
//! 2. Physical range validation: densities and thermal speeds are clamped to (or nulled
//!    outside of) their plausible range.
//! 3. Kinematic consistency: samples whose velocity magnitude disagrees with the bulk
//!    speed are dropped.
//! 4. Uncertainty filtering: estimates with a large relative uncertainty are nulled.
//! 5. Spatial jump filtering: samples where the spacecraft position jumps are dropped.
//! 6. Temporal resolution: sort, remove duplicate timestamps, interpolate short gaps.
//!
//! The cleaned series then feeds the derived parameters (expected temperature, temperature
//! ratio, alpha ratio, dynamic pressure, speed change, plasma beta and a continuous CME
//! score), a rolling baseline, the event detector and the event aggregator.
//!
//! ## Configuration
//!
//! Configurations are YAML files. The CLI can write a template with every default
//! filled in. The top level looks like:
//!
//! ```yml
//! input_path: /path/to/series/
//! output_path: /path/to/output/
//! n_threads: 1
//! pipeline:
//!   required_fields: [proton_density, proton_bulk_speed, proton_thermal]
//!   range_policy: clamp
//!   gap_limit: 5
//!   detection:
//!     active_profile: halo_lenient
//!     minimum_duration: 1
//! ```
//!
//! Any pipeline key left out takes its default. `input_path` is either a single file or a
//! directory; in a directory every `.csv` file is processed, and files are divided among
//! `n_threads` workers.
//!
//! ### Detection profiles
//!
//! A profile is a named list of criteria which must all hold for a sample to be flagged.
//! Criteria are `above` / `below` a fixed threshold, `above_rolling_mean` (value greater
//! than the trailing mean times a factor) and `above_rolling_threshold` (value greater
//! than the trailing mean plus k standard deviations). The bundled profiles are
//! `halo_lenient`, `halo_strict`, `density_spike`, `icme_signature` (needs a
//! `magnetic_field` column) and `cme_parameters`.
//!
//! ## Input
//!
//! Inputs are delimited text with a header row. `time` is required and is parsed as
//! `YYYY-MM-DD HH:MM:SS[.frac]` (a `T` separator is accepted). Other columns are matched by
//! name: `proton_density, numden_p_uncer, proton_bulk_speed, bulk_p_uncer,
//! proton_xvelocity, proton_yvelocity, proton_zvelocity, proton_thermal,
//! thermal_p_uncer, alpha_density, numden_a_uncer, alpha_bulk_speed, bulk_a_uncer,
//! alpha_thermal, thermal_a_uncer, spacecraft_xpos, spacecraft_ypos, spacecraft_zpos` and
//! the optional `magnetic_field`. Unknown columns are ignored; empty cells are missing.
//!
//! ## Output
//!
//! For an input `name.csv` the following are written to the output directory:
//!
//! ```text
//! name_cleaned.csv - the cleaned series, same schema as the input
//! name_cme.csv     - time, proton_density, proton_thermal, proton_bulk_speed, T_exp,
//!                    T_ratio, alpha_ratio, dynamic_pressure, speed_change, beta,
//!                    density_mean, density_std, flag, score
//! name_events.csv  - start_time, end_time, duration, <max|min>_<variable>...
//! name_events.yml  - event count, average and longest duration, global extrema
//! ```
//!
//! The CLI also writes a log file. Log files contain the per-stage cleaning counts and
//! the detection summary of every file; if a file fails, the reason is in the log.
pub mod aggregator;
pub mod config;
pub mod constants;
pub mod criteria;
pub mod derived;
pub mod detector;
pub mod error;
pub mod field;
pub mod kinematic_filter;
pub mod pipeline;
pub mod process;
pub mod range_validator;
pub mod rolling;
pub mod sample;
pub mod sanitizer;
pub mod series_io;
pub mod spatial_filter;
pub mod temporal_resolver;
pub mod uncertainty_filter;
pub mod worker_status;
