use std::path::PathBuf;
use thiserror::Error;

use super::field::Field;
use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("Input is missing the required time column")]
    MissingTimeColumn,
    #[error("Input is missing required field {0}")]
    MissingField(Field),
    #[error("Unknown column name {0}")]
    UnknownColumn(String),
    #[error("Input declares column {0} more than once")]
    DuplicateColumn(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Malformed timestamp {value:?} in row {row}")]
    Unparseable { row: usize, value: String },
    #[error("Timestamp cell is empty in row {0}")]
    Empty(usize),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Detection profile {0} is not defined")]
    UnknownProfile(String),
    #[error("Detection profile {0} has no criteria")]
    EmptyProfile(String),
    #[error("Rolling window is invalid: {0}")]
    InvalidWindow(String),
    #[error("Parameter {name} has invalid value {value}")]
    InvalidParameter { name: String, value: f64 },
    #[error("Range bounds for {0} are inverted or not finite")]
    InvalidRange(Field),
    #[error("Uncertainty pair ({0}, {1}) does not pair a value with its own uncertainty")]
    InvalidUncertaintyPair(Field, Field),
}

#[derive(Debug, Error)]
pub enum SeriesIoError {
    #[error("Series IO failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Series IO failed due to CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Series IO failed due to schema error: {0}")]
    SchemaError(#[from] SchemaError),
    #[error("Series IO failed due to timestamp error: {0}")]
    TimestampError(#[from] TimestampError),
    #[error("Series IO failed to format a timestamp: {0}")]
    FormatError(#[from] time::error::Format),
    #[error("Series IO failed to write YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Could not parse {value:?} in column {column} of row {row} as a number")]
    BadValue {
        row: usize,
        column: Field,
        value: String,
    },
    #[error("Row {0} has a different number of cells than the header")]
    RowLength(usize),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline failed due to configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Pipeline failed due to schema error: {0}")]
    SchemaError(#[from] SchemaError),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Series IO error: {0}")]
    SeriesIoError(#[from] SeriesIoError),
    #[error("Processor failed due to Pipeline error: {0}")]
    PipelineError(#[from] PipelineError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor found no input files at {0:?}")]
    NoInputFiles(PathBuf),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
