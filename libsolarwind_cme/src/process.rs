use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use super::aggregator::EventSummary;
use super::config::Config;
use super::constants::{CLEANED_SUFFIX, EVENTS_SUFFIX, INPUT_EXTENSION, PARAMETERS_SUFFIX};
use super::error::{ConfigError, ProcessorError};
use super::pipeline::{clean_series, detect_events};
use super::series_io::{read_series, write_events, write_parameters, write_series, write_summary};
use super::worker_status::{ProcessingStage, WorkerStatus};

fn is_own_output(path: &Path) -> bool {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    [CLEANED_SUFFIX, PARAMETERS_SUFFIX, EVENTS_SUFFIX]
        .iter()
        .any(|suffix| stem.ends_with(suffix))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Gather the series files to process: the input path itself if it is a file, otherwise
/// every .csv in the directory that is not one of our own outputs. Sorted by path.
pub fn collect_input_files(config: &Config) -> Result<Vec<PathBuf>, ProcessorError> {
    if !config.input_path.exists() {
        return Err(ConfigError::BadFilePath(config.input_path.clone()).into());
    }
    if config.input_path.is_file() {
        return Ok(vec![config.input_path.clone()]);
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(&config.input_path)? {
        let path = entry?.path();
        let is_input = path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(INPUT_EXTENSION)
            && !is_own_output(&path);
        if is_input {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(ProcessorError::NoInputFiles(config.input_path.clone()));
    }
    files.sort();
    Ok(files)
}

/// Run the pipeline over one series file and write all of its outputs.
///
/// Progress is reported through the channel as the file moves between stages.
pub fn process_file(
    config: &Config,
    path: &Path,
    tx: &Sender<WorkerStatus>,
    worker_id: &usize,
) -> Result<EventSummary, ProcessorError> {
    let label = file_label(path);
    let file_size = std::fs::metadata(path)?.len();
    log::info!(
        "Processing {} with size {}",
        label,
        human_bytes::human_bytes(file_size as f64)
    );

    tx.send(WorkerStatus::new(0.0, &label, *worker_id, ProcessingStage::Reading))?;
    let series = read_series(path)?;
    log::info!("Read {} samples with {} fields", series.len(), series.fields().len());

    tx.send(WorkerStatus::new(0.25, &label, *worker_id, ProcessingStage::Cleaning))?;
    let (cleaned, report) = clean_series(series, &config.pipeline)?;

    tx.send(WorkerStatus::new(0.5, &label, *worker_id, ProcessingStage::Detecting))?;
    let output = detect_events(cleaned, report, &config.pipeline)?;
    let profile = config.pipeline.detection.active()?;

    tx.send(WorkerStatus::new(0.75, &label, *worker_id, ProcessingStage::Writing))?;
    std::fs::create_dir_all(&config.output_path)?;
    write_series(&config.get_cleaned_file_name(path), &output.cleaned)?;
    write_parameters(
        &config.get_parameters_file_name(path),
        &output.cleaned,
        &output.derived,
        &output.baseline,
        &output.flags,
    )?;
    write_events(&config.get_events_file_name(path), &output.events, profile)?;
    write_summary(&config.get_summary_file_name(path), &output.summary)?;

    tx.send(WorkerStatus::new(1.0, &label, *worker_id, ProcessingStage::Done))?;
    log::info!(
        "Finished {}: {} events written to {}",
        label,
        output.summary.num_events,
        config.output_path.display()
    );
    Ok(output.summary)
}

/// Process every input file of the configuration on a single worker, stopping at the first
/// failure. The CLI divides files among workers with create_subsets and process_subset
/// instead.
pub fn process(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
) -> Result<(), ProcessorError> {
    config.validate()?;
    for file in collect_input_files(&config)? {
        process_file(&config, &file, &tx, &worker_id)?;
    }
    Ok(())
}

/// Process a subset of files. A file that fails is logged and skipped; only a broken
/// progress channel stops the worker.
pub fn process_subset(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
    subset: Vec<PathBuf>,
) -> Result<(), ProcessorError> {
    for file in subset {
        match process_file(&config, &file, &tx, &worker_id) {
            Ok(_) => (),
            Err(ProcessorError::SendError(e)) => return Err(ProcessorError::SendError(e)),
            Err(e) => log::error!("Failed to process {}, skipping: {e}", file.display()),
        }
    }
    Ok(())
}

/// Divide the input files in to a set of subsets (per thread/worker)
pub fn create_subsets(config: &Config, files: &[PathBuf]) -> Vec<Vec<PathBuf>> {
    let mut subsets: Vec<Vec<PathBuf>> = vec![Vec::new(); config.n_threads.max(1) as usize];
    let n_subsets = subsets.len();

    for (idx, file) in files.iter().enumerate() {
        subsets[idx % n_subsets].push(file.clone())
    }

    subsets
}
