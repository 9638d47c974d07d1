//! # solarwind_cme_cli
//!
//! Part of the solarwind_cme crate family.
//!
//! Command line front end: cleans every series named by a configuration file and writes
//! the cleaned series, derived parameters and detected events.
//!
//! ## Use
//!
//! ```bash
//! solarwind_cme_cli -p config.yml new   # write a template configuration
//! solarwind_cme_cli -p config.yml       # run
//! ```
//!
//! Log output goes to the terminal and to `solarwind_cme.log` in the working directory.
use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use libsolarwind_cme::config::Config;
use libsolarwind_cme::process::{collect_input_files, create_subsets, process_subset};
use libsolarwind_cme::worker_status::{ProcessingStage, WorkerStatus};

const LOG_FILE: &str = "solarwind_cme.log";

fn make_template_config(path: &Path) {
    match Config::default().write_config_file(path) {
        Ok(()) => log::info!("Done."),
        Err(e) => log::error!("Could not write template config: {e}"),
    }
}

/// Per-worker progress: one bar covering the worker's whole subset
struct WorkerBar {
    bar: ProgressBar,
    completed: u64,
}

impl WorkerBar {
    fn update(&mut self, status: &WorkerStatus) {
        if status.stage == ProcessingStage::Done {
            self.completed += 1;
            self.bar.set_position(self.completed * 100);
        } else {
            self.bar
                .set_position(self.completed * 100 + (status.progress * 100.0) as u64);
        }
        self.bar
            .set_message(format!("{} ({})", status.file_name, status.stage));
    }
}

fn main() {
    // Create a cli
    let matches = Command::new("solarwind_cme_cli")
        .about("Clean solar wind plasma series and detect CME signatures")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Initialize feedback
    let mut loggers: Vec<Box<dyn simplelog::SharedLogger>> = vec![simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];
    match File::create(LOG_FILE) {
        Ok(file) => loggers.push(simplelog::WriteLogger::new(
            simplelog::LevelFilter::Info,
            simplelog::Config::default(),
            file,
        )),
        Err(e) => eprintln!("Could not create log file {LOG_FILE}: {e}"),
    }
    let logger = simplelog::CombinedLogger::new(loggers);

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(path) => PathBuf::from(path),
        None => {
            log::error!("A configuration path is required");
            return;
        }
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        make_template_config(&config_path);
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    if let Err(e) = config.validate() {
        log::error!("Invalid configuration: {e}");
        return;
    }
    log::info!("Config successfully loaded.");
    log::info!("Input Path: {}", config.input_path.to_string_lossy());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    log::info!(
        "Detection Profile: {}",
        config.pipeline.detection.active_profile
    );
    log::info!("Number of Workers: {}", config.n_threads);

    let files = match collect_input_files(&config) {
        Ok(f) => f,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Found {} input files", files.len());

    // Setup the progress bars and spawn the workers
    let style = ProgressStyle::with_template("{prefix} [{bar:40.cyan/blue}] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    let mut bars: Vec<Option<WorkerBar>> = Vec::new();
    let mut workers = Vec::new();
    for (idx, subset) in create_subsets(&config, &files).into_iter().enumerate() {
        // Dont make empty workers
        if subset.is_empty() {
            bars.push(None);
            continue;
        }
        let bar = pb_manager.add(ProgressBar::new(subset.len() as u64 * 100));
        bar.set_style(style.clone());
        bar.set_prefix(format!("Worker {idx}"));
        bars.push(Some(WorkerBar { bar, completed: 0 }));

        let conf = config.clone();
        let tx = tx.clone();
        workers.push(std::thread::spawn(move || {
            process_subset(conf, tx, idx, subset)
        }));
    }
    // Only the workers hold senders now; the channel closes when they are all done
    drop(tx);

    loop {
        match rx.recv_timeout(Duration::from_millis(250)) {
            Ok(status) => {
                if let Some(Some(worker_bar)) = bars.get_mut(status.worker_id) {
                    worker_bar.update(&status);
                }
            }
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    for worker in workers {
        match worker.join() {
            Ok(Ok(())) => (),
            Ok(Err(e)) => log::error!("Processing failed with error: {e}"),
            Err(_) => log::error!("Failed to join processing task!"),
        }
    }

    for worker_bar in bars.into_iter().flatten() {
        worker_bar.bar.finish();
    }

    log::info!("Done.");
}
