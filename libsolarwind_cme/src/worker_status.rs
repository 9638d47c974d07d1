use std::fmt;

/// What a worker is currently doing with its file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingStage {
    #[default]
    Reading,
    Cleaning,
    Detecting,
    Writing,
    Done,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProcessingStage::Reading => "reading",
            ProcessingStage::Cleaning => "cleaning",
            ProcessingStage::Detecting => "detecting",
            ProcessingStage::Writing => "writing",
            ProcessingStage::Done => "done",
        };
        write!(f, "{label}")
    }
}

/// Progress message sent from a worker thread to the front end
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    /// Fraction of the worker's subset completed, in [0, 1]
    pub progress: f32,
    pub file_name: String,
    pub worker_id: usize,
    pub stage: ProcessingStage,
}

impl WorkerStatus {
    pub fn new(progress: f32, file_name: &str, worker_id: usize, stage: ProcessingStage) -> Self {
        Self {
            progress,
            file_name: file_name.to_string(),
            worker_id,
            stage,
        }
    }
}
