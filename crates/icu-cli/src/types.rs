use std::path::PathBuf;

use icu_cli::pipeline::OutputPaths;
use icu_model::{FeatureScoreReport, Scorer, SelectionPolicy};

#[derive(Debug)]
pub struct RunResult {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub encounters: usize,
    pub categories: Vec<String>,
    pub candidates: usize,
    pub scorer: Scorer,
    pub policy: SelectionPolicy,
    pub scores: FeatureScoreReport,
    pub selected: FeatureScoreReport,
    /// `None` on a dry run.
    pub outputs: Option<OutputPaths>,
}
