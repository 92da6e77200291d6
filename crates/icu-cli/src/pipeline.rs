//! Staged feature pipeline.
//!
//! ingest → derive → diagnoses → quantize → encode → select → output
//!
//! Each stage runs inside its own `info_span!` and logs its row/column counts
//! and elapsed time on completion.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, info, info_span, trace, warn};

use icu_common::string_values;
use icu_ingest::{load_taxonomy, read_encounter_table};
use icu_model::{FeatureScoreReport, PipelineConfig, Taxonomy};
use icu_select::{SelectionResult, select_features};
use icu_transform::{
    CodeLookup, QuartileBoundaries, arrange_feature_columns, benchmark_categories,
    build_indicator_matrix, classify_columns, derive_temporal_features, encode_categorical,
    first_row_per_encounter, merge_indicators, quantize_columns, resolve_diagnoses,
};

use crate::logging::redact_value;

pub const FEATURES_FILE: &str = "features.csv";
pub const SCORES_FILE: &str = "feature_scores.csv";
pub const OUTCOMES_FILE: &str = "outcomes.csv";

/// Everything a pipeline run produces before anything is written.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Distinct encounters in the feature table.
    pub encounters: usize,
    /// Benchmark categories turned into indicator columns, sorted.
    pub categories: Vec<String>,
    /// Codes claimed by more than one taxonomy category.
    pub collisions: usize,
    /// Fitted boundaries per quantized column.
    pub quartiles: Vec<(String, QuartileBoundaries)>,
    /// Columns offered to the scorer.
    pub candidates: usize,
    pub selection: SelectionResult,
    /// Encounter identifier, outcome and selected features, one row per encounter.
    pub features: DataFrame,
    /// Encounter identifier and outcome, one row per encounter.
    pub outcomes: DataFrame,
}

/// Files written by [`write_outputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub features: PathBuf,
    pub scores: PathBuf,
    pub outcomes: PathBuf,
}

/// Diagnosis indicators attached to the feature table.
#[derive(Debug, Clone)]
pub struct DiagnosisStage {
    pub table: DataFrame,
    pub categories: Vec<String>,
    pub collisions: usize,
    /// Encounters with no benchmark diagnosis.
    pub uncategorized: usize,
}

/// Derives the per-encounter feature table from the long-format input.
///
/// Temporal features are computed on every row, then the first row of each
/// encounter is kept and the columns are put in feature order.
pub fn derive_encounter_features(raw: &DataFrame, config: &PipelineConfig) -> Result<DataFrame> {
    let columns = &config.columns;
    let derived = derive_temporal_features(raw, columns, config.derivation.max_plausible_age)
        .context("derive temporal features")?;
    let encounters = first_row_per_encounter(&derived, &columns.encounter_id)
        .context("collapse encounter rows")?;
    arrange_feature_columns(&encounters, columns, &config.derivation.excluded_columns)
        .context("arrange feature columns")
}

/// Resolves every diagnosis row of `raw` and merges the benchmark indicators
/// into `features`.
pub fn attach_diagnoses(
    raw: &DataFrame,
    features: &DataFrame,
    taxonomy: &Taxonomy,
    config: &PipelineConfig,
) -> Result<DiagnosisStage> {
    let columns = &config.columns;
    let lookup = CodeLookup::build(taxonomy, config.taxonomy.collision_policy)
        .context("build diagnosis lookup")?;
    let categories = benchmark_categories(&lookup);
    let diagnoses = resolve_diagnoses(
        raw,
        &columns.encounter_id,
        &columns.diagnosis_code,
        &lookup,
    )
    .context("resolve diagnoses")?;

    let encounter_ids: Vec<String> = string_values(features, &columns.encounter_id)
        .context("read encounter identifiers")?
        .into_iter()
        .flatten()
        .collect();
    let matrix = build_indicator_matrix(&encounter_ids, &categories, &diagnoses)
        .context("build diagnosis indicators")?;

    let mut uncategorized = 0usize;
    for (row, encounter) in matrix.encounter_ids().iter().enumerate() {
        if !(0..categories.len()).any(|column| matrix.get(row, column)) {
            uncategorized += 1;
            trace!(
                encounter_id = %redact_value(encounter),
                "encounter has no benchmark diagnosis"
            );
        }
    }

    let table = merge_indicators(features, &columns.encounter_id, &matrix)
        .context("merge diagnosis indicators")?;
    Ok(DiagnosisStage {
        table,
        categories,
        collisions: lookup.collisions().len(),
        uncategorized,
    })
}

/// Columns to quantize: the configured list, or every Float64 column.
pub fn continuous_columns(df: &DataFrame, config: &PipelineConfig) -> Vec<String> {
    if config.encoding.continuous_columns.is_empty() {
        classify_columns(df).continuous
    } else {
        config.encoding.continuous_columns.clone()
    }
}

/// Runs every stage up to and including selection.
pub fn run_pipeline(
    input: &Path,
    taxonomy_path: &Path,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    let columns = &config.columns;

    let ingest_start = Instant::now();
    let (raw, taxonomy) = info_span!("ingest", input = %input.display()).in_scope(
        || -> Result<(DataFrame, Taxonomy)> {
            let raw = read_encounter_table(input, columns)
                .with_context(|| format!("read encounters {}", input.display()))?;
            let taxonomy = load_taxonomy(taxonomy_path)
                .with_context(|| format!("load taxonomy {}", taxonomy_path.display()))?;
            Ok((raw, taxonomy))
        },
    )?;
    info!(
        rows = raw.height(),
        columns = raw.width(),
        categories = taxonomy.len(),
        duration_ms = ingest_start.elapsed().as_millis(),
        "ingest complete"
    );

    let derive_start = Instant::now();
    let features = info_span!("derive").in_scope(|| derive_encounter_features(&raw, config))?;
    info!(
        encounters = features.height(),
        columns = features.width(),
        duration_ms = derive_start.elapsed().as_millis(),
        "derive complete"
    );

    let diagnoses_start = Instant::now();
    let diagnoses = info_span!("diagnoses")
        .in_scope(|| attach_diagnoses(&raw, &features, &taxonomy, config))?;
    if diagnoses.collisions > 0 {
        warn!(
            collisions = diagnoses.collisions,
            "diagnosis codes claimed by several categories"
        );
    }
    info!(
        categories = diagnoses.categories.len(),
        uncategorized = diagnoses.uncategorized,
        duration_ms = diagnoses_start.elapsed().as_millis(),
        "diagnoses complete"
    );

    let quantize_start = Instant::now();
    let (binned, quartiles) = info_span!("quantize").in_scope(|| -> Result<_> {
        let continuous = continuous_columns(&diagnoses.table, config);
        debug!(columns = ?continuous, "continuous columns");
        quantize_columns(&diagnoses.table, &continuous).context("quantize continuous columns")
    })?;
    info!(
        columns = quartiles.len(),
        duration_ms = quantize_start.elapsed().as_millis(),
        "quantize complete"
    );

    let encode_start = Instant::now();
    let encoded = info_span!("encode").in_scope(|| -> Result<DataFrame> {
        let mut passthrough = vec![columns.encounter_id.clone(), columns.outcome.clone()];
        passthrough.extend(diagnoses.categories.iter().cloned());
        encode_categorical(&binned, &passthrough).context("encode categorical columns")
    })?;
    info!(
        columns = encoded.width(),
        duration_ms = encode_start.elapsed().as_millis(),
        "encode complete"
    );

    let select_start = Instant::now();
    let selection_config = &config.selection;
    let exclude = [columns.encounter_id.clone()];
    let selection = info_span!("select", scorer = selection_config.scorer.as_str()).in_scope(
        || -> Result<SelectionResult> {
            let policy = selection_config.policy()?;
            select_features(
                &encoded,
                &columns.outcome,
                &exclude,
                selection_config.scorer,
                policy,
                selection_config.on_degenerate,
            )
            .context("select features")
        },
    )?;
    info!(
        selected = selection.selected.len(),
        duration_ms = select_start.elapsed().as_millis(),
        "select complete"
    );

    let outcomes = encoded
        .select([columns.encounter_id.as_str(), columns.outcome.as_str()])
        .context("extract outcomes")?;
    let mut features = selection.table.clone();
    features
        .insert_column(0, encoded.column(&columns.encounter_id)?.clone())
        .context("attach encounter identifier to selected features")?;
    Ok(PipelineOutput {
        encounters: encoded.height(),
        categories: diagnoses.categories,
        collisions: diagnoses.collisions,
        quartiles,
        candidates: encoded.width().saturating_sub(exclude.len() + 1),
        selection,
        features,
        outcomes,
    })
}

/// Selected scores as a `feature,p_value,score` table.
pub fn score_table(report: &FeatureScoreReport) -> Result<DataFrame> {
    let features: Vec<&str> = report.feature_names();
    let p_values: Vec<Option<f64>> = report.scores().iter().map(|s| s.p_value).collect();
    let scores: Vec<f64> = report.scores().iter().map(|s| s.score).collect();
    DataFrame::new(vec![
        Series::new("feature".into(), features).into(),
        Series::new("p_value".into(), p_values).into(),
        Series::new("score".into(), scores).into(),
    ])
    .context("build score table")
}

fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), rows = df.height(), "csv written");
    Ok(())
}

/// Writes the selected feature table, the selected scores and the outcomes.
///
/// Both row tables lead with the encounter identifier so they join by key.
pub fn write_outputs(output: &PipelineOutput, output_dir: &Path) -> Result<OutputPaths> {
    let output_start = Instant::now();
    let _guard = info_span!("output", output_dir = %output_dir.display()).entered();
    fs::create_dir_all(output_dir)
        .with_context(|| format!("create output directory {}", output_dir.display()))?;

    let paths = OutputPaths {
        features: output_dir.join(FEATURES_FILE),
        scores: output_dir.join(SCORES_FILE),
        outcomes: output_dir.join(OUTCOMES_FILE),
    };
    write_csv(&output.features, &paths.features)?;
    write_csv(&score_table(&output.selection.selected)?, &paths.scores)?;
    write_csv(&output.outcomes, &paths.outcomes)?;

    info!(
        features = output.selection.selected.len(),
        encounters = output.outcomes.height(),
        duration_ms = output_start.elapsed().as_millis(),
        "output complete"
    );
    Ok(paths)
}
