use std::collections::BTreeSet;

use anyhow::{Context, Result};
use comfy_table::Table;
use tracing::{info, info_span};

use icu_cli::pipeline::{run_pipeline, write_outputs};
use icu_ingest::load_taxonomy;
use icu_model::{DegeneratePolicy, PipelineConfig, PolicyKind};

use crate::cli::{CategoriesArgs, RunArgs, TopK};
use crate::summary::apply_table_style;
use crate::types::RunResult;

pub fn run_categories(args: &CategoriesArgs) -> Result<()> {
    let taxonomy = load_taxonomy(&args.taxonomy)
        .with_context(|| format!("load taxonomy {}", args.taxonomy.display()))?;
    let mut table = Table::new();
    table.set_header(vec!["Category", "Codes", "Benchmark"]);
    apply_table_style(&mut table);
    for (name, category) in taxonomy.categories() {
        let codes: BTreeSet<&str> = category.codes.iter().map(|code| code.trim()).collect();
        table.add_row(vec![
            name.to_string(),
            codes.len().to_string(),
            if category.use_in_benchmark { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Loads the configuration file, if any, and applies the flag overrides.
pub fn resolve_config(args: &RunArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let selection = &mut config.selection;
    if let Some(scorer) = args.scorer {
        selection.scorer = scorer.into();
    }
    if let Some(TopK(k)) = args.top_k {
        selection.policy = PolicyKind::TopK;
        selection.k = k;
    }
    if let Some(threshold) = args.p_value {
        selection.policy = PolicyKind::PValue;
        selection.threshold = threshold;
    }
    if let Some(threshold) = args.min_score {
        selection.policy = PolicyKind::Score;
        selection.threshold = threshold;
    }
    if args.skip_degenerate {
        selection.on_degenerate = DegeneratePolicy::Skip;
    }
    if let Some(max_age) = args.max_age {
        config.derivation.max_plausible_age = max_age;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

pub fn run_features(args: &RunArgs) -> Result<RunResult> {
    let run_span = info_span!("run", input = %args.input.display());
    let _run_guard = run_span.enter();

    let config = resolve_config(args)?;
    let policy = config.selection.policy()?;
    info!(
        scorer = config.selection.scorer.as_str(),
        policy = %policy,
        dry_run = args.dry_run,
        "pipeline configured"
    );

    let output = run_pipeline(&args.input, &args.taxonomy, &config)?;
    let outputs = if args.dry_run {
        None
    } else {
        Some(write_outputs(&output, &args.output_dir)?)
    };

    Ok(RunResult {
        input: args.input.clone(),
        output_dir: args.output_dir.clone(),
        encounters: output.encounters,
        categories: output.categories,
        candidates: output.candidates,
        scorer: config.selection.scorer,
        policy,
        scores: output.selection.scores,
        selected: output.selection.selected,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use icu_model::{Scorer, SelectionPolicy};

    use crate::cli::{Cli, Command};

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec![
            "icu-features",
            "run",
            "encounters.csv",
            "--taxonomy",
            "taxonomy.yaml",
            "--output-dir",
            "out",
        ];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Run(args) => args,
            Command::Categories(_) => unreachable!(),
        }
    }

    #[test]
    fn defaults_select_by_p_value() {
        let config = resolve_config(&run_args(&[])).unwrap();
        assert_eq!(
            config.selection.policy().unwrap(),
            SelectionPolicy::PValueBelow(0.001)
        );
        assert_eq!(config.selection.on_degenerate, DegeneratePolicy::Fail);
    }

    #[test]
    fn flags_override_selection() {
        let config = resolve_config(&run_args(&[
            "--scorer",
            "mutual-info",
            "--top-k",
            "all",
            "--skip-degenerate",
            "--max-age",
            "95",
        ]))
        .unwrap();
        assert_eq!(config.selection.scorer, Scorer::MutualInfo);
        assert_eq!(config.selection.policy().unwrap(), SelectionPolicy::TopK(None));
        assert_eq!(config.selection.on_degenerate, DegeneratePolicy::Skip);
        assert_eq!(config.derivation.max_plausible_age, 95);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, "[selection]\npolicy = \"top_k\"\nk = 5\n").unwrap();
        let path = path.to_string_lossy().to_string();

        let from_file = resolve_config(&run_args(&["--config", &path])).unwrap();
        assert_eq!(
            from_file.selection.policy().unwrap(),
            SelectionPolicy::TopK(Some(5))
        );

        let overridden = resolve_config(&run_args(&["--config", &path, "--p-value", "0.05"]))
            .unwrap();
        assert_eq!(
            overridden.selection.policy().unwrap(),
            SelectionPolicy::PValueBelow(0.05)
        );
    }

    #[test]
    fn mutual_info_rejects_p_value_policy() {
        let error = resolve_config(&run_args(&["--scorer", "mutual-info"])).unwrap_err();
        assert!(format!("{error:#}").contains("p-value selection"));
    }
}
