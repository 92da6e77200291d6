use std::collections::HashSet;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use icu_model::FeatureScore;

use crate::types::RunResult;

/// Rows shown in the ranked score preview.
const PREVIEW_ROWS: usize = 20;

pub fn print_summary(result: &RunResult) {
    println!("Input: {}", result.input.display());
    match &result.outputs {
        Some(outputs) => {
            println!("Output: {}", result.output_dir.display());
            println!("Features: {}", outputs.features.display());
            println!("Scores: {}", outputs.scores.display());
            println!("Outcomes: {}", outputs.outcomes.display());
        }
        None => println!("Output: dry run, nothing written"),
    }
    println!("Encounters: {}", result.encounters);
    println!(
        "Benchmark categories: {} ({})",
        result.categories.len(),
        result.categories.join(", ")
    );
    println!("Scorer: {}  Policy: {}", result.scorer.as_str(), result.policy);

    let selected: HashSet<&str> = result.selected.feature_names().into_iter().collect();
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Rank"),
        header_cell("Feature"),
        header_cell("Score"),
        header_cell("p-value"),
        header_cell("Selected"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    for (rank, score) in result.scores.scores().iter().take(PREVIEW_ROWS).enumerate() {
        table.add_row(score_row(rank + 1, score, selected.contains(score.feature.as_str())));
    }
    if result.scores.len() > PREVIEW_ROWS {
        table.add_row(vec![
            dim_cell("…"),
            dim_cell(format!("{} more", result.scores.len() - PREVIEW_ROWS)),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
        ]);
    }
    println!("{table}");
    println!(
        "Selected {} of {} candidate features",
        result.selected.len(),
        result.candidates
    );

    let degenerate = result.scores.degenerate();
    if !degenerate.is_empty() {
        eprintln!("Skipped features:");
        for feature in degenerate {
            eprintln!("- {} ({})", feature.feature, feature.reason);
        }
    }
}

fn score_row(rank: usize, score: &FeatureScore, selected: bool) -> Vec<Cell> {
    let p_value = match score.p_value {
        Some(p) => Cell::new(format!("{p:.3e}")),
        None => dim_cell("-"),
    };
    let marker = if selected {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        dim_cell("-")
    };
    vec![
        Cell::new(rank),
        Cell::new(&score.feature),
        Cell::new(format!("{:.4}", score.score)),
        p_value,
        marker,
    ]
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
