//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - assembles subjects from flags or a CSV file
//! - evaluates the reference equations
//! - prints reports and writes optional exports

use std::collections::BTreeMap;

use clap::Parser;

use crate::cli::{BatchArgs, Cli, Command, PctArgs, PredictArgs, SubjectArgs, TableArgs};
use crate::domain::{BatchConfig, Reference, TableSources};
use crate::error::AppError;
use crate::io::ingest::{RowNote, SubjectBatch, is_na, load_subjects, parse_cell};

pub mod pipeline;

use pipeline::{RunOutput, Selection};

/// Entry point for the `spiro` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let tables = TableSources {
        knudson: cli.knudson_table.clone(),
        wang: cli.wang_table.clone(),
    };

    match cli.command {
        Command::Predict(args) => handle_predict(args, &tables),
        Command::Pct(args) => handle_pct(args, &tables),
        Command::Batch(args) => handle_batch(&batch_config_from_args(&args, &tables)),
        Command::Table(args) => handle_table(args, &tables),
    }
}

fn handle_predict(args: PredictArgs, tables: &TableSources) -> Result<(), AppError> {
    let batch = subjects_from_args(&args.subjects)?;
    let run = pipeline::evaluate(
        &batch,
        Selection::Predicted(args.measure),
        args.subjects.reference,
        args.subjects.adult,
        tables,
    )?;
    print_run(&run, true);
    Ok(())
}

fn handle_pct(args: PctArgs, tables: &TableSources) -> Result<(), AppError> {
    let batch = subjects_from_args(&args.subjects)?;
    let observed: BTreeMap<String, Vec<Option<f64>>> = args
        .observed()
        .into_iter()
        .map(|(name, values)| (name.to_string(), values.iter().map(|v| parse_cell(v)).collect()))
        .collect();

    let run = pipeline::evaluate(
        &batch,
        Selection::Pct(observed),
        args.subjects.reference,
        args.subjects.adult,
        tables,
    )?;
    print_run(&run, true);
    Ok(())
}

fn handle_batch(config: &BatchConfig) -> Result<(), AppError> {
    let batch = load_subjects(&config.input, config.reference)?;
    log::info!("read {} subject rows from {}", batch.rows_read, config.input.display());

    let selection = pipeline::select_for_batch(&batch, config.measure.as_deref());
    let run = pipeline::evaluate(&batch, selection, config.reference, config.adult_mode, &config.tables)?;
    print_run(&run, config.print_rows);

    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, &run.results)?;
    }
    if let Some(path) = &config.export_json {
        crate::io::export::write_results_json(
            path,
            run.reference,
            &run.measure,
            run.adult_mode,
            &run.warnings,
            &run.results,
        )?;
    }

    Ok(())
}

fn handle_table(args: TableArgs, tables: &TableSources) -> Result<(), AppError> {
    match args.reference {
        Reference::Knudson => {
            let table = pipeline::knudson_table(tables)?;
            match &args.export {
                Some(path) => crate::io::table::write_table_csv(path, &table)?,
                None => println!("{}", crate::report::format_knudson_table(&table)),
            }
        }
        Reference::Wang => {
            let table = pipeline::wang_table(tables)?;
            match &args.export {
                Some(path) => crate::io::table::write_table_csv(path, &table)?,
                None => println!("{}", crate::report::format_wang_table(&table)),
            }
        }
    }
    Ok(())
}

fn print_run(run: &RunOutput, print_rows: bool) {
    println!("{}", crate::report::format_summary(run));
    if print_rows {
        println!("{}", crate::report::format_results(&run.results, run.with_pct));
    }
}

pub fn batch_config_from_args(args: &BatchArgs, tables: &TableSources) -> BatchConfig {
    BatchConfig {
        reference: args.reference,
        input: args.input.clone(),
        measure: args.measure.clone(),
        adult_mode: args.adult,
        tables: tables.clone(),
        print_rows: !args.summary_only,
        export_results: args.export.clone(),
        export_json: args.json.clone(),
    }
}

/// Build a subject batch from comma-separated flag vectors.
///
/// Subjects are numbered from 1. `NA`/empty cells are missing values; a cell
/// that is not a number is missing too and gets an input note.
pub fn subjects_from_args(args: &SubjectArgs) -> Result<SubjectBatch, AppError> {
    let n = args.sex.len();
    if n == 0 {
        return Err(AppError::new(3, "No subjects to evaluate."));
    }

    let mut row_notes = Vec::new();
    let age = numeric_flag("age", &args.age, &mut row_notes);
    let height = numeric_flag("height", &args.height, &mut row_notes);

    // An omitted --race is an all-missing vector of the right length; Knudson
    // ignores race entirely.
    let race = if args.race.is_empty() {
        vec![None; n]
    } else {
        text_flag(&args.race)
    };

    Ok(SubjectBatch {
        ids: (1..=n).map(|i| i.to_string()).collect(),
        sex: text_flag(&args.sex),
        age,
        height,
        race,
        measure: None,
        observed: BTreeMap::new(),
        row_notes,
        rows_read: n,
    })
}

fn text_flag(values: &[String]) -> Vec<Option<String>> {
    values
        .iter()
        .map(|v| if is_na(v) { None } else { Some(v.trim().to_string()) })
        .collect()
}

fn numeric_flag(name: &str, values: &[String], notes: &mut Vec<RowNote>) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let parsed = parse_cell(v);
            if parsed.is_none() && !is_na(v) {
                notes.push(RowNote {
                    line: i + 1,
                    id: Some((i + 1).to_string()),
                    message: format!("{name}: could not parse '{}'", v.trim()),
                });
            }
            parsed
        })
        .collect()
}
