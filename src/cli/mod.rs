//! Command-line parsing for the spirometry reference calculator.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! equation code. Vector flags take comma-separated values; `NA` or an empty
//! cell marks a missing value.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::Reference;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "spiro", version, about = "Spirometry reference values (Knudson 1983, Wang 1993)")]
pub struct Cli {
    /// Knudson coefficient table CSV to use instead of the built-in one.
    #[arg(long, global = true, env = "SPIRO_KNUDSON_TABLE", value_name = "CSV")]
    pub knudson_table: Option<PathBuf>,

    /// Wang coefficient table CSV to use instead of the built-in one.
    #[arg(long, global = true, env = "SPIRO_WANG_TABLE", value_name = "CSV")]
    pub wang_table: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Predicted values for one measure.
    Predict(PredictArgs),
    /// Percent of predicted for exactly one observed measure.
    Pct(PctArgs),
    /// Evaluate every subject in a CSV file.
    Batch(BatchArgs),
    /// Print or export a coefficient table.
    Table(TableArgs),
}

/// Subject inputs shared by `predict` and `pct`.
#[derive(Debug, Args, Clone)]
pub struct SubjectArgs {
    /// Reference equations to evaluate.
    #[arg(short = 'r', long, value_enum, default_value_t = Reference::Knudson)]
    pub reference: Reference,

    /// Sex per subject: 1/2 for Knudson, m/f for Wang.
    #[arg(long, value_delimiter = ',', required = true)]
    pub sex: Vec<String>,

    /// Age per subject (years).
    #[arg(long, value_delimiter = ',', required = true)]
    pub age: Vec<String>,

    /// Height per subject: cm for Knudson, metres for Wang.
    #[arg(long, value_delimiter = ',', required = true)]
    pub height: Vec<String>,

    /// Race per subject (Wang only: white, black).
    #[arg(long, value_delimiter = ',')]
    pub race: Vec<String>,

    /// Wang: reuse the 18-year-old coefficients for ages 19 and above.
    #[arg(long)]
    pub adult: bool,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub subjects: SubjectArgs,

    /// Measure to predict; a list must repeat a single value.
    #[arg(short = 'm', long, value_delimiter = ',', required = true)]
    pub measure: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct PctArgs {
    #[command(flatten)]
    pub subjects: SubjectArgs,

    /// Observed FEV1 (L).
    #[arg(long, value_delimiter = ',')]
    pub fev: Option<Vec<String>>,

    /// Observed FVC (L).
    #[arg(long, value_delimiter = ',')]
    pub fvc: Option<Vec<String>>,

    /// Observed FEV1/FVC ratio (Wang only).
    #[arg(long = "fev-fvc", value_delimiter = ',')]
    pub fev_fvc: Option<Vec<String>>,

    /// Observed FEF25-75 (L/s).
    #[arg(long, value_delimiter = ',')]
    pub fef2575: Option<Vec<String>>,

    /// Observed Vmax50 (L/s, Knudson only).
    #[arg(long, value_delimiter = ',')]
    pub vmax50: Option<Vec<String>>,

    /// Observed Vmax75 (L/s, Knudson only).
    #[arg(long, value_delimiter = ',')]
    pub vmax75: Option<Vec<String>>,
}

impl PctArgs {
    /// Observed flags that were supplied, keyed by measure name.
    pub fn observed(&self) -> Vec<(&'static str, &[String])> {
        [
            ("fev", &self.fev),
            ("fvc", &self.fvc),
            ("fev_fvc", &self.fev_fvc),
            ("fef2575", &self.fef2575),
            ("vmax50", &self.vmax50),
            ("vmax75", &self.vmax75),
        ]
        .into_iter()
        .filter_map(|(name, values)| values.as_deref().map(|v| (name, v)))
        .collect()
    }
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    /// Reference equations to evaluate.
    #[arg(short = 'r', long, value_enum, default_value_t = Reference::Knudson)]
    pub reference: Reference,

    /// Subject CSV (columns: id, sex, age, height, race, measure, observed measures).
    #[arg(short = 'f', long, value_name = "CSV")]
    pub input: PathBuf,

    /// Measure to evaluate; percent of predicted if the CSV has a column of that name.
    #[arg(short = 'm', long)]
    pub measure: Option<String>,

    /// Wang: reuse the 18-year-old coefficients for ages 19 and above.
    #[arg(long)]
    pub adult: bool,

    /// Export per-subject results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export results (with run metadata) to JSON.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Only print the summary, not every subject.
    #[arg(long)]
    pub summary_only: bool,
}

#[derive(Debug, Args, Clone)]
pub struct TableArgs {
    /// Which coefficient table.
    #[arg(short = 'r', long, value_enum, default_value_t = Reference::Knudson)]
    pub reference: Reference,

    /// Write the table to CSV instead of printing it.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_comma_separated_vectors() {
        let cli = Cli::parse_from([
            "spiro", "pct", "-r", "wang", "--sex", "m,f", "--age", "10,NA", "--height", "1.4,1.5", "--race",
            "white,black", "--fev-fvc", "0.85,0.9", "--adult",
        ]);
        let Command::Pct(args) = cli.command else {
            panic!("expected pct");
        };
        assert_eq!(args.subjects.reference, Reference::Wang);
        assert_eq!(args.subjects.age, vec!["10", "NA"]);
        assert!(args.subjects.adult);
        let observed = args.observed();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].0, "fev_fvc");
    }

    #[test]
    fn table_override_is_global() {
        let cli = Cli::parse_from(["spiro", "table", "--knudson-table", "k.csv"]);
        assert_eq!(cli.knudson_table, Some(PathBuf::from("k.csv")));
    }
}
