//! Command-line interface argument parsing.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use log::LevelFilter;

use natality_weeks::config::Config;
use natality_weeks::data::filter::{Interval, RecordFilter};

/// natality-weeks - delivery method by gestational week
///
/// Reads a fixed-width natality extract (or a converted .parquet/.csv
/// extract), filters mothers by age, BMI and education, and tabulates the
/// delivery route × induction mix for every gestational week.
///
/// Examples:
///   natality-weeks report Nat2023us.txt --png delivery_analysis.png
///   natality-weeks report Nat2023us.txt --age 35-38 --bmi 3 --education 6
///   natality-weeks export Nat2023us.parquet -o buckets.json
///   natality-weeks convert Nat2023us.txt Nat2023us.parquet
///   natality-weeks view Nat2023us.parquet
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for natality.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE", env = "NATALITY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print weekly delivery statistics, optionally writing a chart and JSON table
    Report(ReportArgs),

    /// Write the bucketed JSON export (age range → BMI → education → week → category)
    Export(ExportArgs),

    /// Parse an extract once and save it as .parquet or .csv
    Convert {
        /// Source extract
        input: PathBuf,
        /// Destination (.parquet or .csv)
        output: PathBuf,
    },

    /// Open the interactive viewer
    View {
        /// Extract to open on start-up
        input: Option<PathBuf>,
    },

    /// Write a default natality.toml to the current directory
    InitConfig,
}

#[derive(ClapArgs, Debug)]
pub struct ReportArgs {
    /// Natality extract (fixed-width, .parquet or .csv)
    pub input: PathBuf,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Write the stacked-bar chart to this PNG file
    #[arg(long, value_name = "FILE")]
    pub png: Option<PathBuf>,

    /// Write the weekly table to this JSON file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Skip the chart even if the config names one
    #[arg(long, conflicts_with = "png")]
    pub no_chart: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ExportArgs {
    /// Natality extract (fixed-width, .parquet or .csv)
    pub input: PathBuf,

    /// Output JSON file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Gestational weeks to include
    #[arg(long, value_name = "MIN-MAX")]
    pub weeks: Option<Interval>,

    /// Age ranges to slice by (comma-separated)
    ///
    /// Example: --age-ranges 20-29,30-38,39-42
    #[arg(long, value_name = "RANGES", value_delimiter = ',')]
    pub age_ranges: Option<Vec<Interval>>,

    /// BMI categories to slice by (comma-separated codes 1-6, 9)
    #[arg(long, value_name = "CODES", value_delimiter = ',')]
    pub bmi: Option<Vec<u8>>,

    /// Education levels to slice by (comma-separated codes 1-9)
    #[arg(long, value_name = "CODES", value_delimiter = ',')]
    pub education: Option<Vec<u8>>,
}

/// Filter flags shared by commands that tabulate one population.
#[derive(ClapArgs, Debug, Default)]
pub struct FilterArgs {
    /// Mother's age range
    #[arg(long, value_name = "MIN-MAX", conflicts_with = "any_age")]
    pub age: Option<Interval>,

    /// Drop the age constraint
    #[arg(long)]
    pub any_age: bool,

    /// BMI categories (comma-separated codes 1-6, 9)
    #[arg(long, value_name = "CODES", value_delimiter = ',')]
    pub bmi: Option<Vec<u8>>,

    /// Drop the BMI constraint
    #[arg(long, conflicts_with = "bmi")]
    pub any_bmi: bool,

    /// Education levels (comma-separated codes 1-9)
    #[arg(long, value_name = "CODES", value_delimiter = ',')]
    pub education: Option<Vec<u8>>,

    /// Drop the education constraint
    #[arg(long, conflicts_with = "education")]
    pub any_education: bool,

    /// Gestational weeks to tabulate
    #[arg(long, value_name = "MIN-MAX")]
    pub weeks: Option<Interval>,
}

impl FilterArgs {
    /// Overlay the flags on a filter taken from the config file.
    pub fn apply(&self, filter: &mut RecordFilter) {
        if let Some(age) = self.age {
            filter.age = Some(age);
        }
        if self.any_age {
            filter.age = None;
        }
        if let Some(codes) = &self.bmi {
            filter.bmi = Some(codes.iter().copied().collect::<BTreeSet<_>>());
        }
        if self.any_bmi {
            filter.bmi = None;
        }
        if let Some(codes) = &self.education {
            filter.education = Some(codes.iter().copied().collect::<BTreeSet<_>>());
        }
        if self.any_education {
            filter.education = None;
        }
        if let Some(weeks) = self.weeks {
            filter.weeks = weeks;
        }
    }
}

impl ExportArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(ranges) = &self.age_ranges {
            config.buckets.age_ranges = ranges.clone();
        }
        if let Some(codes) = &self.bmi {
            config.buckets.bmi = codes.clone();
        }
        if let Some(codes) = &self.education {
            config.buckets.education = codes.clone();
        }
        if let Some(weeks) = self.weeks {
            config.filter.weeks = weeks;
        }
        if let Some(output) = &self.output {
            config.output.export = output.clone();
        }
    }
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }
}
