//! Codeshift CLI - release transition analysis for coded classifications
//!
//! Classifies the changes between consecutive releases of a terminology such
//! as OPS or ICD-10-GM from the publisher's crosswalk files.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Parse a field delimiter; accepts a single character, `tab` or `\t`.
fn parse_delimiter(s: &str) -> Result<char, String> {
    if s == "tab" || s == "\\t" {
        return Ok('\t');
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c),
        _ => Err(format!(
            "delimiter must be a single ASCII character, got '{}'",
            s
        )),
    }
}

mod commands;
mod config;
mod output;

use commands::*;
use config::CodeshiftConfig;
use output::{OutputConfig, OutputFormat};

/// Release transition analysis for coded medical classifications.
///
/// Reads the old and new release tables and the crosswalk between them,
/// and classifies every change as addition, deletion, replacement, split
/// or merge, together with the accompanying label changes.
#[derive(Parser)]
#[command(name = "codeshift")]
#[command(author, version)]
#[command(about = "Release transition analysis for coded medical classifications")]
#[command(propagate_version = true)]
#[command(next_help_heading = "Options")]
#[command(after_help = "Examples:
  codeshift release data/ops/2010             Classify one release folder
  codeshift release data/ops/2010 --change split
  codeshift batch data/ops                    Analyse all releases in properties.csv
  codeshift batch data/icd10gm --format csv   Print the yearly report as CSV")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Borderless tables and single-line JSON
    #[arg(long, global = true)]
    compact: bool,

    /// Never truncate long codes or labels in tables
    #[arg(long, global = true)]
    no_truncate: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse every release listed in a terminology's properties.csv
    #[command(visible_alias = "b")]
    Batch {
        /// Terminology root folder containing properties.csv
        path: String,

        /// Terminology name (defaults to the root folder name)
        #[arg(short, long)]
        terminology: Option<String>,

        /// Report file (default: <root>/eval_<root name>.csv)
        #[arg(short, long)]
        output: Option<String>,

        /// Analyse releases one after another
        #[arg(long)]
        sequential: bool,
    },

    /// Analyse a single release folder
    #[command(visible_alias = "r")]
    Release {
        /// Folder with the old table, new table and crosswalk
        path: String,

        /// Terminology name (defaults to the parent folder name, then ops)
        #[arg(short, long)]
        terminology: Option<String>,

        /// Field delimiter of the input files
        #[arg(short, long, default_value = ";", value_parser = parse_delimiter)]
        delimiter: char,

        /// Text encoding of the input files
        #[arg(short, long, default_value = "UTF-8")]
        encoding: String,

        /// Zero-based crosswalk column of the old code
        #[arg(long, default_value = "0")]
        old_column: usize,

        /// Zero-based crosswalk column of the new code
        #[arg(long, default_value = "1")]
        new_column: usize,

        /// Only list records of this semantic category
        #[arg(short, long, value_enum)]
        change: Option<release::ChangeFilter>,
    },
}

impl Commands {
    fn path(&self) -> &str {
        match self {
            Commands::Batch { path, .. } | Commands::Release { path, .. } => path,
        }
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

/// Combine command-line flags with the `[output]` section of the config.
fn output_config(
    format: OutputFormat,
    compact: bool,
    no_truncate: bool,
    config: &CodeshiftConfig,
) -> OutputConfig {
    let mut output = OutputConfig::auto_detect(format, config.use_color());
    if compact || config.compact() {
        output = output.compact();
    }
    if no_truncate {
        output = output.without_truncation();
    }
    if let Some(width) = config.width() {
        output = output.with_width(width);
    }
    output
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    // Load the nearest .codeshiftrc.toml from the analysed folder upwards
    let config = CodeshiftConfig::discover(Path::new(command.path()));

    // Resolve output format: CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });
    let output = output_config(format, cli.compact, cli.no_truncate, &config);

    match command {
        Commands::Batch {
            path,
            terminology,
            output: report,
            sequential,
        } => {
            let args = batch::BatchArgs {
                terminology,
                output: report,
                sequential,
            };
            batch::run(&path, &args, &config, output)
        }
        Commands::Release {
            path,
            terminology,
            delimiter,
            encoding,
            old_column,
            new_column,
            change,
        } => {
            let args = release::ReleaseArgs {
                terminology,
                delimiter,
                encoding,
                old_column,
                new_column,
                change,
            };
            release::run(&path, &args, &config, output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";"), Ok(';'));
        assert_eq!(parse_delimiter("tab"), Ok('\t'));
        assert_eq!(parse_delimiter("\\t"), Ok('\t'));
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("§").is_err());
    }

    #[test]
    fn test_output_config_from_flags_and_config() {
        let config: CodeshiftConfig = toml::from_str("[output]\nwidth = 100\n").unwrap();

        let output = output_config(OutputFormat::Table, true, true, &config);
        assert!(output.compact);
        assert!(output.no_truncate);
        assert_eq!(output.effective_width(), 100);

        let config: CodeshiftConfig = toml::from_str("[output]\ncompact = true\n").unwrap();
        let output = output_config(OutputFormat::Json, false, false, &config);
        assert!(output.compact);
        assert_eq!(output.width, None);
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
