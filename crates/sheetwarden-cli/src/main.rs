//! sheetwarden CLI - locked, validated workbook edits

mod commands;
mod exit_codes;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use sheetwarden::SessionOptions;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "sheetwarden")]
#[command(author, version, about = "Safe, locked edits to Excel workbooks")]
struct Cli {
    /// Print a single JSON value on stdout
    #[arg(long, global = true)]
    json: bool,

    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// How long to wait for another process's lock
    #[arg(
        long,
        global = true,
        env = "SHEETWARDEN_LOCK_TIMEOUT_MS",
        default_value_t = 10_000
    )]
    lock_timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a workbook with the given sheets
    CreateNew(CreateNewArgs),
    /// Write a value into a cell
    SetValue(SetValueArgs),
    /// Validate a formula and write it into a cell
    AddFormula(AddFormulaArgs),
    /// Write a highlighted, annotated model assumption
    AddAssumption(AddAssumptionArgs),
    /// Export a sheet or range to CSV or JSON
    ExportSheet(ExportSheetArgs),
    /// Copy a workbook, optionally clearing values, formulas or formatting
    CloneTemplate(CloneTemplateArgs),
    /// Summarize a workbook
    Info(InfoArgs),
}

#[derive(Args)]
struct CreateNewArgs {
    /// Output workbook path
    #[arg(long)]
    output: PathBuf,
    /// Comma-separated sheet names
    #[arg(long)]
    sheets: String,
    /// Validate and sanitize names without writing anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct SetValueArgs {
    /// Workbook path
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    sheet: String,
    /// Cell reference, e.g. B10
    #[arg(long)]
    cell: String,
    #[arg(long, allow_hyphen_values = true)]
    value: String,
    /// auto, string, number, integer or date
    #[arg(long = "type", default_value = "auto")]
    value_type: String,
    /// Style preset name
    #[arg(long)]
    style: Option<String>,
    /// Number format pattern, e.g. 0.0%
    #[arg(long)]
    format: Option<String>,
}

#[derive(Args)]
struct AddFormulaArgs {
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    sheet: String,
    #[arg(long)]
    cell: String,
    /// Formula text; the leading = is optional
    #[arg(long, allow_hyphen_values = true)]
    formula: String,
    /// Require Sheet! references to name existing sheets (default)
    #[arg(long, overrides_with = "no_validate_refs")]
    validate_refs: bool,
    /// Skip the sheet-reference check
    #[arg(long)]
    no_validate_refs: bool,
    /// Permit blocked functions and external links
    #[arg(long)]
    allow_external: bool,
    #[arg(long)]
    style: Option<String>,
}

#[derive(Args)]
struct AddAssumptionArgs {
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    sheet: String,
    #[arg(long)]
    cell: String,
    /// Numeric values are stored as numbers, anything else as text
    #[arg(long, allow_hyphen_values = true)]
    value: String,
    /// Note attached to the cell
    #[arg(long)]
    description: String,
    /// currency, percent, number or accounting
    #[arg(long)]
    format: Option<String>,
    #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
    decimals: i64,
}

#[derive(Args)]
struct ExportSheetArgs {
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    sheet: String,
    #[arg(long)]
    output: PathBuf,
    /// Range such as A1:D20; defaults to the used range
    #[arg(long)]
    range: Option<String>,
    /// csv, json or auto (from the output extension)
    #[arg(long, default_value = "auto")]
    format: String,
    /// Export formula text instead of cached values
    #[arg(long)]
    include_formulas: bool,
}

#[derive(Args)]
struct CloneTemplateArgs {
    #[arg(long)]
    source: PathBuf,
    #[arg(long)]
    output: PathBuf,
    #[arg(long)]
    preserve_values: bool,
    #[arg(long)]
    preserve_formulas: bool,
    /// Keep styles and number formats (default)
    #[arg(long, overrides_with = "no_preserve_formatting")]
    preserve_formatting: bool,
    #[arg(long)]
    no_preserve_formatting: bool,
}

#[derive(Args)]
struct InfoArgs {
    #[arg(long)]
    file: PathBuf,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Usage errors exit 1; 2 is reserved for security rejections
            return if e.use_stderr() {
                ExitCode::from(EXIT_ERROR)
            } else {
                ExitCode::from(EXIT_SUCCESS)
            };
        }
    };
    init_logging(cli.verbose);

    let options = SessionOptions::default()
        .with_lock_timeout(Duration::from_millis(cli.lock_timeout_ms));

    let result = match cli.command {
        Commands::CreateNew(args) => commands::create_new(&options, args),
        Commands::SetValue(args) => commands::set_value(&options, args),
        Commands::AddFormula(args) => commands::add_formula(&options, args),
        Commands::AddAssumption(args) => commands::add_assumption(&options, args),
        Commands::ExportSheet(args) => commands::export_sheet(&options, args),
        Commands::CloneTemplate(args) => commands::clone_template(&options, args),
        Commands::Info(args) => commands::info(&options, args),
    };

    match result {
        Ok(report) => {
            report.print(cli.json);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(err) => {
            let err = output::CliError::from(err);
            err.print(cli.json);
            ExitCode::from(err.code)
        }
    }
}
