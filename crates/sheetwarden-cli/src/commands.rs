//! Subcommand handlers
//!
//! Each handler runs one session operation and describes the outcome as a
//! [`Report`]. Writers open the workbook read-write (exclusive lock) and
//! save before returning; readers take no lock.

use anyhow::{Context, Result};
use serde_json::Value;
use sheetwarden::{
    clone_template as clone_workbook, number_format_named, write_rows, AccessMode, CloneMethod,
    CoreError, ExportFormat, ExportMode, LockCoordinator, Preserve, SessionOptions, TypedValue,
    ValidationOptions, ValueKind, WorkbookSession, XlsxCodec, ASSUMPTION_PRESET, MAX_DECIMALS,
};

use crate::output::Report;
use crate::{
    AddAssumptionArgs, AddFormulaArgs, CloneTemplateArgs, CreateNewArgs, ExportSheetArgs,
    InfoArgs, SetValueArgs,
};

fn open_for_write(options: &SessionOptions, file: &std::path::Path) -> Result<WorkbookSession> {
    let mut session = WorkbookSession::new(options.clone());
    session
        .open(file, AccessMode::ReadWrite)
        .with_context(|| format!("Failed to open '{}'", file.display()))?;
    Ok(session)
}

fn open_for_read(options: &SessionOptions, file: &std::path::Path) -> Result<WorkbookSession> {
    let mut session = WorkbookSession::new(options.clone());
    session
        .open(file, AccessMode::ReadOnly)
        .with_context(|| format!("Failed to open '{}'", file.display()))?;
    Ok(session)
}

pub fn create_new(options: &SessionOptions, args: CreateNewArgs) -> Result<Report> {
    let names: Vec<&str> = args
        .sheets
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if args.dry_run {
        let plan = sheetwarden::plan_sheets(&names, &options.sheet_names)?;
        return Report::new("dry_run")
            .field("output", args.output.display().to_string())
            .line(format!("Would create {}", args.output.display()))
            .line(format!("   Sheets: {}", plan.sheets.join(", ")))
            .merge(&plan);
    }

    let mut session = WorkbookSession::new(options.clone());
    let plan = session.create_new(&names)?;
    let saved = session.save_and_close(Some(args.output.as_path()))?;

    let mut report = Report::new("success")
        .field("file", saved.path.display().to_string())
        .field("sheet_count", plan.sheets.len())
        .field("file_size_bytes", saved.bytes_written)
        .line(format!("Created workbook: {}", saved.path.display()))
        .line(format!("   Sheets: {}", plan.sheets.join(", ")));
    for warning in &plan.warnings {
        report = report.line(format!("   Warning: {}", warning));
    }
    report.merge(&plan)
}

pub fn set_value(options: &SessionOptions, args: SetValueArgs) -> Result<Report> {
    let kind: ValueKind = args
        .value_type
        .parse()
        .map_err(sheetwarden::Error::from)?;
    let value = TypedValue::parse(&args.value, kind).map_err(sheetwarden::Error::from)?;

    let mut session = open_for_write(options, &args.file)?;
    session.set_cell_value(
        &args.sheet,
        &args.cell,
        &value,
        args.style.as_deref(),
        args.format.as_deref(),
    )?;
    session.save_and_close(None)?;

    Ok(Report::new("success")
        .field("file", args.file.display().to_string())
        .field("sheet", args.sheet.as_str())
        .field("cell", args.cell.as_str())
        .field("value", value.to_string())
        .field("type", value.kind_name())
        .field("style", args.style.clone())
        .field("number_format", args.format.clone())
        .line(format!(
            "Set {}!{} = {} ({})",
            args.sheet,
            args.cell,
            value,
            value.kind_name()
        )))
}

pub fn add_formula(options: &SessionOptions, args: AddFormulaArgs) -> Result<Report> {
    let validation = ValidationOptions {
        validate_refs: args.validate_refs || !args.no_validate_refs,
        allow_external: args.allow_external,
    };

    let mut session = open_for_write(options, &args.file)?;
    let formula = session.add_formula(
        &args.sheet,
        &args.cell,
        &args.formula,
        validation,
        args.style.as_deref(),
    )?;
    session.save_and_close(None)?;

    let mut report = Report::new("success")
        .field("file", args.file.display().to_string())
        .field("sheet", args.sheet.as_str())
        .field("cell", args.cell.as_str())
        .field("formula", formula.text.as_str())
        .field("classification", formula.class.as_str())
        .field("referenced_sheets", formula.referenced_sheets.clone())
        .field("overrides", formula.overrides.clone())
        .line(format!("Added formula to {}!{}: {}", args.sheet, args.cell, formula.text));
    for overridden in &formula.overrides {
        report = report.line(format!("   Allowed external access: {}", overridden));
    }
    Ok(report)
}

pub fn add_assumption(options: &SessionOptions, args: AddAssumptionArgs) -> Result<Report> {
    let value = TypedValue::parse(&args.value, ValueKind::Number)
        .unwrap_or_else(|_| TypedValue::Text(args.value.clone()));
    let number_format = match args.format.as_deref() {
        Some(format_type) => {
            let decimals = u8::try_from(args.decimals)
                .ok()
                .filter(|d| *d <= MAX_DECIMALS)
                .ok_or(CoreError::InvalidDecimals {
                    actual: args.decimals,
                    max: MAX_DECIMALS,
                })
                .map_err(sheetwarden::Error::from)?;
            Some(number_format_named(format_type, decimals).map_err(sheetwarden::Error::from)?)
        }
        None => None,
    };

    let mut session = open_for_write(options, &args.file)?;
    session.add_assumption(
        &args.sheet,
        &args.cell,
        &value,
        &args.description,
        number_format.as_deref(),
    )?;
    session.save_and_close(None)?;

    let stored = match &value {
        TypedValue::Number(n) => Value::from(*n),
        other => Value::from(other.to_string()),
    };
    Ok(Report::new("success")
        .field("file", args.file.display().to_string())
        .field("sheet", args.sheet.as_str())
        .field("cell", args.cell.as_str())
        .field("value", stored)
        .field("description", args.description.as_str())
        .field("format", args.format.clone())
        .field("number_format", number_format)
        .field("style", ASSUMPTION_PRESET)
        .line(format!(
            "Added assumption {}!{} = {}",
            args.sheet, args.cell, value
        ))
        .line(format!("   {}", args.description)))
}

pub fn export_sheet(options: &SessionOptions, args: ExportSheetArgs) -> Result<Report> {
    let format = match args.format.as_str() {
        "auto" => ExportFormat::from_path(&args.output).ok_or_else(|| {
            sheetwarden::Error::Validation(format!(
                "Cannot infer export format from '{}'; use --format csv or --format json",
                args.output.display()
            ))
        })?,
        other => other.parse()?,
    };
    let mode = if args.include_formulas {
        ExportMode::Formulas
    } else {
        ExportMode::Values
    };

    let session = open_for_read(options, &args.file)?;
    let rows = session.export_range(&args.sheet, args.range.as_deref(), mode)?;
    let range = rows.range().map(|r| r.to_string());
    let report = write_rows(rows, format, &args.output)
        .with_context(|| format!("Failed to write '{}'", args.output.display()))?;

    Ok(Report::new("success")
        .field("source_file", args.file.display().to_string())
        .field("sheet", args.sheet.as_str())
        .field("output_file", args.output.display().to_string())
        .field("range", range)
        .field("included_formulas", args.include_formulas)
        .line(format!(
            "Exported {} rows from {} to {}",
            report.rows_exported,
            args.sheet,
            args.output.display()
        ))
        .merge(&report)?)
}

pub fn clone_template(options: &SessionOptions, args: CloneTemplateArgs) -> Result<Report> {
    let preserve = Preserve {
        values: args.preserve_values,
        formulas: args.preserve_formulas,
        formatting: args.preserve_formatting || !args.no_preserve_formatting,
    };
    let locks = LockCoordinator::from_options(options);
    let cloned = clone_workbook(&XlsxCodec, &locks, &args.source, &args.output, preserve)?;

    let method = match cloned.method {
        CloneMethod::FullCopy => "full copy",
        CloneMethod::SelectiveCopy => "selective copy",
    };
    Report::new("success")
        .line(format!(
            "Cloned {} to {} ({})",
            cloned.source.display(),
            cloned.output.display(),
            method
        ))
        .merge(&cloned)
}

pub fn info(options: &SessionOptions, args: InfoArgs) -> Result<Report> {
    let session = open_for_read(options, &args.file)?;
    let info = session.info()?;

    let mut report = Report::new("success")
        .field("file", args.file.display().to_string())
        .line(format!("{}", args.file.display()));
    for sheet in &info.sheets {
        report = report.line(format!(
            "   {}: {} cells, {} formulas, {} notes, used range {}",
            sheet.name,
            sheet.cells,
            sheet.formulas,
            sheet.notes,
            sheet.used_range.as_deref().unwrap_or("-")
        ));
    }
    report.merge(&info)
}
