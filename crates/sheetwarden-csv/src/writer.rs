//! CSV writer

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::CsvResult;
use crate::options::CsvWriteOptions;
use sheetwarden_core::CellValue;

/// CSV writer for exported rows
///
/// Each row is a sequence of cell values. Formula cells are written as
/// their formula text; every other value uses its display form, with
/// `Empty` as an empty field.
pub struct CsvWriter;

impl CsvWriter {
    /// Write rows to a CSV file, returning the number of records written
    pub fn write_file<P, I, R>(rows: I, path: P, options: &CsvWriteOptions) -> CsvResult<usize>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = CellValue>,
    {
        let file = File::create(path)?;
        Self::write(rows, BufWriter::new(file), options)
    }

    /// Write rows to a writer, returning the number of records written
    pub fn write<W, I, R>(rows: I, writer: W, options: &CsvWriteOptions) -> CsvResult<usize>
    where
        W: Write,
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = CellValue>,
    {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .terminator(options.line_terminator.into())
            // Rows may be ragged when the caller trims trailing blanks
            .flexible(true)
            .from_writer(writer);

        let mut count = 0;
        for row in rows {
            let record: Vec<String> = row.into_iter().map(|v| field(&v)).collect();
            csv_writer.write_record(&record)?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }
}

fn field(value: &CellValue) -> String {
    match value {
        CellValue::Formula { text, .. } => text.clone(),
        other => other.to_string(),
    }
}
