//! Cell value types
//!
//! [`CellValue`] is what the workbook model stores. [`TypedValue`] is what a
//! caller hands in: raw text resolved against a [`ValueKind`] before anything
//! touches the model.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Error, Result};

/// Number format applied to date values when the caller gives none
pub const DEFAULT_DATE_FORMAT: &str = "yyyy-mm-dd";

/// Number format applied to date-time values when the caller gives none
pub const DEFAULT_DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Represents the value stored in a cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// String value
    Text(String),

    /// Numeric value (all numbers stored as f64, including dates)
    Number(f64),

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Error value as written in the file (`#REF!`, `#DIV/0!`, ...)
    Error(String),

    /// Formula with the cached result read from the file, if any
    Formula {
        /// Formula text including the leading `=`
        text: String,
        /// Last calculated value. Never computed here, only carried through.
        cached_value: Option<Box<CellValue>>,
    },
}

impl CellValue {
    /// Create a new text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellValue::Text(s.into())
    }

    /// Create a new formula value without a cached result
    pub fn formula<S: Into<String>>(text: S) -> Self {
        CellValue::Formula {
            text: text.into(),
            cached_value: None,
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    /// Get the formula text if this is a formula cell
    pub fn formula_text(&self) -> Option<&str> {
        match self {
            CellValue::Formula { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Get the effective value (cached value for formulas, value otherwise)
    ///
    /// A formula without a cached result has an effective value of `Empty`.
    pub fn effective_value(&self) -> &CellValue {
        match self {
            CellValue::Formula {
                cached_value: Some(v),
                ..
            } => v.effective_value(),
            CellValue::Formula { .. } => &CellValue::Empty,
            _ => self,
        }
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self.effective_value() {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the type name for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Text(_) => "text",
            CellValue::Number(_) => "number",
            CellValue::Boolean(_) => "boolean",
            CellValue::Error(_) => "error",
            CellValue::Formula { .. } => "formula",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Error(e) => write!(f, "{}", e),
            CellValue::Formula { .. } => write!(f, "{}", self.effective_value()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// How caller text should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    /// Integer, then decimal number, then text
    #[default]
    Auto,
    /// Always text
    String,
    /// Decimal number
    Number,
    /// Whole number
    Integer,
    /// ISO-8601 date or date-time
    Date,
}

impl ValueKind {
    /// Lowercase name as accepted by [`FromStr`]
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Auto => "auto",
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Integer => "integer",
            ValueKind::Date => "date",
        }
    }
}

impl FromStr for ValueKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ValueKind::Auto),
            "string" | "text" => Ok(ValueKind::String),
            "number" | "float" => Ok(ValueKind::Number),
            "integer" | "int" => Ok(ValueKind::Integer),
            "date" => Ok(ValueKind::Date),
            _ => Err(Error::UnknownValueKind(s.to_string())),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller-supplied value after type resolution
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(String),
    Number(f64),
    Integer(i64),
    /// Date or date-time; a date alone has a midnight time component
    Date(NaiveDateTime),
}

impl TypedValue {
    /// Resolve raw text against a value kind
    ///
    /// ```
    /// use sheetwarden_core::{TypedValue, ValueKind};
    ///
    /// assert_eq!(TypedValue::parse("42", ValueKind::Auto).unwrap(), TypedValue::Integer(42));
    /// assert_eq!(TypedValue::parse("0.05", ValueKind::Auto).unwrap(), TypedValue::Number(0.05));
    /// assert_eq!(
    ///     TypedValue::parse("Q1", ValueKind::Auto).unwrap(),
    ///     TypedValue::Text("Q1".into())
    /// );
    /// assert!(TypedValue::parse("Q1", ValueKind::Number).is_err());
    /// ```
    pub fn parse(text: &str, kind: ValueKind) -> Result<Self> {
        match kind {
            ValueKind::String => Ok(TypedValue::Text(text.to_string())),
            ValueKind::Number => parse_number(text)
                .map(TypedValue::Number)
                .ok_or_else(|| invalid(text, "number")),
            ValueKind::Integer => text
                .trim()
                .parse::<i64>()
                .map(TypedValue::Integer)
                .map_err(|_| invalid(text, "integer")),
            ValueKind::Date => parse_date(text)
                .map(TypedValue::Date)
                .ok_or_else(|| invalid(text, "date")),
            ValueKind::Auto => {
                let resolved = if text.contains('.') {
                    parse_number(text).map(TypedValue::Number)
                } else {
                    text.trim().parse::<i64>().ok().map(TypedValue::Integer)
                };
                Ok(resolved.unwrap_or_else(|| TypedValue::Text(text.to_string())))
            }
        }
    }

    /// Convert to the value stored in the model. Dates become serial numbers.
    pub fn to_cell_value(&self) -> Result<CellValue> {
        Ok(match self {
            TypedValue::Text(s) => CellValue::Text(s.clone()),
            TypedValue::Number(n) => CellValue::Number(*n),
            TypedValue::Integer(i) => CellValue::Number(*i as f64),
            TypedValue::Date(dt) => CellValue::Number(excel_serial(dt)?),
        })
    }

    /// Number format implied by the value, used when the caller gives none
    pub fn default_number_format(&self) -> Option<&'static str> {
        match self {
            TypedValue::Date(dt) if is_midnight(dt) => Some(DEFAULT_DATE_FORMAT),
            TypedValue::Date(_) => Some(DEFAULT_DATETIME_FORMAT),
            _ => None,
        }
    }

    /// Name of the resolved kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypedValue::Text(_) => "string",
            TypedValue::Number(_) => "number",
            TypedValue::Integer(_) => "integer",
            TypedValue::Date(_) => "date",
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Text(s) => write!(f, "{}", s),
            TypedValue::Number(n) => write!(f, "{}", n),
            TypedValue::Integer(i) => write!(f, "{}", i),
            TypedValue::Date(dt) if is_midnight(dt) => {
                write!(f, "{}", dt.date().format("%Y-%m-%d"))
            }
            TypedValue::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

fn is_midnight(dt: &NaiveDateTime) -> bool {
    dt.time().num_seconds_from_midnight() == 0 && dt.time().nanosecond() == 0
}

fn invalid(text: &str, kind: &'static str) -> Error {
    Error::InvalidValue {
        text: text.to_string(),
        kind,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// Convert a date-time to an Excel serial number (1900 date system)
///
/// Excel counts 1900-02-29 as a real day, so serials from 1900-03-01 onward
/// are days since 1899-12-30 and earlier ones are days since 1899-12-31.
pub fn excel_serial(dt: &NaiveDateTime) -> Result<f64> {
    let out_of_range = || invalid(&dt.to_string(), "date on or after 1900-01-01");

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).ok_or_else(out_of_range)?;
    let first = NaiveDate::from_ymd_opt(1900, 1, 1).ok_or_else(out_of_range)?;
    let leap_bug = NaiveDate::from_ymd_opt(1900, 3, 1).ok_or_else(out_of_range)?;

    let date = dt.date();
    if date < first {
        return Err(out_of_range());
    }

    let mut days = date.signed_duration_since(epoch).num_days();
    if date < leap_bug {
        days -= 1;
    }

    let seconds = dt.time().num_seconds_from_midnight() as f64;
    Ok(days as f64 + seconds / SECONDS_PER_DAY)
}
