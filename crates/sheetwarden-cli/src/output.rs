//! Result and error rendering
//!
//! With `--json`, stdout carries exactly one JSON value for success and
//! failure alike; logs and human-readable errors go to stderr.

use serde_json::{json, Map, Value};
use sheetwarden::ErrorKind;

use crate::exit_codes::{EXIT_ERROR, EXIT_SECURITY};

const SECURITY_HINT: &str = "Use --allow-external to explicitly permit dangerous operations";
const LOCK_HINT: &str =
    "Another process is editing this workbook; retry later or raise --lock-timeout-ms";

/// Successful command output
#[derive(Debug)]
pub struct Report {
    /// `status` plus command-specific fields
    pub json: Map<String, Value>,
    /// Lines printed without `--json`
    pub lines: Vec<String>,
}

impl Report {
    pub fn new(status: &str) -> Self {
        let mut json = Map::new();
        json.insert("status".into(), Value::from(status));
        Self {
            json,
            lines: Vec::new(),
        }
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.json.insert(key.into(), value.into());
        self
    }

    /// Merge every field of a serializable report
    pub fn merge<T: serde::Serialize>(mut self, report: &T) -> anyhow::Result<Self> {
        if let Value::Object(fields) = serde_json::to_value(report)? {
            self.json.extend(fields);
        }
        Ok(self)
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn print(&self, json: bool) {
        if json {
            println!("{}", Value::Object(self.json.clone()));
        } else {
            for line in &self.lines {
                println!("{}", line);
            }
        }
    }
}

/// A failed command, ready to report
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub kind: &'static str,
    pub message: String,
    pub hint: Option<&'static str>,
}

impl CliError {
    pub fn to_json(&self) -> Value {
        let status = if self.code == EXIT_SECURITY {
            "security_error"
        } else {
            "error"
        };
        let mut value = json!({
            "status": status,
            "error": self.message,
            "error_type": self.kind,
        });
        if let (Some(hint), Some(obj)) = (self.hint, value.as_object_mut()) {
            obj.insert("hint".into(), Value::from(hint));
        }
        value
    }

    pub fn print(&self, json: bool) {
        if json {
            println!("{}", self.to_json());
        } else {
            eprintln!("error: {}", self.message);
            if let Some(hint) = self.hint {
                eprintln!("hint:  {}", hint);
            }
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{:#}", err);
        match err.downcast_ref::<sheetwarden::Error>() {
            Some(e) => {
                let kind = e.kind();
                CliError {
                    code: if e.is_security_violation() {
                        EXIT_SECURITY
                    } else {
                        EXIT_ERROR
                    },
                    kind: kind.as_str(),
                    message,
                    hint: match kind {
                        ErrorKind::Security => Some(SECURITY_HINT),
                        ErrorKind::Lock => Some(LOCK_HINT),
                        _ => None,
                    },
                }
            }
            None => CliError {
                code: EXIT_ERROR,
                kind: ErrorKind::Validation.as_str(),
                message,
                hint: None,
            },
        }
    }
}
