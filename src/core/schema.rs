use std::collections::BTreeMap;

use regex::Regex;
use serde::Deserialize;

use crate::domain::model::{value_to_string, Dataset, Record, ValidationError};
use crate::utils::error::{EtlError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Number,
}

/// Per-column constraints. All checks run against the scalar's string form
/// where that makes sense; CSV-sourced numbers arrive as numeric strings.
#[derive(Debug, Clone)]
pub struct ColumnRule {
    pub name: String,
    pub kind: Option<ColumnType>,
    pub pattern: Option<Regex>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub allowed: Option<Vec<String>>,
}

/// Declarative validation schema. Loaded once per run, never mutated.
#[derive(Debug, Clone)]
pub struct Schema {
    required: Vec<String>,
    columns: Vec<ColumnRule>,
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    properties: BTreeMap<String, PropertyFile>,
}

#[derive(Debug, Deserialize)]
struct PropertyFile {
    #[serde(rename = "type")]
    kind: Option<String>,
    pattern: Option<String>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    #[serde(rename = "enum")]
    allowed: Option<Vec<String>>,
}

impl Schema {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: SchemaFile =
            serde_json::from_str(content).map_err(|e| EtlError::Config {
                message: format!("invalid schema document: {}", e),
            })?;

        let mut columns = Vec::with_capacity(file.properties.len());
        for (name, property) in file.properties {
            let kind = match property.kind.as_deref() {
                None => None,
                Some("string") => Some(ColumnType::String),
                Some("number") => Some(ColumnType::Number),
                Some(other) => {
                    return Err(EtlError::Config {
                        message: format!("unsupported type '{}' for column '{}'", other, name),
                    })
                }
            };
            let pattern = match property.pattern {
                None => None,
                Some(p) => Some(Regex::new(&p).map_err(|e| EtlError::Config {
                    message: format!("invalid pattern for column '{}': {}", name, e),
                })?),
            };
            columns.push(ColumnRule {
                name,
                kind,
                pattern,
                min_length: property.min_length,
                max_length: property.max_length,
                allowed: property.allowed,
            });
        }

        Ok(Self {
            required: file.required,
            columns,
        })
    }

    /// Checks every record and reports the first violation of each invalid
    /// row. Never short-circuits across rows, so the caller always gets the
    /// full per-row report.
    pub fn validate(&self, dataset: &Dataset) -> Vec<ValidationError> {
        dataset
            .records()
            .iter()
            .enumerate()
            .filter_map(|(row, record)| {
                self.first_violation(dataset, record)
                    .map(|message| ValidationError { row, message })
            })
            .collect()
    }

    fn first_violation(&self, dataset: &Dataset, record: &Record) -> Option<String> {
        for field in &self.required {
            match dataset.column_index(field) {
                None => return Some(format!("required field '{}' is missing", field)),
                Some(idx) => {
                    if record.get(idx).map(|v| v.is_null()).unwrap_or(true) {
                        return Some(format!("required field '{}' is null", field));
                    }
                }
            }
        }

        for rule in &self.columns {
            let Some(idx) = dataset.column_index(&rule.name) else {
                continue;
            };
            let Some(value) = record.get(idx) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            if let Some(message) = check_value(rule, value) {
                return Some(message);
            }
        }

        None
    }
}

fn check_value(rule: &ColumnRule, value: &serde_json::Value) -> Option<String> {
    let text = value_to_string(value);

    if let Some(ColumnType::Number) = rule.kind {
        let numeric = value.is_number() || text.parse::<f64>().is_ok();
        if !numeric {
            return Some(format!("field '{}' is not a number: '{}'", rule.name, text));
        }
    }

    if let Some(min) = rule.min_length {
        if text.chars().count() < min {
            return Some(format!(
                "field '{}' is shorter than {} characters",
                rule.name, min
            ));
        }
    }

    if let Some(max) = rule.max_length {
        if text.chars().count() > max {
            return Some(format!(
                "field '{}' is longer than {} characters",
                rule.name, max
            ));
        }
    }

    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(&text) {
            return Some(format!(
                "field '{}' does not match pattern '{}'",
                rule.name, pattern
            ));
        }
    }

    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| a == &text) {
            return Some(format!(
                "field '{}' has value '{}' outside the allowed set",
                rule.name, text
            ));
        }
    }

    None
}
