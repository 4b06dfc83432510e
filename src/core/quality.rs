use std::collections::HashMap;

use crate::domain::model::{value_to_string, Dataset};
use crate::utils::error::{EtlError, Result};

/// Post-load quality gates: which fields must never be null, and which field
/// combination must be unique within one logical run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityPolicy {
    pub identity_fields: Vec<String>,
    pub uniqueness_key: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityReport {
    pub null_identity_count: usize,
    pub duplicate_count: usize,
}

impl QualityReport {
    /// Null-identity violations are reported before duplicates, matching the
    /// check order. The run fails with the violating count; nothing is
    /// auto-repaired.
    pub fn into_result(self) -> Result<()> {
        if self.null_identity_count > 0 {
            return Err(EtlError::QualityCheck {
                message: format!(
                    "found {} records with null values in required identity fields",
                    self.null_identity_count
                ),
            });
        }
        if self.duplicate_count > 0 {
            return Err(EtlError::QualityCheck {
                message: format!(
                    "found {} duplicate record groups under the uniqueness key",
                    self.duplicate_count
                ),
            });
        }
        Ok(())
    }
}

pub fn check(dataset: &Dataset, policy: &QualityPolicy) -> QualityReport {
    QualityReport {
        null_identity_count: null_identity_count(dataset, &policy.identity_fields),
        duplicate_count: duplicate_count(dataset, &policy.uniqueness_key),
    }
}

/// Rows where any identity field is null. A field missing from the column
/// set counts as null for every row.
fn null_identity_count(dataset: &Dataset, identity_fields: &[String]) -> usize {
    let indices: Vec<Option<usize>> = identity_fields
        .iter()
        .map(|f| dataset.column_index(f))
        .collect();

    dataset
        .records()
        .iter()
        .filter(|record| {
            indices.iter().any(|idx| match idx {
                None => true,
                Some(i) => record.get(*i).map(|v| v.is_null()).unwrap_or(true),
            })
        })
        .count()
}

/// Number of key groups that occur more than once.
fn duplicate_count(dataset: &Dataset, uniqueness_key: &[String]) -> usize {
    if uniqueness_key.is_empty() {
        return 0;
    }
    let indices: Vec<Option<usize>> = uniqueness_key
        .iter()
        .map(|f| dataset.column_index(f))
        .collect();

    let mut groups: HashMap<Vec<Option<String>>, usize> = HashMap::new();
    for record in dataset.records() {
        let key: Vec<Option<String>> = indices
            .iter()
            .map(|idx| {
                idx.and_then(|i| record.get(i)).and_then(|v| {
                    if v.is_null() {
                        None
                    } else {
                        Some(value_to_string(v))
                    }
                })
            })
            .collect();
        *groups.entry(key).or_insert(0) += 1;
    }

    groups.values().filter(|&&count| count > 1).count()
}
