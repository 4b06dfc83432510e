use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::domain::model::{value_to_string, Dataset, Record};
use crate::utils::error::{EtlError, Result};

/// Number of hex characters kept from the SHA-256 digest. Truncation is
/// deliberate and collision-bearing; the output is pseudonymous, not unique.
const HASH_PREFIX_LEN: usize = 16;

const GENERALIZED_PLACEHOLDER: &str = "Generalized Location";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Hash,
    Mask,
    Generalize,
}

impl TransformKind {
    /// Unknown kinds are a configuration error and surface here, before any
    /// row is processed.
    pub fn parse(column: &str, kind: &str) -> Result<Self> {
        match kind {
            "hash" => Ok(TransformKind::Hash),
            "mask" => Ok(TransformKind::Mask),
            "generalize" => Ok(TransformKind::Generalize),
            other => Err(EtlError::UnknownTransform {
                column: column.to_string(),
                kind: other.to_string(),
            }),
        }
    }
}

/// Immutable column -> transform mapping, supplied once per run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaskingRuleSet {
    rules: BTreeMap<String, TransformKind>,
}

impl MaskingRuleSet {
    pub fn new<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut rules = BTreeMap::new();
        for (column, kind) in pairs {
            let parsed = TransformKind::parse(&column, &kind)?;
            rules.insert(column, parsed);
        }
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_for(&self, column: &str) -> Option<TransformKind> {
        self.rules.get(column).copied()
    }

    /// Pure transform: a new dataset where every ruled column is rewritten.
    /// Columns without a rule pass through; rule columns missing from the
    /// dataset are ignored. Null and empty values are never transformed.
    pub fn apply(&self, dataset: &Dataset) -> Dataset {
        let column_rules: Vec<Option<TransformKind>> = dataset
            .columns()
            .iter()
            .map(|name| self.rule_for(name))
            .collect();

        let records = dataset
            .records()
            .iter()
            .map(|record| {
                let values = record
                    .values()
                    .iter()
                    .zip(&column_rules)
                    .map(|(value, rule)| match rule {
                        Some(kind) => transform_value(value, *kind),
                        None => value.clone(),
                    })
                    .collect();
                Record::new(values)
            })
            .collect();

        // Column set and row widths are unchanged, so this cannot fail.
        Dataset::new(dataset.columns().to_vec(), records)
            .expect("masking preserves dataset shape")
    }
}

fn transform_value(value: &serde_json::Value, kind: TransformKind) -> serde_json::Value {
    if value.is_null() {
        return value.clone();
    }
    let text = value_to_string(value);
    if text.is_empty() {
        return value.clone();
    }

    let masked = match kind {
        TransformKind::Hash => hash_value(&text),
        TransformKind::Mask => mask_value(&text),
        TransformKind::Generalize => generalize_value(&text),
    };
    serde_json::Value::String(masked)
}

/// First 16 hex characters of the SHA-256 digest of the string form.
fn hash_value(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut hex = String::with_capacity(HASH_PREFIX_LEN);
    for byte in digest.iter().take(HASH_PREFIX_LEN / 2) {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Context-aware redaction: emails keep two local chars and the first
/// domain segment, phone-length strings keep three leading and four
/// trailing chars, everything else keeps two leading chars.
fn mask_value(value: &str) -> String {
    if let Some((local, rest)) = value.split_once('@') {
        let prefix: String = local.chars().take(2).collect();
        let domain = rest.split('@').next().unwrap_or(rest);
        return format!("{}***@{}", prefix, domain);
    }

    let chars: Vec<char> = value.chars().collect();
    if chars.len() >= 10 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", prefix, suffix)
    } else {
        let prefix: String = chars.iter().take(2).collect();
        format!("{}***", prefix)
    }
}

fn generalize_value(_value: &str) -> String {
    GENERALIZED_PLACEHOLDER.to_string()
}
