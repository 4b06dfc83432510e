use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::core::masking::MaskingRuleSet;
use crate::core::schema::Schema;
use crate::utils::error::{EtlError, Result};

#[derive(Debug, Deserialize)]
struct RulesFile {
    masking: BTreeMap<String, String>,
}

/// Loads the column -> transform map from a TOML file. `${VAR}` references
/// in the file body are replaced from the environment before parsing;
/// unresolved references are left as-is.
pub fn load_masking_rules<P: AsRef<Path>>(path: P) -> Result<MaskingRuleSet> {
    let content = std::fs::read_to_string(&path).map_err(|e| EtlError::Config {
        message: format!(
            "failed to read rules file {}: {}",
            path.as_ref().display(),
            e
        ),
    })?;
    rules_from_toml_str(&content)
}

pub fn rules_from_toml_str(content: &str) -> Result<MaskingRuleSet> {
    let processed = substitute_env_vars(content);

    let file: RulesFile = toml::from_str(&processed).map_err(|e| EtlError::Config {
        message: format!("failed to parse masking rules: {}", e),
    })?;

    MaskingRuleSet::new(file.masking)
}

/// Loads the row-validation schema from a JSON file.
pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<Schema> {
    let content = std::fs::read_to_string(&path).map_err(|e| EtlError::Config {
        message: format!(
            "failed to read schema file {}: {}",
            path.as_ref().display(),
            e
        ),
    })?;
    Schema::from_json_str(&content)
}

/// Replaces `${VAR_NAME}` with the matching environment variable.
fn substitute_env_vars(content: &str) -> String {
    use regex::Regex;
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::masking::TransformKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn rules_parse_from_masking_table() {
        let rules = rules_from_toml_str(
            r#"
            [masking]
            ssn = "hash"
            email = "mask"
            address = "generalize"
            "#,
        )
        .unwrap();

        assert_eq!(rules.rule_for("ssn"), Some(TransformKind::Hash));
        assert_eq!(rules.rule_for("email"), Some(TransformKind::Mask));
        assert_eq!(rules.rule_for("address"), Some(TransformKind::Generalize));
        assert_eq!(rules.rule_for("patient_id"), None);
    }

    #[test]
    fn unknown_transform_is_a_config_error() {
        let err = rules_from_toml_str(
            r#"
            [masking]
            ssn = "redact"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("redact"));
    }

    #[test]
    fn env_vars_are_substituted() {
        std::env::set_var("PHI_SSN_TRANSFORM", "hash");
        let rules = rules_from_toml_str(
            r#"
            [masking]
            ssn = "${PHI_SSN_TRANSFORM}"
            "#,
        )
        .unwrap();
        assert_eq!(rules.rule_for("ssn"), Some(TransformKind::Hash));
        std::env::remove_var("PHI_SSN_TRANSFORM");
    }

    #[test]
    fn unresolved_env_vars_are_left_verbatim() {
        let result = substitute_env_vars("value = \"${NOT_SET_ANYWHERE_XYZ}\"");
        assert_eq!(result, "value = \"${NOT_SET_ANYWHERE_XYZ}\"");
    }

    #[test]
    fn load_masking_rules_reads_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[masking]\nemail = \"mask\"").unwrap();

        let rules = load_masking_rules(file.path()).unwrap();
        assert_eq!(rules.rule_for("email"), Some(TransformKind::Mask));
    }

    #[test]
    fn missing_rules_file_is_a_config_error() {
        let err = load_masking_rules("/nonexistent/rules.toml").unwrap_err();
        assert!(err.to_string().contains("failed to read rules file"));
    }
}
