use chrono::NaiveDate;
use clap::Parser;

use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_list, validate_non_empty_string, validate_path, validate_url, Validate,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "phi-etl")]
#[command(about = "Batch ETL pipeline for PHI datasets with PII masking")]
pub struct CliConfig {
    /// Endpoint serving the raw CSV export
    #[arg(long)]
    pub source_endpoint: String,

    /// PostgreSQL connection string for the warehouse
    #[arg(long)]
    pub database_url: String,

    /// Base directory for raw and processed run artifacts
    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// JSON schema file for row validation
    #[arg(long)]
    pub schema_file: String,

    /// TOML file mapping columns to masking transforms
    #[arg(long)]
    pub rules_file: String,

    #[arg(long, default_value = "phi_data")]
    pub table: String,

    #[arg(long, default_value = "etl_audit_log")]
    pub audit_table: String,

    /// Run identifier recorded in the audit log; generated when omitted
    #[arg(long)]
    pub run_id: Option<String>,

    /// Logical run date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub run_date: Option<NaiveDate>,

    /// Fields that must never be null after masking
    #[arg(long, value_delimiter = ',', default_value = "patient_id,encounter_date")]
    pub identity_fields: Vec<String>,

    /// Field combination that must be unique within one run
    #[arg(long, value_delimiter = ',', default_value = "patient_id,encounter_date")]
    pub uniqueness_key: Vec<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("source_endpoint", &self.source_endpoint)?;
        validate_non_empty_string("database_url", &self.database_url)?;
        validate_path("output_path", &self.output_path)?;
        validate_non_empty_string("schema_file", &self.schema_file)?;
        validate_non_empty_string("rules_file", &self.rules_file)?;
        validate_non_empty_string("table", &self.table)?;
        validate_non_empty_string("audit_table", &self.audit_table)?;
        validate_non_empty_list("identity_fields", &self.identity_fields)?;
        validate_non_empty_list("uniqueness_key", &self.uniqueness_key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec![
            "phi-etl",
            "--source-endpoint",
            "https://example.com/export",
            "--database-url",
            "postgres://etl@localhost/warehouse",
            "--schema-file",
            "schema.json",
            "--rules-file",
            "rules.toml",
        ]
    }

    #[test]
    fn defaults_cover_tables_and_quality_fields() {
        let config = CliConfig::parse_from(base_args());

        assert_eq!(config.table, "phi_data");
        assert_eq!(config.audit_table, "etl_audit_log");
        assert_eq!(config.identity_fields, vec!["patient_id", "encounter_date"]);
        assert_eq!(config.uniqueness_key, vec!["patient_id", "encounter_date"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn run_date_parses_iso_dates() {
        let mut args = base_args();
        args.extend(["--run-date", "2024-01-15"]);
        let config = CliConfig::parse_from(args);
        assert_eq!(
            config.run_date,
            Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
    }

    #[test]
    fn invalid_endpoint_fails_validation() {
        let mut config = CliConfig::parse_from(base_args());
        config.source_endpoint = "not-a-url".to_string();
        assert!(config.validate().is_err());
    }
}
