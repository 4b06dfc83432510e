use chrono::Utc;
use clap::Parser;
use phi_etl::config::{load_masking_rules, load_schema};
use phi_etl::utils::{logger, validation::Validate};
use phi_etl::{
    AuditRecord, CliConfig, ErrorCategory, EtlEngine, EtlError, HttpSource, LocalStorage,
    PhiPipeline, PipelineSettings, PostgresDatabase, QualityPolicy,
};

fn exit_code(error: &EtlError) -> i32 {
    match error.category() {
        ErrorCategory::DataQuality => 1,
        ErrorCategory::Configuration => 2,
        ErrorCategory::Transient => 3,
    }
}

async fn run(config: CliConfig) -> Result<AuditRecord, EtlError> {
    let schema = load_schema(&config.schema_file)?;
    let rules = load_masking_rules(&config.rules_file)?;

    let run_date = config.run_date.unwrap_or_else(|| Utc::now().date_naive());
    let run_id = config
        .run_id
        .clone()
        .unwrap_or_else(|| format!("manual__{}", Utc::now().format("%Y%m%dT%H%M%S")));

    let storage = LocalStorage::new(config.output_path.clone());
    let db = PostgresDatabase::connect(&config.database_url).await?;
    let source = HttpSource::new(config.source_endpoint.clone());

    let settings = PipelineSettings {
        schema,
        rules,
        quality: QualityPolicy {
            identity_fields: config.identity_fields.clone(),
            uniqueness_key: config.uniqueness_key.clone(),
        },
        table: config.table.clone(),
        audit_table: config.audit_table.clone(),
        run_date,
    };

    let pipeline = PhiPipeline::new(storage, db, source, settings);
    let engine = EtlEngine::new(pipeline);
    engine.run(&run_id, run_date).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting phi-etl CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(2);
    }

    match run(config).await {
        Ok(record) => {
            tracing::info!(
                run_id = %record.run_id,
                records = record.records_processed,
                "pipeline run completed"
            );
            println!("✅ ETL run {} completed successfully!", record.run_id);
            println!("📊 Records processed: {}", record.records_processed);
        }
        Err(e) => {
            tracing::error!("ETL run failed: {} (category: {:?})", e, e.category());
            eprintln!("❌ {}", e);
            std::process::exit(exit_code(&e));
        }
    }

    Ok(())
}
