use chrono::NaiveDate;

use crate::domain::model::AuditRecord;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

/// Fail-fast stage sequencer. Stage N runs only if stage N-1 completed; the
/// audit record is written exactly once per run, success or failure. Retry
/// and backoff belong to the external orchestrator, never to this engine.
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self, run_id: &str, run_date: NaiveDate) -> Result<AuditRecord> {
        tracing::info!(run_id, %run_date, "starting pipeline run");
        let outcome = self.run_stages().await;

        let record = match &outcome {
            Ok(count) => AuditRecord::success(run_id, run_date, *count),
            Err(e) => {
                tracing::error!(run_id, error = %e, "pipeline run failed");
                AuditRecord::failure(run_id, run_date, e.to_string())
            }
        };

        if let Err(audit_err) = self.pipeline.audit(&record).await {
            tracing::error!(run_id, error = %audit_err, "failed to write audit record");
            // A failed run keeps its original error; the audit failure is
            // surfaced only when the run itself succeeded.
            return Err(match outcome {
                Err(stage_err) => stage_err,
                Ok(_) => audit_err,
            });
        }

        outcome.map(|_| record)
    }

    async fn run_stages(&self) -> Result<u64> {
        let dataset = self.pipeline.extract().await?;
        tracing::info!(records = dataset.len(), "extract complete");

        self.pipeline.validate(&dataset).await?;

        let masked = self.pipeline.mask(dataset).await?;
        tracing::info!(records = masked.len(), "mask complete");

        let loaded = self.pipeline.load(&masked).await?;
        tracing::info!(records = loaded, "load complete");

        self.pipeline.quality_check(&masked).await?;

        Ok(loaded as u64)
    }
}
