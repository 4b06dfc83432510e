use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

use crate::domain::ports::Database;
use crate::utils::error::{EtlError, Result};

/// PostgreSQL warehouse adapter. One connection per run; the background
/// connection task ends when the client is dropped.
pub struct PostgresDatabase {
    client: Client,
}

impl PostgresDatabase {
    pub async fn connect(conn_str: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(conn_str, NoTls)
            .await
            .map_err(db_err)?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "database connection terminated");
            }
        });

        Ok(Self { client })
    }
}

fn db_err(e: tokio_postgres::Error) -> EtlError {
    EtlError::Database {
        message: e.to_string(),
    }
}

fn sql_params(values: &[Option<String>]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

/// Builds a multi-row INSERT with numbered placeholders, one parameter per
/// cell across all rows.
fn insert_statement(table: &str, columns: &[String], row_count: usize) -> String {
    let mut groups = Vec::with_capacity(row_count);
    let mut index = 1;
    for _ in 0..row_count {
        let row: Vec<String> = (0..columns.len())
            .map(|_| {
                let placeholder = format!("${}", index);
                index += 1;
                placeholder
            })
            .collect();
        groups.push(format!("({})", row.join(", ")));
    }

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        columns.join(", "),
        groups.join(", ")
    )
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn execute(&self, sql: &str, params: &[Option<String>]) -> Result<()> {
        let params = sql_params(params);
        self.client.execute(sql, &params).await.map_err(db_err)?;
        Ok(())
    }

    async fn query_scalar(&self, sql: &str) -> Result<Option<i64>> {
        let row = self.client.query_opt(sql, &[]).await.map_err(db_err)?;
        match row {
            Some(row) => Ok(Some(row.try_get(0).map_err(db_err)?)),
            None => Ok(None),
        }
    }

    async fn batch_insert(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Option<String>>],
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let flat: Vec<Option<String>> = rows.iter().flatten().cloned().collect();
        let sql = insert_statement(table, columns, rows.len());
        let params = sql_params(&flat);
        self.client
            .execute(sql.as_str(), &params)
            .await
            .map_err(db_err)?;

        tracing::debug!(table, rows = rows.len(), "batch insert complete");
        Ok(())
    }
}
