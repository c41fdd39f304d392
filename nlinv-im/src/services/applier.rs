//! Script applier
//!
//! Executes a normalized script against the inventory and re-reads the table.
//! In atomic mode the script and the read-back share one transaction, so a
//! failing statement leaves the table exactly as it was. In partial mode each
//! statement commits on its own and execution stops at the first failure.

use super::normalizer::NormalizedScript;
use crate::db::InventoryStore;
use nlinv_common::db::{Item, SELECT_ALL_ITEMS};
use sqlx::Executor;
use thiserror::Error;
use tracing::{debug, warn};

/// Execution-stage errors
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A generated statement was rejected by SQLite
    #[error("Statement {index} failed: {source}")]
    Statement {
        /// Zero-based position in the script
        index: usize,
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    /// Transaction bookkeeping or the read-back failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Applies scripts to the inventory
#[derive(Debug, Clone, Copy)]
pub struct Applier {
    atomic: bool,
}

impl Applier {
    pub fn new(atomic: bool) -> Self {
        Self { atomic }
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    /// Run every statement of `script` in order, then return all rows by id
    ///
    /// An empty script touches nothing and only re-reads the table.
    pub async fn apply(
        &self,
        store: &InventoryStore,
        script: &NormalizedScript,
    ) -> Result<Vec<Item>, ExecutionError> {
        if script.is_empty() {
            debug!("Empty script, reading inventory only");
            return Ok(read_all(store).await?);
        }

        if self.atomic {
            self.apply_atomic(store, script).await
        } else {
            self.apply_partial(store, script).await
        }
    }

    async fn apply_atomic(
        &self,
        store: &InventoryStore,
        script: &NormalizedScript,
    ) -> Result<Vec<Item>, ExecutionError> {
        let mut tx = store.pool().begin().await?;

        for (index, statement) in script.statements().iter().enumerate() {
            let sql = statement.to_string();
            debug!(index, kind = statement.kind().as_str(), "Executing statement");
            if let Err(source) = (&mut *tx).execute(sqlx::raw_sql(&sql)).await {
                warn!("Statement {} failed, rolling back batch: {}", index, source);
                // Dropping the transaction rolls it back
                return Err(ExecutionError::Statement { index, sql, source });
            }
        }

        let items = sqlx::query_as::<_, Item>(SELECT_ALL_ITEMS)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(items)
    }

    async fn apply_partial(
        &self,
        store: &InventoryStore,
        script: &NormalizedScript,
    ) -> Result<Vec<Item>, ExecutionError> {
        for (index, statement) in script.statements().iter().enumerate() {
            let sql = statement.to_string();
            debug!(index, kind = statement.kind().as_str(), "Executing statement");
            if let Err(source) = sqlx::raw_sql(&sql).execute(store.pool()).await {
                warn!(
                    "Statement {} failed, {} earlier statement(s) stay applied: {}",
                    index, index, source
                );
                return Err(ExecutionError::Statement { index, sql, source });
            }
        }

        Ok(read_all(store).await?)
    }
}

async fn read_all(store: &InventoryStore) -> Result<Vec<Item>, sqlx::Error> {
    sqlx::query_as::<_, Item>(SELECT_ALL_ITEMS)
        .fetch_all(store.pool())
        .await
}
