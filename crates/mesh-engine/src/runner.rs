//! Transactional plan runner
//!
//! Applies a mutation list in declared order inside one transaction. The
//! first failure stops the run and rolls the transaction back; nothing from
//! a failed run is ever visible.

use crate::error::EngineError;
use crate::executor::MutationExecutor;
use mesh_core::{AppliedRepair, Mutation};
use mesh_store::Datastore;

/// What a run did
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Repairs applied, in order
    pub repairs: Vec<AppliedRepair>,
    /// Errors; empty iff the transaction committed
    pub errors: Vec<EngineError>,
    /// Index of the mutation that halted the run
    pub failed_at: Option<usize>,
    /// Mutations applied before commit or halt
    pub applied: usize,
}

impl RunOutcome {
    /// True when the transaction committed
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Repair trail as rendered strings
    #[must_use]
    pub fn repair_trail(&self) -> Vec<String> {
        self.repairs.iter().map(ToString::to_string).collect()
    }
}

/// Runs mutation lists against a datastore
pub struct PlanRunner<'a> {
    datastore: &'a dyn Datastore,
    executor: MutationExecutor<'a>,
}

impl<'a> PlanRunner<'a> {
    /// Create runner
    #[must_use]
    pub fn new(datastore: &'a dyn Datastore, executor: MutationExecutor<'a>) -> Self {
        Self {
            datastore,
            executor,
        }
    }

    /// Apply `mutations` atomically
    pub async fn run(&self, mutations: &[Mutation]) -> RunOutcome {
        let mut outcome = RunOutcome::default();

        let mut tx = match self.datastore.begin().await {
            Ok(tx) => tx,
            Err(source) => {
                outcome.errors.push(EngineError::Transaction {
                    stage: "begin",
                    source,
                });
                return outcome;
            }
        };

        for (index, mutation) in mutations.iter().enumerate() {
            match self.executor.apply(tx.as_mut(), index, mutation).await {
                Ok(repairs) => {
                    outcome.repairs.extend(repairs);
                    outcome.applied += 1;
                }
                Err(err) => {
                    tracing::warn!("Halting at mutation #{}: {}", index, err);
                    outcome.failed_at = Some(index);
                    outcome.errors.push(err);
                    if let Err(e) = tx.rollback().await {
                        tracing::error!("Transaction rollback failed: {}", e);
                    }
                    return outcome;
                }
            }
        }

        if let Err(source) = tx.commit().await {
            tracing::warn!("Commit failed after {} mutations: {}", outcome.applied, source);
            outcome.errors.push(EngineError::Transaction {
                stage: "commit",
                source,
            });
        }
        outcome
    }
}
