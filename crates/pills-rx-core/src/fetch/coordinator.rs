//! Fetch coordinator: gathers the four reads and feeds the builder.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{CancelToken, Collaborators, FetchError, FetchResult};
use crate::config::EngineConfig;
use crate::models::{AdherenceLog, PrescriptionId};
use crate::schedule::{build_schedule, LogWrite, Schedule, ScheduleSources};

/// Runs fetch/build cycles against a set of collaborators.
///
/// Every [`load`](Self::load) starts a new generation. A cycle whose
/// generation is no longer current when its reads complete is discarded, so
/// rapid navigation never surfaces a stale schedule.
pub struct FetchCoordinator {
    collaborators: Collaborators,
    timeout: Duration,
    generation: AtomicU64,
}

impl FetchCoordinator {
    pub fn new(collaborators: Collaborators, config: &EngineConfig) -> Self {
        Self {
            collaborators,
            timeout: config.fetch_timeout(),
            generation: AtomicU64::new(0),
        }
    }

    /// Upper bound on one gather.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Generation of the most recently started cycle.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Read all four collections concurrently.
    ///
    /// Fails as soon as any read fails. Cancellation drops every outstanding
    /// read.
    pub async fn gather(
        &self,
        prescription_id: PrescriptionId,
        cancel: &CancelToken,
    ) -> FetchResult<ScheduleSources> {
        let c = &self.collaborators;
        let reads = async {
            tokio::try_join!(
                c.drugs.drugs(),
                c.prescriptions.prescription(prescription_id),
                c.doses.doses(prescription_id),
                c.logs.logs(prescription_id),
            )
        };

        let (drugs, prescription, doses, logs) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = tokio::time::timeout(self.timeout, reads) => {
                result.map_err(|_| FetchError::Timeout(self.timeout))??
            }
        };

        Ok(ScheduleSources {
            prescription,
            drugs,
            doses,
            logs,
        })
    }

    /// Fetch and build the schedule of a prescription.
    ///
    /// The builder runs only when all reads succeeded, the token was not
    /// cancelled and no newer cycle has started.
    pub async fn load(
        &self,
        prescription_id: PrescriptionId,
        cancel: &CancelToken,
    ) -> FetchResult<Schedule> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(prescription_id, generation, "loading schedule");

        let sources = match self.gather(prescription_id, cancel).await {
            Ok(sources) => sources,
            Err(e) => {
                tracing::warn!(prescription_id, generation, error = %e, "schedule fetch failed");
                return Err(e);
            }
        };

        if cancel.is_cancelled() {
            tracing::warn!(prescription_id, generation, "schedule fetch cancelled");
            return Err(FetchError::Cancelled);
        }

        let current = self.generation();
        if current != generation {
            tracing::warn!(prescription_id, generation, current, "discarding superseded fetch");
            return Err(FetchError::Superseded {
                generation,
                current,
            });
        }

        let schedule = build_schedule(prescription_id, &sources)?;
        tracing::info!(
            prescription_id,
            generation,
            days = schedule.days.len(),
            "schedule loaded"
        );
        Ok(schedule)
    }

    /// Resolve a write against a schedule and hand it to the log store.
    pub async fn record(&self, schedule: &Schedule, write: &LogWrite) -> FetchResult<AdherenceLog> {
        let log = write.resolve(schedule)?;
        self.collaborators
            .logs
            .put(std::slice::from_ref(&log))
            .await?;
        tracing::debug!(
            prescription_id = log.prescription_id,
            drug_id = log.drug_id,
            time_slot = log.time_slot,
            day = log.day,
            taken = log.taken,
            "recorded adherence"
        );
        Ok(log)
    }
}
