//! Periodic expiry sweep.
//!
//! Each tick drains every overdue verification on a blocking thread; store
//! calls never run on the async executor.

use std::sync::Arc;
use std::time::Duration;

use plancheck_store::PlanStore;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use crate::service::{AcceptanceService, SweepSummary};
use crate::ServiceError;

pub struct Sweeper<S> {
    service: Arc<AcceptanceService<S>>,
    interval: Duration,
    batch_size: usize,
}

impl<S: PlanStore + 'static> Sweeper<S> {
    pub fn new(service: Arc<AcceptanceService<S>>, interval: Duration, batch_size: usize) -> Self {
        Self {
            service,
            interval,
            batch_size,
        }
    }

    /// Sweep on every tick until `shutdown` fires. The first tick is
    /// immediate. Transient failures are logged and retried next tick.
    pub async fn run(
        self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<SweepSummary, ServiceError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut totals = SweepSummary::default();
        tracing::info!(interval_secs = self.interval.as_secs_f64(), "sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    let service = Arc::clone(&self.service);
                    let batch_size = self.batch_size;
                    let pass = tokio::task::spawn_blocking(move || service.sweep_all(batch_size))
                        .await
                        .map_err(|e| ServiceError::StoreUnavailable(format!("sweep task failed: {e}")))?;
                    match pass {
                        Ok(summary) => totals.absorb(&summary),
                        Err(e) if e.is_transient() => {
                            tracing::warn!(error = %e, "sweep pass failed, retrying next tick");
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        tracing::info!(
            batches = totals.batches,
            expired = totals.expired,
            "sweeper stopped"
        );
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::ShutdownController;
    use plancheck_nullables::{NullClock, NullStore};
    use plancheck_store::StaticSpecialtyDirectory;
    use plancheck_types::{
        AcceptanceKey, ConsensusParams, Fingerprint, LedgerParams, VerificationStatus,
    };
    use plancheck_verification::Claim;

    #[tokio::test]
    async fn expires_overdue_entries_until_shutdown() {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(1_000_000));
        let service = Arc::new(AcceptanceService::new(
            Arc::clone(&store),
            Arc::new(StaticSpecialtyDirectory::new()),
            clock.clone(),
            LedgerParams::default(),
            &ConsensusParams::default(),
        ));
        let key = AcceptanceKey::new("npi-1", "plan-1");
        let id = service
            .submit(Claim::new(key.clone(), true, Fingerprint::new("o")))
            .unwrap()
            .entry
            .id;
        clock.advance_days(200);

        let controller = ShutdownController::new();
        let sweeper = Sweeper::new(Arc::clone(&service), Duration::from_millis(10), 10);
        let handle = tokio::spawn(sweeper.run(controller.subscribe()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        controller.shutdown();

        let totals = handle.await.unwrap().unwrap();
        assert_eq!(totals.expired, 1);
        assert_eq!(
            service.get_verification(&id).unwrap().unwrap().status,
            VerificationStatus::Expired
        );
        assert_eq!(
            service.get_acceptance(&key).unwrap().unwrap().verification_count,
            0
        );
    }
}
