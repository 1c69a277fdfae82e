// Worker - Registration claiming loop

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::domain::{Registration, RegistrationStatus};
use crate::error::Result;
use crate::port::{RegistrationProcessor, RegistrationRepository};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Claims pending registrations and hands them to a processor.
///
/// Any number of workers may share one repository; the claim itself
/// (`fetch_pending_job`) guarantees each record goes to exactly one of them.
pub struct Worker {
    name: String,
    repo: Arc<dyn RegistrationRepository>,
    processor: Arc<dyn RegistrationProcessor>,
}

impl Worker {
    pub fn new(
        name: impl Into<String>,
        repo: Arc<dyn RegistrationRepository>,
        processor: Arc<dyn RegistrationProcessor>,
    ) -> Self {
        Self {
            name: name.into(),
            repo,
            processor,
        }
    }

    /// Run worker loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(worker = %self.name, "Worker started");
        loop {
            if shutdown.is_shutdown() {
                info!(worker = %self.name, "Worker shutting down");
                break;
            }
            match self.process_next_job().await {
                Ok(true) => {}
                Ok(false) => {
                    tokio::select! {
                        _ = sleep(IDLE_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!(worker = %self.name, "Worker interrupted during idle");
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!(worker = %self.name, error = %e, "Worker error");
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!(worker = %self.name, "Worker interrupted during error recovery");
                            break;
                        }
                    }
                }
            }
        }
        info!(worker = %self.name, "Worker stopped");
        Ok(())
    }

    /// Claim and process one registration (returns true if one was claimed)
    pub async fn process_next_job(&self) -> Result<bool> {
        // Already atomically moved to processing in the store
        let registration = match self.repo.fetch_pending_job().await? {
            Some(r) => r,
            None => return Ok(false),
        };

        info!(
            worker = %self.name,
            registration_id = registration.id,
            erp_code = registration.erp_code,
            "Claimed registration"
        );

        // A panicking processor must not take the worker down with it
        let registration = Arc::new(registration);
        let for_processor = Arc::clone(&registration);
        let processor = Arc::clone(&self.processor);
        let handle =
            tokio::task::spawn(async move { processor.process(&for_processor).await });

        let next = match handle.await {
            Ok(Ok(())) => RegistrationStatus::Completed,
            Ok(Err(e)) => {
                warn!(
                    worker = %self.name,
                    registration_id = registration.id,
                    reason = %e,
                    "Registration failed processing"
                );
                RegistrationStatus::Failed
            }
            Err(join_err) => {
                if join_err.is_panic() {
                    error!(worker = %self.name, registration_id = registration.id, "Processor panicked");
                } else {
                    error!(worker = %self.name, registration_id = registration.id, "Processor cancelled");
                }
                RegistrationStatus::Failed
            }
        };

        self.finish(&registration, next).await?;
        Ok(true)
    }

    async fn finish(&self, registration: &Registration, next: RegistrationStatus) -> Result<()> {
        let updated = self.repo.update_status(registration.id, next).await?;
        info!(
            worker = %self.name,
            registration_id = updated.id,
            status = %updated.status,
            "Registration finished"
        );
        Ok(())
    }
}
