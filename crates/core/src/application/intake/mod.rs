// Intake Service - Registration use cases for the agent workflow

pub mod submit;

pub use submit::SubmitOutcome;

use crate::domain::{NewRegistration, Registration, RegistrationId, RegistrationStatus};
use crate::error::{AppError, Result};
use crate::port::RegistrationRepository;
use std::sync::Arc;
use tracing::info;

/// Intake Service
pub struct IntakeService {
    repo: Arc<dyn RegistrationRepository>,
}

impl IntakeService {
    pub fn new(repo: Arc<dyn RegistrationRepository>) -> Self {
        Self { repo }
    }

    /// Register a parsed certificate, or report the existing record
    pub async fn submit(&self, new: NewRegistration) -> Result<SubmitOutcome> {
        submit::execute(self.repo.as_ref(), new).await
    }

    /// Move a registration forward in the workflow.
    ///
    /// Backward moves (e.g. `completed -> pending`) are refused with
    /// `InvalidState`. The repository itself does not check this.
    pub async fn advance_status(
        &self,
        id: RegistrationId,
        next: RegistrationStatus,
    ) -> Result<Registration> {
        let current = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Registration {} not found", id)))?;

        if !current.status.can_transition_to(next) {
            return Err(AppError::InvalidState(format!(
                "Cannot move registration {} from {} to {}",
                id, current.status, next
            )));
        }

        let updated = self.repo.update_status(id, next).await?;
        info!(registration_id = id, from = %current.status, to = %next, "Status advanced");
        Ok(updated)
    }
}
