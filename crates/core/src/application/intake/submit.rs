// Submit Use Case

use crate::domain::{NewRegistration, Registration};
use crate::error::Result;
use crate::port::RegistrationRepository;
use serde::Serialize;
use tracing::{info, warn};

/// Result of a submission the caller can branch on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "registration", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Newly stored record (status `pending`)
    Registered(Registration),
    /// A record with the same business number already exists
    AlreadyRegistered(Registration),
}

impl SubmitOutcome {
    pub fn registration(&self) -> &Registration {
        match self {
            SubmitOutcome::Registered(r) | SubmitOutcome::AlreadyRegistered(r) => r,
        }
    }
}

/// Execute submit use case
///
/// The lookup by business number is only a fast path. The unique
/// constraint decides: a duplicate reported by the insert is resolved to
/// the stored record as well.
pub async fn execute(repo: &dyn RegistrationRepository, new: NewRegistration) -> Result<SubmitOutcome> {
    new.validate()?;

    if let Some(number) = new.business_number.as_deref() {
        if let Some(existing) = repo.get_by_business_number(number).await? {
            info!(
                business_number = %number,
                erp_code = existing.erp_code,
                "Business number already registered"
            );
            return Ok(SubmitOutcome::AlreadyRegistered(existing));
        }
    }

    match repo.insert_registration(&new).await {
        Ok(record) => {
            info!(
                registration_id = record.id,
                erp_code = record.erp_code,
                client_name = %record.client_name,
                "Registration stored"
            );
            Ok(SubmitOutcome::Registered(record))
        }
        Err(err) if err.is_duplicate_business_number() => {
            warn!(error = %err, "Concurrent submission won the business number");
            let number = new.business_number.as_deref().unwrap_or_default();
            match repo.get_by_business_number(number).await? {
                Some(existing) => Ok(SubmitOutcome::AlreadyRegistered(existing)),
                None => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}
