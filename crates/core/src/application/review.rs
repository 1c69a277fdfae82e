// Review processor - post-intake checks on claimed registrations

use crate::domain::Registration;
use crate::error::{AppError, Result};
use crate::port::{ProcessingError, RegistrationProcessor};
use async_trait::async_trait;
use tracing::debug;

/// Digits in a business registration number (formatted `###-##-#####`)
pub const BUSINESS_NUMBER_DIGITS: usize = 10;

/// Completes registrations that pass review, fails the rest.
///
/// A registration is rejected when the extraction confidence is below
/// `min_confidence`, or when a business number is present but is not
/// ten digits once dashes are removed. Missing confidence is accepted.
pub struct ReviewProcessor {
    min_confidence: f64,
}

impl ReviewProcessor {
    /// `min_confidence` must lie in `[0, 1]` (NaN is refused)
    pub fn new(min_confidence: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(AppError::Config(format!(
                "min_confidence must be within 0.0..=1.0, got {}",
                min_confidence
            )));
        }
        Ok(Self { min_confidence })
    }

    pub fn review(&self, registration: &Registration) -> std::result::Result<(), ProcessingError> {
        if let Some(confidence) = registration.confidence {
            if confidence < self.min_confidence {
                return Err(ProcessingError::Rejected(format!(
                    "confidence {:.2} below {:.2}",
                    confidence, self.min_confidence
                )));
            }
        }

        if let Some(number) = registration.business_number.as_deref() {
            if !is_well_formed_business_number(number) {
                return Err(ProcessingError::Rejected(format!(
                    "malformed business number {:?}",
                    number
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl RegistrationProcessor for ReviewProcessor {
    async fn process(&self, registration: &Registration) -> std::result::Result<(), ProcessingError> {
        debug!(registration_id = registration.id, "Reviewing registration");
        self.review(registration)
    }
}

fn is_well_formed_business_number(number: &str) -> bool {
    let mut digits = 0;
    for c in number.chars() {
        match c {
            '0'..='9' => digits += 1,
            '-' => {}
            _ => return false,
        }
    }
    digits == BUSINESS_NUMBER_DIGITS
}
