// Registration Processor Port
//
// Whatever a worker does with a claimed registration (review, ERP sync)
// sits behind this trait.

use crate::domain::Registration;
use async_trait::async_trait;
use thiserror::Error;

/// Why processing a claimed registration did not succeed
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Processes one claimed registration. `Ok` completes it, `Err` fails it.
#[async_trait]
pub trait RegistrationProcessor: Send + Sync {
    async fn process(&self, registration: &Registration) -> Result<(), ProcessingError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock processor behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        Success,
        Reject(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Mock processor that records the ids it saw
    pub struct MockRegistrationProcessor {
        behavior: MockBehavior,
        seen: Arc<Mutex<Vec<i64>>>,
    }

    impl MockRegistrationProcessor {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_reject(reason: impl Into<String>) -> Self {
            Self::new(MockBehavior::Reject(reason.into()))
        }

        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }

        pub fn seen(&self) -> Vec<i64> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RegistrationProcessor for MockRegistrationProcessor {
        async fn process(&self, registration: &Registration) -> Result<(), ProcessingError> {
            self.seen.lock().unwrap().push(registration.id);
            match &self.behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Reject(reason) => Err(ProcessingError::Rejected(reason.clone())),
                MockBehavior::Panic(msg) => panic!("{}", msg),
            }
        }
    }
}
