// Port Layer - Interfaces for external dependencies

pub mod registration_processor;
pub mod registration_repository;

// Re-exports
pub use registration_processor::{ProcessingError, RegistrationProcessor};
pub use registration_repository::{ListOrder, ListQuery, RegistrationRepository};
