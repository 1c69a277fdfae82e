// Domain Layer - Pure business logic and entities

pub mod error;
pub mod registration;

// Re-exports
pub use error::DomainError;
pub use registration::{
    ClientType, ErpCode, NewRegistration, PriceGrade, Registration, RegistrationId,
    RegistrationPatch, RegistrationStatus, TextColumn, ERP_CODE_MAX, ERP_CODE_MIN,
};
