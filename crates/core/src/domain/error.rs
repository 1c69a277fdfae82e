// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("missing mandatory field: {0}")]
    MissingField(&'static str),

    #[error("{field} value {value:?} is not one of the allowed codes")]
    InvalidEnum { field: &'static str, value: String },

    #[error("{field} value {value} is out of range")]
    OutOfRange { field: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;
