use thiserror::Error;

use crate::orders::intake::ValidationError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Entity not found: {entity}")]
    NotFound { entity: String },

    #[error("Uniqueness conflict: {field}")]
    Uniqueness { field: String },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Payment was not confirmed")]
    PaymentNotConfirmed,

    #[error("Unsupported prescription file: {file_name}")]
    UnsupportedPrescription { file_name: String },

    #[error("Receipt is not available for this session")]
    ReceiptUnavailable,

    #[error("Failed to render receipt: {message}")]
    Rendering { message: String },
}

impl Error {
    pub(crate) fn rendering(message: impl std::fmt::Display) -> Self {
        Self::Rendering {
            message: message.to_string(),
        }
    }
}
