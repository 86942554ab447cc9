//! Server error types.

use std::io;

use facility_core::TimeError;
use facility_protocol::StatusCode;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Result type for booking operations.
pub type BookingResult<T> = Result<T, BookingError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (socket bind, send, receive).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Failures of a booking operation, reported to the client as a status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("facility not found: {0}")]
    FacilityNotFound(String),

    #[error("requested time overlaps an existing booking")]
    TimingUnavailable,

    #[error("invalid datetime: {0}")]
    InvalidDatetime(#[from] TimeError),

    #[error("booking not found: {0}")]
    BookingNotFound(String),

    /// The requester does not own the booking.
    #[error("booking {confirmation_id} is not owned by {client_id}")]
    WrongClientId {
        confirmation_id: String,
        client_id: String,
    },
}

impl BookingError {
    /// Status sent to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::FacilityNotFound(_) | Self::BookingNotFound(_) | Self::WrongClientId { .. } => {
                StatusCode::NotFound
            }
            Self::TimingUnavailable => StatusCode::Conflict,
            Self::InvalidDatetime(_) => StatusCode::BadRequest,
        }
    }

    /// Message sent to the client.
    ///
    /// An ownership mismatch reads exactly like an unknown id.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::FacilityNotFound(_) => "Facility not found",
            Self::TimingUnavailable => "Booking time not available",
            Self::InvalidDatetime(_) => "Invalid datetime provided",
            Self::BookingNotFound(_) | Self::WrongClientId { .. } => "Invalid confirmation ID",
        }
    }
}
