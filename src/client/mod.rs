//! Client side of the booking system.
//!
//! An HTTP client for the appointment API plus the local state the
//! booking pages keep: the saved-appointments store, the clinic
//! directory, the booking form, and the page state machines.

pub mod api_client;
pub mod booking;
pub mod clinics;
pub mod saved;
pub mod views;

pub use api_client::AppointmentsClient;
pub use booking::{BookingError, BookingForm};
pub use saved::{SavedAppointment, SavedAppointments};

/// Errors from calls against the appointment API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Transport failure; the message is surfaced verbatim.
    #[error("{0}")]
    Network(String),
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Http { status: 404, .. })
    }
}
