//! Booking state machine.

use serde::{Deserialize, Serialize};

/// The state of a booking in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Picked ───┬──► Confirmed ──► Completed
///           │              │        │
///           └──► Confirmed ┘        │
///           │                       │
///           └───────┬───────────────┴──► Cancelled
///                   └──► Rejected
/// ```
///
/// `Picked` may also complete directly when a partner fulfils without an
/// explicit confirmation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Booking was taken in, awaiting a partner claim or confirmation.
    #[default]
    Pending,

    /// A delivery partner claimed the booking.
    Picked,

    /// Booking is confirmed and being prepared.
    Confirmed,

    /// Booking was fulfilled (terminal state).
    Completed,

    /// Booking was cancelled (terminal state).
    Cancelled,

    /// Booking was rejected by staff (terminal state).
    Rejected,
}

impl BookingStatus {
    /// Returns true if a partner can claim the booking in this state.
    pub fn can_pick(&self) -> bool {
        matches!(self, BookingStatus::Pending)
    }

    /// Returns true if the booking can be confirmed in this state.
    pub fn can_confirm(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Picked)
    }

    /// Returns true if the booking can be completed in this state.
    pub fn can_complete(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Picked)
    }

    /// Returns true if the booking can be rejected in this state.
    pub fn can_reject(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Rejected
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Picked => "picked",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the physical delivery stands, tracked alongside the booking status.
///
/// The canonical enumeration includes `out_for_delivery`; it is the state a
/// claimed booking enters, and reads must never surface a booking without a
/// delivery status (absent values normalize to `pending`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// No delivery activity yet.
    #[default]
    Pending,

    /// Booking confirmed, delivery being prepared.
    Processing,

    /// A partner claimed the booking and is delivering.
    OutForDelivery,

    /// Handed to a carrier.
    Shipping,

    /// Delivered to the customer (terminal).
    Delivered,

    /// Delivery cancelled (terminal).
    Cancelled,
}

impl DeliveryStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Processing => "processing",
            DeliveryStatus::OutForDelivery => "out_for_delivery",
            DeliveryStatus::Shipping => "shipping",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Initial booking status for cash-on-delivery intake.
///
/// Operationally a COD booking can be treated as confirmed the moment it is
/// taken in, or held pending staff review. Configurable, defaults to
/// `Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodInitialStatus {
    /// COD bookings start pending review.
    Pending,

    /// COD bookings start confirmed.
    #[default]
    Confirmed,
}

impl CodInitialStatus {
    /// Returns the booking status a new COD booking starts in.
    pub fn booking_status(&self) -> BookingStatus {
        match self {
            CodInitialStatus::Pending => BookingStatus::Pending,
            CodInitialStatus::Confirmed => BookingStatus::Confirmed,
        }
    }
}

impl std::str::FromStr for CodInitialStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(CodInitialStatus::Pending),
            "confirmed" => Ok(CodInitialStatus::Confirmed),
            other => Err(format!(
                "invalid COD initial status '{other}' (expected 'pending' or 'confirmed')"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(BookingStatus::default(), BookingStatus::Pending);
        assert_eq!(DeliveryStatus::default(), DeliveryStatus::Pending);
    }

    #[test]
    fn test_only_pending_can_be_picked() {
        assert!(BookingStatus::Pending.can_pick());
        assert!(!BookingStatus::Picked.can_pick());
        assert!(!BookingStatus::Confirmed.can_pick());
        assert!(!BookingStatus::Completed.can_pick());
        assert!(!BookingStatus::Cancelled.can_pick());
        assert!(!BookingStatus::Rejected.can_pick());
    }

    #[test]
    fn test_pending_and_picked_can_confirm() {
        assert!(BookingStatus::Pending.can_confirm());
        assert!(BookingStatus::Picked.can_confirm());
        assert!(!BookingStatus::Confirmed.can_confirm());
        assert!(!BookingStatus::Completed.can_confirm());
    }

    #[test]
    fn test_confirmed_and_picked_can_complete() {
        assert!(BookingStatus::Confirmed.can_complete());
        assert!(BookingStatus::Picked.can_complete());
        assert!(!BookingStatus::Pending.can_complete());
        assert!(!BookingStatus::Completed.can_complete());
        assert!(!BookingStatus::Cancelled.can_complete());
    }

    #[test]
    fn test_terminal_states_cannot_reject() {
        assert!(BookingStatus::Pending.can_reject());
        assert!(BookingStatus::Picked.can_reject());
        assert!(BookingStatus::Confirmed.can_reject());
        assert!(!BookingStatus::Completed.can_reject());
        assert!(!BookingStatus::Cancelled.can_reject());
        assert!(!BookingStatus::Rejected.can_reject());
    }

    #[test]
    fn test_terminal_states() {
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(BookingStatus::Rejected.is_terminal());
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(!BookingStatus::Picked.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&BookingStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::OutForDelivery).unwrap(),
            "\"out_for_delivery\""
        );

        let status: DeliveryStatus = serde_json::from_str("\"out_for_delivery\"").unwrap();
        assert_eq!(status, DeliveryStatus::OutForDelivery);
    }

    #[test]
    fn test_display() {
        assert_eq!(BookingStatus::Picked.to_string(), "picked");
        assert_eq!(DeliveryStatus::OutForDelivery.to_string(), "out_for_delivery");
    }

    #[test]
    fn test_cod_initial_status_parse() {
        assert_eq!(
            "pending".parse::<CodInitialStatus>().unwrap(),
            CodInitialStatus::Pending
        );
        assert_eq!(
            "Confirmed".parse::<CodInitialStatus>().unwrap(),
            CodInitialStatus::Confirmed
        );
        assert!("done".parse::<CodInitialStatus>().is_err());
    }

    #[test]
    fn test_cod_initial_status_default_is_confirmed() {
        assert_eq!(
            CodInitialStatus::default().booking_status(),
            BookingStatus::Confirmed
        );
    }
}
