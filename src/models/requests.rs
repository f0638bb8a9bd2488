use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::domain::TimeSlot;

/// Request body for a cleaner accepting a booking
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AcceptRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "cleaner_id", rename = "cleanerId")]
    pub cleaner_id: String,
    /// Which of the booking's date options the cleaner is taking.
    /// Defaults to the customer's first choice.
    #[serde(default, alias = "scheduled_date", rename = "scheduledDate")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default, alias = "time_slot", rename = "timeSlot")]
    pub time_slot: Option<TimeSlot>,
}

/// Query for the browse ranking
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CandidatesQuery {
    #[validate(range(min = 1, max = 500))]
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Query for the debug explain endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExplainQuery {
    #[validate(length(min = 1))]
    #[serde(alias = "booking_id", rename = "bookingId")]
    pub booking_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "cleaner_id", rename = "cleanerId")]
    pub cleaner_id: String,
}
