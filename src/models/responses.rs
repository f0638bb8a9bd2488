use serde::{Deserialize, Serialize};
use crate::models::domain::{FunnelStats, Job, RankedCandidate};

/// Response for the browse ranking endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatesResponse {
    pub booking_id: String,
    pub candidates: Vec<RankedCandidate>,
    pub total_eligible: usize,
    pub low_supply: bool,
    pub funnel: FunnelStats,
}

/// Response for a successful accept
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    pub success: bool,
    pub job: Job,
    pub offers_purged: u64,
    pub customer_notified: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
