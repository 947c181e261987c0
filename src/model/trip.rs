use crate::model::{Amount, MemberId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

string_id!(
    /// The identifier of a trip.
    TripId
);

string_id!(
    /// The identifier of a pledge transaction.
    PledgeId
);

/// A group trip. Members join it, log expenses against it, and pledge its `pact_amount` into the
/// shared trip wallet.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Trip {
    pub id: TripId,
    pub title: String,
    pub destination: String,
    /// The fixed sum each member pledges to join the trip wallet. Zero means there is no pact.
    pub pact_amount: Amount,
    pub created_by: MemberId,
    pub created_at: DateTime<Utc>,
}

/// A trip as it appears in a listing, along with how many members have joined.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TripSummary {
    #[serde(flatten)]
    pub trip: Trip,
    pub member_count: u64,
}

/// A recorded commitment of the pact amount by a member. Having at least one of these is what
/// puts a member into the settlement pool.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Pledge {
    pub id: PledgeId,
    pub trip_id: TripId,
    pub member_id: MemberId,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}
