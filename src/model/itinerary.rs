use crate::model::{MemberId, TripId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

string_id!(
    /// The identifier of an itinerary entry.
    ItineraryItemId
);

/// One entry in a trip's shared itinerary, e.g. "Visit Baga Beach".
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ItineraryItem {
    pub id: ItineraryItemId,
    pub trip_id: TripId,
    /// Who added the entry.
    pub member_id: MemberId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}
