use crate::model::{Amount, TripId};
use serde::{Deserialize, Serialize};

/// A declared spending limit for one expense category on a trip.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Budget {
    pub trip_id: TripId,
    pub category: String,
    pub amount: Amount,
}

impl Budget {
    pub fn new(trip_id: impl Into<TripId>, category: impl Into<String>, amount: Amount) -> Self {
        Self {
            trip_id: trip_id.into(),
            category: category.into(),
            amount,
        }
    }
}
