//! A `Generator` that answers from built-in data.
//!
//! Note: this is compiled into the release binary as well so that the whole program can be driven
//! end to end without an API key.

use crate::ai::{schema_title, Generator};
use crate::error::Res;
use anyhow::bail;
use serde_json::{json, Value};
use tracing::trace;

pub(crate) struct CannedGenerator;

#[async_trait::async_trait]
impl Generator for CannedGenerator {
    async fn generate(&self, prompt: &str, schema: Value) -> Res<Value> {
        trace!("Canned generation for prompt: {prompt}");
        match schema_title(&schema) {
            Some("ItineraryPlan") => Ok(itinerary()),
            Some("DealList") => Ok(deals()),
            Some(other) => bail!("No canned response for schema '{other}'"),
            None => bail!("No canned response for an untitled schema"),
        }
    }
}

fn itinerary() -> Value {
    json!({
        "items": [
            {"day": 1, "title": "Arrive and check in", "notes": "Keep the first evening light."},
            {"day": 1, "title": "Sunset walk along the waterfront", "notes": ""},
            {"day": 2, "title": "Old town walking tour", "notes": "Most tours start at 9 am."},
            {"day": 2, "title": "Street food crawl", "notes": "Carry cash."},
            {"day": 3, "title": "Day trip to the nearest viewpoint", "notes": "Book transport a day ahead."},
            {"day": 4, "title": "Souvenir shopping and departure", "notes": ""}
        ]
    })
}

fn deals() -> Value {
    json!({
        "deals": [
            {
                "title": "Student return fares",
                "category": "Flights",
                "description": "Discounted return tickets with a valid student ID.",
                "estimated_price": "4,500"
            },
            {
                "title": "Dorm beds from the hostel chain",
                "category": "Hostels",
                "description": "Shared dorms with breakfast included, cheaper for groups of four or more.",
                "estimated_price": "650"
            },
            {
                "title": "Scooter rental for the week",
                "category": "Transport",
                "description": "Weekly rate beats paying per day.",
                "estimated_price": "2,100"
            }
        ]
    })
}
