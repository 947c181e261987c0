//! Itinerary and deal suggestions.

use crate::ai::Generator;
use crate::error::Res;
use crate::model::Trip;
use anyhow::{ensure, Context};
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The longest itinerary we will ask for.
const MAX_DAYS: u32 = 30;

/// A suggested itinerary, one or more entries per day.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItineraryPlan {
    pub items: Vec<ItinerarySuggestion>,
}

/// A single suggested activity.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItinerarySuggestion {
    /// 1-based day of the trip.
    pub day: u32,
    /// Short title, suitable as an itinerary entry.
    pub title: String,
    /// Practical tips. May be empty.
    #[serde(default)]
    pub notes: String,
}

/// Suggested deals for a destination.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DealList {
    pub deals: Vec<DealSuggestion>,
}

/// A money-saving offer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DealSuggestion {
    pub title: String,
    /// e.g. Flights, Hostels, Transport.
    pub category: String,
    pub description: String,
    /// A rough price in the trip's currency, as text.
    #[serde(default)]
    pub estimated_price: String,
}

/// Asks `generator` for a `days`-long itinerary for `trip`. Entries come back ordered by day.
pub(crate) async fn suggest_itinerary(
    generator: &dyn Generator,
    trip: &Trip,
    days: u32,
) -> Res<Vec<ItinerarySuggestion>> {
    ensure!(
        (1..=MAX_DAYS).contains(&days),
        "An itinerary must cover between 1 and {MAX_DAYS} days"
    );
    let place = if trip.destination.is_empty() {
        trip.title.as_str()
    } else {
        trip.destination.as_str()
    };
    let prompt = format!(
        "Plan a {days}-day itinerary for a group trip called '{}' to {place}. Suggest two or \
        three affordable activities per day, numbering days from 1.",
        trip.title
    );

    let plan: ItineraryPlan = generate_as(generator, &prompt).await?;
    let mut items: Vec<ItinerarySuggestion> = plan
        .items
        .into_iter()
        .filter(|item| !item.title.trim().is_empty())
        .filter(|item| (1..=days).contains(&item.day))
        .collect();
    items.sort_by_key(|item| item.day);
    debug!("Received {} itinerary suggestions", items.len());
    Ok(items)
}

/// Asks `generator` for student-friendly deals at `destination`.
pub(crate) async fn suggest_deals(
    generator: &dyn Generator,
    destination: &str,
) -> Res<Vec<DealSuggestion>> {
    let destination = destination.trim();
    ensure!(!destination.is_empty(), "A destination is required to find deals");
    let prompt = format!(
        "List current money-saving deals for students travelling to {destination}: flights, \
        hostels and local transport. Give a rough price for each."
    );
    let list: DealList = generate_as(generator, &prompt).await?;
    debug!("Received {} deals", list.deals.len());
    Ok(list.deals)
}

async fn generate_as<T>(generator: &dyn Generator, prompt: &str) -> Res<T>
where
    T: JsonSchema + DeserializeOwned,
{
    let schema = serde_json::to_value(schema_for!(T)).context("Unable to serialize schema")?;
    let value = generator.generate(prompt, schema).await?;
    serde_json::from_value(value).context("The text generator returned output in the wrong shape")
}
