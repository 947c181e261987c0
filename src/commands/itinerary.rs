//! Itinerary commands, including the generated itinerary and deal suggestions.

use crate::ai::{self, DealSuggestion, ItinerarySuggestion};
use crate::args::{AddItineraryArgs, SuggestItineraryArgs};
use crate::commands::{load_trip, require_member, require_membership, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{ItineraryItem, MemberId, TripId};
use crate::{Config, Mode, Result};
use tracing::debug;

/// Adds an entry to a trip's itinerary on behalf of the acting member.
pub async fn add_itinerary_item(
    config: Config,
    member: Option<&MemberId>,
    args: AddItineraryArgs,
) -> Result<Out<ItineraryItem>> {
    let member = require_member(member)?;
    load_trip(&config, args.trip()).await?;
    require_membership(&config, args.trip(), member).await?;
    let item = config
        .db()
        .add_itinerary_item(args.trip(), member, args.title())
        .await
        .pub_result(ErrorType::Request)?;
    Ok(Out::new(format!("Added '{}' to the itinerary", item.title), item))
}

/// Lists a trip's itinerary, oldest entry first.
pub async fn list_itinerary(config: Config, trip_id: &TripId) -> Result<Out<Vec<ItineraryItem>>> {
    let trip = load_trip(&config, trip_id).await?;
    let items = config
        .db()
        .itinerary(trip_id)
        .await
        .pub_result(ErrorType::Database)?;
    let message = if items.is_empty() {
        format!("No itinerary items added to '{}' yet", trip.title)
    } else {
        let mut message = format!("Itinerary for '{}':", trip.title);
        for item in &items {
            message.push_str(&format!("\n  - {}", item.title));
        }
        message
    };
    Ok(Out::new(message, items))
}

/// Asks the text generator for an itinerary. With `--add`, each suggestion is also added to the
/// trip's itinerary on behalf of the acting member.
pub async fn suggest_itinerary(
    config: Config,
    mode: Mode,
    member: Option<&MemberId>,
    args: SuggestItineraryArgs,
) -> Result<Out<Vec<ItinerarySuggestion>>> {
    let trip = load_trip(&config, args.trip()).await?;
    let adding_as = if args.add() {
        let member = require_member(member)?;
        require_membership(&config, args.trip(), member).await?;
        Some(member)
    } else {
        None
    };

    let generator = ai::generator(config.generator(), mode).pub_result(ErrorType::Config)?;
    let suggestions = ai::suggest_itinerary(generator.as_ref(), &trip, args.days())
        .await
        .pub_result(ErrorType::Generation)?;

    let mut message = format!(
        "Suggested {}-day itinerary for '{}':",
        args.days(),
        trip.title
    );
    for suggestion in &suggestions {
        message.push_str(&format!("\n  Day {}: {}", suggestion.day, suggestion.title));
        if !suggestion.notes.is_empty() {
            message.push_str(&format!(" ({})", suggestion.notes));
        }
    }

    if let Some(member) = adding_as {
        for suggestion in &suggestions {
            let title = format!("Day {}: {}", suggestion.day, suggestion.title);
            config
                .db()
                .add_itinerary_item(args.trip(), member, &title)
                .await
                .pub_result(ErrorType::Database)?;
        }
        debug!("Added {} suggestions to the itinerary", suggestions.len());
        message.push_str(&format!(
            "\nAdded {} entries to the itinerary",
            suggestions.len()
        ));
    }
    Ok(Out::new(message, suggestions))
}

/// Asks the text generator for student-friendly deals at `destination`.
pub async fn deals(
    config: Config,
    mode: Mode,
    destination: &str,
) -> Result<Out<Vec<DealSuggestion>>> {
    let generator = ai::generator(config.generator(), mode).pub_result(ErrorType::Config)?;
    let deals = ai::suggest_deals(generator.as_ref(), destination)
        .await
        .pub_result(ErrorType::Generation)?;

    let mut message = format!("Found {} deal(s) for {}:", deals.len(), destination.trim());
    for deal in &deals {
        message.push_str(&format!("\n  [{}] {}", deal.category, deal.title));
        if !deal.estimated_price.is_empty() {
            message.push_str(&format!(
                ", about {}{}",
                config.currency_symbol(),
                deal.estimated_price
            ));
        }
    }
    Ok(Out::new(message, deals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_add_and_list() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("asha", &[], "0").await;
        let asha = MemberId::from("asha");
        add_itinerary_item(
            env.config(),
            Some(&asha),
            AddItineraryArgs::new(trip.id.clone(), "Visit Baga Beach"),
        )
        .await
        .unwrap();

        let out = list_itinerary(env.config(), &trip.id).await.unwrap();
        assert_eq!(out.structure().unwrap().len(), 1);
        assert!(out.message().contains("- Visit Baga Beach"));
    }

    #[tokio::test]
    async fn test_add_blank_title() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("asha", &[], "0").await;
        let err = add_itinerary_item(
            env.config(),
            Some(&MemberId::from("asha")),
            AddItineraryArgs::new(trip.id.clone(), " "),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
    }

    #[tokio::test]
    async fn test_suggest_and_add() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("asha", &[], "0").await;
        let asha = MemberId::from("asha");

        let out = suggest_itinerary(
            env.config(),
            Mode::Testing,
            None,
            SuggestItineraryArgs::new(trip.id.clone(), 2, false),
        )
        .await
        .unwrap();
        let count = out.structure().unwrap().len();
        assert!(count > 0);
        assert!(env.config().db().itinerary(&trip.id).await.unwrap().is_empty());

        suggest_itinerary(
            env.config(),
            Mode::Testing,
            Some(&asha),
            SuggestItineraryArgs::new(trip.id.clone(), 2, true),
        )
        .await
        .unwrap();
        let items = env.config().db().itinerary(&trip.id).await.unwrap();
        assert_eq!(items.len(), count);
        assert!(items[0].title.starts_with("Day 1: "));
    }

    #[tokio::test]
    async fn test_suggest_add_requires_member() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("asha", &[], "0").await;
        let err = suggest_itinerary(
            env.config(),
            Mode::Testing,
            None,
            SuggestItineraryArgs::new(trip.id.clone(), 2, true),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
    }

    #[tokio::test]
    async fn test_deals() {
        let env = TestEnv::new().await;
        let out = deals(env.config(), Mode::Testing, "Goa").await.unwrap();
        assert_eq!(out.structure().unwrap().len(), 3);
        assert!(out.message().contains("[Flights]"));

        let err = deals(env.config(), Mode::Testing, "").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Generation);
    }
}
