//! Trip commands: create, list, show and join.

use crate::args::CreateTripArgs;
use crate::commands::{load_trip, money, require_member, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Amount, ItineraryItem, MemberId, Trip, TripId, TripSummary};
use crate::settle::total_spent;
use crate::{Config, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Everything about a trip on one screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TripDetail {
    #[serde(flatten)]
    pub trip: Trip,
    /// In the order they joined.
    pub members: Vec<MemberId>,
    /// Members who have pledged, in the order of their first pledge.
    pub pledged: Vec<MemberId>,
    /// The sum of all pledges.
    pub wallet: Amount,
    pub itinerary: Vec<ItineraryItem>,
    pub expense_count: usize,
    pub total_spent: Amount,
}

/// Creates a trip with the acting member as its first member.
pub async fn create_trip(
    config: Config,
    member: Option<&MemberId>,
    args: CreateTripArgs,
) -> Result<Out<Trip>> {
    let member = require_member(member)?;
    let trip = config
        .db()
        .create_trip(
            member,
            args.title(),
            args.destination(),
            money(&config, args.pact_amount().value()),
        )
        .await
        .pub_result(ErrorType::Request)?;
    info!("Created trip '{}'", trip.title);
    Ok(Out::new(
        format!(
            "Created trip '{}' with ID {}. Share the ID so others can join.",
            trip.title, trip.id
        ),
        trip,
    ))
}

/// Lists the acting member's trips. Lists every trip when `all` is set or no member is known.
pub async fn list_trips(
    config: Config,
    member: Option<&MemberId>,
    all: bool,
) -> Result<Out<Vec<TripSummary>>> {
    let filter = if all { None } else { member };
    let trips = config
        .db()
        .list_trips(filter)
        .await
        .pub_result(ErrorType::Database)?;

    let mut message = match (filter, trips.len()) {
        (_, 0) => "No trips found".to_string(),
        (Some(member), n) => format!("{member} belongs to {n} trip(s):"),
        (None, n) => format!("Found {n} trip(s):"),
    };
    for summary in &trips {
        message.push_str(&format!(
            "\n  {}  {} ({} member(s))",
            summary.trip.id, summary.trip.title, summary.member_count
        ));
    }
    Ok(Out::new(message, trips))
}

/// Shows a trip with its members, pledges, itinerary and spending.
pub async fn show_trip(config: Config, trip_id: &TripId) -> Result<Out<TripDetail>> {
    let trip = load_trip(&config, trip_id).await?;
    let db = config.db();
    let members = db.members(trip_id).await.pub_result(ErrorType::Database)?;
    let pledges = db.pledges(trip_id).await.pub_result(ErrorType::Database)?;
    let pledged = db
        .pledged_members(trip_id)
        .await
        .pub_result(ErrorType::Database)?;
    let itinerary = db.itinerary(trip_id).await.pub_result(ErrorType::Database)?;
    let expenses = db.expenses(trip_id).await.pub_result(ErrorType::Database)?;

    let wallet: Decimal = pledges.iter().map(|p| p.amount.value()).sum();
    let detail = TripDetail {
        members,
        pledged,
        wallet: money(&config, wallet),
        itinerary,
        expense_count: expenses.len(),
        total_spent: money(&config, total_spent(&expenses)),
        trip,
    };

    let message = format!(
        "{} ({})\n  Pact: {} per member\n  Members: {}, pledged: {}\n  Wallet: {}\n  \
        Spent: {} across {} expense(s)\n  Itinerary entries: {}",
        detail.trip.title,
        if detail.trip.destination.is_empty() {
            "no destination yet"
        } else {
            detail.trip.destination.as_str()
        },
        money(&config, detail.trip.pact_amount.value()),
        detail.members.len(),
        detail.pledged.len(),
        detail.wallet,
        detail.total_spent,
        detail.expense_count,
        detail.itinerary.len(),
    );
    Ok(Out::new(message, detail))
}

/// Adds the acting member to a trip they were invited to.
pub async fn join_trip(
    config: Config,
    member: Option<&MemberId>,
    trip_id: &TripId,
) -> Result<Out<()>> {
    let member = require_member(member)?;
    let trip = load_trip(&config, trip_id).await?;
    let joined = config
        .db()
        .join_trip(trip_id, member)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(if joined {
        format!("{member} joined '{}'", trip.title).into()
    } else {
        format!("{member} is already a member of '{}'", trip.title).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SplitMethod;
    use crate::test::TestEnv;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_create_and_list() {
        let env = TestEnv::new().await;
        let asha = MemberId::from("asha");
        let args = CreateTripArgs::new("Ladakh", "Leh", Amount::from_str("3000").unwrap());
        let out = create_trip(env.config(), Some(&asha), args).await.unwrap();
        let trip = out.structure().unwrap().clone();
        assert_eq!(trip.created_by, asha);

        let out = list_trips(env.config(), Some(&asha), false).await.unwrap();
        assert_eq!(out.structure().unwrap().len(), 1);
        assert!(out.message().contains("Ladakh"));

        let out = list_trips(env.config(), Some(&MemberId::from("bilal")), false)
            .await
            .unwrap();
        assert_eq!(out.message(), "No trips found");

        let out = list_trips(env.config(), Some(&MemberId::from("bilal")), true)
            .await
            .unwrap();
        assert_eq!(out.structure().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_member() {
        let env = TestEnv::new().await;
        let args = CreateTripArgs::new("Ladakh", "", Amount::default());
        let err = create_trip(env.config(), None, args).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
    }

    #[tokio::test]
    async fn test_join_twice() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("asha", &[], "0").await;
        let bilal = MemberId::from("bilal");
        let out = join_trip(env.config(), Some(&bilal), &trip.id).await.unwrap();
        assert!(out.message().contains("joined"));
        let out = join_trip(env.config(), Some(&bilal), &trip.id).await.unwrap();
        assert!(out.message().contains("already a member"));

        let err = join_trip(env.config(), Some(&bilal), &TripId::from("trip-x"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
    }

    #[tokio::test]
    async fn test_show_trip() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("a", &["b", "c"], "500").await;
        env.pledge_all(&trip, &["a", "b"]).await;
        env.add_expense(&trip, "a", "300", SplitMethod::SplitEqually, "Food")
            .await;
        env.add_expense(&trip, "b", "45.50", SplitMethod::YouAreOwed, "Misc")
            .await;

        let out = show_trip(env.config(), &trip.id).await.unwrap();
        let detail = out.structure().unwrap();
        assert_eq!(detail.members.len(), 3);
        assert_eq!(detail.pledged.len(), 2);
        assert_eq!(detail.wallet.value(), Decimal::from(1000));
        assert_eq!(detail.expense_count, 2);
        assert_eq!(detail.total_spent.value(), Decimal::from_str("345.50").unwrap());
        assert!(out.message().contains("₹345.50"));
    }
}
