//! Command handlers for the pact CLI.
//!
//! Each handler takes the loaded `Config` and returns an `Out`, so that the same code serves both
//! the command line and the MCP server.

mod budget;
mod expense;
mod init;
mod itinerary;
mod mcp;
mod pledge;
mod profile;
mod settle;
mod trip;

use crate::error::{Error, ErrorType, IntoResult};
use crate::model::{Amount, MemberId, Trip, TripId};
use crate::{Config, Result};
use anyhow::anyhow;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use budget::{budget_report, set_budget, BudgetReport};
pub use expense::{add_expense, delete_expense, list_expenses, ExpenseList};
pub use init::init;
pub use itinerary::{add_itinerary_item, deals, list_itinerary, suggest_itinerary};
pub use mcp::mcp;
pub use pledge::pledge;
pub use profile::set_profile;
pub use settle::{settle, BalanceLine, SettlementReport};
pub use trip::{create_trip, join_trip, list_trips, show_trip, TripDetail};

pub(crate) use settle::{compute_for_trip, report};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data to both the command line and MCP server interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// The acting member, which commands that change a trip cannot do without.
fn require_member(member: Option<&MemberId>) -> Result<&MemberId> {
    member.ok_or_else(|| {
        Error::new(
            ErrorType::Request,
            anyhow!("This command needs to know who you are, pass --member or set PACT_MEMBER"),
        )
    })
}

/// Loads a trip, where a missing trip is the caller's mistake rather than a database failure.
async fn load_trip(config: &Config, trip_id: &TripId) -> Result<Trip> {
    config
        .db()
        .get_trip(trip_id)
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| {
            Error::new(
                ErrorType::Request,
                anyhow!("Trip {trip_id} does not exist"),
            )
        })
}

/// Requires that `member` belongs to the trip.
async fn require_membership(config: &Config, trip_id: &TripId, member: &MemberId) -> Result<()> {
    let is_member = config
        .db()
        .is_member(trip_id, member)
        .await
        .pub_result(ErrorType::Database)?;
    if is_member {
        Ok(())
    } else {
        Err(Error::new(
            ErrorType::Request,
            anyhow!("{member} is not a member of trip {trip_id}"),
        ))
    }
}

/// `value` as an `Amount` that displays with the configured currency symbol.
fn money(config: &Config, value: Decimal) -> Amount {
    Amount::with_symbol(value, config.currency_symbol())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[test]
    fn test_out_from_message() {
        let out: Out<()> = "done".into();
        assert_eq!(out.message(), "done");
        assert!(out.structure().is_none());
    }

    #[test]
    fn test_require_member() {
        let err = require_member(None).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
        let member = MemberId::from("asha");
        assert_eq!(require_member(Some(&member)).unwrap(), &member);
    }

    #[tokio::test]
    async fn test_load_trip_missing_is_request_error() {
        let env = TestEnv::new().await;
        let err = load_trip(&env.config(), &TripId::from("trip-nope"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
    }

    #[tokio::test]
    async fn test_money_uses_configured_symbol() {
        let env = TestEnv::new().await;
        let amount = money(&env.config(), Decimal::from(1500));
        assert_eq!(amount.to_string(), "₹1,500.00");
    }
}
