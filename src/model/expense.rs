use crate::model::{Amount, MemberId, TripId};
use crate::utils::generate_id;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

string_id!(
    /// The identifier of an expense.
    ExpenseId
);

/// How an expense is treated when balances are computed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Ord,
    PartialOrd,
    Hash,
    Default,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    /// A shared cost, divided evenly among all pledged members.
    #[default]
    SplitEqually,
    /// The payer is credited the amount, but it is not part of the shared cost pool.
    YouAreOwed,
}

serde_plain::derive_display_from_serialize!(SplitMethod);
serde_plain::derive_fromstr_from_deserialize!(SplitMethod);

/// A single logged expense on a trip.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Expense {
    pub id: ExpenseId,
    pub trip_id: TripId,
    pub paid_by: MemberId,
    pub description: String,
    pub amount: Amount,
    pub split_method: SplitMethod,
    /// Free-form label, only used for budget tracking.
    pub category: String,
    /// Public URL of an uploaded receipt, if any.
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Creates a new expense with a generated ID, no description, no category and no receipt.
    pub fn new(
        trip_id: impl Into<TripId>,
        paid_by: impl Into<MemberId>,
        amount: Amount,
        split_method: SplitMethod,
    ) -> Self {
        Self {
            id: ExpenseId::new(generate_id("exp")),
            trip_id: trip_id.into(),
            paid_by: paid_by.into(),
            description: String::new(),
            amount,
            split_method,
            category: String::new(),
            receipt_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_receipt_url(mut self, receipt_url: impl Into<String>) -> Self {
        self.receipt_url = Some(receipt_url.into());
        self
    }

    /// The amount this expense contributes to any tally. Amounts are never negative; a negative
    /// value that slipped past validation contributes nothing.
    pub fn contribution(&self) -> Decimal {
        self.amount.value().max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_split_method_strings() {
        assert_eq!(SplitMethod::SplitEqually.to_string(), "split_equally");
        assert_eq!(
            SplitMethod::from_str("you_are_owed").unwrap(),
            SplitMethod::YouAreOwed
        );
        assert!(SplitMethod::from_str("by_shares").is_err());
    }

    #[test]
    fn test_contribution_ignores_negative() {
        let amount = Amount::from_str("-20").unwrap();
        let expense = Expense::new("t", "m", amount, SplitMethod::SplitEqually);
        assert_eq!(expense.contribution(), Decimal::ZERO);

        let amount = Amount::from_str("₹20.50").unwrap();
        let expense = Expense::new("t", "m", amount, SplitMethod::YouAreOwed);
        assert_eq!(expense.contribution(), Decimal::from_str("20.50").unwrap());
    }
}
