use crate::commands::{load_trip, money, Out};
use crate::error::{ErrorType, IntoResult, Res};
use crate::model::{MemberId, Trip, TripId};
use crate::settle::{
    compute_settlement, instructions, Directory, MemberDirectory, Settlement, TransferInstruction,
    SETTLEMENT_EPSILON,
};
use crate::{Config, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One member's position, ready for display.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BalanceLine {
    pub member_id: MemberId,
    pub name: String,
    /// Rounded to two decimal places. Negative means the member owes money.
    pub balance: Decimal,
}

/// Who owes what on a trip, and how to settle it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettlementReport {
    pub trip_id: TripId,
    pub trip_title: String,
    pub balances: Vec<BalanceLine>,
    pub transfers: Vec<TransferInstruction>,
    /// No transfers are needed and every balance is within a cent of zero.
    pub settled: bool,
}

/// Computes balances and transfers for a trip from a fresh read of its expenses and pledges.
pub async fn settle(config: Config, trip_id: &TripId) -> Result<Out<SettlementReport>> {
    let trip = load_trip(&config, trip_id).await?;
    let settlement = compute_for_trip(&config, trip_id)
        .await
        .pub_result(ErrorType::Database)?;
    report(&config, &trip, &settlement)
        .await
        .pub_result(ErrorType::Database)
}

/// Reads the trip's expenses and pledged members and runs the settlement engine over them.
pub(crate) async fn compute_for_trip(config: &Config, trip_id: &TripId) -> Res<Settlement> {
    let db = config.db();
    let expenses = db.expenses(trip_id).await?;
    let pledged = db.pledged_members(trip_id).await?;
    debug!(
        "Settling {} expense(s) among {} pledged member(s)",
        expenses.len(),
        pledged.len()
    );
    Ok(compute_settlement(&expenses, &pledged))
}

/// Presents `settlement` using the profiles of the trip's members.
pub(crate) async fn report(
    config: &Config,
    trip: &Trip,
    settlement: &Settlement,
) -> Res<Out<SettlementReport>> {
    let directory: Directory = config.db().profiles(&trip.id).await?.into_iter().collect();
    let transfers = instructions(settlement, &directory, &trip.title, config.payment_scheme())?;
    let balances: Vec<BalanceLine> = settlement
        .balances()
        .iter()
        .map(|b| BalanceLine {
            member_id: b.member_id.clone(),
            name: directory.display_name(&b.member_id),
            balance: b.balance.round_dp(2),
        })
        .collect();

    let balanced = settlement
        .balances()
        .iter()
        .all(|b| b.balance.abs() < SETTLEMENT_EPSILON);

    let message = if balances.is_empty() {
        format!(
            "Nobody has pledged to '{}' yet, so there is nothing to settle",
            trip.title
        )
    } else {
        let mut message = format!("Balances for '{}':", trip.title);
        for line in &balances {
            message.push_str(&format!(
                "\n  {:<24} {}",
                line.name,
                money(config, line.balance)
            ));
        }
        if transfers.is_empty() && balanced {
            message.push_str("\nEveryone is settled up");
        } else if transfers.is_empty() {
            // Only one side is left holding a balance, e.g. a credit from a you_are_owed expense.
            message.push_str("\nNo transfers can settle the remaining balances");
        } else {
            message.push_str("\nTo settle up:");
            for transfer in &transfers {
                message.push_str(&format!(
                    "\n  {} pays {} {}",
                    transfer.from_name,
                    transfer.to_name,
                    money(config, transfer.amount)
                ));
                if let Some(link) = &transfer.payment_link {
                    message.push_str(&format!("\n    {link}"));
                }
            }
        }
        message
    };

    Ok(Out::new(
        message,
        SettlementReport {
            trip_id: trip.id.clone(),
            trip_title: trip.title.clone(),
            balances,
            settled: transfers.is_empty() && balanced,
            transfers,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Profile, SplitMethod};
    use crate::test::TestEnv;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_settle_trip() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("a", &["b", "c"], "1000").await;
        env.pledge_all(&trip, &["a", "b", "c"]).await;
        env.add_expense(&trip, "a", "300", SplitMethod::SplitEqually, "Food")
            .await;
        env.config()
            .db()
            .upsert_profile(&Profile::new("a", "asha@example.com").with_payout_address("asha@okbank"))
            .await
            .unwrap();

        let out = settle(env.config(), &trip.id).await.unwrap();
        let report = out.structure().unwrap();
        assert!(!report.settled);
        assert_eq!(report.balances.len(), 3);
        assert_eq!(report.balances[0].name, "asha@example.com");
        assert_eq!(report.balances[0].balance, Decimal::from(200));
        assert_eq!(report.transfers.len(), 2);
        assert_eq!(report.transfers[0].from, MemberId::from("b"));
        assert_eq!(report.transfers[0].to_name, "asha@example.com");
        assert_eq!(report.transfers[0].amount, Decimal::from(100));
        assert!(report.transfers[0]
            .payment_link
            .as_deref()
            .unwrap()
            .starts_with("upi://pay?payee=asha%40okbank&amount=100.00"));
        assert!(out.message().contains("b pays asha@example.com ₹100.00"));
    }

    #[tokio::test]
    async fn test_settle_without_pledges() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("a", &["b"], "0").await;
        env.add_expense(&trip, "a", "300", SplitMethod::SplitEqually, "Food")
            .await;
        let out = settle(env.config(), &trip.id).await.unwrap();
        assert!(out.structure().unwrap().balances.is_empty());
        assert!(out.message().contains("nothing to settle"));
    }

    #[tokio::test]
    async fn test_unpledged_payer_is_left_out() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("a", &["b", "c"], "0").await;
        env.pledge_all(&trip, &["a", "b"]).await;
        env.add_expense(&trip, "c", "90", SplitMethod::SplitEqually, "Fuel")
            .await;
        let settlement = compute_for_trip(&env.config(), &trip.id).await.unwrap();
        assert_eq!(
            settlement.balances().get(&MemberId::from("a")),
            Some(Decimal::from_str("-45").unwrap())
        );
        assert_eq!(settlement.balances().get(&MemberId::from("c")), None);
        assert!(settlement.is_settled());

        let out = settle(env.config(), &trip.id).await.unwrap();
        assert!(!out.structure().unwrap().settled);
        assert!(out
            .message()
            .contains("No transfers can settle the remaining balances"));
    }

    #[tokio::test]
    async fn test_one_sided_balance_is_not_settled_up() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("a", &["b"], "0").await;
        env.pledge_all(&trip, &["a", "b"]).await;
        env.add_expense(&trip, "a", "100", SplitMethod::SplitEqually, "Stay")
            .await;
        env.add_expense(&trip, "b", "50", SplitMethod::YouAreOwed, "Fuel")
            .await;

        let out = settle(env.config(), &trip.id).await.unwrap();
        let report = out.structure().unwrap();
        assert!(report.transfers.is_empty());
        assert_eq!(report.balances[0].balance, Decimal::from(50));
        assert_eq!(report.balances[1].balance, Decimal::ZERO);
        assert!(!report.settled);
        assert!(out
            .message()
            .contains("No transfers can settle the remaining balances"));
        assert!(!out.message().contains("Everyone is settled up"));
    }

    #[tokio::test]
    async fn test_no_expenses_is_settled_up() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("a", &["b"], "0").await;
        env.pledge_all(&trip, &["a", "b"]).await;
        let out = settle(env.config(), &trip.id).await.unwrap();
        assert!(out.structure().unwrap().settled);
        assert!(out.message().contains("Everyone is settled up"));
    }
}
