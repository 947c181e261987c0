use crate::args::AddExpenseArgs;
use crate::commands::{load_trip, money, require_member, require_membership, Out};
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::{Amount, Expense, ExpenseId, MemberId, SplitMethod, TripId, MAX_AMOUNT};
use crate::settle::total_spent;
use crate::{Config, Result};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// A trip's expenses, newest first, along with their running total.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExpenseList {
    pub expenses: Vec<Expense>,
    pub total: Amount,
}

/// Logs an expense paid by the acting member.
pub async fn add_expense(
    config: Config,
    member: Option<&MemberId>,
    args: AddExpenseArgs,
) -> Result<Out<Expense>> {
    let member = require_member(member)?;
    if args.amount().is_negative() {
        return Err(Error::new(
            ErrorType::Request,
            anyhow!("An expense amount cannot be negative"),
        ));
    }
    if args.amount().exceeds_limit() {
        return Err(Error::new(
            ErrorType::Request,
            anyhow!("An expense amount cannot be more than {MAX_AMOUNT}"),
        ));
    }
    let trip = load_trip(&config, args.trip()).await?;
    require_membership(&config, args.trip(), member).await?;

    let mut expense = Expense::new(
        args.trip().clone(),
        member.clone(),
        money(&config, args.amount().value()),
        args.split(),
    )
    .with_description(args.description().trim())
    .with_category(args.category().trim());
    if let Some(url) = args.receipt_url() {
        expense = expense.with_receipt_url(url);
    }

    config
        .db()
        .add_expense(&expense)
        .await
        .pub_result(ErrorType::Database)?;

    let how = match expense.split_method {
        SplitMethod::SplitEqually => "split equally",
        SplitMethod::YouAreOwed => "owed to you",
    };
    Ok(Out::new(
        format!(
            "Added {} ({how}) to '{}' as {}",
            expense.amount, trip.title, expense.id
        ),
        expense,
    ))
}

/// Lists a trip's expenses, newest first, with the total spent.
pub async fn list_expenses(config: Config, trip_id: &TripId) -> Result<Out<ExpenseList>> {
    let trip = load_trip(&config, trip_id).await?;
    let expenses = config
        .db()
        .expenses(trip_id)
        .await
        .pub_result(ErrorType::Database)?;
    let total = money(&config, total_spent(&expenses));

    let mut message = if expenses.is_empty() {
        format!("No expenses logged for '{}' yet", trip.title)
    } else {
        format!("Expenses for '{}':", trip.title)
    };
    for expense in &expenses {
        let label = if expense.description.is_empty() {
            expense.category.as_str()
        } else {
            expense.description.as_str()
        };
        message.push_str(&format!(
            "\n  {}  {:>12}  {}  {}",
            expense.id,
            money(&config, expense.amount.value()).to_string(),
            expense.paid_by,
            label
        ));
    }
    message.push_str(&format!("\nTotal: {total}"));

    Ok(Out::new(message, ExpenseList { expenses, total }))
}

/// Deletes an expense. Only its payer or the trip's creator may do so.
pub async fn delete_expense(
    config: Config,
    member: Option<&MemberId>,
    expense_id: &ExpenseId,
) -> Result<Out<Expense>> {
    let member = require_member(member)?;
    let expense = config
        .db()
        .delete_expense(expense_id, member)
        .await
        .pub_result(ErrorType::Request)?;
    Ok(Out::new(
        format!("Deleted expense {} of {}", expense.id, expense.amount),
        expense,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("asha", &["bilal"], "0").await;
        let bilal = MemberId::from("bilal");

        let args = AddExpenseArgs::new(trip.id.clone(), amount("1200"), SplitMethod::SplitEqually)
            .with_description("Hostel")
            .with_category("Stay");
        let out = add_expense(env.config(), Some(&bilal), args).await.unwrap();
        assert_eq!(out.structure().unwrap().paid_by, bilal);

        let args = AddExpenseArgs::new(trip.id.clone(), amount("80.50"), SplitMethod::YouAreOwed);
        add_expense(env.config(), Some(&bilal), args).await.unwrap();

        let out = list_expenses(env.config(), &trip.id).await.unwrap();
        let list = out.structure().unwrap();
        assert_eq!(list.expenses.len(), 2);
        assert_eq!(list.expenses[1].description, "Hostel");
        assert_eq!(list.total.value(), Decimal::from_str("1280.50").unwrap());
        assert!(out.message().ends_with("Total: ₹1,280.50"));
    }

    #[tokio::test]
    async fn test_add_expense_rejections() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("asha", &[], "0").await;

        let args = AddExpenseArgs::new(trip.id.clone(), amount("10"), SplitMethod::SplitEqually);
        let err = add_expense(env.config(), Some(&MemberId::from("zoya")), args)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);

        let args = AddExpenseArgs::new(trip.id.clone(), amount("-10"), SplitMethod::SplitEqually);
        let err = add_expense(env.config(), Some(&MemberId::from("asha")), args)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);

        let args = AddExpenseArgs::new(
            trip.id.clone(),
            amount("50000000000000000000000000000"),
            SplitMethod::SplitEqually,
        );
        let err = add_expense(env.config(), Some(&MemberId::from("asha")), args)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
    }

    #[tokio::test]
    async fn test_delete_expense() {
        let env = TestEnv::new().await;
        let trip = env.trip_with_members("asha", &["bilal", "chen"], "0").await;
        let expense = env
            .add_expense(&trip, "bilal", "300", SplitMethod::SplitEqually, "Food")
            .await;

        let err = delete_expense(env.config(), Some(&MemberId::from("chen")), &expense.id)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);

        delete_expense(env.config(), Some(&MemberId::from("asha")), &expense.id)
            .await
            .unwrap();
        let out = list_expenses(env.config(), &trip.id).await.unwrap();
        assert!(out.structure().unwrap().expenses.is_empty());
    }
}
