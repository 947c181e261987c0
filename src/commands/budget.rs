use crate::args::SetBudgetArgs;
use crate::commands::{load_trip, money, require_member, require_membership, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Amount, Budget, MemberId, TripId};
use crate::settle::{budget_report as usage, total_spent, BudgetUsage};
use crate::{Config, Result};
use serde::{Deserialize, Serialize};

/// Spending against each declared budget, plus the trip's total.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BudgetReport {
    pub total_spent: Amount,
    pub budgets: Vec<BudgetUsage>,
}

/// Declares or replaces the budget of a category.
pub async fn set_budget(
    config: Config,
    member: Option<&MemberId>,
    args: SetBudgetArgs,
) -> Result<Out<Budget>> {
    let member = require_member(member)?;
    load_trip(&config, args.trip()).await?;
    require_membership(&config, args.trip(), member).await?;

    let budget = Budget::new(
        args.trip().clone(),
        args.category().trim(),
        money(&config, args.amount().value()),
    );
    config
        .db()
        .set_budget(&budget)
        .await
        .pub_result(ErrorType::Request)?;
    Ok(Out::new(
        format!("Budget for {} set to {}", budget.category, budget.amount),
        budget,
    ))
}

/// Reports how much of each declared budget has been spent.
pub async fn budget_report(config: Config, trip_id: &TripId) -> Result<Out<BudgetReport>> {
    let trip = load_trip(&config, trip_id).await?;
    let db = config.db();
    let budgets = db.budgets(trip_id).await.pub_result(ErrorType::Database)?;
    let expenses = db.expenses(trip_id).await.pub_result(ErrorType::Database)?;

    let report = BudgetReport {
        total_spent: money(&config, total_spent(&expenses)),
        budgets: usage(&budgets, &expenses),
    };

    let mut message = format!("Budgets for '{}':", trip.title);
    if report.budgets.is_empty() {
        message.push_str("\n  No budgets declared");
    }
    for line in &report.budgets {
        message.push_str(&format!(
            "\n  {:<12} {} of {} ({}%){}",
            line.category,
            money(&config, line.spent),
            money(&config, line.declared),
            line.percent,
            if line.is_over() { "  OVER BUDGET" } else { "" }
        ));
    }
    message.push_str(&format!("\nTotal spent: {}", report.total_spent));
    Ok(Out::new(message, report))
}
