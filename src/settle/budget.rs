//! Budget tracking: how much of each category's declared budget has been spent.

use crate::model::{Budget, Expense};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Spending against one declared category budget.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BudgetUsage {
    pub category: String,
    pub declared: Decimal,
    pub spent: Decimal,
    /// `spent` as a percentage of `declared`, clamped to `[0, 100]` for display.
    pub percent: Decimal,
}

impl BudgetUsage {
    /// True when more has been spent than was declared.
    pub fn is_over(&self) -> bool {
        self.spent > self.declared
    }
}

/// Sums expense amounts per category, regardless of payer or split method.
pub fn spend_by_category(expenses: &[Expense]) -> BTreeMap<String, Decimal> {
    let mut spend = BTreeMap::new();
    for expense in expenses {
        let total = spend
            .entry(expense.category.clone())
            .or_insert(Decimal::ZERO);
        *total = total.saturating_add(expense.contribution());
    }
    spend
}

/// The trip's running total across all expenses.
pub fn total_spent(expenses: &[Expense]) -> Decimal {
    expenses
        .iter()
        .map(Expense::contribution)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Reports spent-vs-declared for each budget, in the order the budgets are given.
pub fn budget_report(budgets: &[Budget], expenses: &[Expense]) -> Vec<BudgetUsage> {
    let spend = spend_by_category(expenses);
    budgets
        .iter()
        .map(|budget| {
            let declared = budget.amount.value();
            let spent = spend
                .get(&budget.category)
                .copied()
                .unwrap_or(Decimal::ZERO);
            BudgetUsage {
                category: budget.category.clone(),
                declared,
                spent,
                percent: percent(spent, declared),
            }
        })
        .collect()
}

fn percent(spent: Decimal, declared: Decimal) -> Decimal {
    if declared <= Decimal::ZERO {
        // Any spending at all exhausts an empty budget.
        return if spent > Decimal::ZERO {
            HUNDRED
        } else {
            Decimal::ZERO
        };
    }
    match spent
        .checked_div(declared)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
    {
        Some(percent) => percent.clamp(Decimal::ZERO, HUNDRED).round_dp(2),
        // Spending so far beyond a tiny budget that the ratio is not representable.
        None => HUNDRED,
    }
}
