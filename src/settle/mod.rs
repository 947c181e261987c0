//! The settlement engine: turns a trip's expenses and its pledged members into per-member
//! balances and the shortest practical list of transfers that zeroes them out.
//!
//! Everything in this module is pure. Callers fetch a consistent snapshot of expenses and pledged
//! members, call `compute_settlement`, and call it again from scratch whenever the data changes.

mod budget;
mod payment;

pub use budget::{budget_report, spend_by_category, total_spent, BudgetUsage};
pub use payment::{instructions, payment_link, Directory, MemberDirectory, TransferInstruction};

use crate::model::{Expense, MemberId, SplitMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace};

/// Remaining debt or credit below this magnitude (0.01 currency units) is considered settled.
/// Dividing a shared pool among members can leave residue like `0.000…1`, which must never turn
/// into a transfer.
pub const SETTLEMENT_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// The net position of one pledged member. Negative means the member owes the pool, positive
/// means the pool owes the member.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MemberBalance {
    pub member_id: MemberId,
    pub balance: Decimal,
}

/// Balances for every pledged member, in the order the members were given.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances(Vec<MemberBalance>);

impl Balances {
    /// The balance of `member_id`, or `None` if they are not in the pool.
    pub fn get(&self, member_id: &MemberId) -> Option<Decimal> {
        self.0
            .iter()
            .find(|b| &b.member_id == member_id)
            .map(|b| b.balance)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemberBalance> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The sum of all balances.
    pub fn total(&self) -> Decimal {
        self.0
            .iter()
            .fold(Decimal::ZERO, |total, b| total.saturating_add(b.balance))
    }
}

/// One instruction in a settlement plan: `from` pays `to` the `amount`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transfer {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Decimal,
}

/// The result of `compute_settlement`.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settlement {
    balances: Balances,
    transfers: Vec<Transfer>,
}

impl Settlement {
    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    /// True when nobody needs to pay anybody.
    pub fn is_settled(&self) -> bool {
        self.transfers.is_empty()
    }
}

/// A debtor or creditor waiting in the greedy matching queue.
struct Party {
    member_id: MemberId,
    remaining: Decimal,
}

/// Computes every pledged member's balance and the transfers that settle them.
///
/// - Every `SplitEqually` expense goes into a shared pool, and each pledged member owes an equal
///   share of that pool.
/// - The payer of any expense, whichever split method it uses, is credited the full amount, but
///   only if the payer is a pledged member. Payments by anyone else are left out entirely.
/// - Debtors and creditors are then matched greedily in member order: the first debtor pays the
///   first creditor as much as possible, and whoever reaches zero leaves the queue.
///
/// `pledged` gives both the pool and its order. A member listed twice counts once. The same
/// inputs always produce the same balances and the same transfer sequence.
pub fn compute_settlement(expenses: &[Expense], pledged: &[MemberId]) -> Settlement {
    let mut balances: Vec<MemberBalance> = Vec::with_capacity(pledged.len());
    let mut index: HashMap<&MemberId, usize> = HashMap::with_capacity(pledged.len());
    for member_id in pledged {
        if index.contains_key(member_id) {
            continue;
        }
        index.insert(member_id, balances.len());
        balances.push(MemberBalance {
            member_id: member_id.clone(),
            balance: Decimal::ZERO,
        });
    }

    if balances.is_empty() {
        debug!("No pledged members, nothing to settle");
        return Settlement::default();
    }

    let shared_pool: Decimal = expenses
        .iter()
        .filter(|e| e.split_method == SplitMethod::SplitEqually)
        .map(Expense::contribution)
        .fold(Decimal::ZERO, Decimal::saturating_add);
    let individual_share = shared_pool / Decimal::from(balances.len());
    trace!("Shared pool {shared_pool} gives an individual share of {individual_share}");

    for entry in balances.iter_mut() {
        entry.balance = entry.balance.saturating_sub(individual_share);
    }

    for expense in expenses {
        match index.get(&expense.paid_by) {
            Some(&ix) => {
                balances[ix].balance = balances[ix].balance.saturating_add(expense.contribution())
            }
            None => debug!(
                "Expense {} was paid by {}, who has not pledged, so it is left out of balances",
                expense.id, expense.paid_by
            ),
        }
    }

    let transfers = match_parties(&balances);
    Settlement {
        balances: Balances(balances),
        transfers,
    }
}

/// Greedily pairs debtors with creditors, preserving member order on both sides.
fn match_parties(balances: &[MemberBalance]) -> Vec<Transfer> {
    let mut debtors: VecDeque<Party> = VecDeque::new();
    let mut creditors: VecDeque<Party> = VecDeque::new();
    for entry in balances {
        let party = Party {
            member_id: entry.member_id.clone(),
            remaining: entry.balance.abs(),
        };
        if party.remaining < SETTLEMENT_EPSILON {
            continue;
        }
        if entry.balance.is_sign_negative() {
            debtors.push_back(party);
        } else {
            creditors.push_back(party);
        }
    }

    let mut transfers = Vec::new();
    loop {
        let (Some(debtor), Some(creditor)) = (debtors.front(), creditors.front()) else {
            break;
        };
        let amount = debtor.remaining.min(creditor.remaining);
        transfers.push(Transfer {
            from: debtor.member_id.clone(),
            to: creditor.member_id.clone(),
            amount,
        });
        pay_down_front(&mut debtors, amount);
        pay_down_front(&mut creditors, amount);
    }
    transfers
}

/// Reduces the first party in `queue` by `amount` and drops it once it is settled.
fn pay_down_front(queue: &mut VecDeque<Party>, amount: Decimal) {
    let settled = match queue.front_mut() {
        Some(party) => {
            party.remaining -= amount;
            party.remaining < SETTLEMENT_EPSILON
        }
        None => false,
    };
    if settled {
        queue.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Amount;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ids(names: &[&str]) -> Vec<MemberId> {
        names.iter().map(|n| MemberId::from(*n)).collect()
    }

    fn expense(paid_by: &str, amount: &str, split_method: SplitMethod) -> Expense {
        Expense::new("trip-1", paid_by, Amount::from_str(amount).unwrap(), split_method)
    }

    fn transfer(from: &str, to: &str, amount: &str) -> Transfer {
        Transfer {
            from: from.into(),
            to: to.into(),
            amount: dec(amount),
        }
    }

    #[test]
    fn test_empty_input() {
        let settlement = compute_settlement(&[], &[]);
        assert!(settlement.balances().is_empty());
        assert!(settlement.transfers().is_empty());
    }

    #[test]
    fn test_expenses_without_pledged_members() {
        let expenses = vec![expense("a", "300", SplitMethod::SplitEqually)];
        let settlement = compute_settlement(&expenses, &[]);
        assert!(settlement.balances().is_empty());
        assert!(settlement.is_settled());
    }

    #[test]
    fn test_no_expenses_all_zero() {
        let settlement = compute_settlement(&[], &ids(&["a", "b", "c"]));
        assert_eq!(settlement.balances().len(), 3);
        for entry in settlement.balances().iter() {
            assert_eq!(entry.balance, Decimal::ZERO);
        }
        assert!(settlement.is_settled());
    }

    #[test]
    fn test_one_payer_three_members() {
        let expenses = vec![expense("a", "300", SplitMethod::SplitEqually)];
        let settlement = compute_settlement(&expenses, &ids(&["a", "b", "c"]));

        let balances = settlement.balances();
        assert_eq!(balances.get(&"a".into()), Some(dec("200")));
        assert_eq!(balances.get(&"b".into()), Some(dec("-100")));
        assert_eq!(balances.get(&"c".into()), Some(dec("-100")));
        assert_eq!(
            settlement.transfers(),
            &[transfer("b", "a", "100"), transfer("c", "a", "100")]
        );
    }

    #[test]
    fn test_you_are_owed_is_credited_but_not_pooled() {
        // The pool holds only the 100 split equally, so each share is 50. A fronted 100 and B
        // fronted 50, which credits B exactly its own share. Nobody is left in debt, so A's
        // credit cannot be matched and no transfer is produced.
        let expenses = vec![
            expense("a", "100", SplitMethod::SplitEqually),
            expense("b", "50", SplitMethod::YouAreOwed),
        ];
        let settlement = compute_settlement(&expenses, &ids(&["a", "b"]));

        assert_eq!(settlement.balances().get(&"a".into()), Some(dec("50")));
        assert_eq!(settlement.balances().get(&"b".into()), Some(dec("0")));
        assert_eq!(settlement.balances().total(), dec("50"));
        assert!(settlement.is_settled());
    }

    #[test]
    fn test_payer_not_pledged_is_excluded() {
        let expenses = vec![
            expense("outsider", "90", SplitMethod::SplitEqually),
            expense("outsider", "40", SplitMethod::YouAreOwed),
        ];
        let settlement = compute_settlement(&expenses, &ids(&["a", "b", "c"]));

        assert_eq!(settlement.balances().len(), 3);
        assert_eq!(settlement.balances().get(&"outsider".into()), None);
        for entry in settlement.balances().iter() {
            assert_eq!(entry.balance, dec("-30"));
        }
        // All three owe, nobody is owed.
        assert!(settlement.is_settled());
    }

    #[test]
    fn test_residue_is_not_a_transfer() {
        let expenses = vec![expense("a", "100", SplitMethod::SplitEqually)];
        let settlement = compute_settlement(&expenses, &ids(&["a", "b", "c"]));

        let transfers = settlement.transfers();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].from, MemberId::from("b"));
        assert_eq!(transfers[1].from, MemberId::from("c"));
        for t in transfers {
            assert_eq!(t.to, MemberId::from("a"));
            assert_eq!(t.amount.round_dp(2), dec("33.33"));
        }
        assert!(settlement.balances().total().abs() < dec("0.000001"));
    }

    #[test]
    fn test_greedy_order_with_several_creditors() {
        // Pool 600, share 150 each.
        // a: +250, b: +50, c: -150, d: -150
        let expenses = vec![
            expense("a", "400", SplitMethod::SplitEqually),
            expense("b", "200", SplitMethod::SplitEqually),
        ];
        let settlement = compute_settlement(&expenses, &ids(&["a", "b", "c", "d"]));
        assert_eq!(
            settlement.transfers(),
            &[
                transfer("c", "a", "150"),
                transfer("d", "a", "100"),
                transfer("d", "b", "50"),
            ]
        );
    }

    #[test]
    fn test_duplicate_pledged_members_count_once() {
        let expenses = vec![expense("a", "300", SplitMethod::SplitEqually)];
        let settlement = compute_settlement(&expenses, &ids(&["a", "b", "a", "c", "b"]));
        assert_eq!(settlement.balances().len(), 3);
        assert_eq!(settlement.balances().get(&"a".into()), Some(dec("200")));
        let order: Vec<&str> = settlement
            .balances()
            .iter()
            .map(|b| b.member_id.as_str())
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_malformed_and_negative_amounts_contribute_nothing() {
        let mut broken = expense("b", "0", SplitMethod::SplitEqually);
        broken.amount = Amount::parse_lenient("lots");
        let expenses = vec![
            expense("a", "60", SplitMethod::SplitEqually),
            broken,
            expense("c", "-500", SplitMethod::SplitEqually),
        ];
        let settlement = compute_settlement(&expenses, &ids(&["a", "b", "c"]));
        assert_eq!(settlement.balances().get(&"a".into()), Some(dec("40")));
        assert_eq!(settlement.balances().get(&"b".into()), Some(dec("-20")));
        assert_eq!(settlement.balances().get(&"c".into()), Some(dec("-20")));
    }

    #[test]
    fn test_huge_amounts_do_not_abort_settlement() {
        let expenses = vec![
            expense("a", "50000000000000000000000000000", SplitMethod::SplitEqually),
            expense("b", "50000000000000000000000000000", SplitMethod::SplitEqually),
        ];
        let settlement = compute_settlement(&expenses, &ids(&["a", "b"]));
        let a = settlement.balances().get(&"a".into()).unwrap();
        let b = settlement.balances().get(&"b".into()).unwrap();
        assert_eq!(a, b);
        assert!(settlement.is_settled());
        assert_eq!(settlement.balances().total(), a.saturating_add(b));
    }

    #[test]
    fn test_idempotent() {
        let expenses = vec![
            expense("a", "123.45", SplitMethod::SplitEqually),
            expense("b", "67.89", SplitMethod::SplitEqually),
            expense("c", "10", SplitMethod::YouAreOwed),
        ];
        let members = ids(&["a", "b", "c", "d"]);
        let first = compute_settlement(&expenses, &members);
        let second = compute_settlement(&expenses, &members);
        assert_eq!(first, second);
    }

    prop_compose! {
        fn trip_input()(member_count in 1usize..=6)(
            member_count in Just(member_count),
            rows in prop::collection::vec((0usize..6, 0u32..=1_000_000u32, any::<bool>()), 0..=30),
        ) -> (Vec<MemberId>, Vec<Expense>) {
            let members: Vec<MemberId> =
                (0..member_count).map(|ix| MemberId::new(format!("m{ix}"))).collect();
            let expenses = rows
                .into_iter()
                .map(|(payer, cents, shared)| {
                    let split = if shared { SplitMethod::SplitEqually } else { SplitMethod::YouAreOwed };
                    Expense::new(
                        "trip-1",
                        members[payer % member_count].clone(),
                        Amount::new(Decimal::new(i64::from(cents), 2)),
                        split,
                    )
                })
                .collect();
            (members, expenses)
        }
    }

    proptest! {
        #[test]
        fn balances_sum_to_unpooled_credit((members, expenses) in trip_input()) {
            let settlement = compute_settlement(&expenses, &members);
            // Credits that never entered the pool are the only thing keeping the sum off zero.
            let unpooled: Decimal = expenses
                .iter()
                .filter(|e| e.split_method == SplitMethod::YouAreOwed)
                .map(Expense::contribution)
                .sum();
            let drift = (settlement.balances().total() - unpooled).abs();
            prop_assert!(drift < dec("0.000001"), "drift {}", drift);
        }

        #[test]
        fn balances_sum_to_zero_when_all_shared((members, expenses) in trip_input()) {
            let shared: Vec<Expense> = expenses
                .into_iter()
                .map(|mut e| { e.split_method = SplitMethod::SplitEqually; e })
                .collect();
            let settlement = compute_settlement(&shared, &members);
            prop_assert!(settlement.balances().total().abs() < dec("0.000001"));
        }

        #[test]
        fn transfers_cover_positive_balances((members, expenses) in trip_input()) {
            let shared: Vec<Expense> = expenses
                .into_iter()
                .map(|mut e| { e.split_method = SplitMethod::SplitEqually; e })
                .collect();
            let settlement = compute_settlement(&shared, &members);
            let owed: Decimal = settlement
                .balances()
                .iter()
                .filter(|b| b.balance > Decimal::ZERO)
                .map(|b| b.balance)
                .sum();
            let paid: Decimal = settlement.transfers().iter().map(|t| t.amount).sum();
            // Parties are only ever dropped with less than epsilon outstanding.
            let slack = SETTLEMENT_EPSILON * Decimal::from(members.len());
            prop_assert!((owed - paid).abs() <= slack, "owed {} paid {}", owed, paid);
        }

        #[test]
        fn transfer_count_is_bounded((members, expenses) in trip_input()) {
            let settlement = compute_settlement(&expenses, &members);
            let debtors = settlement.balances().iter().filter(|b| b.balance < Decimal::ZERO).count();
            let creditors = settlement.balances().iter().filter(|b| b.balance > Decimal::ZERO).count();
            let bound = (debtors + creditors).saturating_sub(1);
            prop_assert!(settlement.transfers().len() <= bound);
            for t in settlement.transfers() {
                prop_assert!(t.amount > Decimal::ZERO);
                prop_assert_ne!(&t.from, &t.to);
            }
        }

        #[test]
        fn settlement_is_deterministic((members, expenses) in trip_input()) {
            prop_assert_eq!(
                compute_settlement(&expenses, &members),
                compute_settlement(&expenses, &members)
            );
        }
    }
}
