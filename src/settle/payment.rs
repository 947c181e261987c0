//! Turns a `Settlement` into instructions people can act on: who pays whom, shown by email, with a
//! payment link when the recipient has a payout address.

use crate::error::Res;
use crate::model::{MemberId, Profile};
use crate::settle::Settlement;
use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Resolves member identifiers to display metadata.
pub trait MemberDirectory {
    fn profile(&self, member_id: &MemberId) -> Option<&Profile>;

    /// The member's email, or their raw identifier when no profile (or no email) is known.
    fn display_name(&self, member_id: &MemberId) -> String {
        self.profile(member_id)
            .map(|p| p.email.as_str())
            .filter(|email| !email.is_empty())
            .map(String::from)
            .unwrap_or_else(|| member_id.to_string())
    }
}

/// An in-memory `MemberDirectory` built from profile rows.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    profiles: BTreeMap<MemberId, Profile>,
}

impl MemberDirectory for Directory {
    fn profile(&self, member_id: &MemberId) -> Option<&Profile> {
        self.profiles.get(member_id)
    }
}

impl FromIterator<Profile> for Directory {
    fn from_iter<T: IntoIterator<Item = Profile>>(iter: T) -> Self {
        Self {
            profiles: iter
                .into_iter()
                .map(|p| (p.member_id.clone(), p))
                .collect(),
        }
    }
}

/// A human-readable transfer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TransferInstruction {
    pub from: MemberId,
    pub from_name: String,
    pub to: MemberId,
    pub to_name: String,
    /// Rounded to two decimal places.
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
}

/// Builds a link of the form `scheme://pay?payee=<addr>&amount=<value>&note=<note>`.
///
/// # Errors
/// - Returns an error if `scheme` cannot be used as a URL scheme.
pub fn payment_link(scheme: &str, payee: &str, amount: Decimal, note: &str) -> Res<Url> {
    let mut url = Url::parse(&format!("{scheme}://pay"))
        .with_context(|| format!("'{scheme}' is not a usable payment link scheme"))?;
    url.query_pairs_mut()
        .append_pair("payee", payee)
        .append_pair("amount", &format!("{amount:.2}"))
        .append_pair("note", note);
    Ok(url)
}

/// Presents each transfer of `settlement` using `directory`. `trip_title` becomes the payment note.
pub fn instructions(
    settlement: &Settlement,
    directory: &impl MemberDirectory,
    trip_title: &str,
    scheme: &str,
) -> Res<Vec<TransferInstruction>> {
    settlement
        .transfers()
        .iter()
        .map(|transfer| -> Res<TransferInstruction> {
            let amount = transfer.amount.round_dp(2);
            let payment_link = match directory
                .profile(&transfer.to)
                .and_then(|p| p.payout_address.as_deref())
            {
                Some(address) => {
                    Some(payment_link(scheme, address, amount, trip_title)?.to_string())
                }
                None => None,
            };
            Ok(TransferInstruction {
                from: transfer.from.clone(),
                from_name: directory.display_name(&transfer.from),
                to: transfer.to.clone(),
                to_name: directory.display_name(&transfer.to),
                amount,
                payment_link,
            })
        })
        .collect()
}
