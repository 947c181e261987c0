use serde::{Deserialize, Serialize};

string_id!(
    /// The identifier of a user, as resolved by the external auth service.
    MemberId
);

/// Display metadata for a member. Used to present transfer instructions, never for the math.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Profile {
    pub member_id: MemberId,
    pub email: String,
    /// Where this member wants to receive money, e.g. a UPI address like `asha@okbank`.
    pub payout_address: Option<String>,
}

impl Profile {
    pub fn new(member_id: impl Into<MemberId>, email: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            email: email.into(),
            payout_address: None,
        }
    }

    pub fn with_payout_address(mut self, payout_address: impl Into<String>) -> Self {
        self.payout_address = Some(payout_address.into());
        self
    }
}
