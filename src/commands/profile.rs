use crate::args::SetProfileArgs;
use crate::commands::{require_member, Out};
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::{MemberId, Profile};
use crate::{Config, Result};
use anyhow::anyhow;

/// Saves the acting member's email and payout address. Other members see the email in place of the
/// member ID, and `pact settle` builds payment links to the payout address.
pub async fn set_profile(
    config: Config,
    member: Option<&MemberId>,
    args: SetProfileArgs,
) -> Result<Out<Profile>> {
    let member = require_member(member)?;
    let email = args.email().trim();
    if !email.contains('@') {
        return Err(Error::new(
            ErrorType::Request,
            anyhow!("'{email}' does not look like an email address"),
        ));
    }

    let mut profile = Profile::new(member.clone(), email);
    if let Some(address) = args.payout_address().map(str::trim) {
        if !address.is_empty() {
            profile = profile.with_payout_address(address);
        }
    }
    config
        .db()
        .upsert_profile(&profile)
        .await
        .pub_result(ErrorType::Database)?;

    let message = match &profile.payout_address {
        Some(address) => format!("Saved profile for {email}, payments go to {address}"),
        None => format!("Saved profile for {email}"),
    };
    Ok(Out::new(message, profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_set_profile() {
        let env = TestEnv::new().await;
        let asha = MemberId::from("asha");
        let args = SetProfileArgs::new("asha@example.com", Some("asha@okbank".to_string()));
        let out = set_profile(env.config(), Some(&asha), args).await.unwrap();
        let profile = out.structure().unwrap();
        assert_eq!(profile.payout_address.as_deref(), Some("asha@okbank"));

        let args = SetProfileArgs::new("asha@example.com", Some("  ".to_string()));
        let out = set_profile(env.config(), Some(&asha), args).await.unwrap();
        assert_eq!(out.structure().unwrap().payout_address, None);
    }

    #[tokio::test]
    async fn test_set_profile_rejects_bad_email() {
        let env = TestEnv::new().await;
        let args = SetProfileArgs::new("asha", None);
        let err = set_profile(env.config(), Some(&MemberId::from("asha")), args)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
    }
}
