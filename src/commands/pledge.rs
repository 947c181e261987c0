use crate::commands::{load_trip, money, require_member, require_membership, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{MemberId, Pledge, TripId};
use crate::{Config, Result};

/// Records that the acting member pledged the trip's pact amount. From then on they share in the
/// trip's costs.
pub async fn pledge(
    config: Config,
    member: Option<&MemberId>,
    trip_id: &TripId,
) -> Result<Out<Pledge>> {
    let member = require_member(member)?;
    let trip = load_trip(&config, trip_id).await?;
    require_membership(&config, trip_id, member).await?;

    let pledge = config
        .db()
        .pledge(trip_id, member)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(
        format!(
            "{member} pledged {} to '{}'",
            money(&config, pledge.amount.value()),
            trip.title
        ),
        pledge,
    ))
}
