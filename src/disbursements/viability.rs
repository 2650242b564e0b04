//! Whether a pending disbursement can still be confirmed.
//!
//! A disbursement waits for a second member of staff, and in the meantime the
//! prisoner may have moved or spent the money. Both are checked before the
//! confirm button is offered.

use maud::{Markup, html};

use crate::{
    ApiError,
    api::{ApiSession, Disbursement},
    disbursements::DisbursementState,
    html::{BANNER_ERROR_STYLE, format_currency},
};

/// The result of checking a pending disbursement against the prisoner's
/// current location and NOMIS balance.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Viability {
    Viable,
    /// A lookup failed, so nothing is known either way.
    Unknown,
    /// The prisoner is now held in another prison.
    PrisonerMoved,
    /// The prisoner is no longer listed, usually because they were released.
    PrisonerNotFound,
    /// The prisoner's private cash account holds less than the amount.
    InsufficientFunds { cash: i64 },
}

impl Viability {
    /// Unknown viability does not block confirming, NOMIS still refuses invalid debits.
    pub(super) fn can_confirm(&self) -> bool {
        matches!(self, Viability::Viable | Viability::Unknown)
    }

    pub(super) fn warning(&self) -> Option<String> {
        match self {
            Viability::Viable => None,
            Viability::Unknown => Some(
                "The prisoner’s location and balance could not be checked. \
                Check NOMIS before confirming this payment."
                    .to_owned(),
            ),
            Viability::PrisonerMoved => Some(
                "This prisoner has moved to another prison, so this payment cannot be \
                confirmed. Reject it and ask the new prison to enter it again."
                    .to_owned(),
            ),
            Viability::PrisonerNotFound => Some(
                "This prisoner is no longer in a prison you manage, they may have been \
                released. Reject this payment."
                    .to_owned(),
            ),
            Viability::InsufficientFunds { cash } => Some(format!(
                "There is not enough money in the prisoner’s private account. \
                The account holds {}.",
                format_currency(*cash)
            )),
        }
    }
}

/// A warning for a disbursement that is not plainly viable, nothing otherwise.
pub(super) fn viability_warning(viability: &Viability) -> Markup {
    let Some(warning) = viability.warning() else {
        return html! {};
    };

    html! {
        div class={ "viability-warning " (BANNER_ERROR_STYLE) } role="alert"
        {
            p { (warning) }
        }
    }
}

/// Check the prisoner is still where the disbursement was entered and can pay it.
pub(super) async fn check_viability(
    state: &DisbursementState,
    api: &ApiSession<'_>,
    disbursement: &Disbursement,
) -> Viability {
    match api.get_prisoner_location(&disbursement.prisoner_number).await {
        Ok(location) if location.prison != disbursement.prison => return Viability::PrisonerMoved,
        Ok(_) => {}
        Err(ApiError::NotFound) => return Viability::PrisonerNotFound,
        Err(ApiError::Forbidden) => return Viability::PrisonerMoved,
        Err(error) => {
            tracing::error!(
                "Could not look up the location of {} for disbursement {}: {error}",
                disbursement.prisoner_number,
                disbursement.id
            );
            return Viability::Unknown;
        }
    }

    match state
        .nomis
        .get_balances(&disbursement.prison, &disbursement.prisoner_number)
        .await
    {
        Ok(balances) if balances.cash < disbursement.amount => Viability::InsufficientFunds {
            cash: balances.cash,
        },
        Ok(_) => Viability::Viable,
        Err(error) => {
            tracing::error!(
                "Could not get the NOMIS balance of {} for disbursement {}: {error}",
                disbursement.prisoner_number,
                disbursement.id
            );
            Viability::Unknown
        }
    }
}
