//! Credits locked by any member of staff, which can be returned to ‘New credits’.

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde_json::json;

use crate::{
    Error,
    alert::Alert,
    api::Credit,
    cashbook::{
        CREDITS_PATH, CashbookState, CreditSelection, UNLOCK_PATH, credit_checklist, pluralise,
        status_query,
    },
    endpoints,
    html::{PAGE_CONTAINER_STYLE, base, submit_button},
    navigation::NavBar,
    session::Session,
};

/// Group credits by the member of staff who locked them, keeping the order owners first appear in.
fn group_by_owner(credits: Vec<Credit>) -> Vec<(String, Vec<Credit>)> {
    let mut groups: Vec<(String, Vec<Credit>)> = Vec::new();

    for credit in credits {
        let owner = credit
            .owner_name
            .clone()
            .unwrap_or_else(|| "Unknown user".to_owned());

        match groups.iter_mut().find(|(name, _)| *name == owner) {
            Some((_, group)) => group.push(credit),
            None => groups.push((owner, vec![credit])),
        }
    }

    groups
}

fn locked_credits_view(groups: &[(String, Vec<Credit>)]) -> Markup {
    let nav_bar = NavBar::new(endpoints::LOCKED_CREDITS_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-5xl space-y-4"
            {
                h1 class="text-2xl font-bold" { "Credits being processed" }

                @if groups.is_empty() {
                    p id="no-credits" { "No credits are being processed." }
                } @else {
                    form
                        hx-post=(endpoints::UNLOCK_CREDITS_API)
                        hx-target-error="#alert-container"
                        hx-indicator="#indicator"
                        hx-disabled-elt="#submit-button"
                        class="space-y-6"
                    {
                        @for (owner, credits) in groups {
                            section class="space-y-2"
                            {
                                h2 class="text-lg font-semibold owner-name" { (owner) }
                                (credit_checklist(credits, false))
                            }
                        }

                        (submit_button("Return selected to ‘New credits’"))
                    }
                }
            }
        }
    );

    base("Credits being processed", &content)
}

/// Display every locked credit grouped by who locked it.
pub async fn get_locked_credits_page(
    State(state): State<CashbookState>,
    Extension(session): Extension<Session>,
) -> Result<Response, Error> {
    let credits: Vec<Credit> = state
        .api_session(&session)
        .retrieve_all_pages(CREDITS_PATH, &status_query("locked"))
        .await?;

    Ok(locked_credits_view(&group_by_owner(credits)).into_response())
}

/// Unlock the ticked credits.
pub async fn post_unlock_credits(
    State(state): State<CashbookState>,
    Extension(session): Extension<Session>,
    Form(selection): Form<CreditSelection>,
) -> Response {
    if selection.credits.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Alert::Error {
                message: "No payments selected".to_owned(),
                details: "Tick the payments to return to ‘New credits’.".to_owned(),
            }
            .into_html(),
        )
            .into_response();
    }

    let count = selection.credits.len();
    if let Err(error) = state
        .api_session(&session)
        .post_action(UNLOCK_PATH, &json!({ "credit_ids": selection.credits }))
        .await
    {
        return Error::from(error).into_alert_response();
    }

    tracing::info!(
        "User \"{}\" unlocked {}",
        session.user.username,
        pluralise(count, "payment", "payments")
    );

    (
        HxRedirect(format!("{}?unlocked={count}", endpoints::CASHBOOK_VIEW)),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
