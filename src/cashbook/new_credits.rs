//! Locking a batch of new credits, then crediting the ones that were entered into NOMIS.

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
        CREDIT_PATH, CashbookState, CreditSelection, LOCK_PATH, UNLOCK_PATH, credit_checklist,
        credits::sum_credits, get_my_locked_credits, pluralise,
    },
    endpoints,
    html::{BUTTON_SECONDARY_STYLE, PAGE_CONTAINER_STYLE, base, format_currency, submit_button},
    navigation::NavBar,
    session::Session,
};

fn new_credits_view(credits: &[Credit]) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_CREDITS_VIEW).into_html();
    let total = sum_credits(credits);

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-5xl space-y-4"
            {
                header
                {
                    h1 class="text-2xl font-bold" { "New credits" }

                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Enter each payment into NOMIS, then tick it here. "
                        "Payments you don’t tick are returned to ‘New credits’."
                    }
                }

                @if credits.is_empty() {
                    p id="no-credits" { "There are no new credits to process." }
                } @else {
                    form
                        hx-post=(endpoints::CREDIT_BATCH_API)
                        hx-target-error="#alert-container"
                        hx-indicator="#indicator"
                        hx-disabled-elt="#submit-button"
                        class="space-y-4"
                    {
                        (credit_checklist(credits, false))

                        p id="batch-total" class="text-right font-semibold"
                        {
                            "Total: " (format_currency(total))
                        }

                        (submit_button("Done"))
                    }

                    form
                        hx-post=(endpoints::DISCARD_BATCH_API)
                        hx-target-error="#alert-container"
                        hx-confirm="Return all of these payments to ‘New credits’?"
                    {
                        button type="submit" class=(BUTTON_SECONDARY_STYLE)
                        {
                            "Return all to ‘New credits’"
                        }
                    }
                }
            }
        }
    );

    base("New credits", &content)
}

/// Lock a batch of credits for the member of staff and list every credit they have locked.
pub async fn get_new_credits_page(
    State(state): State<CashbookState>,
    Extension(session): Extension<Session>,
) -> Result<Response, Error> {
    let api = state.api_session(&session);

    api.post_action(LOCK_PATH, &json!({})).await?;
    let credits = get_my_locked_credits(api, session.user.pk).await?;

    Ok(new_credits_view(&credits).into_response())
}

/// Credit the ticked credits and unlock the rest of the batch.
pub async fn post_credit_batch(
    State(state): State<CashbookState>,
    Extension(session): Extension<Session>,
    Form(selection): Form<CreditSelection>,
) -> Response {
    let api = state.api_session(&session);

    let locked_ids: Vec<i64> = match get_my_locked_credits(api, session.user.pk).await {
        Ok(credits) => credits.iter().map(|credit| credit.id).collect(),
        Err(error) => return Error::from(error).into_alert_response(),
    };

    let (credited, discarded): (Vec<i64>, Vec<i64>) = locked_ids
        .into_iter()
        .partition(|id| selection.credits.contains(id));

    if credited.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Alert::Error {
                message: "No payments selected".to_owned(),
                details: "Tick the payments you have entered into NOMIS.".to_owned(),
            }
            .into_html(),
        )
            .into_response();
    }

    if let Err(error) = api
        .post_action(CREDIT_PATH, &json!({ "credit_ids": credited }))
        .await
    {
        return Error::from(error).into_alert_response();
    }

    tracing::info!(
        "User \"{}\" credited {} to NOMIS",
        session.user.username,
        pluralise(credited.len(), "payment", "payments")
    );

    let mut redirect_url = format!("{}?credited={}", endpoints::CASHBOOK_VIEW, credited.len());

    if !discarded.is_empty() {
        if let Err(error) = api
            .post_action(UNLOCK_PATH, &json!({ "credit_ids": discarded }))
            .await
        {
            return Error::from(error).into_alert_response();
        }
        redirect_url.push_str("&batch=incomplete");
    }

    (HxRedirect(redirect_url), StatusCode::SEE_OTHER).into_response()
}

/// Unlock every credit locked by the member of staff.
pub async fn post_discard_batch(
    State(state): State<CashbookState>,
    Extension(session): Extension<Session>,
) -> Response {
    let api = state.api_session(&session);

    let locked_ids: Vec<i64> = match get_my_locked_credits(api, session.user.pk).await {
        Ok(credits) => credits.iter().map(|credit| credit.id).collect(),
        Err(error) => return Error::from(error).into_alert_response(),
    };

    if !locked_ids.is_empty()
        && let Err(error) = api
            .post_action(UNLOCK_PATH, &json!({ "credit_ids": locked_ids }))
            .await
    {
        return Error::from(error).into_alert_response();
    }

    (
        HxRedirect(endpoints::CASHBOOK_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
