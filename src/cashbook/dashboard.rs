//! The cashbook overview with the number of credits waiting to be processed.

use axum::{
    Extension,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    Error,
    api::{Credit, Page},
    cashbook::{CREDITS_PATH, CashbookState, locked_by_query, pluralise, status_query},
    endpoints,
    html::{BANNER_SUCCESS_STYLE, BUTTON_PRIMARY_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
    session::Session,
};

/// The outcome of the last action, passed back to the dashboard as query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub credited: Option<usize>,
    pub unlocked: Option<usize>,
    pub batch: Option<String>,
}

fn banners(query: &DashboardQuery) -> Vec<String> {
    let mut messages = Vec::new();

    if let Some(credited) = query.credited
        && credited > 0
    {
        messages.push(format!(
            "You’ve credited {} to NOMIS.",
            pluralise(credited, "payment", "payments")
        ));
    }

    if let Some(unlocked) = query.unlocked
        && unlocked > 0
    {
        messages.push(format!(
            "{} returned to ‘New credits’.",
            pluralise(unlocked, "payment", "payments")
        ));
    }

    if query.batch.as_deref() == Some("incomplete") {
        messages.push(
            "Payments you didn’t credit have been returned to ‘New credits’.".to_owned(),
        );
    }

    messages
}

fn dashboard_view(new_credits: u64, locked_credits: u64, messages: &[String]) -> Markup {
    let nav_bar = NavBar::new(endpoints::CASHBOOK_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            @for message in messages {
                div class=(BANNER_SUCCESS_STYLE) role="status" { (message) }
            }

            section class="w-full max-w-5xl space-y-6"
            {
                h1 class="text-2xl font-bold" { "Digital cashbook" }

                div class="grid gap-4 md:grid-cols-2"
                {
                    div
                        id="new-credits"
                        class="p-6 bg-white border border-gray-200 rounded-lg shadow dark:bg-gray-800 dark:border-gray-700"
                    {
                        h2 class="text-lg font-semibold" { "New credits" }
                        p class="my-4 text-4xl font-bold tabular-nums" { (new_credits) }

                        @if new_credits > 0 {
                            a href=(endpoints::NEW_CREDITS_VIEW) class=(BUTTON_PRIMARY_STYLE)
                            {
                                "Credits to process"
                            }
                        } @else {
                            p class="text-sm text-gray-500 dark:text-gray-400"
                            {
                                "There are no new credits."
                            }
                        }
                    }

                    div
                        id="locked-credits"
                        class="p-6 bg-white border border-gray-200 rounded-lg shadow dark:bg-gray-800 dark:border-gray-700"
                    {
                        h2 class="text-lg font-semibold" { "In progress" }
                        p class="my-4 text-4xl font-bold tabular-nums" { (locked_credits) }

                        a href=(endpoints::LOCKED_CREDITS_VIEW) class=(LINK_STYLE)
                        {
                            "See credits being processed"
                        }
                    }
                }

                p
                {
                    a href=(endpoints::CREDIT_HISTORY_VIEW) class=(LINK_STYLE)
                    {
                        "Search all credits"
                    }
                }
            }
        }
    );

    base("Digital cashbook", &content)
}

/// Display the number of new credits (available plus locked by me) and all locked credits.
pub async fn get_cashbook_dashboard(
    State(state): State<CashbookState>,
    Extension(session): Extension<Session>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, Error> {
    let api = state.api_session(&session);

    let available: Page<Credit> = api
        .get_page(CREDITS_PATH, &status_query("available"), 0, 1)
        .await?;
    let my_locked: Page<Credit> = api
        .get_page(CREDITS_PATH, &locked_by_query(session.user.pk), 0, 1)
        .await?;
    let locked: Page<Credit> = api
        .get_page(CREDITS_PATH, &status_query("locked"), 0, 1)
        .await?;

    let new_credits = available.count + my_locked.count;

    Ok(dashboard_view(new_credits, locked.count, &banners(&query)).into_response())
}
