//! The cashbook: locking, crediting and unlocking incoming payments, and their history.

mod credits;
mod dashboard;
mod history;
mod locked;
mod new_credits;

use axum::extract::FromRef;
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    AppState,
    api::{ApiClient, ApiSession, Credit},
    html::{TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, format_currency},
    session::Session,
};

pub use dashboard::get_cashbook_dashboard;
pub use history::get_credit_history_page;
pub use locked::{get_locked_credits_page, post_unlock_credits};
pub use new_credits::{get_new_credits_page, post_credit_batch, post_discard_batch};

const CREDITS_PATH: &str = "/credits/";
const LOCK_PATH: &str = "/credits/actions/lock/";
const UNLOCK_PATH: &str = "/credits/actions/unlock/";
const CREDIT_PATH: &str = "/credits/actions/credit/";

/// The state needed by the cashbook pages.
#[derive(Debug, Clone)]
pub struct CashbookState {
    pub api: ApiClient,
    /// The local timezone as a canonical timezone name, e.g. "Europe/London".
    pub local_timezone: String,
}

impl FromRef<AppState> for CashbookState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

impl CashbookState {
    fn api_session<'a>(&'a self, session: &'a Session) -> ApiSession<'a> {
        self.api.session(&session.access_token)
    }
}

/// The credits ticked in a list of credits.
///
/// Checkboxes repeat the `credits` key, so this is read with
/// [axum_extra::extract::Form].
#[derive(Debug, Default, Deserialize)]
pub struct CreditSelection {
    #[serde(default)]
    pub credits: Vec<i64>,
}

fn status_query(status: &str) -> Vec<(String, String)> {
    vec![("status".to_owned(), status.to_owned())]
}

fn locked_by_query(user_pk: i64) -> Vec<(String, String)> {
    vec![
        ("status".to_owned(), "locked".to_owned()),
        ("user".to_owned(), user_pk.to_string()),
    ]
}

/// Every credit currently locked by the member of staff with `user_pk`.
async fn get_my_locked_credits(
    api: ApiSession<'_>,
    user_pk: i64,
) -> Result<Vec<Credit>, crate::api::ApiError> {
    api.retrieve_all_pages(CREDITS_PATH, &locked_by_query(user_pk))
        .await
}

fn pluralise(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// A table of credits, each with a checkbox named `credits`.
fn credit_checklist(credits: &[Credit], checked: bool) -> Markup {
    html! {
        table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { span class="sr-only" { "Select" } }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Prisoner" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Sender" }
                    th scope="col" class="px-6 py-4 text-right" { "Amount" }
                }
            }

            tbody
            {
                @for credit in credits {
                    @let id = format!("credit-{}", credit.id);
                    tr class=(TABLE_ROW_STYLE)
                    {
                        td class=(TABLE_CELL_STYLE)
                        {
                            input
                                type="checkbox"
                                name="credits"
                                id=(id)
                                value=(credit.id)
                                checked[checked]
                                class="rounded-xs";
                        }

                        td class=(TABLE_CELL_STYLE)
                        {
                            label for=(id) class="font-medium text-gray-900 dark:text-white"
                            {
                                (credit.prisoner_name.as_deref().unwrap_or_default())
                            }
                            br;
                            (credit.prisoner_number.as_deref().unwrap_or_default())
                        }

                        td class=(TABLE_CELL_STYLE)
                        {
                            (credit.sender_name.as_deref().unwrap_or("Unknown sender"))
                        }

                        td class="px-6 py-4 text-right tabular-nums"
                        {
                            (format_currency(credit.amount.unwrap_or(0)))
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod cashbook_test_utils {
    use serde_json::{Value, json};

    /// A credit as the payments API sends it.
    pub(super) fn credit_json(id: i64, prisoner_number: &str, amount: i64) -> Value {
        json!({
            "id": id,
            "prisoner_number": prisoner_number,
            "prisoner_name": "JAMES HALLS",
            "amount": amount,
            "sender_name": "Mary Halls",
            "prison": "BXI",
            "resolution": "pending",
            "anonymous": false,
            "owner": 1,
            "owner_name": "Test Staff",
            "received_at": "2018-01-01T10:00:00Z",
            "credited_at": null,
            "refunded_at": null
        })
    }
}
