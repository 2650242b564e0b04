//! Disbursements: the wizard for requesting a payment out of a prisoner's
//! account, confirming or rejecting pending requests and searching past ones.

mod forms;
mod pending;
mod search;
mod steps;
mod viability;
mod wizard;

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;
use time::UtcOffset;

use crate::{
    AppState, NomisClient,
    api::{ApiClient, DateValue, Disbursement, DisbursementLog},
};

pub use pending::{
    confirm_disbursement, get_pending_disbursement_page, get_pending_disbursements_page,
    reject_disbursement,
};
pub use search::get_disbursement_search_page;
pub use steps::{
    clear_disbursement_session, get_amount_page, get_details_check_page, get_hand_over_page,
    get_prisoner_check_page, get_prisoner_page, get_recipient_address_page,
    get_recipient_bank_account_page, get_recipient_contact_page,
    get_remittance_description_page, get_sending_method_page, get_start_page, post_amount,
    post_complete, post_prisoner, post_prisoner_check, post_recipient_address,
    post_recipient_bank_account, post_recipient_contact, post_remittance_description,
    post_sending_method,
};

const DISBURSEMENTS_PATH: &str = "/disbursements/";

/// The state needed by the disbursement pages.
#[derive(Debug, Clone)]
pub struct DisbursementState {
    pub api: ApiClient,
    pub nomis: NomisClient,
    /// The session store, the wizard's answers are saved to it.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Europe/London".
    pub local_timezone: String,
    /// The NOMIS transaction type used when a disbursement is confirmed.
    pub transaction_type: String,
}

impl FromRef<AppState> for DisbursementState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
            nomis: state.nomis.clone(),
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            transaction_type: state.disbursement_transaction_type.clone(),
        }
    }
}

/// The label of a sending method for display, e.g. "Bank transfer".
fn sending_method_label(method: &str) -> &str {
    crate::forms::choice_label(&forms::SENDING_METHOD_CHOICES, method).unwrap_or(method)
}

/// Format a sort code stored as six digits, e.g. "10-20-30".
fn format_sort_code(sort_code: &str) -> String {
    if sort_code.len() == 6 && sort_code.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &sort_code[..2], &sort_code[2..4], &sort_code[4..])
    } else {
        sort_code.to_owned()
    }
}

/// Parse a disbursement's dates and name the staff in its log, newest entry first.
fn prepare_for_display(mut disbursement: Disbursement, offset: UtcOffset) -> Disbursement {
    disbursement.created = disbursement.created.map(|created| created.parse(offset));

    for log in &mut disbursement.log_set {
        log.created = log.created.take().map(|created| created.parse(offset));
        log.staff_name = log.user.staff_name();
    }

    let logged_at = |log: &DisbursementLog| log.created.as_ref().and_then(DateValue::sort_key);
    disbursement
        .log_set
        .sort_by(|a, b| logged_at(b).cmp(&logged_at(a)));

    disbursement
}

/// When a disbursement was confirmed, if it has been.
fn confirmed_at(disbursement: &Disbursement) -> Option<&DateValue> {
    disbursement
        .log_set
        .iter()
        .find(|log| log.action == "confirmed")
        .and_then(|log| log.created.as_ref())
}


#[cfg(test)]
mod disbursements_tests {
    use serde_json::json;
    use time::macros::{datetime, offset};

    use crate::api::{DateValue, Disbursement};

    use super::{
        confirmed_at, disbursement_test_utils::disbursement_json, format_sort_code,
        prepare_for_display, sending_method_label,
    };

    #[test]
    fn logs_are_named_and_sorted_newest_first() {
        let mut raw = disbursement_json(1, "confirmed");
        raw["log_set"] = json!([
            {"action": "created", "created": "2018-01-01T10:00:00Z", "user": {"username": "clerk"}},
            {"action": "confirmed", "created": "2018-01-02T10:00:00Z", "user": {"first_name": "Ann", "last_name": "Clerk"}},
            {"action": "sent", "created": "not a date", "user": {}}
        ]);
        let disbursement: Disbursement = serde_json::from_value(raw).unwrap();

        let disbursement = prepare_for_display(disbursement, offset!(UTC));

        let names: Vec<&str> = disbursement
            .log_set
            .iter()
            .map(|log| log.staff_name.as_str())
            .collect();
        assert_eq!(names, vec!["Ann Clerk", "clerk", "Unknown user"]);
        assert_eq!(
            disbursement.created,
            Some(DateValue::DateTime(datetime!(2018-01-01 10:00 UTC)))
        );
        assert_eq!(
            confirmed_at(&disbursement),
            Some(&DateValue::DateTime(datetime!(2018-01-02 10:00 UTC)))
        );
    }

    #[test]
    fn formats_sort_codes_with_dashes() {
        assert_eq!(format_sort_code("102030"), "10-20-30");
        assert_eq!(format_sort_code("10203"), "10203");
    }

    #[test]
    fn labels_sending_methods() {
        assert_eq!(sending_method_label("bank_transfer"), "Bank transfer");
        assert_eq!(sending_method_label("pigeon"), "pigeon");
    }
}
