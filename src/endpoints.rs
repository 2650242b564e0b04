//! The endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/disbursements/pending/{disbursement_id}',
//! use [format_endpoint].

/// The landing page for logged in staff.
pub const ROOT: &str = "/";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The cashbook overview with counts of new and locked credits.
pub const CASHBOOK_VIEW: &str = "/cashbook";
/// The page listing a freshly locked batch of credits.
pub const NEW_CREDITS_VIEW: &str = "/cashbook/new";
/// The page listing credits locked by any member of staff.
pub const LOCKED_CREDITS_VIEW: &str = "/cashbook/locked";
/// The page for searching processed credits.
pub const CREDIT_HISTORY_VIEW: &str = "/cashbook/history";

/// The first page of the disbursement wizard.
pub const DISBURSEMENT_START: &str = "/disbursements/start";
/// Choose bank transfer or cheque.
pub const DISBURSEMENT_SENDING_METHOD: &str = "/disbursements/sending-method";
/// Look up the prisoner.
pub const DISBURSEMENT_PRISONER: &str = "/disbursements/prisoner";
/// Confirm the looked up prisoner.
pub const DISBURSEMENT_PRISONER_CHECK: &str = "/disbursements/prisoner-check";
/// Enter the amount.
pub const DISBURSEMENT_AMOUNT: &str = "/disbursements/amount";
/// Enter the recipient's name and email.
pub const DISBURSEMENT_RECIPIENT_CONTACT: &str = "/disbursements/recipient-contact";
/// Enter the recipient's postal address.
pub const DISBURSEMENT_RECIPIENT_ADDRESS: &str = "/disbursements/recipient-address";
/// Enter the recipient's bank details.
pub const DISBURSEMENT_RECIPIENT_BANK_ACCOUNT: &str = "/disbursements/recipient-bank-account";
/// Choose the payment description.
pub const DISBURSEMENT_REMITTANCE_DESCRIPTION: &str = "/disbursements/remittance-description";
/// Review all of the entered details.
pub const DISBURSEMENT_DETAILS_CHECK: &str = "/disbursements/details-check";
/// Hand the request over for confirmation.
pub const DISBURSEMENT_HAND_OVER: &str = "/disbursements/hand-over";
/// Submit the request to the API.
pub const DISBURSEMENT_COMPLETE: &str = "/disbursements/complete";
/// Throw away the wizard state and start again.
pub const DISBURSEMENT_CLEAR_SESSION: &str = "/disbursements/clear-session";
/// The page for searching disbursements.
pub const DISBURSEMENT_SEARCH_VIEW: &str = "/disbursements/search";
/// The list of disbursements waiting for confirmation.
pub const PENDING_DISBURSEMENTS_VIEW: &str = "/disbursements/pending";
/// A single disbursement waiting for confirmation.
pub const PENDING_DISBURSEMENT_VIEW: &str = "/disbursements/pending/{disbursement_id}";
/// Confirm a pending disbursement and post it to NOMIS.
pub const CONFIRM_DISBURSEMENT: &str = "/disbursements/pending/{disbursement_id}/confirm";

/// The route for logging in a member of staff.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current member of staff.
pub const LOG_OUT: &str = "/api/log_out";
/// Credit the selected credits in the current batch.
pub const CREDIT_BATCH_API: &str = "/api/cashbook/new";
/// Unlock every credit in the current batch.
pub const DISCARD_BATCH_API: &str = "/api/cashbook/discard";
/// Unlock the selected locked credits.
pub const UNLOCK_CREDITS_API: &str = "/api/cashbook/unlock";
/// Reject a pending disbursement.
pub const REJECT_DISBURSEMENT_API: &str = "/api/disbursements/pending/{disbursement_id}/reject";

/// HTMX form submission endpoints for the wizard steps.
pub const SENDING_METHOD_API: &str = "/api/disbursements/sending-method";
pub const PRISONER_API: &str = "/api/disbursements/prisoner";
pub const PRISONER_CHECK_API: &str = "/api/disbursements/prisoner-check";
pub const AMOUNT_API: &str = "/api/disbursements/amount";
pub const RECIPIENT_CONTACT_API: &str = "/api/disbursements/recipient-contact";
pub const RECIPIENT_ADDRESS_API: &str = "/api/disbursements/recipient-address";
pub const RECIPIENT_BANK_ACCOUNT_API: &str = "/api/disbursements/recipient-bank-account";
pub const REMITTANCE_DESCRIPTION_API: &str = "/api/disbursements/remittance-description";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/disbursements/pending/{disbursement_id}',
/// '{disbursement_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
