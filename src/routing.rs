//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{auth_guard, auth_guard_hx, get_log_in_page, get_log_out, post_log_in},
    cashbook::{
        get_cashbook_dashboard, get_credit_history_page, get_locked_credits_page,
        get_new_credits_page, post_credit_batch, post_discard_batch, post_unlock_credits,
    },
    disbursements::{
        clear_disbursement_session, confirm_disbursement, get_amount_page,
        get_details_check_page, get_disbursement_search_page, get_hand_over_page,
        get_pending_disbursement_page, get_pending_disbursements_page, get_prisoner_check_page,
        get_prisoner_page, get_recipient_address_page, get_recipient_bank_account_page,
        get_recipient_contact_page, get_remittance_description_page, get_sending_method_page,
        get_start_page, post_amount, post_complete, post_prisoner, post_prisoner_check,
        post_recipient_address, post_recipient_bank_account, post_recipient_contact,
        post_remittance_description, post_sending_method, reject_disbursement,
    },
    endpoints,
    internal_server_error::get_internal_server_error_page,
    landing::get_landing_page,
    not_found::get_404_not_found,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    // Full page loads and plain form posts redirect to the log-in page.
    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_landing_page))
        .route(endpoints::CASHBOOK_VIEW, get(get_cashbook_dashboard))
        .route(endpoints::NEW_CREDITS_VIEW, get(get_new_credits_page))
        .route(endpoints::LOCKED_CREDITS_VIEW, get(get_locked_credits_page))
        .route(endpoints::CREDIT_HISTORY_VIEW, get(get_credit_history_page))
        .route(endpoints::DISBURSEMENT_START, get(get_start_page))
        .route(
            endpoints::DISBURSEMENT_CLEAR_SESSION,
            get(clear_disbursement_session),
        )
        .route(
            endpoints::DISBURSEMENT_SENDING_METHOD,
            get(get_sending_method_page),
        )
        .route(endpoints::DISBURSEMENT_PRISONER, get(get_prisoner_page))
        .route(
            endpoints::DISBURSEMENT_PRISONER_CHECK,
            get(get_prisoner_check_page),
        )
        .route(endpoints::DISBURSEMENT_AMOUNT, get(get_amount_page))
        .route(
            endpoints::DISBURSEMENT_RECIPIENT_CONTACT,
            get(get_recipient_contact_page),
        )
        .route(
            endpoints::DISBURSEMENT_RECIPIENT_ADDRESS,
            get(get_recipient_address_page),
        )
        .route(
            endpoints::DISBURSEMENT_RECIPIENT_BANK_ACCOUNT,
            get(get_recipient_bank_account_page),
        )
        .route(
            endpoints::DISBURSEMENT_REMITTANCE_DESCRIPTION,
            get(get_remittance_description_page),
        )
        .route(
            endpoints::DISBURSEMENT_DETAILS_CHECK,
            get(get_details_check_page),
        )
        .route(endpoints::DISBURSEMENT_HAND_OVER, get(get_hand_over_page))
        .route(endpoints::DISBURSEMENT_COMPLETE, post(post_complete))
        .route(
            endpoints::DISBURSEMENT_SEARCH_VIEW,
            get(get_disbursement_search_page),
        )
        .route(
            endpoints::PENDING_DISBURSEMENTS_VIEW,
            get(get_pending_disbursements_page),
        )
        .route(
            endpoints::PENDING_DISBURSEMENT_VIEW,
            get(get_pending_disbursement_page),
        )
        .route(endpoints::CONFIRM_DISBURSEMENT, post(confirm_disbursement))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::CREDIT_BATCH_API, post(post_credit_batch))
            .route(endpoints::DISCARD_BATCH_API, post(post_discard_batch))
            .route(endpoints::UNLOCK_CREDITS_API, post(post_unlock_credits))
            .route(endpoints::SENDING_METHOD_API, post(post_sending_method))
            .route(endpoints::PRISONER_API, post(post_prisoner))
            .route(endpoints::PRISONER_CHECK_API, post(post_prisoner_check))
            .route(endpoints::AMOUNT_API, post(post_amount))
            .route(
                endpoints::RECIPIENT_CONTACT_API,
                post(post_recipient_contact),
            )
            .route(
                endpoints::RECIPIENT_ADDRESS_API,
                post(post_recipient_address),
            )
            .route(
                endpoints::RECIPIENT_BANK_ACCOUNT_API,
                post(post_recipient_bank_account),
            )
            .route(
                endpoints::REMITTANCE_DESCRIPTION_API,
                post(post_remittance_description),
            )
            .route(
                endpoints::REJECT_DISBURSEMENT_API,
                post(reject_disbursement),
            )
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

#[cfg(test)]
mod routing_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;

    use crate::{endpoints, test_utils::test_app_state};

    use super::build_router;

    fn test_server() -> TestServer {
        let state = test_app_state("http://127.0.0.1:1", "http://127.0.0.1:1");

        TestServer::try_new(build_router(state)).unwrap()
    }

    #[tokio::test]
    async fn log_in_page_is_public() {
        let response = test_server().get(endpoints::LOG_IN_VIEW).await;

        response.assert_status_ok();
    }

    #[tokio::test]
    async fn pages_redirect_to_log_in_without_a_session() {
        let server = test_server();

        for path in [
            endpoints::ROOT,
            endpoints::CASHBOOK_VIEW,
            endpoints::DISBURSEMENT_START,
            endpoints::PENDING_DISBURSEMENTS_VIEW,
            endpoints::DISBURSEMENT_SEARCH_VIEW,
        ] {
            let response = server.get(path).await;

            response.assert_status(StatusCode::SEE_OTHER);
            let location = response.header("location");
            assert!(
                location.to_str().unwrap().starts_with(endpoints::LOG_IN_VIEW),
                "{path} redirected to {location:?}"
            );
        }
    }

    #[tokio::test]
    async fn htmx_posts_get_hx_redirect_without_a_session() {
        let response = test_server().post(endpoints::AMOUNT_API).await;

        let hx_redirect = response.header("hx-redirect");
        assert!(
            hx_redirect
                .to_str()
                .unwrap()
                .starts_with(endpoints::LOG_IN_VIEW)
        );
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        let response = test_server().get("/no/such/page").await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}
