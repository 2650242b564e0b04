//! Disbursements waiting for a second member of staff to confirm or reject them.
//!
//! Confirming posts the payment to the prisoner's NOMIS account before the
//! payments API is told about it, so the NOMIS record ID is derived from the
//! disbursement ID and a repeated post is recognised by NOMIS as a duplicate.

use axum::{
    Extension, Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    Error, NomisError,
    api::Disbursement,
    disbursements::{
        DISBURSEMENTS_PATH, DisbursementState, format_sort_code, forms::SERVICE_UNAVAILABLE_MESSAGE,
        prepare_for_display, sending_method_label,
    },
    endpoints::{self, format_endpoint},
    forms::{FormErrors, TextField},
    html::{
        BANNER_ERROR_STYLE, BANNER_SUCCESS_STYLE, BUTTON_DELETE_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency, format_date_value, submit_button,
    },
    navigation::NavBar,
    nomis::NomisTransaction,
    session::Session,
    timezone::get_local_offset,
};

use super::viability::{Viability, check_viability, viability_warning};

const PRECONFIRM_PATH: &str = "/disbursements/actions/preconfirm/";
const CONFIRM_PATH: &str = "/disbursements/actions/confirm/";
const REJECT_PATH: &str = "/disbursements/actions/reject/";
const COMMENTS_PATH: &str = "/disbursements/comments/";

const INVALID_MESSAGE: &str = "This payment could not be confirmed because NOMIS rejected it. \
    Check the prisoner’s details and account in NOMIS.";

fn pending_query() -> Vec<(String, String)> {
    vec![("resolution".to_owned(), "pending".to_owned())]
}

fn disbursement_path(id: i64) -> String {
    format!("{DISBURSEMENTS_PATH}{id}/")
}

fn local_offset(state: &DisbursementState) -> Result<time::UtcOffset, Error> {
    get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))
}

fn pending_list_view(disbursements: &[(Disbursement, Viability)]) -> Markup {
    let nav_bar = NavBar::new(endpoints::PENDING_DISBURSEMENTS_VIEW).into_html();
    let count = disbursements.len();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-5xl space-y-4"
            {
                h1 class="text-2xl font-bold" { "Confirm payments" }

                p id="pending-count"
                {
                    @if count == 1 { "1 payment is waiting for confirmation." }
                    @else { (count) " payments are waiting for confirmation." }
                }

                @if !disbursements.is_empty() {
                    div class="relative overflow-x-auto rounded"
                    {
                        table class="w-full text-sm text-left"
                        {
                            thead class=(TABLE_HEADER_STYLE)
                            {
                                tr
                                {
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Entered" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Prisoner" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Recipient" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Method" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { span class="sr-only" { "Actions" } }
                                }
                            }

                            tbody
                            {
                                @for (disbursement, viability) in disbursements {
                                    tr class=(TABLE_ROW_STYLE) data-disbursement-id=(disbursement.id)
                                    {
                                        td class=(TABLE_CELL_STYLE)
                                        {
                                            @if let Some(created) = &disbursement.created {
                                                (format_date_value(created))
                                            }
                                        }
                                        td class=(TABLE_CELL_STYLE)
                                        {
                                            (disbursement.prisoner_name) br;
                                            (disbursement.prisoner_number)
                                        }
                                        td class=(TABLE_CELL_STYLE) { (disbursement.recipient_name()) }
                                        td class=(TABLE_CELL_STYLE) { (sending_method_label(&disbursement.method)) }
                                        td class=(TABLE_CELL_STYLE) { (format_currency(disbursement.amount)) }
                                        td class=(TABLE_CELL_STYLE)
                                        {
                                            a
                                                href=(format_endpoint(endpoints::PENDING_DISBURSEMENT_VIEW, disbursement.id))
                                                class=(LINK_STYLE)
                                            {
                                                "Check details"
                                            }
                                            @if !viability.can_confirm() {
                                                p class="cannot-confirm text-red-600 dark:text-red-400" { "Cannot be confirmed" }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Confirm payments", &content)
}

/// List every disbursement waiting for confirmation.
pub async fn get_pending_disbursements_page(
    State(state): State<DisbursementState>,
    Extension(session): Extension<Session>,
) -> Result<Response, Error> {
    let offset = local_offset(&state)?;
    let api = state.api.session(&session.access_token);
    let disbursements: Vec<Disbursement> = api
        .retrieve_all_pages(DISBURSEMENTS_PATH, &pending_query())
        .await?;

    let mut checked = Vec::with_capacity(disbursements.len());
    for disbursement in disbursements {
        let viability = check_viability(&state, &api, &disbursement).await;
        checked.push((prepare_for_display(disbursement, offset), viability));
    }
    let disbursements = checked;

    Ok(pending_list_view(&disbursements).into_response())
}

/// The recipient, payment and audit details of a disbursement.
pub(super) fn disbursement_details(disbursement: &Disbursement) -> Markup {
    let row = |label: &str, value: Markup| {
        html! {
            div class="grid grid-cols-3 gap-2 py-2 border-b border-gray-200 dark:border-gray-700"
            {
                dt class="font-semibold" { (label) }
                dd class="col-span-2" { (value) }
            }
        }
    };

    html! {
        dl.disbursement-details
        {
            (row("Prisoner", html! { (disbursement.prisoner_name) " (" (disbursement.prisoner_number) ")" }))
            (row("Prison", html! { (disbursement.prison_name) }))
            (row("Amount", html! { (format_currency(disbursement.amount)) }))
            (row("Sending method", html! { (sending_method_label(&disbursement.method)) }))
            (row("Recipient", html! {
                (disbursement.recipient_name())
                @if let Some(email) = &disbursement.recipient_email {
                    br; (email)
                }
            }))
            (row("Address", html! {
                (disbursement.address_line1) br;
                @if let Some(line2) = disbursement.address_line2.as_deref().filter(|line| !line.is_empty()) {
                    (line2) br;
                }
                (disbursement.city) br;
                (disbursement.postcode)
            }))
            @if let (Some(sort_code), Some(account_number)) = (&disbursement.sort_code, &disbursement.account_number) {
                (row("Bank details", html! {
                    "Sort code: " (format_sort_code(sort_code)) br;
                    "Account number: " (account_number)
                    @if let Some(roll_number) = disbursement.roll_number.as_deref().filter(|roll| !roll.is_empty()) {
                        br; "Roll number: " (roll_number)
                    }
                }))
            }
            @if let Some(description) = &disbursement.remittance_description {
                (row("Payment description", html! { (description) }))
            }
            @if let Some(nomis_transaction_id) = &disbursement.nomis_transaction_id {
                (row("NOMIS reference", html! { (nomis_transaction_id) }))
            }
            @if let Some(invoice_number) = &disbursement.invoice_number {
                (row("Invoice number", html! { (invoice_number) }))
            }
        }

        @if !disbursement.log_set.is_empty() {
            ul class="disbursement-log text-sm text-gray-500 dark:text-gray-400 space-y-1"
            {
                @for log in &disbursement.log_set {
                    li
                    {
                        (log.action.replace('_', " ")) " by " (log.staff_name)
                        @if let Some(created) = &log.created {
                            " on " (format_date_value(created))
                        }
                    }
                }
            }
        }
    }
}

fn reject_form(disbursement_id: i64, reason: &str, errors: &FormErrors) -> Markup {
    html! {
        form
            hx-post=(format_endpoint(endpoints::REJECT_DISBURSEMENT_API, disbursement_id))
            hx-target-error="#alert-container"
            hx-confirm="Are you sure you want to reject this payment?"
            class="space-y-4"
        {
            (TextField::new("reason", "Reason for rejecting (optional)", reason)
                .help("The person who entered the payment will see this")
                .render(errors))

            button type="submit" id="reject-button" class=(BUTTON_DELETE_STYLE) { "Reject payment" }
        }
    }
}

fn pending_detail_view(disbursement: &Disbursement, viability: &Viability) -> Markup {
    let nav_bar = NavBar::new(endpoints::PENDING_DISBURSEMENTS_VIEW).into_html();
    let is_pending = disbursement.resolution == "pending";

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-xl space-y-6"
            {
                a href=(endpoints::PENDING_DISBURSEMENTS_VIEW) id="back-link" class=(LINK_STYLE) { "Back" }

                h1 class="text-2xl font-bold" { "Check payment details" }

                (disbursement_details(disbursement))

                @if is_pending {
                    (viability_warning(viability))

                    @if viability.can_confirm() {
                        form
                            method="post"
                            action=(format_endpoint(endpoints::CONFIRM_DISBURSEMENT, disbursement.id))
                            id="confirm-form"
                        {
                            (submit_button("Confirm payment"))
                        }
                    } @else {
                        button type="button" id="confirm-disabled" disabled class="w-full px-4 py-2 bg-gray-300 text-gray-600 rounded cursor-not-allowed"
                        {
                            "Confirm payment"
                        }
                    }

                    (reject_form(disbursement.id, "", &FormErrors::new()))
                } @else {
                    p id="not-pending" { "This payment has already been " (disbursement.resolution) "." }
                }
            }
        }
    );

    base("Check payment details", &content)
}

/// Show one pending disbursement with the buttons to confirm or reject it.
pub async fn get_pending_disbursement_page(
    State(state): State<DisbursementState>,
    Extension(session): Extension<Session>,
    Path(disbursement_id): Path<i64>,
) -> Result<Response, Error> {
    let offset = local_offset(&state)?;
    let api = state.api.session(&session.access_token);
    let disbursement: Disbursement = api.get(&disbursement_path(disbursement_id), &[]).await?;

    let viability = if disbursement.resolution == "pending" {
        check_viability(&state, &api, &disbursement).await
    } else {
        Viability::Viable
    };

    let disbursement = prepare_for_display(disbursement, offset);
    Ok(pending_detail_view(&disbursement, &viability).into_response())
}

/// What happened when a disbursement was posted to NOMIS.
#[derive(Debug, Clone, PartialEq)]
enum NomisOutcome {
    /// Posted, or found to have been posted before. The ID is `None` for the latter.
    Posted(Option<String>),
    /// NOMIS could not be reached or failed.
    Unavailable,
    /// NOMIS refused the transaction.
    Invalid,
}

async fn post_to_nomis(state: &DisbursementState, disbursement: &Disbursement) -> NomisOutcome {
    let record_id = format!("d{}", disbursement.id);
    let description = format!("Sent to {}", disbursement.recipient_name());
    let transaction = NomisTransaction {
        prison_id: &disbursement.prison,
        prisoner_number: &disbursement.prisoner_number,
        amount: -disbursement.amount,
        record_id: &record_id,
        description: &description,
        transaction_type: &state.transaction_type,
    };

    match state.nomis.create_transaction(&transaction).await {
        Ok(nomis_transaction_id) => NomisOutcome::Posted(Some(nomis_transaction_id)),
        Err(NomisError::AlreadyApplied) => {
            tracing::warn!(
                "Disbursement {} was already present in NOMIS",
                disbursement.id
            );
            NomisOutcome::Posted(None)
        }
        Err(NomisError::Unavailable(error)) => {
            tracing::error!(
                "Disbursement {} could not be made as NOMIS is unavailable: {error}",
                disbursement.id
            );
            NomisOutcome::Unavailable
        }
        Err(error) => {
            tracing::warn!("Disbursement {} is invalid: {error}", disbursement.id);
            NomisOutcome::Invalid
        }
    }
}

fn confirm_body(disbursement_id: i64, nomis_transaction_id: Option<&str>) -> Value {
    let mut update = json!({ "id": disbursement_id });
    if let Some(nomis_transaction_id) = nomis_transaction_id {
        update["nomis_transaction_id"] = json!(nomis_transaction_id);
    }

    update
}

fn confirmation_view(disbursement: &Disbursement, outcome: Option<&NomisOutcome>) -> Markup {
    let nav_bar = NavBar::new(endpoints::PENDING_DISBURSEMENTS_VIEW).into_html();
    let retry_url = format_endpoint(endpoints::PENDING_DISBURSEMENT_VIEW, disbursement.id);

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-xl space-y-6"
            {
                h1 class="text-2xl font-bold" { "Payment confirmation" }

                @match outcome {
                    Some(NomisOutcome::Posted(_)) | None => {
                        div id="confirmed-banner" class=(BANNER_SUCCESS_STYLE) role="status"
                        {
                            p class="font-semibold" { "Payment confirmed" }
                            p
                            {
                                (format_currency(disbursement.amount)) " to "
                                (disbursement.recipient_name()) " from "
                                (disbursement.prisoner_name)
                            }
                            @if let Some(nomis_transaction_id) = &disbursement.nomis_transaction_id {
                                p { "NOMIS reference: " (nomis_transaction_id) }
                            }
                        }
                    }
                    Some(NomisOutcome::Unavailable) => {
                        div id="confirm-error" class=(BANNER_ERROR_STYLE) role="alert"
                        {
                            p class="font-semibold" { (SERVICE_UNAVAILABLE_MESSAGE) }
                            p { "The payment has not been confirmed. Try again later." }
                        }
                    }
                    Some(NomisOutcome::Invalid) => {
                        div id="confirm-error" class=(BANNER_ERROR_STYLE) role="alert"
                        {
                            p class="font-semibold" { "Payment not confirmed" }
                            p { (INVALID_MESSAGE) }
                        }
                    }
                }

                p class="space-x-4"
                {
                    @if matches!(outcome, Some(NomisOutcome::Unavailable | NomisOutcome::Invalid)) {
                        a href=(retry_url) class=(LINK_STYLE) { "Back to payment" }
                    }
                    a href=(endpoints::PENDING_DISBURSEMENTS_VIEW) class=(LINK_STYLE) { "Confirm more payments" }
                }
            }
        }
    );

    base("Payment confirmation", &content)
}

/// Post a pending disbursement to NOMIS and mark it confirmed.
///
/// A disbursement that is no longer pending is shown as it is without
/// contacting NOMIS again.
pub async fn confirm_disbursement(
    State(state): State<DisbursementState>,
    Extension(session): Extension<Session>,
    Path(disbursement_id): Path<i64>,
) -> Result<Response, Error> {
    let offset = local_offset(&state)?;
    let api = state.api.session(&session.access_token);
    let mut disbursement: Disbursement = api.get(&disbursement_path(disbursement_id), &[]).await?;

    if disbursement.resolution != "pending" {
        tracing::info!(
            "Disbursement {disbursement_id} is already {}, not confirming again",
            disbursement.resolution
        );
        let disbursement = prepare_for_display(disbursement, offset);
        return Ok(confirmation_view(&disbursement, None).into_response());
    }

    let viability = check_viability(&state, &api, &disbursement).await;
    if !viability.can_confirm() {
        tracing::warn!(
            "User \"{}\" tried to confirm disbursement {disbursement_id}, which is not viable: {viability:?}",
            session.user.username
        );
        let disbursement = prepare_for_display(disbursement, offset);
        return Ok(pending_detail_view(&disbursement, &viability).into_response());
    }

    api.post_action(
        PRECONFIRM_PATH,
        &json!({ "disbursement_ids": [disbursement_id] }),
    )
    .await?;

    let outcome = post_to_nomis(&state, &disbursement).await;

    if let NomisOutcome::Posted(nomis_transaction_id) = &outcome {
        api.post_action(
            CONFIRM_PATH,
            &confirm_body(disbursement_id, nomis_transaction_id.as_deref()),
        )
        .await?;

        disbursement.resolution = "confirmed".to_owned();
        disbursement.nomis_transaction_id = nomis_transaction_id.clone();
        tracing::info!(
            "User \"{}\" confirmed disbursement {disbursement_id}",
            session.user.username
        );
    }

    let disbursement = prepare_for_display(disbursement, offset);
    Ok(confirmation_view(&disbursement, Some(&outcome)).into_response())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RejectForm {
    pub reason: String,
}

/// Reject a pending disbursement, recording the reason as a comment if one was given.
pub async fn reject_disbursement(
    State(state): State<DisbursementState>,
    Extension(session): Extension<Session>,
    Path(disbursement_id): Path<i64>,
    Form(form): Form<RejectForm>,
) -> Response {
    let api = state.api.session(&session.access_token);

    if let Err(error) = api
        .post_action(REJECT_PATH, &json!({ "disbursement_ids": [disbursement_id] }))
        .await
    {
        return Error::from(error).into_alert_response();
    }

    let reason = form.reason.trim();
    if !reason.is_empty()
        && let Err(error) = api
            .post_action(
                COMMENTS_PATH,
                &json!([{
                    "disbursement": disbursement_id,
                    "comment": reason,
                    "category": "reject",
                }]),
            )
            .await
    {
        tracing::error!("Could not save the reason for rejecting disbursement {disbursement_id}: {error}");
    }

    tracing::info!(
        "User \"{}\" rejected disbursement {disbursement_id}",
        session.user.username
    );

    (
        HxRedirect(endpoints::PENDING_DISBURSEMENTS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod pending_tests {
    use axum::{
        Extension, Form, Json, Router,
        extract::{FromRef, Path, Query, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
    };
    use serde_json::{Value, json};

    use crate::{
        Error,
        disbursements::{DisbursementState, disbursement_test_utils::disbursement_json},
        endpoints,
        session::test_session,
        test_utils::{
            Recorder, assert_hx_redirect, assert_page_contains, assert_valid_html,
            parse_html_document, select_text, spawn_fake_api, test_app_state,
        },
    };

    use super::{
        RejectForm, confirm_body, confirm_disbursement,
        get_pending_disbursement_page, get_pending_disbursements_page, reject_disbursement,
    };

    /// A fake payments API holding one disbursement with `resolution`, recording actions.
    async fn fake_api(resolution: &'static str, recorder: Recorder) -> String {
        let preconfirm = recorder.clone();
        let confirm = recorder.clone();
        let reject = recorder.clone();
        let comments = recorder;
        let router = Router::new()
            .route(
                "/disbursements/",
                get(|Query(query): Query<Vec<(String, String)>>| async move {
                    assert!(query.contains(&("resolution".to_owned(), "pending".to_owned())));
                    Json(json!({
                        "count": 2,
                        "results": [disbursement_json(1, "pending"), disbursement_json(2, "pending")]
                    }))
                }),
            )
            .route(
                "/disbursements/{id}/",
                get(move |Path(id): Path<i64>| async move {
                    if id == 1 {
                        Json(disbursement_json(1, resolution)).into_response()
                    } else {
                        (StatusCode::NOT_FOUND, Json(json!({}))).into_response()
                    }
                }),
            )
            .route(
                "/prisoner_locations/{prisoner_number}/",
                get(|Path(prisoner_number): Path<String>| async move {
                    Json(json!({
                        "prisoner_number": prisoner_number,
                        "prisoner_name": "JAMES HALLS",
                        "prison": "BXI"
                    }))
                }),
            )
            .route(
                "/disbursements/actions/preconfirm/",
                post(move |Json(body): Json<Value>| async move {
                    preconfirm.record("preconfirm", body);
                    StatusCode::NO_CONTENT
                }),
            )
            .route(
                "/disbursements/actions/confirm/",
                post(move |Json(body): Json<Value>| async move {
                    confirm.record("confirm", body);
                    StatusCode::NO_CONTENT
                }),
            )
            .route(
                "/disbursements/actions/reject/",
                post(move |Json(body): Json<Value>| async move {
                    reject.record("reject", body);
                    StatusCode::NO_CONTENT
                }),
            )
            .route(
                "/disbursements/comments/",
                post(move |Json(body): Json<Value>| async move {
                    comments.record("comments", body);
                    StatusCode::CREATED
                }),
            );

        spawn_fake_api(router).await
    }

    /// A fake NOMIS that answers every transaction with `status` and records the request.
    async fn fake_nomis(status: StatusCode, recorder: Recorder) -> String {
        let router = Router::new().route(
            "/prison/{prison}/offenders/{prisoner_number}/transactions",
            post(move |Json(body): Json<Value>| async move {
                recorder.record("nomis", body);
                (status, Json(json!({"id": "6244779-1"})))
            }),
        );

        spawn_fake_api(router).await
    }

    /// A fake NOMIS where the prisoner's cash account holds `cash` pence.
    async fn fake_nomis_with_cash(cash: i64, recorder: Recorder) -> String {
        let router = Router::new()
            .route(
                "/prison/{prison}/offenders/{prisoner_number}/accounts",
                get(move || async move { Json(json!({"cash": cash, "spends": 0, "savings": 0})) }),
            )
            .route(
                "/prison/{prison}/offenders/{prisoner_number}/transactions",
                post(move |Json(body): Json<Value>| async move {
                    recorder.record("nomis", body);
                    (StatusCode::CREATED, Json(json!({"id": "6244779-1"})))
                }),
            );

        spawn_fake_api(router).await
    }

    fn state_for(api_url: &str, nomis_url: &str) -> DisbursementState {
        DisbursementState::from_ref(&test_app_state(api_url, nomis_url))
    }

    #[tokio::test]
    async fn lists_pending_disbursements_with_count() {
        let api_url = fake_api("pending", Recorder::default()).await;
        let state = state_for(&api_url, "http://127.0.0.1:1");

        let response = get_pending_disbursements_page(State(state), Extension(test_session()))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(
            select_text(&html, "#pending-count"),
            vec!["2 payments are waiting for confirmation."]
        );
        assert_page_contains(&html, "1 Jan 2018 10:00");
    }

    #[tokio::test]
    async fn detail_page_has_confirm_and_reject_forms() {
        let api_url = fake_api("pending", Recorder::default()).await;
        let state = state_for(&api_url, "http://127.0.0.1:1");

        let response =
            get_pending_disbursement_page(State(state), Extension(test_session()), Path(1))
                .await
                .unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_page_contains(&html, "Sort code: 10-20-30");
        assert_eq!(select_text(&html, ".disbursement-log li"), vec!["created by Ann Clerk on 1 Jan 2018 10:00"]);
        let confirm = scraper::Selector::parse("form#confirm-form").unwrap();
        let form = html.select(&confirm).next().unwrap();
        assert_eq!(form.value().attr("action"), Some("/disbursements/pending/1/confirm"));
    }

    #[tokio::test]
    async fn low_balance_replaces_confirm_with_warning() {
        let api_url = fake_api("pending", Recorder::default()).await;
        let nomis_url = fake_nomis_with_cash(1000, Recorder::default()).await;
        let state = state_for(&api_url, &nomis_url);

        let response =
            get_pending_disbursement_page(State(state), Extension(test_session()), Path(1))
                .await
                .unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let warning = select_text(&html, ".viability-warning");
        assert_eq!(warning.len(), 1);
        assert!(warning[0].contains("not enough money"), "got {warning:?}");
        assert!(select_text(&html, "form#confirm-form").is_empty());
        assert_eq!(select_text(&html, "#confirm-disabled"), vec!["Confirm payment"]);
        assert_eq!(select_text(&html, "#reject-button"), vec!["Reject payment"]);
    }

    #[tokio::test]
    async fn enough_money_offers_confirm_without_warning() {
        let api_url = fake_api("pending", Recorder::default()).await;
        let nomis_url = fake_nomis_with_cash(5000, Recorder::default()).await;
        let state = state_for(&api_url, &nomis_url);

        let response =
            get_pending_disbursement_page(State(state), Extension(test_session()), Path(1))
                .await
                .unwrap();

        let html = parse_html_document(response).await;
        assert!(select_text(&html, ".viability-warning").is_empty());
        assert_eq!(select_text(&html, "form#confirm-form button").len(), 1);
    }

    #[tokio::test]
    async fn list_flags_disbursements_that_cannot_be_confirmed() {
        let api_url = fake_api("pending", Recorder::default()).await;
        let nomis_url = fake_nomis_with_cash(1000, Recorder::default()).await;
        let state = state_for(&api_url, &nomis_url);

        let response = get_pending_disbursements_page(State(state), Extension(test_session()))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert_eq!(
            select_text(&html, ".cannot-confirm"),
            vec!["Cannot be confirmed", "Cannot be confirmed"]
        );
    }

    #[tokio::test]
    async fn confirming_with_low_balance_is_refused_before_any_action() {
        let recorder = Recorder::default();
        let api_url = fake_api("pending", recorder.clone()).await;
        let nomis_url = fake_nomis_with_cash(1000, recorder.clone()).await;
        let state = state_for(&api_url, &nomis_url);

        let response = confirm_disbursement(State(state), Extension(test_session()), Path(1))
            .await
            .unwrap();

        assert!(recorder.calls().is_empty());
        let html = parse_html_document(response).await;
        assert_eq!(select_text(&html, ".viability-warning").len(), 1);
        assert!(select_text(&html, "#confirmed-banner").is_empty());
    }

    #[tokio::test]
    async fn unknown_disbursement_is_not_found() {
        let api_url = fake_api("pending", Recorder::default()).await;
        let state = state_for(&api_url, "http://127.0.0.1:1");

        let result =
            get_pending_disbursement_page(State(state), Extension(test_session()), Path(2)).await;

        assert_eq!(
            result.unwrap_err(),
            Error::Api(crate::ApiError::NotFound)
        );
    }

    #[tokio::test]
    async fn confirming_posts_to_nomis_then_confirms() {
        let recorder = Recorder::default();
        let api_url = fake_api("pending", recorder.clone()).await;
        let nomis_url = fake_nomis(StatusCode::CREATED, recorder.clone()).await;
        let state = state_for(&api_url, &nomis_url);

        let response = confirm_disbursement(State(state), Extension(test_session()), Path(1))
            .await
            .unwrap();

        let calls: Vec<String> = recorder.calls().into_iter().map(|(path, _)| path).collect();
        assert_eq!(calls, vec!["preconfirm", "nomis", "confirm"]);
        assert_eq!(
            recorder.bodies_for("preconfirm"),
            vec![json!({"disbursement_ids": [1]})]
        );
        assert_eq!(
            recorder.bodies_for("nomis"),
            vec![json!({
                "type": "RELA",
                "description": "Sent to Jane Doe",
                "amount": -1250,
                "client_transaction_id": "d1",
                "client_unique_ref": "d1"
            })]
        );
        assert_eq!(
            recorder.bodies_for("confirm"),
            vec![json!({"id": 1, "nomis_transaction_id": "6244779-1"})]
        );

        let html = parse_html_document(response).await;
        assert_page_contains(&html, "NOMIS reference: 6244779-1");
    }

    #[tokio::test]
    async fn duplicate_nomis_transaction_is_confirmed_without_reference() {
        let recorder = Recorder::default();
        let api_url = fake_api("pending", recorder.clone()).await;
        let nomis_url = fake_nomis(StatusCode::CONFLICT, recorder.clone()).await;
        let state = state_for(&api_url, &nomis_url);

        confirm_disbursement(State(state), Extension(test_session()), Path(1))
            .await
            .unwrap();

        assert_eq!(recorder.bodies_for("confirm"), vec![json!({"id": 1})]);
    }

    #[tokio::test]
    async fn nomis_failures_leave_disbursement_unconfirmed() {
        for (status, want_message) in [
            (StatusCode::INTERNAL_SERVER_ERROR, "This service is currently unavailable"),
            (StatusCode::BAD_REQUEST, "Payment not confirmed"),
        ] {
            let recorder = Recorder::default();
            let api_url = fake_api("pending", recorder.clone()).await;
            let nomis_url = fake_nomis(status, recorder.clone()).await;
            let state = state_for(&api_url, &nomis_url);

            let response = confirm_disbursement(State(state), Extension(test_session()), Path(1))
                .await
                .unwrap();

            assert!(recorder.bodies_for("confirm").is_empty());
            let html = parse_html_document(response).await;
            assert_page_contains(&html, want_message);
        }
    }

    #[tokio::test]
    async fn confirmed_disbursement_is_not_posted_again() {
        let recorder = Recorder::default();
        let api_url = fake_api("confirmed", recorder.clone()).await;
        let nomis_url = fake_nomis(StatusCode::CREATED, recorder.clone()).await;
        let state = state_for(&api_url, &nomis_url);

        let response = confirm_disbursement(State(state), Extension(test_session()), Path(1))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn rejecting_records_reason_and_returns_to_list() {
        let recorder = Recorder::default();
        let api_url = fake_api("pending", recorder.clone()).await;
        let state = state_for(&api_url, "http://127.0.0.1:1");

        let response = reject_disbursement(
            State(state),
            Extension(test_session()),
            Path(1),
            Form(RejectForm {
                reason: " Wrong account ".to_owned(),
            }),
        )
        .await;

        assert_hx_redirect(&response, endpoints::PENDING_DISBURSEMENTS_VIEW);
        assert_eq!(recorder.bodies_for("reject"), vec![json!({"disbursement_ids": [1]})]);
        assert_eq!(
            recorder.bodies_for("comments"),
            vec![json!([{"disbursement": 1, "comment": "Wrong account", "category": "reject"}])]
        );
    }

    #[tokio::test]
    async fn rejecting_without_reason_adds_no_comment() {
        let recorder = Recorder::default();
        let api_url = fake_api("pending", recorder.clone()).await;
        let state = state_for(&api_url, "http://127.0.0.1:1");

        reject_disbursement(
            State(state),
            Extension(test_session()),
            Path(1),
            Form(RejectForm::default()),
        )
        .await;

        assert!(recorder.bodies_for("comments").is_empty());
    }

    #[test]
    fn confirm_body_only_carries_known_reference() {
        assert_eq!(confirm_body(3, None), json!({"id": 3}));
        assert_eq!(
            confirm_body(3, Some("123-1")),
            json!({"id": 3, "nomis_transaction_id": "123-1"})
        );
    }
}
