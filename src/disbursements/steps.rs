//! The pages and form handlers of the disbursement wizard.

use axum::{
    Extension, Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    api::NewDisbursement,
    disbursements::{
        DISBURSEMENTS_PATH, DisbursementState, format_sort_code,
        forms::{
            AmountForm, EXCEEDS_FUNDS_MESSAGE, PrisonerForm, RECIPIENT_TYPE_CHOICES,
            RecipientAddressForm, RecipientBankAccountForm, RecipientContactForm,
            RemittanceDescriptionForm, SENDING_METHOD_CHOICES, SERVICE_UNAVAILABLE_MESSAGE,
            SendingMethodForm, StepForm,
        },
        sending_method_label,
        wizard::{
            StepId, WizardData, clear_wizard, load_step, next_step, previous_step, save_step,
            validate_chain,
        },
    },
    endpoints,
    forms::{ConfirmationForm, FormErrors, TextField, non_field_errors, radio_group},
    html::{
        BANNER_ERROR_STYLE, BUTTON_PRIMARY_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, base,
        format_currency, submit_button,
    },
    navigation::NavBar,
    session::{Session, store_session},
};

/// A wizard step whose answers are collected with a form.
trait FormStep: StepForm {
    const STEP: StepId;
    const TITLE: &'static str;
    /// The endpoint the form is posted to.
    const ACTION: &'static str;

    fn fields(&self, data: &WizardData, errors: &FormErrors) -> Markup;
}

impl FormStep for SendingMethodForm {
    const STEP: StepId = StepId::SendingMethod;
    const TITLE: &'static str = "How will the money be sent?";
    const ACTION: &'static str = endpoints::SENDING_METHOD_API;

    fn fields(&self, _data: &WizardData, errors: &FormErrors) -> Markup {
        html! {
            (radio_group("method", "Sending method", &SENDING_METHOD_CHOICES, &self.method, errors))

            ul class="text-sm text-gray-500 dark:text-gray-400 list-disc pl-5"
            {
                li { "Bank transfer: the recipient’s bank account is directly credited in 5-7 working days" }
                li { "Cheque: the recipient gets a cheque in the post in 5-7 working days" }
            }
        }
    }
}

impl FormStep for PrisonerForm {
    const STEP: StepId = StepId::Prisoner;
    const TITLE: &'static str = "Who is sending money?";
    const ACTION: &'static str = endpoints::PRISONER_API;

    fn fields(&self, _data: &WizardData, errors: &FormErrors) -> Markup {
        TextField::new("prisoner_number", "Prisoner number", &self.prisoner_number)
            .help("For example, A1234BC")
            .max_length(7)
            .required()
            .render(errors)
    }
}

impl FormStep for AmountForm {
    const STEP: StepId = StepId::Amount;
    const TITLE: &'static str = "How much is being sent?";
    const ACTION: &'static str = endpoints::AMOUNT_API;

    fn fields(&self, _data: &WizardData, errors: &FormErrors) -> Markup {
        TextField::new("amount", "Amount to send", &self.amount)
            .help("For example, £12.50")
            .required()
            .render(errors)
    }
}

impl FormStep for RecipientContactForm {
    const STEP: StepId = StepId::RecipientContact;
    const TITLE: &'static str = "Who is receiving the money?";
    const ACTION: &'static str = endpoints::RECIPIENT_CONTACT_API;

    fn fields(&self, _data: &WizardData, errors: &FormErrors) -> Markup {
        html! {
            (radio_group("recipient_type", "The recipient is a", &RECIPIENT_TYPE_CHOICES, &self.recipient_type, errors))
            (TextField::new("recipient_first_name", "Their first name", &self.recipient_first_name).render(errors))
            (TextField::new("recipient_last_name", "Last name", &self.recipient_last_name).render(errors))
            (TextField::new("recipient_company_name", "Company name", &self.recipient_company_name).render(errors))
            (TextField::new("recipient_email", "Their email address", &self.recipient_email)
                .input_type("email")
                .help("The recipient will be told about this request by email if given here, otherwise by letter")
                .render(errors))
        }
    }
}

impl FormStep for RecipientAddressForm {
    const STEP: StepId = StepId::RecipientAddress;
    const TITLE: &'static str = "What is the recipient’s address?";
    const ACTION: &'static str = endpoints::RECIPIENT_ADDRESS_API;

    fn fields(&self, _data: &WizardData, errors: &FormErrors) -> Markup {
        html! {
            (TextField::new("address_line1", "Their address", &self.address_line1).required().render(errors))
            (TextField::new("address_line2", "Address line 2", &self.address_line2).render(errors))
            (TextField::new("city", "Town or city", &self.city).required().render(errors))
            (TextField::new("postcode", "Postcode", &self.postcode).required().render(errors))
        }
    }
}

impl FormStep for RecipientBankAccountForm {
    const STEP: StepId = StepId::RecipientBankAccount;
    const TITLE: &'static str = "What are the recipient’s bank details?";
    const ACTION: &'static str = endpoints::RECIPIENT_BANK_ACCOUNT_API;

    fn fields(&self, data: &WizardData, errors: &FormErrors) -> Markup {
        html! {
            @if let Some(contact) = &data.recipient_contact {
                p class="font-semibold" { (contact.recipient_name()) }
            }

            (TextField::new("sort_code", "Sort code", &self.sort_code)
                .help("For example, 10-20-30")
                .required()
                .render(errors))
            (TextField::new("account_number", "Bank account number", &self.account_number)
                .help("For example, 12345678")
                .required()
                .render(errors))
            (TextField::new("roll_number", "Building society roll number (if applicable)", &self.roll_number)
                .help("Up to 18 characters, which can include A to Z, 0 to 9, space, / and -")
                .max_length(18)
                .render(errors))
        }
    }
}

impl FormStep for RemittanceDescriptionForm {
    const STEP: StepId = StepId::RemittanceDescription;
    const TITLE: &'static str = "Would you like to add to the payment description?";
    const ACTION: &'static str = endpoints::REMITTANCE_DESCRIPTION_API;

    fn fields(&self, data: &WizardData, errors: &FormErrors) -> Markup {
        let default_description = RemittanceDescriptionForm::default_description(data);

        html! {
            p class="text-sm text-gray-500 dark:text-gray-400"
            {
                "The recipient will see “" (default_description) "” unless you change it."
            }

            (radio_group("remittance", "Add to the description?", &RemittanceDescriptionForm::CHOICES, &self.remittance, errors))
            (TextField::new("remittance_description", "Payment description", &self.remittance_description)
                .max_length(60)
                .render(errors))
        }
    }
}

fn redirect_to_step(step: StepId) -> Response {
    Redirect::to(step.url()).into_response()
}

fn hx_redirect_to(url: &str) -> Response {
    (HxRedirect(url.to_owned()), StatusCode::SEE_OTHER).into_response()
}

fn wizard_page(title: &str, back: Option<StepId>, body: Markup) -> Markup {
    let nav_bar = NavBar::new(endpoints::DISBURSEMENT_START).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-xl space-y-6"
            {
                @if let Some(back) = back {
                    a href=(back.url()) id="back-link" class=(LINK_STYLE) { "Back" }
                }

                h1 class="text-2xl font-bold" { (title) }

                (body)

                p class="text-sm"
                {
                    a href=(endpoints::DISBURSEMENT_CLEAR_SESSION) class=(LINK_STYLE)
                    {
                        "Cancel and start again"
                    }
                }
            }
        }
    );

    base(title, &content)
}

fn step_form<F: FormStep>(form: &F, data: &WizardData, errors: &FormErrors) -> Markup {
    html! {
        form
            hx-post=(F::ACTION)
            hx-target="this"
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            (non_field_errors(errors))
            (form.fields(data, errors))
            (submit_button("Continue"))
        }
    }
}

/// Show the step's form, filled in with the stored answers if they are still valid.
fn form_step_page<F: FormStep>(session: &Session) -> Response {
    let data = match validate_chain(F::STEP, session) {
        Ok(data) => data,
        Err(step) => return redirect_to_step(step),
    };

    let form = load_step::<F>(session, F::STEP)
        .and_then(|stored| stored.clean(&data).ok())
        .unwrap_or_else(|| F::initial(&data));

    wizard_page(
        F::TITLE,
        previous_step(F::STEP, &data),
        step_form(&form, &data, &FormErrors::new()),
    )
    .into_response()
}

/// Store the cleaned answers for the step and send the client to the next step.
fn save_and_continue<F: FormStep>(
    state: &DisbursementState,
    mut session: Session,
    form: F,
    mut data: WizardData,
) -> Response {
    if let Err(error) = save_step(&mut session, F::STEP, &form)
        .and_then(|()| store_session(&state.db_connection, &session))
    {
        tracing::error!("Could not save wizard step {}: {error}", F::STEP.key());
        return error.into_alert_response();
    }

    form.record(&mut data);
    let next = next_step(F::STEP, &data).unwrap_or(StepId::Start);

    hx_redirect_to(next.url())
}

/// Clean a submitted form and continue, or show the form again with its errors.
fn post_form_step<F: FormStep>(state: &DisbursementState, session: Session, submitted: F) -> Response {
    let data = match validate_chain(F::STEP, &session) {
        Ok(data) => data,
        Err(step) => return hx_redirect_to(step.url()),
    };

    match submitted.clean(&data) {
        Ok(cleaned) => save_and_continue(state, session, cleaned, data),
        Err(errors) => step_form(&submitted, &data, &errors).into_response(),
    }
}

/// The introduction to the wizard.
pub async fn get_start_page() -> Response {
    let body = html! {
        p { "Use this service to send money from a prisoner’s private account by bank transfer or cheque." }

        p
        {
            "You will need the prisoner’s number, the amount and the recipient’s name and address. "
            "For bank transfers you will also need the recipient’s sort code and account number."
        }

        p { "A colleague must check and confirm the request before the money is sent." }

        a href=(endpoints::DISBURSEMENT_SENDING_METHOD) id="start-button" class=(BUTTON_PRIMARY_STYLE)
        {
            "Start now"
        }
    };

    wizard_page("Send money out", None, body).into_response()
}

/// Throw away the wizard's answers and go back to the start.
pub async fn clear_disbursement_session(
    State(state): State<DisbursementState>,
    Extension(mut session): Extension<Session>,
) -> Response {
    if clear_wizard(&mut session)
        && let Err(error) = store_session(&state.db_connection, &session)
    {
        tracing::error!("Could not clear the disbursement wizard: {error}");
    }

    Redirect::to(endpoints::DISBURSEMENT_START).into_response()
}

pub async fn get_sending_method_page(Extension(session): Extension<Session>) -> Response {
    form_step_page::<SendingMethodForm>(&session)
}

pub async fn post_sending_method(
    State(state): State<DisbursementState>,
    Extension(session): Extension<Session>,
    Form(form): Form<SendingMethodForm>,
) -> Response {
    post_form_step(&state, session, form)
}

pub async fn get_prisoner_page(Extension(session): Extension<Session>) -> Response {
    form_step_page::<PrisonerForm>(&session)
}

/// Look up the prisoner and store their details.
pub async fn post_prisoner(
    State(state): State<DisbursementState>,
    Extension(session): Extension<Session>,
    Form(form): Form<PrisonerForm>,
) -> Response {
    let data = match validate_chain(StepId::Prisoner, &session) {
        Ok(data) => data,
        Err(step) => return hx_redirect_to(step.url()),
    };

    let api = state.api.session(&session.access_token);
    match PrisonerForm::look_up(api, &form.prisoner_number).await {
        Ok(prisoner) => save_and_continue(&state, session, prisoner, data),
        Err(errors) => step_form(&form, &data, &errors).into_response(),
    }
}

fn prisoner_check_form(form: &ConfirmationForm, errors: &FormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::PRISONER_CHECK_API)
            hx-target="this"
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="space-y-4 md:space-y-6"
        {
            (radio_group("confirmation", "Is this the right prisoner?", &ConfirmationForm::CHOICES, &form.confirmation, errors))
            (submit_button("Continue"))
        }
    }
}

/// Show the looked up prisoner for staff to confirm.
pub async fn get_prisoner_check_page(Extension(session): Extension<Session>) -> Response {
    let data = match validate_chain(StepId::PrisonerCheck, &session) {
        Ok(data) => data,
        Err(step) => return redirect_to_step(step),
    };
    let Some(prisoner) = &data.prisoner else {
        return redirect_to_step(StepId::Prisoner);
    };

    let body = html! {
        dl id="prisoner-details" class="grid grid-cols-2 gap-2"
        {
            dt class="font-semibold" { "Name" }
            dd { (prisoner.prisoner_name) }
            dt class="font-semibold" { "Prisoner number" }
            dd { (prisoner.prisoner_number) }
            dt class="font-semibold" { "Date of birth" }
            dd { (prisoner.prisoner_dob) }
        }

        (prisoner_check_form(&ConfirmationForm::default(), &FormErrors::new()))
    };

    wizard_page(
        "Check prisoner details",
        previous_step(StepId::PrisonerCheck, &data),
        body,
    )
    .into_response()
}

/// Continue if the prisoner is right, otherwise go back to the prisoner number.
pub async fn post_prisoner_check(
    Extension(session): Extension<Session>,
    Form(form): Form<ConfirmationForm>,
) -> Response {
    let data = match validate_chain(StepId::PrisonerCheck, &session) {
        Ok(data) => data,
        Err(step) => return hx_redirect_to(step.url()),
    };

    match form.clean() {
        Ok(true) => {
            let next = next_step(StepId::PrisonerCheck, &data).unwrap_or(StepId::Start);
            hx_redirect_to(next.url())
        }
        Ok(false) => hx_redirect_to(StepId::Prisoner.url()),
        Err(errors) => prisoner_check_form(&form, &errors).into_response(),
    }
}

pub async fn get_amount_page(Extension(session): Extension<Session>) -> Response {
    form_step_page::<AmountForm>(&session)
}

/// Store the amount if the prisoner's private account can cover it.
///
/// The balance check is skipped if NOMIS cannot be reached.
pub async fn post_amount(
    State(state): State<DisbursementState>,
    Extension(session): Extension<Session>,
    Form(form): Form<AmountForm>,
) -> Response {
    let data = match validate_chain(StepId::Amount, &session) {
        Ok(data) => data,
        Err(step) => return hx_redirect_to(step.url()),
    };

    let cleaned = match form.clean(&data) {
        Ok(cleaned) => cleaned,
        Err(errors) => return step_form(&form, &data, &errors).into_response(),
    };

    if let Some(prisoner) = &data.prisoner {
        match state
            .nomis
            .get_balances(&prisoner.prison, &prisoner.prisoner_number)
            .await
        {
            Ok(balances) if cleaned.pence() > balances.cash => {
                let mut errors = FormErrors::new();
                errors.add("amount", EXCEEDS_FUNDS_MESSAGE);
                return step_form(&form, &data, &errors).into_response();
            }
            Ok(_) => {}
            Err(error) => tracing::error!(
                "Could not get NOMIS balances for {}: {error}",
                prisoner.prisoner_number
            ),
        }
    }

    save_and_continue(&state, session, cleaned, data)
}

pub async fn get_recipient_contact_page(Extension(session): Extension<Session>) -> Response {
    form_step_page::<RecipientContactForm>(&session)
}

pub async fn post_recipient_contact(
    State(state): State<DisbursementState>,
    Extension(session): Extension<Session>,
    Form(form): Form<RecipientContactForm>,
) -> Response {
    post_form_step(&state, session, form)
}

pub async fn get_recipient_address_page(Extension(session): Extension<Session>) -> Response {
    form_step_page::<RecipientAddressForm>(&session)
}

pub async fn post_recipient_address(
    State(state): State<DisbursementState>,
    Extension(session): Extension<Session>,
    Form(form): Form<RecipientAddressForm>,
) -> Response {
    post_form_step(&state, session, form)
}

pub async fn get_recipient_bank_account_page(Extension(session): Extension<Session>) -> Response {
    form_step_page::<RecipientBankAccountForm>(&session)
}

pub async fn post_recipient_bank_account(
    State(state): State<DisbursementState>,
    Extension(session): Extension<Session>,
    Form(form): Form<RecipientBankAccountForm>,
) -> Response {
    post_form_step(&state, session, form)
}

pub async fn get_remittance_description_page(Extension(session): Extension<Session>) -> Response {
    form_step_page::<RemittanceDescriptionForm>(&session)
}

pub async fn post_remittance_description(
    State(state): State<DisbursementState>,
    Extension(session): Extension<Session>,
    Form(form): Form<RemittanceDescriptionForm>,
) -> Response {
    post_form_step(&state, session, form)
}

fn summary_row(label: &str, value: Markup, change: StepId) -> Markup {
    html! {
        div class="grid grid-cols-3 gap-2 py-3 border-b border-gray-200 dark:border-gray-700"
        {
            dt class="font-semibold" { (label) }
            dd { (value) }
            dd class="text-right"
            {
                a href=(change.url()) class=(LINK_STYLE) { "Change" span class="sr-only" { " " (label) } }
            }
        }
    }
}

/// Every answer, bank details only for bank transfers.
fn details_summary(data: &WizardData) -> Markup {
    html! {
        dl id="details"
        {
            @if let Some(method) = &data.sending_method {
                (summary_row("Sending method", html! { (sending_method_label(&method.method)) }, StepId::SendingMethod))
            }

            @if let Some(prisoner) = &data.prisoner {
                (summary_row(
                    "Prisoner",
                    html! { (prisoner.prisoner_name) br; (prisoner.prisoner_number) },
                    StepId::Prisoner,
                ))
            }

            @if let Some(amount) = &data.amount {
                (summary_row("Amount", html! { (format_currency(amount.pence())) }, StepId::Amount))
            }

            @if let Some(contact) = &data.recipient_contact {
                (summary_row(
                    "Recipient",
                    html! {
                        (contact.recipient_name())
                        @if !contact.recipient_email.is_empty() {
                            br; (contact.recipient_email)
                        }
                    },
                    StepId::RecipientContact,
                ))
            }

            @if let Some(address) = &data.recipient_address {
                (summary_row(
                    "Address",
                    html! {
                        (address.address_line1) br;
                        @if !address.address_line2.is_empty() {
                            (address.address_line2) br;
                        }
                        (address.city) br;
                        (address.postcode)
                    },
                    StepId::RecipientAddress,
                ))
            }

            @if let Some(bank) = data.recipient_bank_account.as_ref().filter(|_| data.is_bank_transfer()) {
                (summary_row(
                    "Bank details",
                    html! {
                        "Sort code: " (format_sort_code(&bank.sort_code)) br;
                        "Account number: " (bank.account_number)
                        @if !bank.roll_number.is_empty() {
                            br; "Roll number: " (bank.roll_number)
                        }
                    },
                    StepId::RecipientBankAccount,
                ))
            }

            @if let Some(remittance) = &data.remittance_description {
                (summary_row(
                    "Payment description",
                    html! { (remittance.remittance_description) },
                    StepId::RemittanceDescription,
                ))
            }
        }
    }
}

/// Review every answer before handing the request over.
pub async fn get_details_check_page(Extension(session): Extension<Session>) -> Response {
    let data = match validate_chain(StepId::DetailsCheck, &session) {
        Ok(data) => data,
        Err(step) => return redirect_to_step(step),
    };

    let body = html! {
        (details_summary(&data))

        a href=(endpoints::DISBURSEMENT_HAND_OVER) id="continue-button" class=(BUTTON_PRIMARY_STYLE)
        {
            "Continue"
        }
    };

    wizard_page(
        "Check details",
        previous_step(StepId::DetailsCheck, &data),
        body,
    )
    .into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct HandOverQuery {
    pub e: Option<String>,
}

/// Ask staff to send the request on for a colleague to confirm.
pub async fn get_hand_over_page(
    Extension(session): Extension<Session>,
    Query(query): Query<HandOverQuery>,
) -> Response {
    let data = match validate_chain(StepId::HandOver, &session) {
        Ok(data) => data,
        Err(step) => return redirect_to_step(step),
    };

    let error = match query.e.as_deref() {
        Some("connection") => Some(SERVICE_UNAVAILABLE_MESSAGE),
        _ => None,
    };

    let body = html! {
        @if let Some(error) = error {
            div id="hand-over-error" class=(BANNER_ERROR_STYLE) role="alert" { (error) }
        }

        p
        {
            "Once you send this request it will wait in ‘Pending’ until a colleague "
            "checks the details and confirms it."
        }

        form method="post" action=(endpoints::DISBURSEMENT_COMPLETE) class="space-y-4"
        {
            (submit_button("Send request"))
        }
    };

    wizard_page(
        "Send the request for confirmation",
        previous_step(StepId::HandOver, &data),
        body,
    )
    .into_response()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}

/// Build the request sent to the API from the wizard's answers.
fn new_disbursement(data: &WizardData) -> Option<NewDisbursement> {
    let method = data.sending_method.as_ref()?;
    let prisoner = data.prisoner.as_ref()?;
    let amount = data.amount.as_ref()?;
    let contact = data.recipient_contact.as_ref()?;
    let address = data.recipient_address.as_ref()?;
    let remittance = data.remittance_description.as_ref()?;
    let bank = data
        .recipient_bank_account
        .as_ref()
        .filter(|_| data.is_bank_transfer());

    let (recipient_first_name, recipient_last_name) = contact.api_names();
    let remittance_description = if remittance.remittance_description.is_empty() {
        RemittanceDescriptionForm::default_description(data)
    } else {
        remittance.remittance_description.clone()
    };

    Some(NewDisbursement {
        prisoner_number: prisoner.prisoner_number.clone(),
        prison: prisoner.prison.clone(),
        method: method.method.clone(),
        amount: amount.pence(),
        recipient_first_name,
        recipient_last_name,
        recipient_is_company: contact.is_company(),
        recipient_email: non_empty(&contact.recipient_email),
        address_line1: address.address_line1.clone(),
        address_line2: non_empty(&address.address_line2),
        city: address.city.clone(),
        postcode: address.postcode.clone(),
        sort_code: bank.map(|bank| bank.sort_code.clone()),
        account_number: bank.map(|bank| bank.account_number.clone()),
        roll_number: bank.and_then(|bank| non_empty(&bank.roll_number)),
        remittance_description,
    })
}

fn complete_view(disbursement: &NewDisbursement, recipient_name: &str) -> Markup {
    let body = html! {
        div id="complete-banner" class="p-4 rounded border border-green-300 bg-green-50 dark:bg-gray-800" role="status"
        {
            p class="text-lg font-semibold" { "Request sent" }
            p
            {
                (format_currency(disbursement.amount)) " to " (recipient_name)
                " by " (sending_method_label(&disbursement.method).to_lowercase())
            }
        }

        p { "A colleague now needs to check and confirm the request." }

        p
        {
            a href=(endpoints::DISBURSEMENT_START) class=(LINK_STYLE) { "Send more money" }
        }
    };

    wizard_page("Request sent", None, body)
}

/// Send the request to the API, clearing the wizard only if the API accepted it.
pub async fn post_complete(
    State(state): State<DisbursementState>,
    Extension(mut session): Extension<Session>,
) -> Response {
    let data = match validate_chain(StepId::Complete, &session) {
        Ok(data) => data,
        Err(step) => return redirect_to_step(step),
    };
    let Some(disbursement) = new_disbursement(&data) else {
        return redirect_to_step(StepId::Start);
    };

    if let Err(error) = state
        .api
        .session(&session.access_token)
        .post_action(DISBURSEMENTS_PATH, &disbursement)
        .await
    {
        tracing::error!("Failed to create disbursement: {error}");
        return Redirect::to(&format!("{}?e=connection", endpoints::DISBURSEMENT_HAND_OVER))
            .into_response();
    }

    tracing::info!(
        "User \"{}\" requested a disbursement of {} from {}",
        session.user.username,
        format_currency(disbursement.amount),
        disbursement.prisoner_number
    );

    let recipient_name = data
        .recipient_contact
        .as_ref()
        .map(RecipientContactForm::recipient_name)
        .unwrap_or_default();

    clear_wizard(&mut session);
    if let Err(error) = store_session(&state.db_connection, &session) {
        tracing::error!("Could not clear the disbursement wizard: {error}");
    }

    complete_view(&disbursement, &recipient_name).into_response()
}
