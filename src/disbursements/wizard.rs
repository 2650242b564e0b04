//! The steps of the disbursement wizard and the answers stored in the session.
//!
//! Answers live in the session under [WIZARD_SESSION_KEY] as an object that
//! maps each step's key to its cleaned form. Before a step is shown, every
//! enabled step before it is replayed from the session with
//! [validate_chain], so a step can never be reached with a gap in the answers.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
    Error,
    disbursements::forms::{
        AmountForm, PrisonerForm, RecipientAddressForm, RecipientBankAccountForm,
        RecipientContactForm, RemittanceDescriptionForm, SendingMethodForm, StepForm,
    },
    endpoints,
    session::Session,
};

/// The session key holding the wizard's answers.
pub const WIZARD_SESSION_KEY: &str = "disbursement";

/// The steps of the wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepId {
    Start,
    SendingMethod,
    Prisoner,
    PrisonerCheck,
    Amount,
    RecipientContact,
    RecipientAddress,
    RecipientBankAccount,
    RemittanceDescription,
    DetailsCheck,
    HandOver,
    Complete,
}

impl StepId {
    /// The key the step's answers are stored under.
    pub fn key(self) -> &'static str {
        match self {
            StepId::Start => "start",
            StepId::SendingMethod => "sending_method",
            StepId::Prisoner => "prisoner",
            StepId::PrisonerCheck => "prisoner_check",
            StepId::Amount => "amount",
            StepId::RecipientContact => "recipient_contact",
            StepId::RecipientAddress => "recipient_address",
            StepId::RecipientBankAccount => "recipient_bank_account",
            StepId::RemittanceDescription => "remittance_description",
            StepId::DetailsCheck => "details_check",
            StepId::HandOver => "hand_over",
            StepId::Complete => "complete",
        }
    }

    /// The page for the step.
    pub fn url(self) -> &'static str {
        match self {
            StepId::Start => endpoints::DISBURSEMENT_START,
            StepId::SendingMethod => endpoints::DISBURSEMENT_SENDING_METHOD,
            StepId::Prisoner => endpoints::DISBURSEMENT_PRISONER,
            StepId::PrisonerCheck => endpoints::DISBURSEMENT_PRISONER_CHECK,
            StepId::Amount => endpoints::DISBURSEMENT_AMOUNT,
            StepId::RecipientContact => endpoints::DISBURSEMENT_RECIPIENT_CONTACT,
            StepId::RecipientAddress => endpoints::DISBURSEMENT_RECIPIENT_ADDRESS,
            StepId::RecipientBankAccount => endpoints::DISBURSEMENT_RECIPIENT_BANK_ACCOUNT,
            StepId::RemittanceDescription => endpoints::DISBURSEMENT_REMITTANCE_DESCRIPTION,
            StepId::DetailsCheck => endpoints::DISBURSEMENT_DETAILS_CHECK,
            StepId::HandOver => endpoints::DISBURSEMENT_HAND_OVER,
            StepId::Complete => endpoints::DISBURSEMENT_COMPLETE,
        }
    }
}

/// The cleaned answers of the steps completed so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WizardData {
    pub sending_method: Option<SendingMethodForm>,
    pub prisoner: Option<PrisonerForm>,
    pub amount: Option<AmountForm>,
    pub recipient_contact: Option<RecipientContactForm>,
    pub recipient_address: Option<RecipientAddressForm>,
    pub recipient_bank_account: Option<RecipientBankAccountForm>,
    pub remittance_description: Option<RemittanceDescriptionForm>,
}

impl WizardData {
    pub fn is_bank_transfer(&self) -> bool {
        self.sending_method
            .as_ref()
            .is_some_and(SendingMethodForm::is_bank_transfer)
    }
}

/// A step of the wizard.
pub struct Step {
    pub id: StepId,
    pub previous: Option<StepId>,
    /// Whether the step stores answers that later steps depend on.
    pub has_form: bool,
    /// Whether the step applies, given the answers before it.
    pub is_enabled: fn(&WizardData) -> bool,
    /// Where to send staff when the step's stored answers are invalid,
    /// the step itself if `None`.
    pub redirect_to: Option<StepId>,
}

fn always(_data: &WizardData) -> bool {
    true
}

fn bank_transfer_only(data: &WizardData) -> bool {
    data.is_bank_transfer()
}

const fn step(id: StepId, previous: Option<StepId>, has_form: bool) -> Step {
    Step {
        id,
        previous,
        has_form,
        is_enabled: always,
        redirect_to: None,
    }
}

/// Every step in order. A step's position is its [StepId] discriminant.
pub const STEPS: [Step; 12] = [
    step(StepId::Start, None, false),
    step(StepId::SendingMethod, Some(StepId::Start), true),
    Step {
        redirect_to: Some(StepId::Start),
        ..step(StepId::Prisoner, Some(StepId::SendingMethod), true)
    },
    step(StepId::PrisonerCheck, Some(StepId::Prisoner), false),
    step(StepId::Amount, Some(StepId::PrisonerCheck), true),
    step(StepId::RecipientContact, Some(StepId::Amount), true),
    step(StepId::RecipientAddress, Some(StepId::RecipientContact), true),
    Step {
        is_enabled: bank_transfer_only,
        ..step(
            StepId::RecipientBankAccount,
            Some(StepId::RecipientAddress),
            true,
        )
    },
    step(
        StepId::RemittanceDescription,
        Some(StepId::RecipientBankAccount),
        true,
    ),
    step(
        StepId::DetailsCheck,
        Some(StepId::RemittanceDescription),
        false,
    ),
    step(StepId::HandOver, Some(StepId::DetailsCheck), false),
    step(StepId::Complete, Some(StepId::HandOver), false),
];

pub fn get_step(id: StepId) -> &'static Step {
    &STEPS[id as usize]
}

/// The steps before `target`, following the predecessor links, first step first.
fn predecessors(target: StepId) -> Vec<StepId> {
    let mut chain = Vec::new();
    let mut current = get_step(target).previous;

    while let Some(id) = current {
        chain.push(id);
        current = get_step(id).previous;
    }

    chain.reverse();
    chain
}

/// The first enabled step after `current`.
pub fn next_step(current: StepId, data: &WizardData) -> Option<StepId> {
    STEPS[current as usize + 1..]
        .iter()
        .find(|step| (step.is_enabled)(data))
        .map(|step| step.id)
}

/// The last enabled step before `current`.
pub fn previous_step(current: StepId, data: &WizardData) -> Option<StepId> {
    STEPS[..current as usize]
        .iter()
        .rev()
        .find(|step| (step.is_enabled)(data))
        .map(|step| step.id)
}

fn wizard_answers(session: &Session) -> Map<String, Value> {
    session.get(WIZARD_SESSION_KEY).unwrap_or_default()
}

/// The answers stored for `step`, if any.
pub fn load_step<F: DeserializeOwned>(session: &Session, step: StepId) -> Option<F> {
    wizard_answers(session)
        .remove(step.key())
        .and_then(|value| serde_json::from_value(value).ok())
}

/// Store `form` as the answers for `step`.
pub fn save_step<F: Serialize>(session: &mut Session, step: StepId, form: &F) -> Result<(), Error> {
    let mut answers = wizard_answers(session);
    answers.insert(step.key().to_owned(), serde_json::to_value(form)?);

    session.insert(WIZARD_SESSION_KEY, &answers)
}

/// Remove every stored answer, returning whether there were any.
pub fn clear_wizard(session: &mut Session) -> bool {
    session.remove(WIZARD_SESSION_KEY).is_some()
}

fn replay<F: StepForm>(session: &Session, step: StepId, data: &mut WizardData) -> bool {
    let Some(form) = load_step::<F>(session, step) else {
        return false;
    };

    match form.clean(data) {
        Ok(cleaned) => {
            cleaned.record(data);
            true
        }
        Err(_) => false,
    }
}

/// Replay the stored answers of every enabled step before `target`.
///
/// # Errors
/// Returns the step to send staff to when a step's answers are missing or invalid.
pub fn validate_chain(target: StepId, session: &Session) -> Result<WizardData, StepId> {
    let mut data = WizardData::default();

    for id in predecessors(target) {
        let step = get_step(id);
        if !step.has_form || !(step.is_enabled)(&data) {
            continue;
        }

        let is_valid = match id {
            StepId::SendingMethod => replay::<SendingMethodForm>(session, id, &mut data),
            StepId::Prisoner => replay::<PrisonerForm>(session, id, &mut data),
            StepId::Amount => replay::<AmountForm>(session, id, &mut data),
            StepId::RecipientContact => replay::<RecipientContactForm>(session, id, &mut data),
            StepId::RecipientAddress => replay::<RecipientAddressForm>(session, id, &mut data),
            StepId::RecipientBankAccount => {
                replay::<RecipientBankAccountForm>(session, id, &mut data)
            }
            StepId::RemittanceDescription => {
                replay::<RemittanceDescriptionForm>(session, id, &mut data)
            }
            _ => true,
        };

        if !is_valid {
            tracing::debug!("Wizard step {} has no valid answers", id.key());
            return Err(step.redirect_to.unwrap_or(id));
        }
    }

    Ok(data)
}
