//! The forms of the disbursement wizard.
//!
//! Every form keeps its fields as the strings that were submitted, and
//! [StepForm::clean] returns a normalised copy. Cleaning a cleaned form gives
//! the same form back, which is what lets the wizard replay stored answers.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    api::{ApiError, ApiSession},
    disbursements::wizard::WizardData,
    forms::{FormErrors, INVALID_CHOICE_MESSAGE, REQUIRED_MESSAGE, collapse_whitespace, require},
};

pub const BANK_TRANSFER: &str = "bank_transfer";
pub const CHEQUE: &str = "cheque";

pub const SENDING_METHOD_CHOICES: [(&str, &str); 2] =
    [(BANK_TRANSFER, "Bank transfer"), (CHEQUE, "Cheque")];

pub const RECIPIENT_TYPE_CHOICES: [(&str, &str); 2] = [("person", "Person"), ("company", "Company")];

pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "This service is currently unavailable";
pub const PRISONER_NOT_FOUND_MESSAGE: &str = "No prisoner matches the details you’ve supplied";
pub const WRONG_PRISON_MESSAGE: &str =
    "This prisoner does not appear to be in a prison that you manage";
pub const PRISONER_NUMBER_FORMAT_MESSAGE: &str =
    "The prisoner number should be in the form A1234AB";
pub const EXCEEDS_FUNDS_MESSAGE: &str = "There is not enough money in the prisoner’s private \
    account. Use NOMIS to move money from other accounts into the private account, then click \
    ‘Update balances’";

const MAX_REMITTANCE_DESCRIPTION_LENGTH: usize = 60;
const MAX_ROLL_NUMBER_LENGTH: usize = 18;

/// A form that makes up one step of the wizard.
pub trait StepForm: Clone + Default + Serialize + DeserializeOwned {
    /// Validate the fields, returning the normalised form.
    ///
    /// `data` holds the cleaned forms of the earlier steps.
    fn clean(&self, data: &WizardData) -> Result<Self, FormErrors>;

    /// The form shown when nothing valid has been stored for the step.
    fn initial(_data: &WizardData) -> Self {
        Self::default()
    }

    /// Add the cleaned form to the wizard's answers.
    fn record(self, data: &mut WizardData);
}

fn max_length_message(max_length: usize, length: usize) -> String {
    format!("Ensure this value has at most {max_length} characters (it has {length}).")
}

/// Check a prisoner number looks like "A1234BC", ignoring case.
pub fn is_prisoner_number(value: &str) -> bool {
    let bytes = value.as_bytes();

    bytes.len() == 7
        && bytes[0].is_ascii_alphabetic()
        && bytes[1..5].iter().all(u8::is_ascii_digit)
        && bytes[5..].iter().all(u8::is_ascii_alphabetic)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendingMethodForm {
    pub method: String,
}

impl SendingMethodForm {
    pub fn is_bank_transfer(&self) -> bool {
        self.method == BANK_TRANSFER
    }
}

impl StepForm for SendingMethodForm {
    fn clean(&self, _data: &WizardData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();
        let method = self.method.trim();

        if !SENDING_METHOD_CHOICES
            .iter()
            .any(|(choice, _)| *choice == method)
        {
            errors.add("method", "Select a sending method");
        }

        errors.into_result(Self {
            method: method.to_owned(),
        })
    }

    fn record(self, data: &mut WizardData) {
        data.sending_method = Some(self);
    }
}

/// The prisoner number and the details looked up from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrisonerForm {
    pub prisoner_number: String,
    pub prisoner_name: String,
    pub prisoner_dob: String,
    pub prison: String,
}

impl PrisonerForm {
    /// Check the format of a submitted prisoner number, returning it in upper case.
    pub fn clean_prisoner_number(raw: &str) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let prisoner_number = require(raw, "prisoner_number", &mut errors).to_uppercase();

        if prisoner_number.chars().count() > 7 {
            errors.add(
                "prisoner_number",
                max_length_message(7, prisoner_number.chars().count()),
            );
        } else if !prisoner_number.is_empty() && !is_prisoner_number(&prisoner_number) {
            errors.add("prisoner_number", PRISONER_NUMBER_FORMAT_MESSAGE);
        }

        errors.into_result(prisoner_number)
    }

    /// Look up where the prisoner is held, filling in the looked up details.
    ///
    /// # Errors
    /// Unknown prisoners, prisoners outside the member of staff's prisons and
    /// API failures are returned as errors on `prisoner_number`.
    pub async fn look_up(api: ApiSession<'_>, raw_number: &str) -> Result<Self, FormErrors> {
        let prisoner_number = Self::clean_prisoner_number(raw_number)?;
        let mut errors = FormErrors::new();

        match api.get_prisoner_location(&prisoner_number).await {
            Ok(location) => Ok(Self {
                prisoner_number,
                prisoner_name: location.prisoner_name,
                prisoner_dob: location.prisoner_dob,
                prison: location.prison,
            }),
            Err(ApiError::NotFound) => {
                errors.add("prisoner_number", PRISONER_NOT_FOUND_MESSAGE);
                Err(errors)
            }
            Err(ApiError::Forbidden) => {
                errors.add("prisoner_number", WRONG_PRISON_MESSAGE);
                Err(errors)
            }
            Err(error) => {
                tracing::error!("Could not look up prisoner location for {prisoner_number}: {error}");
                errors.add("prisoner_number", SERVICE_UNAVAILABLE_MESSAGE);
                Err(errors)
            }
        }
    }
}

impl StepForm for PrisonerForm {
    fn clean(&self, _data: &WizardData) -> Result<Self, FormErrors> {
        let prisoner_number = Self::clean_prisoner_number(&self.prisoner_number)?;

        // Stored answers are only valid with the details from a successful look up.
        if self.prisoner_name.is_empty() || self.prison.is_empty() {
            let mut errors = FormErrors::new();
            errors.add("prisoner_number", PRISONER_NOT_FOUND_MESSAGE);
            return Err(errors);
        }

        Ok(Self {
            prisoner_number,
            ..self.clone()
        })
    }

    fn record(self, data: &mut WizardData) {
        data.prisoner = Some(self);
    }
}

/// Parse an amount of money in pounds, e.g. "£1,234.5", as pence.
///
/// # Errors
/// Returns the message to show against the amount field.
pub fn parse_amount(raw: &str) -> Result<i64, &'static str> {
    let cleaned = raw.trim().trim_start_matches('£').replace(',', "");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return Err(REQUIRED_MESSAGE);
    }

    let (negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(cleaned)),
    };
    let (pounds, pence) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let is_number = !(pounds.is_empty() && pence.is_empty())
        && pounds.chars().all(|c| c.is_ascii_digit())
        && pence.chars().all(|c| c.is_ascii_digit());
    if !is_number {
        return Err("Enter amount as a number");
    }

    if pence.len() > 2 {
        return Err("Only use 2 decimal places");
    }

    let pounds: i64 = if pounds.is_empty() {
        0
    } else {
        pounds.parse().map_err(|_| "Enter amount as a number")?
    };
    let pence: i64 = format!("{pence:0<2}").parse().unwrap_or(0);
    let total = pounds
        .checked_mul(100)
        .and_then(|total| total.checked_add(pence))
        .ok_or("Enter amount as a number")?;

    if negative || total < 1 {
        return Err("Amount should be 1p or more");
    }

    Ok(total)
}

/// Format pence as an amount in pounds without the currency sign, e.g. "12.50".
pub fn serialise_amount(pence: i64) -> String {
    format!("{}.{:02}", pence / 100, pence % 100)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountForm {
    pub amount: String,
}

impl AmountForm {
    /// The amount in pence, zero if the form has not been cleaned.
    pub fn pence(&self) -> i64 {
        parse_amount(&self.amount).unwrap_or_default()
    }
}

impl StepForm for AmountForm {
    fn clean(&self, _data: &WizardData) -> Result<Self, FormErrors> {
        match parse_amount(&self.amount) {
            Ok(pence) => Ok(Self {
                amount: serialise_amount(pence),
            }),
            Err(message) => {
                let mut errors = FormErrors::new();
                errors.add("amount", message);
                Err(errors)
            }
        }
    }

    fn record(self, data: &mut WizardData) {
        data.amount = Some(self);
    }
}

/// A loose check that `email` looks like an email address.
fn is_email_address(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };

    !local.is_empty()
        && !local.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Who the money is going to.
///
/// A company's name is sent to the API as the recipient's last name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipientContactForm {
    pub recipient_type: String,
    pub recipient_first_name: String,
    pub recipient_last_name: String,
    pub recipient_company_name: String,
    pub recipient_email: String,
}

impl RecipientContactForm {
    pub fn is_company(&self) -> bool {
        self.recipient_type == "company"
    }

    /// The recipient's name as it is shown to staff.
    pub fn recipient_name(&self) -> String {
        if self.is_company() {
            self.recipient_company_name.clone()
        } else {
            format!("{} {}", self.recipient_first_name, self.recipient_last_name)
        }
    }

    /// The first and last names to send to the API.
    pub fn api_names(&self) -> (String, String) {
        if self.is_company() {
            (String::new(), self.recipient_company_name.clone())
        } else {
            (
                self.recipient_first_name.clone(),
                self.recipient_last_name.clone(),
            )
        }
    }
}

impl StepForm for RecipientContactForm {
    fn clean(&self, _data: &WizardData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();
        let mut cleaned = Self {
            recipient_type: self.recipient_type.trim().to_owned(),
            recipient_first_name: self.recipient_first_name.trim().to_owned(),
            recipient_last_name: self.recipient_last_name.trim().to_owned(),
            recipient_company_name: self.recipient_company_name.trim().to_owned(),
            recipient_email: self.recipient_email.trim().to_owned(),
        };

        match cleaned.recipient_type.as_str() {
            "person" => {
                require(&cleaned.recipient_first_name, "recipient_first_name", &mut errors);
                require(&cleaned.recipient_last_name, "recipient_last_name", &mut errors);
                cleaned.recipient_company_name.clear();
            }
            "company" => {
                require(&cleaned.recipient_company_name, "recipient_company_name", &mut errors);
                cleaned.recipient_first_name.clear();
                cleaned.recipient_last_name.clear();
            }
            _ => errors.add("recipient_type", "Please select ‘Person’ or ‘Company’"),
        }

        if !cleaned.recipient_email.is_empty() && !is_email_address(&cleaned.recipient_email) {
            errors.add("recipient_email", "Enter a valid email address.");
        }

        errors.into_result(cleaned)
    }

    fn record(self, data: &mut WizardData) {
        data.recipient_contact = Some(self);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipientAddressForm {
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub postcode: String,
}

impl StepForm for RecipientAddressForm {
    fn clean(&self, _data: &WizardData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();

        let address_line1 = require(&self.address_line1, "address_line1", &mut errors);
        let city = require(&self.city, "city", &mut errors);
        let postcode = require(&self.postcode, "postcode", &mut errors).to_uppercase();

        if !postcode.is_empty() && postcode.chars().filter(|c| *c != ' ').count() < 5 {
            errors.add("postcode", "Enter a full valid UK postcode");
        }

        errors.into_result(Self {
            address_line1,
            address_line2: self.address_line2.trim().to_owned(),
            city,
            postcode,
        })
    }

    fn record(self, data: &mut WizardData) {
        data.recipient_address = Some(self);
    }
}

fn is_sort_code(value: &str) -> bool {
    let digits: Vec<char> = value.chars().filter(|c| *c != '-').collect();
    let bytes = value.as_bytes();
    let dash_positions_valid = match bytes.len() {
        6 => true,
        7 => bytes[2] == b'-' || bytes[4] == b'-',
        8 => bytes[2] == b'-' && bytes[5] == b'-',
        _ => false,
    };

    dash_positions_valid && digits.len() == 6 && digits.iter().all(char::is_ascii_digit)
}

fn is_roll_number(value: &str) -> bool {
    value.chars().count() <= MAX_ROLL_NUMBER_LENGTH
        && value
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || " /-".contains(c))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipientBankAccountForm {
    pub account_number: String,
    pub sort_code: String,
    pub roll_number: String,
}

impl StepForm for RecipientBankAccountForm {
    fn clean(&self, _data: &WizardData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();

        let account_number = require(&self.account_number, "account_number", &mut errors);
        if !account_number.is_empty()
            && !(account_number.len() == 8 && account_number.chars().all(|c| c.is_ascii_digit()))
        {
            errors.add("account_number", "The account number should be 8 digits long");
        }

        let sort_code = require(&self.sort_code, "sort_code", &mut errors);
        if !sort_code.is_empty() && !is_sort_code(&sort_code) {
            errors.add("sort_code", "The sort code should be 6 digits long");
        }

        let roll_number = self.roll_number.trim().to_uppercase();
        if !is_roll_number(&roll_number) {
            errors.add(
                "roll_number",
                "Enter up to 18 characters, which can include A to Z, 0 to 9, space, / and -",
            );
        }

        errors.into_result(Self {
            account_number,
            sort_code: sort_code.replace('-', ""),
            roll_number,
        })
    }

    fn record(self, data: &mut WizardData) {
        data.recipient_bank_account = Some(self);
    }
}

/// The description on the recipient's bank statement or cheque letter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemittanceDescriptionForm {
    pub remittance: String,
    pub remittance_description: String,
}

impl RemittanceDescriptionForm {
    pub const CHOICES: [(&'static str, &'static str); 2] = [("yes", "Yes"), ("no", "No")];

    /// The description used when staff don't add their own.
    pub fn default_description(data: &WizardData) -> String {
        match &data.prisoner {
            Some(prisoner) => format!("Payment from {}", prisoner.prisoner_name),
            None => String::new(),
        }
    }
}

impl StepForm for RemittanceDescriptionForm {
    fn clean(&self, data: &WizardData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();
        let default_description = Self::default_description(data);

        let mut remittance = match self.remittance.trim() {
            "" | "yes" => "yes",
            "no" => "no",
            _ => {
                errors.add("remittance", INVALID_CHOICE_MESSAGE);
                "yes"
            }
        };

        let mut remittance_description =
            collapse_whitespace(self.remittance_description.trim());
        let length = remittance_description.chars().count();
        if length > MAX_REMITTANCE_DESCRIPTION_LENGTH {
            errors.add(
                "remittance_description",
                max_length_message(MAX_REMITTANCE_DESCRIPTION_LENGTH, length),
            );
        }

        if remittance == "no" {
            remittance_description = default_description;
        } else if remittance_description == default_description {
            remittance = "no";
        }

        errors.into_result(Self {
            remittance: remittance.to_owned(),
            remittance_description,
        })
    }

    fn initial(data: &WizardData) -> Self {
        Self {
            remittance: "no".to_owned(),
            remittance_description: Self::default_description(data),
        }
    }

    fn record(self, data: &mut WizardData) {
        data.remittance_description = Some(self);
    }
}
