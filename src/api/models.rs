//! The records exchanged with the payments API.

use serde::{Deserialize, Deserializer, Serialize};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

/// One page of a paginated API listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// A date or date-time field from the API.
///
/// The API sends dates as strings. They arrive as [DateValue::Unparsed] and
/// the presentation code parses them into one of the other variants,
/// leaving values it does not understand untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum DateValue {
    DateTime(OffsetDateTime),
    Date(Date),
    Unparsed(String),
}

const NAIVE_DATE_TIME_FORMATS: [&[BorrowedFormatItem]; 4] = [
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
];

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

impl DateValue {
    /// Parse an unparsed value.
    ///
    /// Date-times with an offset are converted to `offset`, date-times without
    /// one are taken to be UTC. Anything that is not a date-time or a date is
    /// returned unchanged.
    pub fn parse(self, offset: UtcOffset) -> Self {
        let DateValue::Unparsed(raw) = self else {
            return self;
        };

        if let Ok(date_time) = OffsetDateTime::parse(&raw, &Rfc3339) {
            return DateValue::DateTime(date_time.to_offset(offset));
        }

        for format in NAIVE_DATE_TIME_FORMATS {
            if let Ok(date_time) = PrimitiveDateTime::parse(&raw, format) {
                return DateValue::DateTime(date_time.assume_utc().to_offset(offset));
            }
        }

        match Date::parse(&raw, DATE_FORMAT) {
            Ok(date) => DateValue::Date(date),
            Err(_) => DateValue::Unparsed(raw),
        }
    }

    /// The calendar date of the value, if it has been parsed.
    pub fn date(&self) -> Option<Date> {
        match self {
            DateValue::DateTime(date_time) => Some(date_time.date()),
            DateValue::Date(date) => Some(*date),
            DateValue::Unparsed(_) => None,
        }
    }

    /// A sort key that orders parsed values chronologically and puts unparsed values first.
    pub fn sort_key(&self) -> Option<OffsetDateTime> {
        match self {
            DateValue::DateTime(date_time) => Some(*date_time),
            DateValue::Date(date) => Some(date.midnight().assume_utc()),
            DateValue::Unparsed(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for DateValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(DateValue::Unparsed)
    }
}

/// A payment into a prisoner's account.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Credit {
    pub id: i64,
    pub prisoner_number: Option<String>,
    pub prisoner_name: Option<String>,
    /// The amount in pence.
    pub amount: Option<i64>,
    pub sender_name: Option<String>,
    pub prison: Option<String>,
    pub resolution: String,
    pub anonymous: bool,
    pub owner: Option<i64>,
    pub owner_name: Option<String>,
    pub received_at: Option<DateValue>,
    pub credited_at: Option<DateValue>,
    pub refunded_at: Option<DateValue>,
}

/// Read a string that the API may send as `null` as an empty string.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A payment out of a prisoner's account.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Disbursement {
    pub id: i64,
    /// The amount in pence.
    pub amount: i64,
    #[serde(deserialize_with = "null_as_empty")]
    pub method: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub prisoner_number: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub prisoner_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub prison: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub prison_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub recipient_first_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub recipient_last_name: String,
    pub recipient_is_company: bool,
    pub recipient_email: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub address_line1: String,
    pub address_line2: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub city: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub postcode: String,
    pub sort_code: Option<String>,
    pub account_number: Option<String>,
    pub roll_number: Option<String>,
    pub remittance_description: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub resolution: String,
    pub nomis_transaction_id: Option<String>,
    pub invoice_number: Option<String>,
    pub created: Option<DateValue>,
    pub log_set: Vec<DisbursementLog>,
}

impl Disbursement {
    /// The recipient's name, a company's name is kept in the last name field.
    pub fn recipient_name(&self) -> String {
        if self.recipient_is_company {
            return self.recipient_last_name.clone();
        }

        [
            self.recipient_first_name.as_str(),
            self.recipient_last_name.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// An entry in a disbursement's audit log.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct DisbursementLog {
    #[serde(deserialize_with = "null_as_empty")]
    pub action: String,
    pub created: Option<DateValue>,
    pub user: LogUser,
    /// Filled in for display after the log has been fetched.
    #[serde(skip)]
    pub staff_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct LogUser {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl LogUser {
    /// "first last", or the username, or "Unknown user".
    pub fn staff_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !name.is_empty() {
            return name;
        }

        match self.username.as_deref() {
            Some(username) if !username.is_empty() => username.to_owned(),
            _ => "Unknown user".to_owned(),
        }
    }
}

/// A new disbursement assembled from the wizard's answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDisbursement {
    pub prisoner_number: String,
    pub prison: String,
    pub method: String,
    /// The amount in pence.
    pub amount: i64,
    pub recipient_first_name: String,
    pub recipient_last_name: String,
    pub recipient_is_company: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    pub address_line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub postcode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    pub remittance_description: String,
}

/// The location of a prisoner, used to confirm the prisoner number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrisonerLocation {
    pub prisoner_number: String,
    pub prisoner_name: String,
    #[serde(default)]
    pub prisoner_dob: String,
    pub prison: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: String,
}

#[cfg(test)]
mod model_tests {
    use serde_json::json;

    use super::{Credit, DateValue, Disbursement, LogUser};

    #[test]
    fn credit_dates_arrive_unparsed() {
        let credit: Credit = serde_json::from_value(json!({
            "id": 1,
            "amount": 1250,
            "received_at": "2018-01-01T10:00:00Z",
            "credited_at": null,
        }))
        .unwrap();

        assert_eq!(
            credit.received_at,
            Some(DateValue::Unparsed("2018-01-01T10:00:00Z".to_owned()))
        );
        assert_eq!(credit.credited_at, None);
        assert!(!credit.anonymous);
    }

    #[test]
    fn null_disbursement_text_fields_are_empty() {
        let disbursement: Disbursement = serde_json::from_value(json!({
            "id": 4,
            "amount": 500,
            "method": "cheque",
            "prison_name": null,
            "recipient_first_name": null,
            "recipient_last_name": "Doe",
            "address_line1": null,
            "city": null,
            "postcode": null,
            "log_set": [{"action": null, "user": {}}]
        }))
        .unwrap();

        assert_eq!(disbursement.prison_name, "");
        assert_eq!(disbursement.address_line1, "");
        assert_eq!(disbursement.postcode, "");
        assert_eq!(disbursement.recipient_name(), "Doe");
        assert_eq!(disbursement.log_set[0].action, "");
    }

    #[test]
    fn company_recipient_name_is_last_name() {
        let disbursement = Disbursement {
            recipient_first_name: String::new(),
            recipient_last_name: "Acme Ltd".to_owned(),
            recipient_is_company: true,
            ..Default::default()
        };

        assert_eq!(disbursement.recipient_name(), "Acme Ltd");
    }

    #[test]
    fn staff_name_falls_back_in_order() {
        let named = LogUser {
            username: Some("clerk".to_owned()),
            first_name: Some("Mary".to_owned()),
            last_name: Some("Smith".to_owned()),
        };
        let username_only = LogUser {
            username: Some("clerk".to_owned()),
            ..Default::default()
        };

        assert_eq!(named.staff_name(), "Mary Smith");
        assert_eq!(username_only.staff_name(), "clerk");
        assert_eq!(LogUser::default().staff_name(), "Unknown user");
    }
}
