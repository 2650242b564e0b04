//! A client for NOMIS, the prison ledger where disbursements are finally settled.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// The ways a NOMIS call can fail.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum NomisError {
    /// NOMIS already holds a transaction with the same record ID (HTTP 409).
    #[error("the transaction has already been applied")]
    AlreadyApplied,

    /// NOMIS could not be reached or responded with a server error.
    #[error("NOMIS is unavailable: {0}")]
    Unavailable(String),

    /// NOMIS refused the request (any other 4xx).
    #[error("NOMIS rejected the request with status {0}: {1}")]
    Rejected(u16, String),

    /// NOMIS responded with a body that could not be decoded.
    #[error("could not decode the NOMIS response: {0}")]
    Decode(String),
}

impl NomisError {
    fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::CONFLICT {
            NomisError::AlreadyApplied
        } else if status.is_server_error() {
            NomisError::Unavailable(format!("status {status}: {body}"))
        } else {
            NomisError::Rejected(status.as_u16(), body)
        }
    }
}

/// A transaction to post to a prisoner's NOMIS account.
#[derive(Debug, Clone, PartialEq)]
pub struct NomisTransaction<'a> {
    pub prison_id: &'a str,
    pub prisoner_number: &'a str,
    /// Signed amount in pence, negative for money leaving the account.
    pub amount: i64,
    /// Unique per record, NOMIS uses it to detect repeated requests.
    pub record_id: &'a str,
    pub description: &'a str,
    pub transaction_type: &'a str,
}

#[derive(Serialize)]
struct TransactionBody<'a> {
    #[serde(rename = "type")]
    transaction_type: &'a str,
    description: &'a str,
    amount: i64,
    client_transaction_id: &'a str,
    client_unique_ref: &'a str,
}

#[derive(Deserialize)]
struct TransactionResponse {
    id: String,
}

/// A prisoner's account balances in pence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NomisBalances {
    pub cash: i64,
    pub spends: i64,
    pub savings: i64,
}

/// Sends requests to NOMIS.
#[derive(Debug, Clone)]
pub struct NomisClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl NomisClient {
    /// Create a client for NOMIS at `base_url`, authenticating with `token` if given.
    ///
    /// # Errors
    /// Returns [NomisError::Unavailable] if the HTTP client could not be built.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, NomisError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|error| NomisError::Unavailable(error.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
            http,
        })
    }

    fn offender_url(&self, prison_id: &str, prisoner_number: &str, resource: &str) -> String {
        format!(
            "{}/prison/{prison_id}/offenders/{prisoner_number}/{resource}",
            self.base_url
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Post `transaction` to the prisoner's account, returning the NOMIS transaction ID.
    ///
    /// A transport failure is retried once.
    ///
    /// # Errors
    /// [NomisError::AlreadyApplied] means the transaction exists already and
    /// callers should treat it as success.
    pub async fn create_transaction(
        &self,
        transaction: &NomisTransaction<'_>,
    ) -> Result<String, NomisError> {
        let url = self.offender_url(
            transaction.prison_id,
            transaction.prisoner_number,
            "transactions",
        );
        let body = TransactionBody {
            transaction_type: transaction.transaction_type,
            description: transaction.description,
            amount: transaction.amount,
            client_transaction_id: transaction.record_id,
            client_unique_ref: transaction.record_id,
        };

        let mut attempts_left = 2;
        let response = loop {
            attempts_left -= 1;

            match self
                .authorize(self.http.post(&url))
                .json(&body)
                .send()
                .await
            {
                Ok(response) => break response,
                Err(error) if attempts_left > 0 => {
                    tracing::warn!(
                        "Could not reach NOMIS for record {}, retrying: {error}",
                        transaction.record_id
                    );
                }
                Err(error) => return Err(NomisError::Unavailable(error.to_string())),
            }
        };

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| NomisError::Unavailable(error.to_string()))?;

        if !status.is_success() {
            return Err(NomisError::from_status(status, text));
        }

        serde_json::from_str::<TransactionResponse>(&text)
            .map(|response| response.id)
            .map_err(|error| NomisError::Decode(error.to_string()))
    }

    /// Get the balances of a prisoner's accounts.
    pub async fn get_balances(
        &self,
        prison_id: &str,
        prisoner_number: &str,
    ) -> Result<NomisBalances, NomisError> {
        let url = self.offender_url(prison_id, prisoner_number, "accounts");
        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|error| NomisError::Unavailable(error.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| NomisError::Unavailable(error.to_string()))?;

        if !status.is_success() {
            return Err(NomisError::from_status(status, text));
        }

        serde_json::from_str(&text).map_err(|error| NomisError::Decode(error.to_string()))
    }
}
