//! A client for the payments API, which owns every credit and disbursement record.
//!
//! [ApiClient] holds the shared HTTP client and the OAuth2 client credentials.
//! Requests made on behalf of a member of staff go through an [ApiSession]
//! which adds the staff member's bearer token.

mod models;

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

pub use models::{
    Credit, DateValue, Disbursement, DisbursementLog, LogUser, NewDisbursement, Page,
    PrisonerLocation,
};

use crate::session::StaffUser;
use models::TokenResponse;

/// How many records to request per page when fetching every page of a listing.
const PAGE_SIZE: u64 = 100;

/// The errors that may occur when calling the payments API.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ApiError {
    /// The username or password given at log in was rejected.
    #[error("the username or password is incorrect")]
    InvalidCredentials,

    /// The access token is missing, invalid or expired.
    #[error("the API rejected the access token")]
    Unauthorized,

    /// The member of staff may not access the resource.
    #[error("the API refused access to the resource")]
    Forbidden,

    /// The resource does not exist.
    #[error("the API could not find the resource")]
    NotFound,

    /// The request conflicts with the current state of the resource.
    #[error("the API reported a conflict: {0}")]
    Conflict(String),

    /// Any other unsuccessful response.
    #[error("the API responded with status {0}: {1}")]
    Status(u16, String),

    /// The API could not be reached or the connection failed.
    #[error("could not reach the API: {0}")]
    Transport(String),

    /// The API responded with a body that could not be decoded.
    #[error("could not decode the API response: {0}")]
    Decode(String),
}

impl ApiError {
    fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden,
            StatusCode::NOT_FOUND => ApiError::NotFound,
            StatusCode::CONFLICT => ApiError::Conflict(body),
            status => ApiError::Status(status.as_u16(), body),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        ApiError::Transport(error.to_string())
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|error| ApiError::Decode(error.to_string()))
}

/// Sends requests to the payments API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client for the API at `base_url`, e.g. "https://api.example.com".
    ///
    /// # Errors
    /// Returns [ApiError::Transport] if the HTTP client could not be built.
    pub fn new(base_url: &str, client_id: &str, client_secret: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client_id: client_id.to_owned(),
            client_secret: client_secret.to_owned(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Exchange a member of staff's credentials for an access token and their user details.
    ///
    /// # Errors
    /// Returns [ApiError::InvalidCredentials] if the API rejects the username or password.
    pub async fn log_in(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(String, StaffUser), ApiError> {
        let response = self
            .http
            .post(self.url("/oauth2/token/"))
            .form(&[
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let token: TokenResponse = match status {
            status if status.is_success() => decode(&body)?,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                return Err(ApiError::InvalidCredentials);
            }
            status => return Err(ApiError::from_status(status, body)),
        };

        let session = self.session(&token.access_token);
        let user: StaffUser = session.get(&format!("/users/{username}/"), &[]).await?;

        Ok((token.access_token, user))
    }

    /// Make requests on behalf of the member of staff holding `access_token`.
    pub fn session<'a>(&'a self, access_token: &'a str) -> ApiSession<'a> {
        ApiSession {
            client: self,
            access_token,
        }
    }
}

/// A view of [ApiClient] that authenticates as one member of staff.
#[derive(Debug, Clone, Copy)]
pub struct ApiSession<'a> {
    client: &'a ApiClient,
    access_token: &'a str,
}

impl ApiSession<'_> {
    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.bearer_auth(self.access_token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(ApiError::from_status(status, body))
        }
    }

    /// GET `path` and decode the JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        let request = self.client.http.get(self.client.url(path)).query(query);
        let body = self.send(request).await?;

        decode(&body)
    }

    /// POST `body` as JSON to `path` and decode the JSON response.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.client.http.post(self.client.url(path)).json(body);
        let body = self.send(request).await?;

        decode(&body)
    }

    /// POST `body` as JSON to an action endpoint whose response is ignored.
    pub async fn post_action<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let request = self.client.http.post(self.client.url(path)).json(body);
        self.send(request).await?;

        Ok(())
    }

    /// GET a single page of a paginated listing.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        offset: u64,
        limit: u64,
    ) -> Result<Page<T>, ApiError> {
        let mut query = query.to_vec();
        query.push(("offset".to_owned(), offset.to_string()));
        query.push(("limit".to_owned(), limit.to_string()));

        self.get(path, &query).await
    }

    /// GET every page of a paginated listing.
    pub async fn retrieve_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Vec<T>, ApiError> {
        let mut results = Vec::new();

        loop {
            let page: Page<T> = self
                .get_page(path, query, results.len() as u64, PAGE_SIZE)
                .await?;
            let fetched = page.results.len();
            results.extend(page.results);

            if fetched == 0 || results.len() as u64 >= page.count {
                break;
            }
        }

        Ok(results)
    }

    /// Look up where the prisoner with `prisoner_number` is held.
    pub async fn get_prisoner_location(
        &self,
        prisoner_number: &str,
    ) -> Result<PrisonerLocation, ApiError> {
        self.get(&format!("/prisoner_locations/{prisoner_number}/"), &[])
            .await
    }
}

#[cfg(test)]
mod api_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Form, Json, Router,
        extract::{Path, Query},
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::{get, post},
    };
    use serde_json::{Value, json};

    use crate::test_utils::spawn_fake_api;

    use super::{ApiClient, ApiError, Credit};

    fn test_client(base_url: &str) -> ApiClient {
        ApiClient::new(base_url, "test-client", "test-secret").unwrap()
    }

    #[tokio::test]
    async fn log_in_returns_token_and_user() {
        let router = Router::new()
            .route(
                "/oauth2/token/",
                post(|Form(form): Form<Vec<(String, String)>>| async move {
                    assert!(form.contains(&("grant_type".to_owned(), "password".to_owned())));
                    assert!(form.contains(&("client_id".to_owned(), "test-client".to_owned())));
                    Json(json!({"access_token": "abc123"}))
                }),
            )
            .route(
                "/users/{username}/",
                get(|Path(username): Path<String>, headers: HeaderMap| async move {
                    assert_eq!(headers["authorization"], "Bearer abc123");
                    Json(json!({
                        "pk": 7,
                        "username": username,
                        "first_name": "Mary",
                        "last_name": "Smith",
                        "prisons": [{"nomis_id": "BXI", "name": "HMP Brixton"}]
                    }))
                }),
            );
        let base_url = spawn_fake_api(router).await;

        let (token, user) = test_client(&base_url)
            .log_in("clerk", "secret")
            .await
            .unwrap();

        assert_eq!(token, "abc123");
        assert_eq!(user.pk, 7);
        assert_eq!(user.username, "clerk");
        assert_eq!(user.prisons[0].nomis_id, "BXI");
    }

    #[tokio::test]
    async fn log_in_with_bad_credentials_fails() {
        let router = Router::new().route(
            "/oauth2/token/",
            post(|| async { (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))) }),
        );
        let base_url = spawn_fake_api(router).await;

        let result = test_client(&base_url).log_in("clerk", "wrong").await;

        assert_eq!(result, Err(ApiError::InvalidCredentials));
    }

    #[tokio::test]
    async fn maps_status_codes_to_errors() {
        let router = Router::new().route(
            "/status/{code}/",
            get(|Path(code): Path<u16>| async move {
                (StatusCode::from_u16(code).unwrap(), "body").into_response()
            }),
        );
        let base_url = spawn_fake_api(router).await;
        let client = test_client(&base_url);
        let session = client.session("token");

        let cases = [
            (401, ApiError::Unauthorized),
            (403, ApiError::Forbidden),
            (404, ApiError::NotFound),
            (409, ApiError::Conflict("body".to_owned())),
            (500, ApiError::Status(500, "body".to_owned())),
        ];

        for (code, want) in cases {
            let got = session
                .get::<Value>(&format!("/status/{code}/"), &[])
                .await;
            assert_eq!(got, Err(want), "unexpected result for status {code}");
        }
    }

    #[tokio::test]
    async fn invalid_json_is_a_decode_error() {
        let router = Router::new().route("/broken/", get(|| async { "not json" }));
        let base_url = spawn_fake_api(router).await;
        let client = test_client(&base_url);

        let got = client.session("token").get::<Value>("/broken/", &[]).await;

        assert!(matches!(got, Err(ApiError::Decode(_))), "got {got:?}");
    }

    #[tokio::test]
    async fn unreachable_api_is_a_transport_error() {
        let client = test_client("http://127.0.0.1:1");

        let got = client.session("token").get::<Value>("/credits/", &[]).await;

        assert!(matches!(got, Err(ApiError::Transport(_))), "got {got:?}");
    }

    #[tokio::test]
    async fn retrieves_every_page() {
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let seen = offsets.clone();
        let router = Router::new().route(
            "/credits/",
            get(move |Query(query): Query<Vec<(String, String)>>| {
                let seen = seen.clone();
                async move {
                    let offset: usize = query
                        .iter()
                        .find(|(key, _)| key == "offset")
                        .map(|(_, value)| value.parse().unwrap())
                        .unwrap();
                    seen.lock().unwrap().push(offset);
                    assert!(query.contains(&("status".to_owned(), "locked".to_owned())));

                    // Two records per page regardless of the requested limit.
                    let results: Vec<Value> = (offset..(offset + 2).min(5))
                        .map(|id| json!({"id": id + 1}))
                        .collect();
                    Json(json!({"count": 5, "results": results}))
                }
            }),
        );
        let base_url = spawn_fake_api(router).await;
        let client = test_client(&base_url);

        let credits: Vec<Credit> = client
            .session("token")
            .retrieve_all_pages(
                "/credits/",
                &[("status".to_owned(), "locked".to_owned())],
            )
            .await
            .unwrap();

        let ids: Vec<i64> = credits.iter().map(|credit| credit.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(*offsets.lock().unwrap(), vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn post_action_ignores_empty_body() {
        let router = Router::new().route(
            "/credits/actions/unlock/",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body, json!({"credit_ids": [1, 2]}));
                StatusCode::NO_CONTENT
            }),
        );
        let base_url = spawn_fake_api(router).await;
        let client = test_client(&base_url);

        let result = client
            .session("token")
            .post_action("/credits/actions/unlock/", &json!({"credit_ids": [1, 2]}))
            .await;

        assert_eq!(result, Ok(()));
    }
}
