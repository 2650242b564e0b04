//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    alert::Alert, api::ApiError, endpoints, internal_server_error::InternalServerError,
    not_found::NotFoundError,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The session cookie is missing from the cookie jar in the request.
    #[error("no session cookie in the cookie jar")]
    CookieMissing,

    /// The session cookie could not be parsed as a session ID.
    #[error("the session cookie \"{0}\" is not a valid session ID")]
    InvalidSessionCookie(String),

    /// The session does not exist or has expired.
    #[error("the session does not exist or has expired")]
    SessionExpired,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing or deserializing session data as JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A request to the payments API failed.
    #[error("payments API request failed: {0}")]
    Api(#[from] ApiError),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound | Error::Api(ApiError::NotFound) => NotFoundError.into_response(),
            // The API rejected the session token, so the member of staff must log in again.
            Error::Api(ApiError::Unauthorized) => {
                Redirect::to(endpoints::LOG_IN_VIEW).into_response()
            }
            Error::Api(ApiError::Transport(error)) => {
                tracing::error!("Could not reach the payments API: {error}");
                InternalServerError::service_unavailable().into_response()
            }
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::NotFound | Error::Api(ApiError::NotFound) => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Not found".to_owned(),
                    details: "The record could not be found. \
                        Try refreshing the page to see if it has already been processed."
                        .to_owned(),
                },
            ),
            Error::Api(ApiError::Forbidden) => (
                StatusCode::FORBIDDEN,
                Alert::Error {
                    message: "Not allowed".to_owned(),
                    details: "You do not have permission to do that.".to_owned(),
                },
            ),
            Error::Api(ApiError::Conflict(_)) => (
                StatusCode::CONFLICT,
                Alert::Error {
                    message: "Already processed".to_owned(),
                    details: "Someone else has already processed this record. \
                        Refresh the page to see the latest changes."
                        .to_owned(),
                },
            ),
            Error::Api(ApiError::Transport(error)) => {
                tracing::error!("Could not reach the payments API: {error}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Alert::Error {
                        message: "This service is currently unavailable".to_owned(),
                        details: "The payments service could not be reached. Try again later."
                            .to_owned(),
                    },
                )
            }
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Something went wrong".to_owned(),
                        details:
                            "An unexpected error occurred, check the server logs for more details."
                                .to_owned(),
                    },
                )
            }
        };

        (status_code, alert.into_html()).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{Error, api::ApiError, endpoints};

    #[test]
    fn no_rows_maps_to_not_found() {
        let error = Error::from(rusqlite::Error::QueryReturnedNoRows);

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn api_not_found_renders_404_page() {
        let response = Error::Api(ApiError::NotFound).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unauthorized_api_error_redirects_to_log_in() {
        let response = Error::Api(ApiError::Unauthorized).into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            endpoints::LOG_IN_VIEW
        );
    }

    #[test]
    fn unexpected_error_renders_500_page() {
        let response = Error::DatabaseLockError.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_alert_uses_conflict_status() {
        let response = Error::Api(ApiError::Conflict("locked".to_owned())).into_alert_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
