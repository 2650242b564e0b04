//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! Credentials are checked by the payments API, the session is stored locally.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    api::{ApiClient, ApiError},
    auth::{cookie::set_session_cookie, redirect::normalize_redirect_url},
    endpoints,
    forms::{FormErrors, REQUIRED_MESSAGE, TextField, non_field_errors},
    html::{base, log_in_card, submit_button},
    session::{Session, delete_expired_sessions, save_session},
};

/// Shown when the payments API rejects the username and password.
pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Please enter a correct username and password. \
    Note that both fields may be case-sensitive.";

/// Shown when the payments API cannot be reached.
pub const SERVICE_UNAVAILABLE_MSG: &str = "This service is currently unavailable";

fn log_in_form(username: &str, errors: &FormErrors, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-target="this"
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (non_field_errors(errors))

            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (TextField::new("username", "Username", username).required().render(errors))
            (TextField::new("password", "Password", "")
                .input_type("password")
                .required()
                .render(errors))

            (submit_button("Sign in"))
        }
    }
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    match raw_url.and_then(normalize_redirect_url) {
        Some(redirect_url) => Some(redirect_url),
        None => {
            if let Some(redirect_url) = raw_url {
                tracing::warn!("Invalid redirect URL from {source}: {redirect_url}");
            }
            None
        }
    }
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let log_in_form = log_in_form("", &FormErrors::new(), redirect_url.as_deref());
    let content = log_in_card("Sign in", &log_in_form);

    base("Sign in", &content).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// How long a new session lasts without activity.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
    pub api: ApiClient,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
            api: state.api.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the session is stored, the session cookie
/// set and the client is redirected to the page it came from or the landing page.
/// Otherwise, the form is returned with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();
    let username = user_data.username.trim();

    let mut errors = FormErrors::new();
    if username.is_empty() {
        errors.add("username", REQUIRED_MESSAGE);
    }
    if user_data.password.is_empty() {
        errors.add("password", REQUIRED_MESSAGE);
    }
    if !errors.is_empty() {
        return log_in_form(username, &errors, redirect_url).into_response();
    }

    let (access_token, user) = match state.api.log_in(username, &user_data.password).await {
        Ok(logged_in) => logged_in,
        Err(ApiError::InvalidCredentials) => {
            tracing::info!("Failed log in attempt for {username}");
            errors.add_non_field(INVALID_CREDENTIALS_ERROR_MSG);
            return log_in_form(username, &errors, redirect_url).into_response();
        }
        Err(error) => {
            tracing::error!("Could not log in {username}: {error}");
            errors.add_non_field(SERVICE_UNAVAILABLE_MSG);
            return log_in_form(username, &errors, redirect_url).into_response();
        }
    };

    let session = Session::new(access_token, user, state.cookie_duration);
    if let Err(error) = store_new_session(&state.db_connection, &session) {
        tracing::error!("Could not store session for {username}: {error}");
        return (
            HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
            StatusCode::INTERNAL_SERVER_ERROR,
        )
            .into_response();
    }

    tracing::info!("{} logged in", session.user.username);

    let redirect_url = redirect_url.unwrap_or(endpoints::ROOT);
    let jar = set_session_cookie(jar, session.id, session.expires_at);

    (
        StatusCode::SEE_OTHER,
        HxRedirect(redirect_url.to_owned()),
        jar,
    )
        .into_response()
}

/// Save `session` and tidy up any sessions that have expired.
fn store_new_session(
    db_connection: &Arc<Mutex<Connection>>,
    session: &Session,
) -> Result<(), Error> {
    let connection = db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let expired = delete_expired_sessions(&connection)?;
    if expired > 0 {
        tracing::debug!("Removed {expired} expired sessions");
    }

    save_session(session, &connection)
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// The raw data entered by the member of staff in the log-in form.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct LogInData {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Optional URL to redirect to after logging in.
    /// Only accepted from the log-in form submission.
    pub redirect_url: Option<String>,
}
