//! Implements a struct that holds the state of the web server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{ApiClient, Error, NomisClient, auth::DEFAULT_SESSION_DURATION, db::initialize};

/// The state of the web server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// How long a session lasts without activity.
    pub cookie_duration: Duration,

    /// The local timezone as a canonical timezone name, e.g. "Europe/London".
    pub local_timezone: String,

    /// The session store.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The payments API.
    pub api: ApiClient,

    /// The prison ledger.
    pub nomis: NomisClient,

    /// The NOMIS transaction type used when a disbursement is confirmed.
    pub disbursement_transaction_type: String,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection for the session store.
    ///
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Europe/London".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        local_timezone: &str,
        api: ApiClient,
        nomis: NomisClient,
        disbursement_transaction_type: &str,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_SESSION_DURATION,
            local_timezone: local_timezone.to_owned(),
            db_connection: Arc::new(Mutex::new(db_connection)),
            api,
            nomis,
            disbursement_transaction_type: disbursement_transaction_type.to_owned(),
        })
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
