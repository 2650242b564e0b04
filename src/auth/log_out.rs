//! Log-out route handler that deletes the session and redirects to the log-in page.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    auth::{
        AuthState,
        cookie::{get_session_id_from_cookies, invalidate_session_cookie},
    },
    endpoints,
    session::delete_session,
};

/// Delete the session, invalidate the session cookie and redirect the client to the log-in page.
pub async fn get_log_out(State(state): State<AuthState>, jar: PrivateCookieJar) -> Response {
    if let Ok(session_id) = get_session_id_from_cookies(&jar) {
        match state.db_connection.lock() {
            Ok(connection) => {
                if let Err(error) = delete_session(session_id, &connection) {
                    tracing::error!("Could not delete session {session_id}: {error}");
                }
            }
            Err(error) => tracing::error!("could not acquire database lock: {error}"),
        }
    }

    let jar = invalidate_session_cookie(jar);

    (jar, Redirect::to(endpoints::LOG_IN_VIEW)).into_response()
}
