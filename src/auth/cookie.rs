//! The private cookie that carries a session ID.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::Error;

pub(crate) const COOKIE_SESSION_ID: &str = "session_id";

/// How long a session lasts without activity.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::minutes(30);

/// Add the session cookie to the cookie jar, expiring at `expires_at`.
pub(crate) fn set_session_cookie(
    jar: PrivateCookieJar,
    session_id: Uuid,
    expires_at: OffsetDateTime,
) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION_ID, session_id.to_string()))
            .expires(expires_at)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Set the session cookie to an invalid value and set its max age to zero, which should delete the cookie on the client side.
pub(crate) fn invalidate_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION_ID, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Read the session ID from the session cookie.
///
/// # Errors
/// Returns [Error::CookieMissing] if there is no session cookie and
/// [Error::InvalidSessionCookie] if its value is not a UUID.
pub(crate) fn get_session_id_from_cookies(jar: &PrivateCookieJar) -> Result<Uuid, Error> {
    let cookie = jar.get(COOKIE_SESSION_ID).ok_or(Error::CookieMissing)?;

    Uuid::parse_str(cookie.value_trimmed())
        .map_err(|_| Error::InvalidSessionCookie(cookie.value_trimmed().to_owned()))
}
