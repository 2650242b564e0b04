//! Logging staff in and out against the payments API, and guarding the routes that need a session.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod redirect;

pub use cookie::DEFAULT_SESSION_DURATION;
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AuthState, auth_guard, auth_guard_hx};

#[cfg(test)]
pub(crate) use cookie::{COOKIE_SESSION_ID, set_session_cookie};
