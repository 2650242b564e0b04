//! Cashbook is a staff-facing web app for managing money held for prisoners.
//!
//! Staff use the cashbook to credit incoming payments to prisoner accounts
//! and the disbursements pages to send money out of those accounts by bank
//! transfer or cheque.
//!
//! This library provides a server that directly serves HTML pages. All
//! business records live in the payments API, the only local state is the
//! server-side session store.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod alert;
mod api;
mod app_state;
mod auth;
mod cashbook;
mod db;
mod disbursements;
mod endpoints;
mod error;
mod forms;
mod html;
mod internal_server_error;
mod landing;
mod logging;
mod navigation;
mod nomis;
mod not_found;
mod pagination;
mod routing;
mod search;
mod session;
mod timezone;

#[cfg(test)]
mod test_utils;

pub use api::{ApiClient, ApiError};
pub use app_state::AppState;
pub use error::Error;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use nomis::{NomisClient, NomisError};
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
