//! In-process stand-ins for the payments API and NOMIS.

use std::sync::{Arc, Mutex};

use axum::Router;
use rusqlite::Connection;
use serde_json::Value;

use crate::{ApiClient, AppState, NomisClient};

/// Serve `router` on a free local port and return its base URL.
pub(crate) async fn spawn_fake_api(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Could not bind fake API listener");
    let address = listener.local_addr().expect("Could not get local address");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Fake API server failed");
    });

    format!("http://{address}")
}

/// Records the JSON bodies posted to a fake upstream, in order.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Recorder {
    pub(crate) fn record(&self, path: &str, body: Value) {
        self.calls.lock().unwrap().push((path.to_owned(), body));
    }

    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn bodies_for(&self, path: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(call_path, _)| call_path == path)
            .map(|(_, body)| body)
            .collect()
    }
}

/// App state pointing at fake upstreams, with an in-memory session store.
pub(crate) fn test_app_state(api_url: &str, nomis_url: &str) -> AppState {
    AppState::new(
        Connection::open_in_memory().unwrap(),
        "42",
        "Etc/UTC",
        ApiClient::new(api_url, "test-client", "test-secret").unwrap(),
        NomisClient::new(nomis_url, None).unwrap(),
        "RELA",
    )
    .unwrap()
}
