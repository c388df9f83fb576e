//! Test utilities for tally-core
//!
//! Provides a mock SimpleFIN bridge that speaks the claim and accounts
//! endpoints, so provider and reconciler tests can run over real HTTP.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde_json::{json, Value};
use tokio::sync::oneshot;

const USERNAME: &str = "demo";
const PASSWORD: &str = "s3cret";

#[derive(Clone)]
struct BridgeState {
    addr: SocketAddr,
    claimed: Arc<Mutex<HashSet<String>>>,
    accounts: Arc<Mutex<Value>>,
    revoked: Arc<Mutex<bool>>,
}

/// Mock SimpleFIN bridge for testing
pub struct MockSimpleFinServer {
    addr: SocketAddr,
    state: BridgeState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockSimpleFinServer {
    /// Start the mock bridge on an available port
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = BridgeState {
            addr,
            claimed: Arc::new(Mutex::new(HashSet::new())),
            accounts: Arc::new(Mutex::new(default_account_set())),
            revoked: Arc::new(Mutex::new(false)),
        };

        let app = Router::new()
            .route("/claim/:token", post(handle_claim))
            .route("/simplefin/accounts", get(handle_accounts))
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL of this bridge
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A base64 setup token that claims once
    pub fn setup_token(&self, name: &str) -> String {
        base64::engine::general_purpose::STANDARD
            .encode(format!("{}/claim/{}", self.url(), name))
    }

    /// The access URL a successful claim hands out
    pub fn access_url(&self) -> String {
        access_url(self.addr)
    }

    /// Replace the `/accounts` payload
    pub fn set_accounts(&self, account_set: Value) {
        *self.state.accounts.lock().unwrap() = account_set;
    }

    /// Make every accounts request fail with 403
    pub fn revoke(&self) {
        *self.state.revoked.lock().unwrap() = true;
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockSimpleFinServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn access_url(addr: SocketAddr) -> String {
    format!("http://{}:{}@{}/simplefin", USERNAME, PASSWORD, addr)
}

/// One checking account with two transactions and one card
pub fn default_account_set() -> Value {
    json!({
        "errors": [],
        "accounts": [
            {
                "org": {"name": "Mock Credit Union", "domain": "mock.example"},
                "id": "ACT-CHK",
                "name": "Everyday Checking",
                "currency": "USD",
                "balance": "1520.40",
                "available-balance": "1500.00",
                "balance-date": 1767225600,
                "transactions": [
                    {"id": "TX-1", "posted": 1767225600, "amount": "-64.20", "description": "Corner Grocer"},
                    {"id": "TX-2", "posted": 1767312000, "amount": "2100.00", "description": "Payroll"}
                ]
            },
            {
                "org": {"name": "Mock Credit Union"},
                "id": "ACT-CC",
                "name": "Cashback Credit",
                "currency": "USD",
                "balance": "-245.10",
                "balance-date": 1767225600,
                "transactions": [
                    {"id": "TX-3", "posted": 1767398400, "amount": "-45.10", "description": "Fuel Stop"}
                ]
            }
        ]
    })
}

/// Claim endpoint: each token works exactly once
async fn handle_claim(State(state): State<BridgeState>, Path(token): Path<String>) -> Response {
    if token == "bad" || !state.claimed.lock().unwrap().insert(token) {
        return (StatusCode::FORBIDDEN, "claim token already used").into_response();
    }
    access_url(state.addr).into_response()
}

async fn handle_accounts(State(state): State<BridgeState>, headers: HeaderMap) -> Response {
    let expected = format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", USERNAME, PASSWORD))
    );
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);

    if !authorized || *state.revoked.lock().unwrap() {
        return (StatusCode::FORBIDDEN, "access revoked").into_response();
    }

    let body = state.accounts.lock().unwrap().clone();
    Json(body).into_response()
}
