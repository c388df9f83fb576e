//! Plaid provider
//!
//! Uses the token-exchange flow: the setup token is a Link `public_token`,
//! exchanged once for an `access_token` that later calls authenticate with.
//!
//! # Configuration
//!
//! Environment variables:
//! - `PLAID_CLIENT_ID`: API client id (required)
//! - `PLAID_SECRET`: API secret for the chosen environment (required)
//! - `PLAID_ENV`: `sandbox` (default), `development`, or `production`

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{AccountKind, FeedProviderKind};

use super::{parse_amount, BankFeedProvider, FeedAccount, FeedSnapshot, FeedTransaction};

const PROVIDER: &str = "Plaid";

/// Page size for `/transactions/get`
const PAGE_SIZE: usize = 500;

/// Error codes that mean the user has to re-link
const CREDENTIAL_ERROR_CODES: &[&str] = &[
    "ITEM_LOGIN_REQUIRED",
    "INVALID_ACCESS_TOKEN",
    "INVALID_PUBLIC_TOKEN",
    "ITEM_NOT_FOUND",
    "ACCESS_NOT_GRANTED",
    "USER_PERMISSION_REVOKED",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaidEnvironment {
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Development => "https://development.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }
}

impl std::str::FromStr for PlaidEnvironment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            _ => Err(format!("Unknown Plaid environment: {}", s)),
        }
    }
}

#[derive(Clone)]
pub struct PlaidProvider {
    http_client: Client,
    base_url: String,
    client_id: String,
    secret: String,
}

#[derive(Debug, Deserialize)]
struct PlaidError {
    #[serde(default)]
    error_type: String,
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<PlaidAccount>,
}

#[derive(Debug, Deserialize)]
struct PlaidAccount {
    account_id: String,
    name: String,
    #[serde(default)]
    official_name: Option<String>,
    #[serde(rename = "type")]
    account_type: String,
    balances: PlaidBalances,
}

#[derive(Debug, Deserialize)]
struct PlaidBalances {
    #[serde(default)]
    current: Option<f64>,
    #[serde(default)]
    available: Option<f64>,
    #[serde(default)]
    limit: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    transactions: Vec<PlaidTransaction>,
    total_transactions: usize,
}

#[derive(Debug, Deserialize)]
struct PlaidTransaction {
    transaction_id: String,
    account_id: String,
    /// Positive = money out of the account
    amount: serde_json::Value,
    date: NaiveDate,
    #[serde(default)]
    name: String,
    #[serde(default)]
    merchant_name: Option<String>,
}

#[derive(Serialize)]
struct TransactionsOptions {
    count: usize,
    offset: usize,
}

impl PlaidProvider {
    pub fn new(http_client: Client, env: PlaidEnvironment, client_id: &str, secret: &str) -> Self {
        Self {
            http_client,
            base_url: env.base_url().to_string(),
            client_id: client_id.to_string(),
            secret: secret.to_string(),
        }
    }

    /// Point at a custom base URL (test servers)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Create from environment variables. Returns None without keys.
    pub fn from_env(http_client: Client) -> Option<Self> {
        let client_id = std::env::var("PLAID_CLIENT_ID").ok()?;
        let secret = std::env::var("PLAID_SECRET").ok()?;
        let env = match std::env::var("PLAID_ENV") {
            Ok(value) => value.parse::<PlaidEnvironment>().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to Plaid sandbox");
                PlaidEnvironment::Sandbox
            }),
            Err(_) => PlaidEnvironment::Sandbox,
        };
        Some(Self::new(http_client, env, &client_id, &secret))
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> Error {
        let parsed: Option<PlaidError> = serde_json::from_str(body).ok();
        let credential = status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
            || parsed
                .as_ref()
                .is_some_and(|e| CREDENTIAL_ERROR_CODES.contains(&e.error_code.as_str()));

        let message = match &parsed {
            Some(e) => format!("{} {}: {}", e.error_type, e.error_code, e.error_message),
            None => format!("{} - {}", status, body),
        };

        if credential {
            Error::Credential {
                provider: PROVIDER.to_string(),
                message,
            }
        } else {
            Error::Provider(format!("Plaid request failed: {}", message))
        }
    }

    /// POST a JSON body with the API keys merged in
    async fn call<T: DeserializeOwned>(&self, path: &str, mut body: serde_json::Value) -> Result<T> {
        if let Some(obj) = body.as_object_mut() {
            obj.insert("client_id".into(), self.client_id.clone().into());
            obj.insert("secret".into(), self.secret.clone().into());
        }

        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::classify_error(status, &text));
        }
        Ok(response.json().await?)
    }

    fn normalize(accounts: Vec<PlaidAccount>, transactions: Vec<PlaidTransaction>) -> FeedSnapshot {
        let mut skipped = 0;
        let mut by_account: HashMap<String, Vec<FeedTransaction>> = HashMap::new();

        for tx in transactions {
            let Some(amount) = parse_amount(&tx.amount) else {
                debug!(tx = %tx.transaction_id, "Skipping transaction with malformed amount");
                skipped += 1;
                continue;
            };
            by_account.entry(tx.account_id).or_default().push(FeedTransaction {
                provider_tx_id: tx.transaction_id,
                date: tx.date,
                // Flip Plaid's outflow-positive convention
                amount: -amount,
                description: tx.merchant_name.unwrap_or(tx.name),
            });
        }

        let accounts = accounts
            .into_iter()
            .map(|acct| {
                let kind = match acct.account_type.as_str() {
                    "credit" | "loan" => AccountKind::Card,
                    _ => AccountKind::Bank,
                };
                let balance = acct.balances.current.unwrap_or(0.0);
                FeedAccount {
                    transactions: by_account.remove(&acct.account_id).unwrap_or_default(),
                    provider_account_id: acct.account_id,
                    name: acct.official_name.unwrap_or(acct.name),
                    institution: None,
                    kind,
                    balance: match kind {
                        AccountKind::Card => balance.max(0.0),
                        AccountKind::Bank => balance,
                    },
                    available_balance: acct.balances.available,
                    limit: acct.balances.limit,
                }
            })
            .collect();

        FeedSnapshot { accounts, skipped }
    }
}

#[async_trait]
impl BankFeedProvider for PlaidProvider {
    fn kind(&self) -> FeedProviderKind {
        FeedProviderKind::Plaid
    }

    async fn claim_access_credential(&self, setup_token: &str) -> Result<String> {
        let response: ExchangeResponse = self
            .call(
                "/item/public_token/exchange",
                serde_json::json!({ "public_token": setup_token.trim() }),
            )
            .await?;
        Ok(response.access_token)
    }

    async fn fetch_accounts(&self, credential: &str, since: NaiveDate) -> Result<FeedSnapshot> {
        let accounts: AccountsResponse = self
            .call("/accounts/get", serde_json::json!({ "access_token": credential }))
            .await?;

        let end = chrono::Utc::now().date_naive();
        let mut transactions = Vec::new();
        loop {
            let options = TransactionsOptions {
                count: PAGE_SIZE,
                offset: transactions.len(),
            };
            let page: TransactionsResponse = self
                .call(
                    "/transactions/get",
                    serde_json::json!({
                        "access_token": credential,
                        "start_date": since.format("%Y-%m-%d").to_string(),
                        "end_date": end.max(since).format("%Y-%m-%d").to_string(),
                        "options": options,
                    }),
                )
                .await?;
            let received = page.transactions.len();
            transactions.extend(page.transactions);
            if received == 0 || transactions.len() >= page.total_transactions {
                break;
            }
        }

        let snapshot = Self::normalize(accounts.accounts, transactions);
        debug!(
            accounts = snapshot.accounts.len(),
            skipped = snapshot.skipped,
            "Fetched Plaid accounts"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_flips_sign_and_groups() {
        let accounts: Vec<PlaidAccount> = serde_json::from_value(json!([
            {"account_id": "a1", "name": "Checking", "type": "depository",
             "balances": {"current": 900.0, "available": 850.0, "limit": null}},
            {"account_id": "a2", "name": "Card", "official_name": "Platinum Card", "type": "credit",
             "balances": {"current": 120.0, "available": null, "limit": 1500.0}}
        ]))
        .unwrap();
        let transactions: Vec<PlaidTransaction> = serde_json::from_value(json!([
            {"transaction_id": "t1", "account_id": "a1", "amount": 25.5, "date": "2026-03-02",
             "name": "SQ *COFFEE", "merchant_name": "Coffee Co"},
            {"transaction_id": "t2", "account_id": "a1", "amount": -1000, "date": "2026-03-01",
             "name": "PAYROLL"},
            {"transaction_id": "t3", "account_id": "a2", "amount": "oops", "date": "2026-03-03",
             "name": "??"}
        ]))
        .unwrap();

        let snapshot = PlaidProvider::normalize(accounts, transactions);
        assert_eq!(snapshot.skipped, 1);

        let checking = &snapshot.accounts[0];
        assert_eq!(checking.kind, AccountKind::Bank);
        assert_eq!(checking.transactions[0].amount, -25.5);
        assert_eq!(checking.transactions[0].description, "Coffee Co");
        assert_eq!(checking.transactions[1].amount, 1000.0);

        let card = &snapshot.accounts[1];
        assert_eq!(card.kind, AccountKind::Card);
        assert_eq!(card.name, "Platinum Card");
        assert_eq!(card.limit, Some(1500.0));
        assert!(card.transactions.is_empty());
    }

    #[test]
    fn test_classify_credential_errors() {
        let body = r#"{"error_type":"ITEM_ERROR","error_code":"ITEM_LOGIN_REQUIRED","error_message":"login required"}"#;
        let err = PlaidProvider::classify_error(reqwest::StatusCode::BAD_REQUEST, body);
        assert!(err.is_credential_failure());

        let body = r#"{"error_type":"RATE_LIMIT_EXCEEDED","error_code":"RATE_LIMIT","error_message":"slow down"}"#;
        let err = PlaidProvider::classify_error(reqwest::StatusCode::TOO_MANY_REQUESTS, body);
        assert!(!err.is_credential_failure());

        let err = PlaidProvider::classify_error(reqwest::StatusCode::UNAUTHORIZED, "nope");
        assert!(err.is_credential_failure());
    }
}
