//! Client side of the ledger: the API seam, an HTTP implementation, and the
//! view controller that drives filtered, incremental loading.

mod controller;
mod http;

pub use controller::{CreateOutcome, LedgerView, LedgerViewController, LoadStatus, QueryOutcome};
pub use http::HttpLedgerClient;

use std::fmt;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::Secret;
use uuid::Uuid;

use crate::account::models::AccountResponse;
use crate::models::DEFAULT_PAGE_LIMIT;
use crate::transaction::models::{
    CreateTransactionDto, PaginatedTransactionResponse, TransactionQueryParams,
    TransactionResponse, TransactionType,
};

/// Filters the view applies to the ledger. `None` means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilterSet {
    pub account_id: Option<Uuid>,
    pub category: Option<String>,
    pub transaction_type: Option<TransactionType>,
}

impl TransactionFilterSet {
    /// Blank categories mean "no category filter".
    pub fn normalized(mut self) -> Self {
        self.category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.account_id.is_none() && self.category.is_none() && self.transaction_type.is_none()
    }
}

/// One page request as issued by the view controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub filters: TransactionFilterSet,
    pub offset: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn first(filters: TransactionFilterSet) -> Self {
        Self {
            filters,
            offset: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn to_params(&self) -> TransactionQueryParams {
        TransactionQueryParams {
            offset: Some(self.offset),
            limit: Some(self.limit),
            account_id: self.filters.account_id,
            category: self.filters.category.clone(),
            transaction_type: self
                .filters
                .transaction_type
                .map(|t| t.as_str().to_string()),
        }
    }
}

/// Render a stored amount for display, e.g. `-$1,250.00` or `$25.00`.
///
/// The stored amount is already signed, so the sign shown is the sign stored.
pub fn format_amount(tx: &TransactionResponse) -> String {
    format_decimal(tx.amount)
}

fn format_decimal(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let plain = format!("{:.2}", rounded.abs());
    let (whole, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}${grouped}.{cents}")
}

/// Failure of a client call, classified for the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The server answered with a structured error body
    Api {
        status: u16,
        code: String,
        message: String,
    },
    /// No identity is available to authenticate the call
    Unauthenticated,
    /// The request never produced a response
    Transport(String),
    /// The response could not be decoded
    Decode(String),
}

impl ClientError {
    /// Whether an explicit user retry may succeed without changing the input.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Api { status, .. } => *status == 409 || *status >= 500,
            ClientError::Transport(_) => true,
            ClientError::Unauthenticated | ClientError::Decode(_) => false,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { message, .. } => message.clone(),
            ClientError::Unauthenticated => "Please log in again".to_string(),
            ClientError::Transport(_) => "Could not reach the server".to_string(),
            ClientError::Decode(_) => "An unexpected error occurred".to_string(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Api {
                status,
                code,
                message,
            } => write!(f, "{status} {code}: {message}"),
            ClientError::Unauthenticated => write!(f, "No session available"),
            ClientError::Transport(msg) => write!(f, "Transport error: {msg}"),
            ClientError::Decode(msg) => write!(f, "Decode error: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

/// Calls the view controller makes against the ledger service.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> Result<PaginatedTransactionResponse, ClientError>;

    async fn create_transaction(
        &self,
        dto: &CreateTransactionDto,
    ) -> Result<TransactionResponse, ClientError>;

    async fn list_accounts(&self) -> Result<Vec<AccountResponse>, ClientError>;
}

/// Supplies the caller identity for outgoing requests.
pub trait IdentityProvider: Send + Sync {
    fn bearer_token(&self) -> Option<Secret<String>>;
}

/// Identity fixed at construction, e.g. a token obtained at login.
pub struct StaticIdentity(Secret<String>);

impl StaticIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Secret::new(token.into()))
    }
}

impl IdentityProvider for StaticIdentity {
    fn bearer_token(&self) -> Option<Secret<String>> {
        Some(self.0.clone())
    }
}

/// Told when an account balance changed so it can re-fetch accounts.
pub trait BalanceListener: Send + Sync {
    fn balance_changed(&self, account_id: Uuid);
}

impl<F> BalanceListener for F
where
    F: Fn(Uuid) + Send + Sync,
{
    fn balance_changed(&self, account_id: Uuid) {
        self(account_id)
    }
}
