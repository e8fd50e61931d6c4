use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Currency applied when an account is created without one
pub const DEFAULT_CURRENCY: &str = "USD";

/// Account type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Checking account for daily transactions
    Checking,
    /// Savings account
    Savings,
    /// Credit card account
    Credit,
    /// Brokerage or other investment account
    Investment,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Credit => "credit",
            AccountType::Investment => "investment",
        }
    }
}

/// Validate ISO 4217 style currency code (three ASCII letters)
fn validate_currency_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::new("invalid_currency_code"));
    }
    Ok(())
}

/// Database entity for accounts
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub account_type: String,
    pub balance: Decimal,
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values needed to insert a new account row
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub owner_id: Uuid,
    pub name: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub currency: String,
    /// Inactive accounts keep their history but accept no new transactions
    pub is_active: bool,
}

/// Account information returned in responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// Unique account identifier
    pub id: Uuid,
    /// Account name
    #[schema(example = "My Checking")]
    pub name: String,
    /// Account type (checking, savings, credit, investment)
    #[serde(rename = "type")]
    #[schema(example = "checking")]
    pub account_type: String,
    /// Current balance
    #[schema(example = 1500.00)]
    pub balance: Decimal,
    /// Currency code
    #[schema(example = "USD")]
    pub currency: String,
    /// Whether the account accepts new transactions
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl AccountResponse {
    pub fn from_account(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            account_type: account.account_type,
            balance: account.balance,
            currency: account.currency,
            is_active: account.is_active,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Response for listing accounts
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountsListResponse {
    /// List of accounts
    pub accounts: Vec<AccountResponse>,
    /// Total count
    #[schema(example = 3)]
    pub count: usize,
}

/// Request body for creating an account
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountDto {
    /// Account name (1-50 characters)
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    #[schema(example = "My Checking")]
    pub name: String,

    /// Account type
    #[serde(rename = "type")]
    pub account_type: AccountType,

    /// Initial balance (defaults to 0)
    #[serde(default)]
    #[schema(example = 1000.00)]
    pub balance: Option<Decimal>,

    /// Currency code (defaults to USD)
    #[serde(default)]
    #[validate(custom(
        function = "validate_currency_code",
        message = "Currency must be a 3-letter code"
    ))]
    #[schema(example = "USD")]
    pub currency: Option<String>,
}

/// Path parameters for account ID
#[derive(Debug, Deserialize, IntoParams)]
pub struct AccountIdPath {
    /// Account UUID
    pub id: Uuid,
}
