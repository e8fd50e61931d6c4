use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::PaginationMeta;

/// Transaction type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money received (increases account balance)
    Income,
    /// Money spent (decreases account balance)
    Expense,
    /// Money moved out of the account (decreases account balance)
    Transfer,
    /// Money returned to the account (increases account balance)
    Refund,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::Income,
        TransactionType::Expense,
        TransactionType::Transfer,
        TransactionType::Refund,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::Transfer => "transfer",
            TransactionType::Refund => "refund",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "income" => Some(TransactionType::Income),
            "expense" => Some(TransactionType::Expense),
            "transfer" => Some(TransactionType::Transfer),
            "refund" => Some(TransactionType::Refund),
            _ => None,
        }
    }

    /// Parse a user-supplied type, producing the message shown to the caller on failure.
    pub fn parse_request(s: &str) -> Result<Self, String> {
        Self::parse(s.trim()).ok_or_else(|| {
            let valid: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
            format!(
                "Invalid transaction type '{}'. Must be one of: {}",
                s,
                valid.join(", ")
            )
        })
    }

    fn is_outflow(&self) -> bool {
        matches!(self, TransactionType::Expense | TransactionType::Transfer)
    }

    /// Signed balance delta for a submitted amount.
    ///
    /// A negative amount is already signed and is applied as is. A positive
    /// amount is negated for outflows (expense, transfer) and kept for
    /// inflows (income, refund). The result is what gets stored.
    pub fn balance_delta(&self, amount: Decimal) -> Decimal {
        if amount.is_sign_negative() || !self.is_outflow() {
            amount
        } else {
            -amount
        }
    }
}

/// Database model for transactions.
///
/// `amount` is the signed delta that was applied to the account balance.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
    pub category: String,
    pub transaction_type: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values needed to insert a transaction; `amount` is already the signed delta.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: Uuid,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
    pub category: String,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
}

/// Filter set accepted by the ledger store. `None` means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerQuery {
    pub owner_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub category: Option<String>,
    pub transaction_type: Option<TransactionType>,
}

impl LedgerQuery {
    pub fn matches(&self, owner_id: Uuid, transaction: &Transaction) -> bool {
        self.owner_id.map_or(true, |id| id == owner_id)
            && self.account_id.map_or(true, |id| id == transaction.account_id)
            && self
                .category
                .as_deref()
                .map_or(true, |c| c == transaction.category)
            && self
                .transaction_type
                .map_or(true, |t| t.as_str() == transaction.transaction_type)
    }
}

/// Transaction information returned in responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Unique transaction identifier
    pub id: Uuid,
    /// Account this transaction was recorded against
    pub account_id: Uuid,
    /// Calendar date of the transaction
    #[serde(rename = "date")]
    #[schema(example = "2025-03-14")]
    pub transaction_date: NaiveDate,
    /// Optional description
    #[schema(example = "Weekly groceries")]
    pub description: Option<String>,
    /// User-defined category label
    #[schema(example = "groceries")]
    pub category: String,
    /// Transaction type (income, expense, transfer, refund)
    #[serde(rename = "type")]
    #[schema(example = "expense")]
    pub transaction_type: String,
    /// Signed balance effect of the transaction
    #[schema(example = "-50.00")]
    pub amount: Decimal,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            account_id: t.account_id,
            transaction_date: t.transaction_date,
            description: t.description,
            category: t.category,
            transaction_type: t.transaction_type,
            amount: t.amount,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Request body for creating a transaction
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionDto {
    /// Account to record the transaction against
    pub account_id: Option<Uuid>,

    /// Date of the transaction (YYYY-MM-DD)
    #[schema(example = "2025-03-14")]
    pub date: NaiveDate,

    /// Optional description (max 200 chars)
    #[serde(default)]
    #[validate(length(max = 200, message = "Description cannot exceed 200 characters"))]
    #[schema(example = "Weekly groceries")]
    pub description: Option<String>,

    /// Category label (1-50 chars)
    #[validate(length(min = 1, max = 50, message = "Category must be 1-50 characters"))]
    #[schema(example = "groceries")]
    pub category: String,

    /// Transaction type (income, expense, transfer, refund)
    #[serde(rename = "type")]
    #[schema(example = "expense")]
    pub transaction_type: String,

    /// Amount; positive values are signed by type, negative values are kept
    #[schema(example = 50.00)]
    pub amount: Decimal,
}

/// Query parameters for listing transactions
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQueryParams {
    /// Number of rows to skip (defaults to 0)
    #[param(example = 0)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,

    /// Page size (defaults to 20, capped at 100)
    #[param(example = 20)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,

    /// Filter by account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,

    /// Filter by exact category
    #[param(example = "groceries")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Filter by type (income, expense, transfer, refund)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    #[param(example = "expense")]
    pub transaction_type: Option<String>,
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedTransactionResponse {
    /// Transactions on this page, oldest first
    pub transactions: Vec<TransactionResponse>,
    /// Pagination metadata for the page
    pub pagination: PaginationMeta,
}
