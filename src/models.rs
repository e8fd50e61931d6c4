use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Page size used by the ledger when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Largest page the ledger will return in one response.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Money columns are `NUMERIC(14,2)`: magnitudes must stay below 10^12.
const MONEY_MAGNITUDE_LIMIT: i64 = 1_000_000_000_000;

/// Whether `amount` can be stored as an amount or a balance.
pub fn fits_money_column(amount: Decimal) -> bool {
    amount.abs() < Decimal::from(MONEY_MAGNITUDE_LIMIT)
}

/// Pagination metadata attached to every ledger page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Number of rows skipped
    #[schema(example = 0)]
    pub offset: i64,
    /// Page size used for this query
    #[schema(example = 20)]
    pub limit: i64,
    /// Number of rows matching the current filters
    #[schema(example = 57)]
    pub total: i64,
    /// Whether another page is available after this one
    #[schema(example = true)]
    pub has_next: bool,
}

impl PaginationMeta {
    pub fn new(offset: i64, limit: i64, total: i64) -> Self {
        Self {
            offset,
            limit,
            total,
            has_next: offset.saturating_add(limit) < total,
        }
    }

    /// Offset of the page following this one.
    pub fn next_offset(&self) -> i64 {
        self.offset.saturating_add(self.limit)
    }
}

impl Default for PaginationMeta {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_LIMIT, 0)
    }
}
