//! Offset and cursor pagination.
//!
//! ```rust
//! use agora_query::Pagination;
//!
//! let pagination = Pagination::new().skip(10).take(20);
//! assert_eq!(pagination.to_sql(), "LIMIT 20 OFFSET 10");
//!
//! let page_3 = Pagination::page(3, 25);
//! assert_eq!(page_3.skip, Some(50));
//! ```

use std::fmt::Write;

use crate::filter::FilterValue;
use crate::sql::quote_identifier;
use crate::types::{OrderBy, OrderByField, SortOrder};

/// Pagination configuration for queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pagination {
    /// Number of records to skip.
    pub skip: Option<u64>,
    /// Maximum number of records to take.
    pub take: Option<u64>,
    /// Cursor for keyset pagination.
    pub cursor: Option<Cursor>,
}

impl Pagination {
    /// Create a new pagination with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of records to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the maximum number of records to take.
    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// Set cursor for keyset pagination.
    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Check if pagination is specified.
    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.take.is_none() && self.cursor.is_none()
    }

    /// Generate the LIMIT/OFFSET clause. The cursor is rendered separately
    /// because it belongs to the WHERE clause.
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        if let Some(take) = self.take {
            let _ = write!(sql, "LIMIT {}", take);
        }
        if let Some(skip) = self.skip {
            if !sql.is_empty() {
                sql.push(' ');
            }
            let _ = write!(sql, "OFFSET {}", skip);
        }
        sql
    }

    /// First `n` records.
    pub fn first(n: u64) -> Self {
        Self::new().take(n)
    }

    /// 1-indexed page.
    pub fn page(page: u64, page_size: u64) -> Self {
        let skip = page.saturating_sub(1).saturating_mul(page_size);
        Self::new().skip(skip).take(page_size)
    }
}

/// Direction for cursor pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorDirection {
    /// Rows strictly after the cursor.
    After,
    /// Rows strictly before the cursor.
    Before,
}

/// Keyset cursor on a single, unique, orderable column.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    /// The column the cursor walks.
    pub column: String,
    /// The last value seen.
    pub value: FilterValue,
    /// Direction of pagination.
    pub direction: CursorDirection,
}

impl Cursor {
    /// Create a new cursor.
    pub fn new(column: impl Into<String>, value: impl Into<FilterValue>, direction: CursorDirection) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
            direction,
        }
    }

    /// Records after this value.
    pub fn after(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(column, value, CursorDirection::After)
    }

    /// Records before this value.
    pub fn before(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(column, value, CursorDirection::Before)
    }

    /// Comparison operator for this direction.
    #[inline]
    pub const fn operator(&self) -> &'static str {
        match self.direction {
            CursorDirection::After => ">",
            CursorDirection::Before => "<",
        }
    }

    /// Render `column op $index`.
    pub fn to_sql_condition(&self, param_index: usize) -> String {
        format!("{} {} ${}", quote_identifier(&self.column), self.operator(), param_index)
    }

    /// Ordering used when the query did not ask for one.
    pub fn default_order(&self) -> OrderBy {
        let order = match self.direction {
            CursorDirection::After => SortOrder::Asc,
            CursorDirection::Before => SortOrder::Desc,
        };
        OrderBy::from(OrderByField::new(self.column.clone(), order))
    }
}
