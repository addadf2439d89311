//! # agora-query
//!
//! Query runtime for the Agora database client.
//!
//! This crate holds everything that does not depend on a particular schema
//! or driver:
//! - filters, ordering, pagination and typed column handles
//! - the operation builders behind `find_many`, `create`, `update`,
//!   `upsert`, `delete`, `count`, `aggregate` and `group_by`
//! - raw SQL with bound parameters
//! - the [`Model`] and [`QueryEngine`] traits the generated client and the
//!   PostgreSQL engine plug into
//! - transaction configuration and the error taxonomy
//!
//! ## Filters
//!
//! ```rust
//! use agora_query::{Filter, FilterValue};
//!
//! let filter = Filter::and([
//!     Filter::Equals("status".into(), "PUBLISHED".into()),
//!     Filter::Gt("position".into(), FilterValue::Int(2)),
//! ]);
//!
//! let (sql, params) = filter.to_sql(0);
//! assert_eq!(sql, "(status = $1 AND position > $2)");
//! assert_eq!(params.len(), 2);
//! ```
//!
//! ## Sorting
//!
//! ```rust
//! use agora_query::{NullsOrder, OrderBy, OrderByField};
//!
//! let order = OrderBy::from(OrderByField::asc("position"))
//!     .then(OrderByField::desc("published_at").nulls(NullsOrder::Last));
//! assert_eq!(order.to_sql(), "position ASC, published_at DESC NULLS LAST");
//! ```
//!
//! ## Raw SQL
//!
//! ```rust
//! use agora_query::Sql;
//!
//! let sql = Sql::new("SELECT * FROM tags WHERE slug = ").bind("energy");
//! assert_eq!(sql.sql(), "SELECT * FROM tags WHERE slug = $1");
//! ```

pub mod data;
pub mod error;
pub mod field;
pub mod filter;
pub mod logging;
pub mod operations;
pub mod pagination;
pub mod raw;
pub mod row;
pub mod sql;
pub mod traits;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod test_support;

pub use data::{Assignment, CreateData, FieldUpdate, UpdateData, UpdateOp};
pub use error::{ErrorCode, ErrorContext, ErrorKind, QueryError, QueryResult};
pub use field::{JsonField, NullableField, ScalarField};
pub use filter::{Filter, FilterValue, MatchKind, QueryMode, RelationFilter, RelationKind};
pub use operations::{
    having, AggregateField, AggregateOperation, AggregateResult, CountOperation,
    CreateManyOperation, CreateOperation, DeleteManyOperation, DeleteOperation,
    FindFirstOperation, FindManyOperation, FindUniqueOperation, GroupByOperation, GroupByRow,
    HavingCondition, HavingOp, UpdateManyOperation, UpdateOperation, UpsertOperation,
};
pub use pagination::{Cursor, CursorDirection, Pagination};
pub use raw::{RawExecuteOperation, RawQueryOperation, RawRowsOperation, SeparatedSql, Sql};
pub use row::{FromColumn, Row, RowError};
pub use traits::{BoxFuture, Model, QueryEngine, TransactionEngine, TransactionalEngine};
pub use transaction::{AccessMode, IsolationLevel, SavepointCounter, TransactionConfig};
pub use types::{NullsOrder, OrderBy, OrderByField, Select, SortOrder};

/// Everything a model module or application usually needs.
pub mod prelude {
    pub use crate::data::{CreateData, FieldUpdate, UpdateData};
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::field::{JsonField, NullableField, ScalarField};
    pub use crate::filter::{Filter, FilterValue};
    pub use crate::operations::having;
    pub use crate::pagination::Cursor;
    pub use crate::raw::Sql;
    pub use crate::traits::{Model, QueryEngine, TransactionEngine, TransactionalEngine};
    pub use crate::transaction::{IsolationLevel, TransactionConfig};
    pub use crate::types::{NullsOrder, OrderBy, OrderByField, SortOrder};
    pub use crate::raw_query;
}
