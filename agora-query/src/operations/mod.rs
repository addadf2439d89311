//! Query operations for the fluent API.
//!
//! Each operation builds its SQL with `build_sql()` and runs it with
//! `exec()` on the engine it was created with:
//! - `FindUniqueOperation` - Find one record by unique constraint
//! - `FindFirstOperation` - Find the first matching record
//! - `FindManyOperation` - Find multiple records
//! - `CreateOperation` / `CreateManyOperation` - Insert records
//! - `UpdateOperation` / `UpdateManyOperation` - Update records
//! - `UpsertOperation` - Create or update a record
//! - `DeleteOperation` / `DeleteManyOperation` - Delete records
//! - `CountOperation` - Count matching records
//! - `AggregateOperation` / `GroupByOperation` - Statistics

pub mod aggregate;
mod count;
mod create;
mod delete;
mod find_first;
mod find_many;
mod find_unique;
mod update;
mod upsert;

pub use aggregate::{
    having, AggregateField, AggregateOperation, AggregateResult, GroupByOperation, GroupByRow,
    HavingCondition, HavingOp,
};
pub use count::CountOperation;
pub use create::{CreateManyOperation, CreateOperation};
pub use delete::{DeleteManyOperation, DeleteOperation};
pub use find_first::FindFirstOperation;
pub use find_many::FindManyOperation;
pub use find_unique::FindUniqueOperation;
pub use update::{UpdateManyOperation, UpdateOperation};
pub use upsert::UpsertOperation;
