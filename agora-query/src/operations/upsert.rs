//! Upsert operation for creating or updating records.

use std::marker::PhantomData;

use tracing::debug;

use crate::data::{write_set_list, Assignment, CreateData, UpdateData};
use crate::error::QueryResult;
use crate::filter::FilterValue;
use crate::sql::{column_list, placeholder_list, quote_identifier};
use crate::traits::{Model, QueryEngine};

/// An insert that falls back to updating the row it collides with.
///
/// The conflict target is the unique key the record was selected by;
/// without one the primary key is used.
///
/// ```rust,ignore
/// let tag = client
///     .tag()
///     .upsert(
///         tag::UniqueWhere::Slug("energy".into()),
///         tag::CreateInput::new("energy", "Energy"),
///         tag::UpdateInput::default().label("Energy"),
///     )
///     .exec()
///     .await?;
/// ```
pub struct UpsertOperation<E: QueryEngine, M: Model> {
    engine: E,
    conflict_columns: Vec<String>,
    create_columns: Vec<String>,
    create_values: Vec<FilterValue>,
    assignments: Vec<Assignment>,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Model> UpsertOperation<E, M> {
    /// Create a new Upsert operation.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            conflict_columns: Vec::new(),
            create_columns: Vec::new(),
            create_values: Vec::new(),
            assignments: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Set the columns to check for conflict.
    pub fn on_conflict(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.conflict_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    fn put_create(&mut self, column: String, value: FilterValue) {
        match self.create_columns.iter().position(|c| *c == column) {
            Some(i) => self.create_values[i] = value,
            None => {
                self.create_columns.push(column);
                self.create_values.push(value);
            }
        }
    }

    /// Set a single create column, replacing an earlier value for it.
    pub fn create_set(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.put_create(column.into(), value.into());
        self
    }

    /// Use a typed create input for the insert branch.
    pub fn create<D: CreateData<Model = M>>(mut self, data: D) -> Self {
        for (column, value) in data.into_values() {
            self.put_create(column.to_string(), value);
        }
        self
    }

    /// Set a single update column.
    pub fn update_set(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.assignments.push(Assignment::set(column, value));
        self
    }

    /// Use a typed update input for the conflict branch.
    pub fn update<D: UpdateData<Model = M>>(mut self, data: D) -> Self {
        self.assignments.extend(data.into_assignments());
        self
    }

    fn conflict_target(&self) -> Vec<String> {
        if self.conflict_columns.is_empty() {
            M::PRIMARY_KEY.iter().map(|c| c.to_string()).collect()
        } else {
            self.conflict_columns.clone()
        }
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        let mut params = self.create_values.clone();
        let target = self.conflict_target();

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET ",
            M::TABLE_NAME,
            column_list(&self.create_columns),
            placeholder_list(1, self.create_values.len()),
            column_list(&target)
        );

        if self.assignments.is_empty() {
            // A no-op update still makes RETURNING yield the existing row.
            if let Some(first) = target.first() {
                let column = quote_identifier(first);
                sql.push_str(&format!("{} = EXCLUDED.{}", column, column));
            }
        } else {
            write_set_list::<M>(&self.assignments, &mut sql, &mut params, Some(M::TABLE_NAME));
        }

        sql.push_str(" RETURNING ");
        sql.push_str(&column_list(M::COLUMNS));

        (sql, params)
    }

    /// Execute and return the inserted or updated record.
    pub async fn exec(self) -> QueryResult<M> {
        let (sql, params) = self.build_sql();
        debug!(model = M::MODEL_NAME, "upsert");
        self.engine.query_one::<M>(&sql, params).await
    }
}
