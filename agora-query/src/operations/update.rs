//! Update operations for modifying existing records.

use std::marker::PhantomData;

use tracing::debug;

use crate::data::{write_set_list, Assignment, UpdateData};
use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::sql::column_list;
use crate::traits::{Model, QueryEngine};

fn build_update<M: Model>(
    assignments: &[Assignment],
    filter: &Filter,
    returning: bool,
) -> (String, Vec<FilterValue>) {
    let mut sql = format!("UPDATE {} SET ", M::TABLE_NAME);
    let mut params = Vec::new();
    write_set_list::<M>(assignments, &mut sql, &mut params, None);

    if !filter.is_none() {
        let (where_sql, where_params) = filter.to_sql(params.len());
        sql.push_str(" WHERE ");
        sql.push_str(&where_sql);
        params.extend(where_params);
    }

    if returning {
        sql.push_str(" RETURNING ");
        sql.push_str(&column_list(M::COLUMNS));
    }

    (sql, params)
}

fn ensure_assignments<M: Model>(assignments: &[Assignment], operation: &str) -> QueryResult<()> {
    if assignments.is_empty() {
        return Err(QueryError::invalid_input("data", "update sets no fields")
            .with_model(M::MODEL_NAME)
            .with_context(format!("{}.{}", M::MODEL_NAME, operation)));
    }
    Ok(())
}

/// Updates one record selected by a unique key and returns it.
///
/// ```rust,ignore
/// let topic = client
///     .topic()
///     .update(
///         topic::UniqueWhere::Slug("climate".into()),
///         topic::UpdateInput::default().position(FieldUpdate::Increment(1)),
///     )
///     .exec()
///     .await?;
/// ```
pub struct UpdateOperation<E: QueryEngine, M: Model> {
    engine: E,
    filter: Filter,
    assignments: Vec<Assignment>,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Model> UpdateOperation<E, M> {
    /// Create a new Update operation for the record matching `filter`.
    pub fn new(engine: E, filter: impl Into<Filter>) -> Self {
        Self {
            engine,
            filter: filter.into(),
            assignments: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Set a column to a value.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.assignments.push(Assignment::set(column, value));
        self
    }

    /// Add an assignment.
    pub fn apply(mut self, assignment: Assignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    /// Use a typed update input.
    pub fn data<D: UpdateData<Model = M>>(mut self, data: D) -> Self {
        self.assignments.extend(data.into_assignments());
        self
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        build_update::<M>(&self.assignments, &self.filter, true)
    }

    /// Execute and return the updated record.
    pub async fn exec(self) -> QueryResult<M> {
        ensure_assignments::<M>(&self.assignments, "update")?;
        let (sql, params) = self.build_sql();
        debug!(model = M::MODEL_NAME, fields = self.assignments.len(), "update");
        self.engine
            .query_optional::<M>(&sql, params)
            .await?
            .ok_or_else(|| {
                QueryError::not_found(M::MODEL_NAME)
                    .with_context(format!("{}.update", M::MODEL_NAME))
                    .with_sql(sql)
            })
    }
}

/// Updates every record matching a filter.
pub struct UpdateManyOperation<E: QueryEngine, M: Model> {
    engine: E,
    filter: Filter,
    assignments: Vec<Assignment>,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Model> UpdateManyOperation<E, M> {
    /// Create a new UpdateMany operation.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            filter: Filter::None,
            assignments: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Add a filter condition.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = self.filter.and_then(filter.into());
        self
    }

    /// Set a column to a value.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.assignments.push(Assignment::set(column, value));
        self
    }

    /// Add an assignment.
    pub fn apply(mut self, assignment: Assignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    /// Use a typed update input.
    pub fn data<D: UpdateData<Model = M>>(mut self, data: D) -> Self {
        self.assignments.extend(data.into_assignments());
        self
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        build_update::<M>(&self.assignments, &self.filter, false)
    }

    /// Execute and return the number of updated records.
    pub async fn exec(self) -> QueryResult<u64> {
        ensure_assignments::<M>(&self.assignments, "update_many")?;
        let (sql, params) = self.build_sql();
        debug!(model = M::MODEL_NAME, fields = self.assignments.len(), "update_many");
        self.engine.execute(&sql, params).await
    }
}
