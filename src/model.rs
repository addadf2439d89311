//! The per-model operation surface shared by every model module.
//!
//! Each model module re-exports [`Actions`] specialised to its record type
//! and adds relation loaders on top.

use std::fmt;
use std::marker::PhantomData;

use agora_query::{
    AggregateOperation, CountOperation, CreateData, CreateManyOperation, CreateOperation,
    DeleteManyOperation, DeleteOperation, Filter, FilterValue, FindFirstOperation,
    FindManyOperation, FindUniqueOperation, GroupByOperation, Model, QueryEngine, QueryError,
    RelationFilter, RelationKind, RowError, UpdateData, UpdateManyOperation, UpdateOperation,
    UpsertOperation,
};

/// Selects at most one row through a primary or unique key.
pub trait UniqueSelector: Send {
    /// Columns of the key, used as the upsert conflict target.
    fn conflict_columns(&self) -> &'static [&'static str];

    /// The key's column/value pairs.
    fn values(&self) -> Vec<(&'static str, FilterValue)>;

    /// Equality filter over every key column.
    fn to_filter(&self) -> Filter {
        Filter::and(
            self.values()
                .into_iter()
                .map(|(column, value)| Filter::Equals(column.into(), value)),
        )
    }
}

/// A model with typed unique selectors and write inputs.
pub trait ClientModel: Model {
    /// Unique selector.
    type Unique: UniqueSelector;
    /// Insert payload.
    type Create: CreateData<Model = Self>;
    /// Update payload.
    type Update: UpdateData<Model = Self>;
}

/// Every operation of one model, bound to an engine.
pub struct Actions<E: QueryEngine, M: ClientModel> {
    engine: E,
    _model: PhantomData<fn() -> M>,
}

impl<E: QueryEngine, M: ClientModel> Clone for Actions<E, M> {
    fn clone(&self) -> Self {
        Self::new(self.engine.clone())
    }
}

impl<E: QueryEngine, M: ClientModel> fmt::Debug for Actions<E, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actions").field("model", &M::MODEL_NAME).finish()
    }
}

impl<E: QueryEngine, M: ClientModel> Actions<E, M> {
    /// Bind the model to `engine`.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            _model: PhantomData,
        }
    }

    /// The engine statements run on.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Find one record by a unique key.
    pub fn find_unique(&self, unique: impl Into<M::Unique>) -> FindUniqueOperation<E, M> {
        FindUniqueOperation::new(self.engine.clone(), unique.into().to_filter())
    }

    /// Find the first record matching a filter.
    pub fn find_first(&self) -> FindFirstOperation<E, M> {
        FindFirstOperation::new(self.engine.clone())
    }

    /// Find every record matching a filter.
    pub fn find_many(&self) -> FindManyOperation<E, M> {
        FindManyOperation::new(self.engine.clone())
    }

    /// Insert one record.
    pub fn create(&self, data: M::Create) -> CreateOperation<E, M> {
        CreateOperation::new(self.engine.clone()).data(data)
    }

    /// Insert many records with one statement.
    pub fn create_many(&self, data: impl IntoIterator<Item = M::Create>) -> CreateManyOperation<E, M> {
        CreateManyOperation::new(self.engine.clone()).data(data)
    }

    /// Update one record by a unique key.
    pub fn update(&self, unique: impl Into<M::Unique>, data: M::Update) -> UpdateOperation<E, M> {
        UpdateOperation::new(self.engine.clone(), unique.into().to_filter()).data(data)
    }

    /// Update every record matching `filter`.
    pub fn update_many(&self, filter: impl Into<Filter>, data: M::Update) -> UpdateManyOperation<E, M> {
        UpdateManyOperation::new(self.engine.clone())
            .r#where(filter)
            .data(data)
    }

    /// Insert a record, or update the one holding the same unique key.
    ///
    /// The key's values are written into the insert, so the conflict always
    /// happens on the selected key.
    pub fn upsert(
        &self,
        unique: impl Into<M::Unique>,
        create: M::Create,
        update: M::Update,
    ) -> UpsertOperation<E, M> {
        let unique = unique.into();
        let mut op = UpsertOperation::new(self.engine.clone())
            .on_conflict(unique.conflict_columns().iter().copied())
            .create(create);
        for (column, value) in unique.values() {
            op = op.create_set(column, value);
        }
        op.update(update)
    }

    /// Delete one record by a unique key.
    pub fn delete(&self, unique: impl Into<M::Unique>) -> DeleteOperation<E, M> {
        DeleteOperation::new(self.engine.clone(), unique.into().to_filter())
    }

    /// Delete every record matching a filter; all records without one.
    pub fn delete_many(&self) -> DeleteManyOperation<E, M> {
        DeleteManyOperation::new(self.engine.clone())
    }

    /// Count, sum, average, min and max over matching records.
    pub fn aggregate(&self) -> AggregateOperation<E, M> {
        AggregateOperation::new(self.engine.clone())
    }

    /// Aggregates per distinct combination of `columns`.
    pub fn group_by(&self, columns: impl IntoIterator<Item = &'static str>) -> GroupByOperation<E, M> {
        GroupByOperation::new(self.engine.clone(), columns)
    }

    /// Count matching records.
    pub fn count(&self) -> CountOperation<E, M> {
        CountOperation::new(self.engine.clone())
    }
}

/// Attach the model name to a column decoding error.
pub(crate) fn row_error<M: Model>(err: RowError) -> QueryError {
    QueryError::from(err).with_model(M::MODEL_NAME)
}

/// Filter on rows of `table` joined directly to `parent`.
pub(crate) fn related(
    kind: RelationKind,
    parent: &'static str,
    table: &'static str,
    join: &'static [(&'static str, &'static str)],
    filter: Filter,
) -> Filter {
    RelationFilter::new(kind, parent, table, join, filter).into()
}

/// Filter on rows of `target` reached through the join table `link`.
///
/// The quantifier applies to the link rows; each link row must point at a
/// matching target.
pub(crate) fn through(
    kind: RelationKind,
    parent: &'static str,
    link: (&'static str, &'static [(&'static str, &'static str)]),
    target: (&'static str, &'static [(&'static str, &'static str)]),
    filter: Filter,
) -> Filter {
    let inner = related(RelationKind::Is, link.0, target.0, target.1, filter);
    related(kind, parent, link.0, link.1, inner)
}

/// `<name>_some`, `<name>_none` and `<name>_every` over a to-many relation
/// built by `$build(kind, filter)`.
macro_rules! to_many_filters {
    ($build:ident, $what:literal: $some:ident, $none:ident, $every:ident) => {
        #[doc = concat!("At least one of the ", $what, " matches.")]
        pub fn $some(filter: impl Into<::agora_query::Filter>) -> ::agora_query::Filter {
            $build(::agora_query::RelationKind::Some, filter.into())
        }

        #[doc = concat!("None of the ", $what, " match.")]
        pub fn $none(filter: impl Into<::agora_query::Filter>) -> ::agora_query::Filter {
            $build(::agora_query::RelationKind::None, filter.into())
        }

        #[doc = concat!("Every one of the ", $what, " matches.")]
        pub fn $every(filter: impl Into<::agora_query::Filter>) -> ::agora_query::Filter {
            $build(::agora_query::RelationKind::Every, filter.into())
        }
    };
}

/// `<name>_is` and `<name>_is_not` over a to-one relation.
macro_rules! to_one_filters {
    ($build:ident, $what:literal: $is:ident, $is_not:ident) => {
        #[doc = concat!("The ", $what, " exists and matches.")]
        pub fn $is(filter: impl Into<::agora_query::Filter>) -> ::agora_query::Filter {
            $build(::agora_query::RelationKind::Is, filter.into())
        }

        #[doc = concat!("The ", $what, " is missing or does not match.")]
        pub fn $is_not(filter: impl Into<::agora_query::Filter>) -> ::agora_query::Filter {
            $build(::agora_query::RelationKind::IsNot, filter.into())
        }
    };
}

pub(crate) use {to_many_filters, to_one_filters};
