//! `Region`: a node of the region tree (country, canton, municipality).

use agora_query::{
    Assignment, CreateData, Filter, FilterValue, FindManyOperation, Model, NullableField,
    QueryEngine, QueryResult, RawQueryOperation, RelationKind, Row, RowError, ScalarField, Sql,
    UpdateData,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{content_item, quick_signup, user_profile};
use crate::model::{self, to_many_filters, to_one_filters, ClientModel, UniqueSelector};

/// Table name.
pub const TABLE: &str = "regions";

/// A region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Primary key.
    pub id: Uuid,
    /// Official code, unique.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Enclosing region.
    pub parent_id: Option<Uuid>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Region {
    fn read(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            code: row.get("code")?,
            name: row.get("name")?,
            parent_id: row.get("parent_id")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl Model for Region {
    const MODEL_NAME: &'static str = "Region";
    const TABLE_NAME: &'static str = TABLE;
    const PRIMARY_KEY: &'static [&'static str] = &["id"];
    const COLUMNS: &'static [&'static str] = &["id", "code", "name", "parent_id", "created_at"];

    fn from_row(row: &Row) -> QueryResult<Self> {
        Self::read(row).map_err(model::row_error::<Self>)
    }
}

impl ClientModel for Region {
    type Unique = UniqueWhere;
    type Create = CreateInput;
    type Update = UpdateInput;
}

/// `id`
pub const fn id() -> ScalarField<Uuid> {
    ScalarField::new("id")
}

/// `code`
pub const fn code() -> ScalarField<String> {
    ScalarField::new("code")
}

/// `name`
pub const fn name() -> ScalarField<String> {
    ScalarField::new("name")
}

/// `parent_id`
pub const fn parent_id() -> NullableField<Uuid> {
    NullableField::new("parent_id")
}

/// `created_at`
pub const fn created_at() -> ScalarField<DateTime<Utc>> {
    ScalarField::new("created_at")
}

const PARENT: &[(&str, &str)] = &[("id", "parent_id")];
const CHILDREN: &[(&str, &str)] = &[("parent_id", "id")];
const REGION_ID: &[(&str, &str)] = &[("region_id", "id")];

fn to_parent(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, TABLE, PARENT, filter)
}

fn children(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, TABLE, CHILDREN, filter)
}

fn items(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, content_item::TABLE, REGION_ID, filter)
}

fn profiles(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, user_profile::TABLE, REGION_ID, filter)
}

fn signups(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, quick_signup::TABLE, REGION_ID, filter)
}

to_one_filters!(to_parent, "parent region": parent_is, parent_is_not);
to_many_filters!(children, "child regions": children_some, children_none, children_every);
to_many_filters!(items, "content items": items_some, items_none, items_every);
to_many_filters!(profiles, "user profiles": profiles_some, profiles_none, profiles_every);
to_many_filters!(signups, "quick signups": signups_some, signups_none, signups_every);

/// Selects one region.
#[derive(Debug, Clone, PartialEq)]
pub enum UniqueWhere {
    /// By primary key.
    Id(Uuid),
    /// By official code.
    Code(String),
}

impl From<Uuid> for UniqueWhere {
    fn from(id: Uuid) -> Self {
        Self::Id(id)
    }
}

impl UniqueSelector for UniqueWhere {
    fn conflict_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Id(_) => &["id"],
            Self::Code(_) => &["code"],
        }
    }

    fn values(&self) -> Vec<(&'static str, FilterValue)> {
        match self {
            Self::Id(id) => vec![("id", (*id).into())],
            Self::Code(code) => vec![("code", code.into())],
        }
    }
}

impl From<UniqueWhere> for Filter {
    fn from(unique: UniqueWhere) -> Self {
        unique.to_filter()
    }
}

/// Data for a new region.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    id: Option<Uuid>,
    code: String,
    name: String,
    parent_id: Option<Uuid>,
}

impl CreateInput {
    /// A top-level region.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            code: code.into(),
            name: name.into(),
            parent_id: None,
        }
    }

    /// Use a known id instead of a generated one.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Nest under `parent_id`.
    pub fn parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

impl CreateData for CreateInput {
    type Model = Region;

    fn into_values(self) -> Vec<(&'static str, FilterValue)> {
        vec![
            ("id", self.id.unwrap_or_else(Uuid::new_v4).into()),
            ("code", self.code.into()),
            ("name", self.name.into()),
            ("parent_id", self.parent_id.into()),
            ("created_at", Utc::now().into()),
        ]
    }
}

/// Changes to a region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateInput {
    code: Option<String>,
    name: Option<String>,
    parent_id: Option<Option<Uuid>>,
}

impl UpdateInput {
    /// Set `code`.
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set `name`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Move under another parent.
    pub fn parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(Some(parent_id));
        self
    }

    /// Make it a top-level region.
    pub fn clear_parent(mut self) -> Self {
        self.parent_id = Some(None);
        self
    }
}

impl UpdateData for UpdateInput {
    type Model = Region;

    fn into_assignments(self) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(v) = self.code {
            out.push(Assignment::set("code", v));
        }
        if let Some(v) = self.name {
            out.push(Assignment::set("name", v));
        }
        if let Some(v) = self.parent_id {
            out.push(Assignment::set("parent_id", v));
        }
        out
    }
}

/// Operations on regions.
pub type Actions<E> = model::Actions<E, Region>;

impl<E: QueryEngine> model::Actions<E, Region> {
    /// Direct children of a region, by name.
    pub fn children_of(&self, region_id: Uuid) -> FindManyOperation<E, Region> {
        self.find_many()
            .r#where(parent_id().equals(region_id))
            .order_by(name().asc())
    }

    /// Regions without a parent.
    pub fn roots(&self) -> FindManyOperation<E, Region> {
        self.find_many()
            .r#where(parent_id().is_null())
            .order_by(name().asc())
    }

    /// Content items restricted relative to a region.
    pub fn items_of(&self, region_id: Uuid) -> FindManyOperation<E, content_item::ContentItem> {
        FindManyOperation::new(self.engine().clone())
            .r#where(content_item::region_id().equals(region_id))
            .order_by(content_item::position().asc())
    }

    /// Profiles living in a region.
    pub fn profiles_of(&self, region_id: Uuid) -> FindManyOperation<E, user_profile::UserProfile> {
        FindManyOperation::new(self.engine().clone())
            .r#where(user_profile::region_id().equals(region_id))
            .order_by(user_profile::email().asc())
    }

    /// The region and every region above it, innermost first.
    ///
    /// A parent loop stops at the first region seen twice.
    pub fn ancestors_of(&self, region_id: Uuid) -> RawQueryOperation<E, Region> {
        let sql = Sql::new(
            "WITH RECURSIVE chain AS (\
             SELECT id, code, name, parent_id, created_at, 0 AS depth, ARRAY[id] AS path \
             FROM regions WHERE id = ",
        )
        .bind(region_id)
        .push(
            " UNION ALL \
             SELECT r.id, r.code, r.name, r.parent_id, r.created_at, c.depth + 1, c.path || r.id \
             FROM regions r JOIN chain c ON r.id = c.parent_id \
             WHERE NOT r.id = ANY(c.path)) \
             SELECT id, code, name, parent_id, created_at FROM chain ORDER BY depth",
        );
        RawQueryOperation::new(self.engine().clone(), sql)
    }
}
