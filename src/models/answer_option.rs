//! `AnswerOption`: one choice of a question item.

use agora_query::{
    Assignment, CreateData, FieldUpdate, Filter, FilterValue, Model, NullableField, QueryResult,
    RelationKind, Row, RowError, ScalarField, UpdateData,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{content_item, contribution};
use crate::model::{self, to_many_filters, to_one_filters, ClientModel, UniqueSelector};

/// Table name.
pub const TABLE: &str = "answer_options";

/// An answer option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    /// Primary key.
    pub id: Uuid,
    /// The question it belongs to.
    pub item_id: Uuid,
    /// Label shown to participants.
    pub label: String,
    /// Longer explanation.
    pub description: Option<String>,
    /// Sort position.
    pub position: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl AnswerOption {
    fn read(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            item_id: row.get("item_id")?,
            label: row.get("label")?,
            description: row.get("description")?,
            position: row.get("position")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl Model for AnswerOption {
    const MODEL_NAME: &'static str = "AnswerOption";
    const TABLE_NAME: &'static str = TABLE;
    const PRIMARY_KEY: &'static [&'static str] = &["id"];
    const COLUMNS: &'static [&'static str] =
        &["id", "item_id", "label", "description", "position", "created_at"];

    fn from_row(row: &Row) -> QueryResult<Self> {
        Self::read(row).map_err(model::row_error::<Self>)
    }
}

impl ClientModel for AnswerOption {
    type Unique = UniqueWhere;
    type Create = CreateInput;
    type Update = UpdateInput;
}

/// `id`
pub const fn id() -> ScalarField<Uuid> {
    ScalarField::new("id")
}

/// `item_id`
pub const fn item_id() -> ScalarField<Uuid> {
    ScalarField::new("item_id")
}

/// `label`
pub const fn label() -> ScalarField<String> {
    ScalarField::new("label")
}

/// `description`
pub const fn description() -> NullableField<String> {
    NullableField::new("description")
}

/// `position`
pub const fn position() -> ScalarField<i32> {
    ScalarField::new("position")
}

/// `created_at`
pub const fn created_at() -> ScalarField<DateTime<Utc>> {
    ScalarField::new("created_at")
}

const ITEM: &[(&str, &str)] = &[("id", "item_id")];
const CONTRIBUTIONS: &[(&str, &str)] = &[("answer_option_id", "id")];

fn to_item(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, content_item::TABLE, ITEM, filter)
}

fn contributions(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, contribution::TABLE, CONTRIBUTIONS, filter)
}

to_one_filters!(to_item, "content item": item_is, item_is_not);
to_many_filters!(contributions, "contributions choosing it": contributions_some, contributions_none, contributions_every);

/// Selects one answer option.
#[derive(Debug, Clone, PartialEq)]
pub enum UniqueWhere {
    /// By primary key.
    Id(Uuid),
}

impl From<Uuid> for UniqueWhere {
    fn from(id: Uuid) -> Self {
        Self::Id(id)
    }
}

impl UniqueSelector for UniqueWhere {
    fn conflict_columns(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn values(&self) -> Vec<(&'static str, FilterValue)> {
        match self {
            Self::Id(id) => vec![("id", (*id).into())],
        }
    }
}

impl From<UniqueWhere> for Filter {
    fn from(unique: UniqueWhere) -> Self {
        unique.to_filter()
    }
}

/// Data for a new answer option.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    id: Option<Uuid>,
    item_id: Uuid,
    label: String,
    description: Option<String>,
    position: i32,
}

impl CreateInput {
    /// An option of `item_id` at `position`.
    pub fn new(item_id: Uuid, label: impl Into<String>, position: i32) -> Self {
        Self {
            id: None,
            item_id,
            label: label.into(),
            description: None,
            position,
        }
    }

    /// Use a known id instead of a generated one.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Set `description`.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl CreateData for CreateInput {
    type Model = AnswerOption;

    fn into_values(self) -> Vec<(&'static str, FilterValue)> {
        vec![
            ("id", self.id.unwrap_or_else(Uuid::new_v4).into()),
            ("item_id", self.item_id.into()),
            ("label", self.label.into()),
            ("description", self.description.into()),
            ("position", self.position.into()),
            ("created_at", Utc::now().into()),
        ]
    }
}

/// Changes to an answer option.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateInput {
    label: Option<String>,
    description: Option<Option<String>>,
    position: Option<FieldUpdate<i32>>,
}

impl UpdateInput {
    /// Set `label`.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set `description`.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    /// Set `description` to null.
    pub fn clear_description(mut self) -> Self {
        self.description = Some(None);
        self
    }

    /// Set or atomically change `position`.
    pub fn position(mut self, position: impl Into<FieldUpdate<i32>>) -> Self {
        self.position = Some(position.into());
        self
    }
}

impl UpdateData for UpdateInput {
    type Model = AnswerOption;

    fn into_assignments(self) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(v) = self.label {
            out.push(Assignment::set("label", v));
        }
        if let Some(v) = self.description {
            out.push(Assignment::set("description", v));
        }
        if let Some(v) = self.position {
            out.push(v.into_assignment("position"));
        }
        out
    }
}

/// Operations on answer options.
pub type Actions<E> = model::Actions<E, AnswerOption>;
