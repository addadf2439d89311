//! `ItemTag`: links a content item to a tag.

use agora_query::{
    Assignment, CreateData, Filter, FilterValue, Model, QueryResult, RelationKind, Row, RowError,
    ScalarField, UpdateData,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{content_item, tag};
use crate::model::{self, to_one_filters, ClientModel, UniqueSelector};

/// Table name.
pub const TABLE: &str = "item_tags";

/// A content item/tag link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTag {
    /// Linked content item.
    pub item_id: Uuid,
    /// Linked tag.
    pub tag_id: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ItemTag {
    fn read(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            item_id: row.get("item_id")?,
            tag_id: row.get("tag_id")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl Model for ItemTag {
    const MODEL_NAME: &'static str = "ItemTag";
    const TABLE_NAME: &'static str = TABLE;
    const PRIMARY_KEY: &'static [&'static str] = &["item_id", "tag_id"];
    const COLUMNS: &'static [&'static str] = &["item_id", "tag_id", "created_at"];

    fn from_row(row: &Row) -> QueryResult<Self> {
        Self::read(row).map_err(model::row_error::<Self>)
    }
}

impl ClientModel for ItemTag {
    type Unique = UniqueWhere;
    type Create = CreateInput;
    type Update = UpdateInput;
}

/// `item_id`
pub const fn item_id() -> ScalarField<Uuid> {
    ScalarField::new("item_id")
}

/// `tag_id`
pub const fn tag_id() -> ScalarField<Uuid> {
    ScalarField::new("tag_id")
}

/// `created_at`
pub const fn created_at() -> ScalarField<DateTime<Utc>> {
    ScalarField::new("created_at")
}

const ITEM: &[(&str, &str)] = &[("id", "item_id")];
const TAG: &[(&str, &str)] = &[("id", "tag_id")];

fn to_item(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, content_item::TABLE, ITEM, filter)
}

fn to_tag(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, tag::TABLE, TAG, filter)
}

to_one_filters!(to_item, "content item": item_is, item_is_not);
to_one_filters!(to_tag, "tag": tag_is, tag_is_not);

/// Selects one link by its composite key.
#[derive(Debug, Clone, PartialEq)]
pub enum UniqueWhere {
    /// By `(item_id, tag_id)`.
    ItemIdTagId {
        /// Content item.
        item_id: Uuid,
        /// Tag.
        tag_id: Uuid,
    },
}

impl UniqueSelector for UniqueWhere {
    fn conflict_columns(&self) -> &'static [&'static str] {
        ItemTag::PRIMARY_KEY
    }

    fn values(&self) -> Vec<(&'static str, FilterValue)> {
        match self {
            Self::ItemIdTagId { item_id, tag_id } => {
                vec![("item_id", (*item_id).into()), ("tag_id", (*tag_id).into())]
            }
        }
    }
}

impl From<UniqueWhere> for Filter {
    fn from(unique: UniqueWhere) -> Self {
        unique.to_filter()
    }
}

/// Data for a new link.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    item_id: Uuid,
    tag_id: Uuid,
}

impl CreateInput {
    /// Link `item_id` to `tag_id`.
    pub fn new(item_id: Uuid, tag_id: Uuid) -> Self {
        Self { item_id, tag_id }
    }
}

impl CreateData for CreateInput {
    type Model = ItemTag;

    fn into_values(self) -> Vec<(&'static str, FilterValue)> {
        vec![
            ("item_id", self.item_id.into()),
            ("tag_id", self.tag_id.into()),
            ("created_at", Utc::now().into()),
        ]
    }
}

/// Moves a link to another content item or tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateInput {
    item_id: Option<Uuid>,
    tag_id: Option<Uuid>,
}

impl UpdateInput {
    /// Set `item_id`.
    pub fn item_id(mut self, item_id: Uuid) -> Self {
        self.item_id = Some(item_id);
        self
    }

    /// Set `tag_id`.
    pub fn tag_id(mut self, tag_id: Uuid) -> Self {
        self.tag_id = Some(tag_id);
        self
    }
}

impl UpdateData for UpdateInput {
    type Model = ItemTag;

    fn into_assignments(self) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(v) = self.item_id {
            out.push(Assignment::set("item_id", v));
        }
        if let Some(v) = self.tag_id {
            out.push(Assignment::set("tag_id", v));
        }
        out
    }
}

/// Operations on item/tag links.
pub type Actions<E> = model::Actions<E, ItemTag>;
