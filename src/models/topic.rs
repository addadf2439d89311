//! `Topic`: a themed collection of content items.

use agora_query::{
    Assignment, CreateData, FieldUpdate, Filter, FilterValue, FindManyOperation, JsonField, Model,
    NullableField, QueryEngine, QueryResult, RelationKind, Row, RowError, ScalarField, UpdateData,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{content_item, quick_signup, tag, topic_tag};
use crate::enums::{Locale, PublishStatus};
use crate::model::{self, to_many_filters, ClientModel, UniqueSelector};

/// Table name.
pub const TABLE: &str = "topics";

/// A topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Primary key.
    pub id: Uuid,
    /// URL slug, unique.
    pub slug: String,
    /// Title.
    pub title: String,
    /// Short description.
    pub summary: Option<String>,
    /// Language.
    pub locale: Locale,
    /// Publication state.
    pub status: PublishStatus,
    /// Sort position.
    pub position: i32,
    /// Free-form metadata.
    pub metadata: Option<serde_json::Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Topic {
    fn read(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            slug: row.get("slug")?,
            title: row.get("title")?,
            summary: row.get("summary")?,
            locale: row.get("locale")?,
            status: row.get("status")?,
            position: row.get("position")?,
            metadata: row.get("metadata")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl Model for Topic {
    const MODEL_NAME: &'static str = "Topic";
    const TABLE_NAME: &'static str = TABLE;
    const PRIMARY_KEY: &'static [&'static str] = &["id"];
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "slug",
        "title",
        "summary",
        "locale",
        "status",
        "position",
        "metadata",
        "created_at",
        "updated_at",
    ];
    const UPDATED_AT: Option<&'static str> = Some("updated_at");

    fn from_row(row: &Row) -> QueryResult<Self> {
        Self::read(row).map_err(model::row_error::<Self>)
    }
}

impl ClientModel for Topic {
    type Unique = UniqueWhere;
    type Create = CreateInput;
    type Update = UpdateInput;
}

/// `id`
pub const fn id() -> ScalarField<Uuid> {
    ScalarField::new("id")
}

/// `slug`
pub const fn slug() -> ScalarField<String> {
    ScalarField::new("slug")
}

/// `title`
pub const fn title() -> ScalarField<String> {
    ScalarField::new("title")
}

/// `summary`
pub const fn summary() -> NullableField<String> {
    NullableField::new("summary")
}

/// `locale`
pub const fn locale() -> ScalarField<Locale> {
    ScalarField::new("locale")
}

/// `status`
pub const fn status() -> ScalarField<PublishStatus> {
    ScalarField::new("status")
}

/// `position`
pub const fn position() -> ScalarField<i32> {
    ScalarField::new("position")
}

/// `metadata`
pub const fn metadata() -> JsonField {
    JsonField::new("metadata")
}

/// `created_at`
pub const fn created_at() -> ScalarField<DateTime<Utc>> {
    ScalarField::new("created_at")
}

/// `updated_at`
pub const fn updated_at() -> ScalarField<DateTime<Utc>> {
    ScalarField::new("updated_at")
}

const ITEMS: &[(&str, &str)] = &[("topic_id", "id")];
const SIGNUPS: &[(&str, &str)] = &[("topic_id", "id")];
const TAG_LINKS: &[(&str, &str)] = &[("topic_id", "id")];
const LINKED_TAG: &[(&str, &str)] = &[("id", "tag_id")];

fn items(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, content_item::TABLE, ITEMS, filter)
}

fn signups(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, quick_signup::TABLE, SIGNUPS, filter)
}

fn tags(kind: RelationKind, filter: Filter) -> Filter {
    model::through(
        kind,
        TABLE,
        (topic_tag::TABLE, TAG_LINKS),
        (tag::TABLE, LINKED_TAG),
        filter,
    )
}

to_many_filters!(items, "content items": items_some, items_none, items_every);
to_many_filters!(tags, "tags": tags_some, tags_none, tags_every);
to_many_filters!(signups, "quick signups": signups_some, signups_none, signups_every);

/// Selects one topic.
#[derive(Debug, Clone, PartialEq)]
pub enum UniqueWhere {
    /// By primary key.
    Id(Uuid),
    /// By slug.
    Slug(String),
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
            Self::Slug(_) => &["slug"],
        }
    }

    fn values(&self) -> Vec<(&'static str, FilterValue)> {
        match self {
            Self::Id(id) => vec![("id", (*id).into())],
            Self::Slug(slug) => vec![("slug", slug.into())],
        }
    }
}

impl From<UniqueWhere> for Filter {
    fn from(unique: UniqueWhere) -> Self {
        unique.to_filter()
    }
}

/// Data for a new topic.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    id: Option<Uuid>,
    slug: String,
    title: String,
    summary: Option<String>,
    locale: Locale,
    status: PublishStatus,
    position: i32,
    metadata: Option<serde_json::Value>,
}

impl CreateInput {
    /// A draft topic in the default locale at position 0.
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: None,
            slug: slug.into(),
            title: title.into(),
            summary: None,
            locale: Locale::default(),
            status: PublishStatus::default(),
            position: 0,
            metadata: None,
        }
    }

    /// Use a known id instead of a generated one.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Set `summary`.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set `locale`.
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Set `status`.
    pub fn status(mut self, status: PublishStatus) -> Self {
        self.status = status;
        self
    }

    /// Set `position`.
    pub fn position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    /// Set `metadata`.
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl CreateData for CreateInput {
    type Model = Topic;

    fn into_values(self) -> Vec<(&'static str, FilterValue)> {
        let now = Utc::now();
        vec![
            ("id", self.id.unwrap_or_else(Uuid::new_v4).into()),
            ("slug", self.slug.into()),
            ("title", self.title.into()),
            ("summary", self.summary.into()),
            ("locale", self.locale.into()),
            ("status", self.status.into()),
            ("position", self.position.into()),
            ("metadata", self.metadata.into()),
            ("created_at", now.into()),
            ("updated_at", now.into()),
        ]
    }
}

/// Changes to a topic. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateInput {
    slug: Option<String>,
    title: Option<String>,
    summary: Option<Option<String>>,
    locale: Option<Locale>,
    status: Option<PublishStatus>,
    position: Option<FieldUpdate<i32>>,
    metadata: Option<Option<serde_json::Value>>,
}

impl UpdateInput {
    /// Set `slug`.
    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Set `title`.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set `summary`.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(Some(summary.into()));
        self
    }

    /// Set `summary` to null.
    pub fn clear_summary(mut self) -> Self {
        self.summary = Some(None);
        self
    }

    /// Set `locale`.
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    /// Set `status`.
    pub fn status(mut self, status: PublishStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set or atomically change `position`.
    pub fn position(mut self, position: impl Into<FieldUpdate<i32>>) -> Self {
        self.position = Some(position.into());
        self
    }

    /// Set `metadata`.
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(Some(metadata));
        self
    }

    /// Set `metadata` to null.
    pub fn clear_metadata(mut self) -> Self {
        self.metadata = Some(None);
        self
    }
}

impl UpdateData for UpdateInput {
    type Model = Topic;

    fn into_assignments(self) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(v) = self.slug {
            out.push(Assignment::set("slug", v));
        }
        if let Some(v) = self.title {
            out.push(Assignment::set("title", v));
        }
        if let Some(v) = self.summary {
            out.push(Assignment::set("summary", v));
        }
        if let Some(v) = self.locale {
            out.push(Assignment::set("locale", v));
        }
        if let Some(v) = self.status {
            out.push(Assignment::set("status", v));
        }
        if let Some(v) = self.position {
            out.push(v.into_assignment("position"));
        }
        if let Some(v) = self.metadata {
            out.push(Assignment::set("metadata", v));
        }
        out
    }
}

/// Operations on topics.
pub type Actions<E> = model::Actions<E, Topic>;

impl<E: QueryEngine> model::Actions<E, Topic> {
    /// Content items of a topic, by position.
    pub fn items_of(&self, topic_id: Uuid) -> FindManyOperation<E, content_item::ContentItem> {
        FindManyOperation::new(self.engine().clone())
            .r#where(content_item::topic_id().equals(topic_id))
            .order_by(content_item::position().asc())
    }

    /// Tags linked to a topic, by slug.
    pub fn tags_of(&self, topic_id: Uuid) -> FindManyOperation<E, tag::Tag> {
        FindManyOperation::new(self.engine().clone())
            .r#where(tag::topic_links_some(topic_tag::topic_id().equals(topic_id)))
            .order_by(tag::slug().asc())
    }

    /// Quick signups that came in through a topic.
    pub fn signups_of(&self, topic_id: Uuid) -> FindManyOperation<E, quick_signup::QuickSignup> {
        FindManyOperation::new(self.engine().clone())
            .r#where(quick_signup::topic_id().equals(topic_id))
            .order_by(quick_signup::created_at().desc())
    }
}
