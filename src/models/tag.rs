//! `Tag`: a label shared by topics and content items.

use agora_query::{
    Assignment, CreateData, Filter, FilterValue, FindManyOperation, Model, QueryEngine,
    QueryResult, RelationKind, Row, RowError, ScalarField, UpdateData,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{content_item, item_tag, topic, topic_tag};
use crate::enums::Locale;
use crate::model::{self, to_many_filters, ClientModel, UniqueSelector};

/// Table name.
pub const TABLE: &str = "tags";

/// A tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Primary key.
    pub id: Uuid,
    /// URL slug, unique.
    pub slug: String,
    /// Display label.
    pub label: String,
    /// Language of the label.
    pub locale: Locale,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Tag {
    fn read(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            slug: row.get("slug")?,
            label: row.get("label")?,
            locale: row.get("locale")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl Model for Tag {
    const MODEL_NAME: &'static str = "Tag";
    const TABLE_NAME: &'static str = TABLE;
    const PRIMARY_KEY: &'static [&'static str] = &["id"];
    const COLUMNS: &'static [&'static str] = &["id", "slug", "label", "locale", "created_at"];

    fn from_row(row: &Row) -> QueryResult<Self> {
        Self::read(row).map_err(model::row_error::<Self>)
    }
}

impl ClientModel for Tag {
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

/// `label`
pub const fn label() -> ScalarField<String> {
    ScalarField::new("label")
}

/// `locale`
pub const fn locale() -> ScalarField<Locale> {
    ScalarField::new("locale")
}

/// `created_at`
pub const fn created_at() -> ScalarField<DateTime<Utc>> {
    ScalarField::new("created_at")
}

const TOPIC_LINKS: &[(&str, &str)] = &[("tag_id", "id")];
const ITEM_LINKS: &[(&str, &str)] = &[("tag_id", "id")];
const LINKED_TOPIC: &[(&str, &str)] = &[("id", "topic_id")];
const LINKED_ITEM: &[(&str, &str)] = &[("id", "item_id")];

fn topic_links(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, topic_tag::TABLE, TOPIC_LINKS, filter)
}

fn item_links(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, item_tag::TABLE, ITEM_LINKS, filter)
}

fn topics(kind: RelationKind, filter: Filter) -> Filter {
    model::through(
        kind,
        TABLE,
        (topic_tag::TABLE, TOPIC_LINKS),
        (topic::TABLE, LINKED_TOPIC),
        filter,
    )
}

fn items(kind: RelationKind, filter: Filter) -> Filter {
    model::through(
        kind,
        TABLE,
        (item_tag::TABLE, ITEM_LINKS),
        (content_item::TABLE, LINKED_ITEM),
        filter,
    )
}

to_many_filters!(topic_links, "topic links": topic_links_some, topic_links_none, topic_links_every);
to_many_filters!(item_links, "item links": item_links_some, item_links_none, item_links_every);
to_many_filters!(topics, "tagged topics": topics_some, topics_none, topics_every);
to_many_filters!(items, "tagged content items": items_some, items_none, items_every);

/// Selects one tag.
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

/// Data for a new tag.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    id: Option<Uuid>,
    slug: String,
    label: String,
    locale: Locale,
}

impl CreateInput {
    /// A tag in the default locale.
    pub fn new(slug: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: None,
            slug: slug.into(),
            label: label.into(),
            locale: Locale::default(),
        }
    }

    /// Use a known id instead of a generated one.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Set `locale`.
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }
}

impl CreateData for CreateInput {
    type Model = Tag;

    fn into_values(self) -> Vec<(&'static str, FilterValue)> {
        vec![
            ("id", self.id.unwrap_or_else(Uuid::new_v4).into()),
            ("slug", self.slug.into()),
            ("label", self.label.into()),
            ("locale", self.locale.into()),
            ("created_at", Utc::now().into()),
        ]
    }
}

/// Changes to a tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateInput {
    slug: Option<String>,
    label: Option<String>,
    locale: Option<Locale>,
}

impl UpdateInput {
    /// Set `slug`.
    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Set `label`.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set `locale`.
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }
}

impl UpdateData for UpdateInput {
    type Model = Tag;

    fn into_assignments(self) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(v) = self.slug {
            out.push(Assignment::set("slug", v));
        }
        if let Some(v) = self.label {
            out.push(Assignment::set("label", v));
        }
        if let Some(v) = self.locale {
            out.push(Assignment::set("locale", v));
        }
        out
    }
}

/// Operations on tags.
pub type Actions<E> = model::Actions<E, Tag>;

impl<E: QueryEngine> model::Actions<E, Tag> {
    /// Topics carrying a tag.
    pub fn topics_of(&self, tag_id: Uuid) -> FindManyOperation<E, topic::Topic> {
        FindManyOperation::new(self.engine().clone())
            .r#where(topic::tags_some(id().equals(tag_id)))
            .order_by(topic::position().asc())
    }

    /// Content items carrying a tag.
    pub fn items_of(&self, tag_id: Uuid) -> FindManyOperation<E, content_item::ContentItem> {
        FindManyOperation::new(self.engine().clone())
            .r#where(content_item::tag_links_some(item_tag::tag_id().equals(tag_id)))
            .order_by(content_item::position().asc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockEngine;
    use pretty_assertions::assert_eq;

    fn tag_row() -> Row {
        Row::new()
            .with("id", Uuid::new_v4())
            .with("slug", "energy")
            .with("label", "Energie")
            .with("locale", "DE")
            .with("created_at", Utc::now())
    }

    #[test]
    fn test_create_input_columns() {
        let columns: Vec<_> = CreateInput::new("energy", "Energie")
            .into_values()
            .into_iter()
            .map(|(c, _)| c)
            .collect();
        assert_eq!(columns, Tag::COLUMNS.to_vec());
    }

    #[tokio::test]
    async fn test_upsert_without_updates_returns_existing() {
        let engine = MockEngine::with_rows(vec![tag_row()]);
        let tag = Actions::new(engine.clone())
            .upsert(
                UniqueWhere::Slug("energy".into()),
                CreateInput::new("energy", "Energie"),
                UpdateInput::default(),
            )
            .exec()
            .await
            .unwrap();
        assert_eq!(tag.label, "Energie");
        assert!(engine
            .last_sql()
            .contains("ON CONFLICT (slug) DO UPDATE SET slug = EXCLUDED.slug RETURNING"));
    }

    #[tokio::test]
    async fn test_update_without_fields_is_rejected() {
        let engine = MockEngine::new();
        let err = Actions::new(engine.clone())
            .update(UniqueWhere::Slug("energy".into()), UpdateInput::default())
            .exec()
            .await
            .unwrap_err();
        assert!(err.is_validation_error());
        assert!(engine.statements.lock().is_empty());
    }

    #[tokio::test]
    async fn test_items_of() {
        let engine = MockEngine::new();
        let tag_id = Uuid::new_v4();
        Actions::new(engine.clone()).items_of(tag_id).exec().await.unwrap();
        assert!(engine.last_sql().contains(
            "FROM content_items WHERE EXISTS (SELECT 1 FROM item_tags AS r1 WHERE r1.item_id = content_items.id AND r1.tag_id = $1)"
        ));
    }

    #[test]
    fn test_topics_every() {
        let (sql, _) = topics_every(topic::status().equals(crate::enums::PublishStatus::Published)).to_sql(0);
        assert_eq!(
            sql,
            "NOT EXISTS (SELECT 1 FROM topic_tags AS r1 WHERE r1.tag_id = tags.id \
             AND NOT (EXISTS (SELECT 1 FROM topics AS r2 WHERE r2.id = r1.topic_id AND r2.status = $1)))"
        );
    }
}
