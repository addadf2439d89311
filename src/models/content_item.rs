//! `ContentItem`: a question, statement, article or video inside a topic.

use agora_query::{
    Assignment, CreateData, FieldUpdate, Filter, FilterValue, FindManyOperation, JsonField, Model,
    NullableField, QueryEngine, QueryResult, RelationKind, Row, RowError, ScalarField, UpdateData,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{answer_option, contribution, item_tag, region, tag, topic};
use crate::enums::{ContentKind, Locale, PublishStatus, RegionMode};
use crate::model::{self, to_many_filters, to_one_filters, ClientModel, UniqueSelector};

/// Table name.
pub const TABLE: &str = "content_items";

/// A content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Primary key.
    pub id: Uuid,
    /// Owning topic.
    pub topic_id: Uuid,
    /// What the item is.
    pub kind: ContentKind,
    /// Publication state.
    pub status: PublishStatus,
    /// Title or question text.
    pub title: String,
    /// Body text.
    pub body: Option<String>,
    /// Language.
    pub locale: Locale,
    /// How `region_id` restricts visibility.
    pub region_mode: RegionMode,
    /// Region the restriction refers to.
    pub region_id: Option<Uuid>,
    /// Sort position inside the topic.
    pub position: i32,
    /// Free-form metadata.
    pub metadata: Option<serde_json::Value>,
    /// When it went live.
    pub published_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    fn read(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            topic_id: row.get("topic_id")?,
            kind: row.get("kind")?,
            status: row.get("status")?,
            title: row.get("title")?,
            body: row.get("body")?,
            locale: row.get("locale")?,
            region_mode: row.get("region_mode")?,
            region_id: row.get("region_id")?,
            position: row.get("position")?,
            metadata: row.get("metadata")?,
            published_at: row.get("published_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Whether the item is shown to someone in `region`.
    ///
    /// `region` is the viewer's region, if known. An `INCLUDE` item is
    /// hidden from viewers without one; an `EXCLUDE` item is shown to them.
    pub fn visible_in(&self, region: Option<Uuid>) -> bool {
        match (self.region_mode, self.region_id) {
            (RegionMode::All, _) | (_, None) => true,
            (RegionMode::Include, Some(own)) => region == Some(own),
            (RegionMode::Exclude, Some(own)) => region != Some(own),
        }
    }
}

impl Model for ContentItem {
    const MODEL_NAME: &'static str = "ContentItem";
    const TABLE_NAME: &'static str = TABLE;
    const PRIMARY_KEY: &'static [&'static str] = &["id"];
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "topic_id",
        "kind",
        "status",
        "title",
        "body",
        "locale",
        "region_mode",
        "region_id",
        "position",
        "metadata",
        "published_at",
        "created_at",
        "updated_at",
    ];
    const UPDATED_AT: Option<&'static str> = Some("updated_at");

    fn from_row(row: &Row) -> QueryResult<Self> {
        Self::read(row).map_err(model::row_error::<Self>)
    }
}

impl ClientModel for ContentItem {
    type Unique = UniqueWhere;
    type Create = CreateInput;
    type Update = UpdateInput;
}

/// `id`
pub const fn id() -> ScalarField<Uuid> {
    ScalarField::new("id")
}

/// `topic_id`
pub const fn topic_id() -> ScalarField<Uuid> {
    ScalarField::new("topic_id")
}

/// `kind`
pub const fn kind() -> ScalarField<ContentKind> {
    ScalarField::new("kind")
}

/// `status`
pub const fn status() -> ScalarField<PublishStatus> {
    ScalarField::new("status")
}

/// `title`
pub const fn title() -> ScalarField<String> {
    ScalarField::new("title")
}

/// `body`
pub const fn body() -> NullableField<String> {
    NullableField::new("body")
}

/// `locale`
pub const fn locale() -> ScalarField<Locale> {
    ScalarField::new("locale")
}

/// `region_mode`
pub const fn region_mode() -> ScalarField<RegionMode> {
    ScalarField::new("region_mode")
}

/// `region_id`
pub const fn region_id() -> NullableField<Uuid> {
    NullableField::new("region_id")
}

/// `position`
pub const fn position() -> ScalarField<i32> {
    ScalarField::new("position")
}

/// `metadata`
pub const fn metadata() -> JsonField {
    JsonField::new("metadata")
}

/// `published_at`
pub const fn published_at() -> NullableField<DateTime<Utc>> {
    NullableField::new("published_at")
}

/// `created_at`
pub const fn created_at() -> ScalarField<DateTime<Utc>> {
    ScalarField::new("created_at")
}

/// `updated_at`
pub const fn updated_at() -> ScalarField<DateTime<Utc>> {
    ScalarField::new("updated_at")
}

const TOPIC: &[(&str, &str)] = &[("id", "topic_id")];
const REGION: &[(&str, &str)] = &[("id", "region_id")];
const OPTIONS: &[(&str, &str)] = &[("item_id", "id")];
const CONTRIBUTIONS: &[(&str, &str)] = &[("item_id", "id")];
const TAG_LINKS: &[(&str, &str)] = &[("item_id", "id")];
const LINKED_TAG: &[(&str, &str)] = &[("id", "tag_id")];

fn to_topic(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, topic::TABLE, TOPIC, filter)
}

fn to_region(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, region::TABLE, REGION, filter)
}

fn answer_options(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, answer_option::TABLE, OPTIONS, filter)
}

fn contributions(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, contribution::TABLE, CONTRIBUTIONS, filter)
}

fn tag_links(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, item_tag::TABLE, TAG_LINKS, filter)
}

fn tags(kind: RelationKind, filter: Filter) -> Filter {
    model::through(
        kind,
        TABLE,
        (item_tag::TABLE, TAG_LINKS),
        (tag::TABLE, LINKED_TAG),
        filter,
    )
}

to_one_filters!(to_topic, "topic": topic_is, topic_is_not);
to_one_filters!(to_region, "region": region_is, region_is_not);
to_many_filters!(answer_options, "answer options": answer_options_some, answer_options_none, answer_options_every);
to_many_filters!(contributions, "contributions": contributions_some, contributions_none, contributions_every);
to_many_filters!(tag_links, "tag links": tag_links_some, tag_links_none, tag_links_every);
to_many_filters!(tags, "tags": tags_some, tags_none, tags_every);

/// Items a viewer in `region` may see, the SQL form of
/// [`ContentItem::visible_in`].
pub fn visible_in(region: Option<Uuid>) -> Filter {
    let unrestricted = Filter::or([
        region_mode().equals(RegionMode::All),
        region_id().is_null(),
    ]);
    match region {
        Some(region) => Filter::or([
            unrestricted,
            Filter::and([region_mode().equals(RegionMode::Include), region_id().equals(region)]),
            Filter::and([region_mode().equals(RegionMode::Exclude), region_id().not(region)]),
        ]),
        None => Filter::or([unrestricted, region_mode().equals(RegionMode::Exclude)]),
    }
}

/// Selects one content item.
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

/// Data for a new content item.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    id: Option<Uuid>,
    topic_id: Uuid,
    kind: ContentKind,
    status: PublishStatus,
    title: String,
    body: Option<String>,
    locale: Locale,
    region_mode: RegionMode,
    region_id: Option<Uuid>,
    position: i32,
    metadata: Option<serde_json::Value>,
    published_at: Option<DateTime<Utc>>,
}

impl CreateInput {
    /// A draft, unrestricted item in the default locale at position 0.
    pub fn new(topic_id: Uuid, kind: ContentKind, title: impl Into<String>) -> Self {
        Self {
            id: None,
            topic_id,
            kind,
            status: PublishStatus::default(),
            title: title.into(),
            body: None,
            locale: Locale::default(),
            region_mode: RegionMode::default(),
            region_id: None,
            position: 0,
            metadata: None,
            published_at: None,
        }
    }

    /// Use a known id instead of a generated one.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Set `status`.
    pub fn status(mut self, status: PublishStatus) -> Self {
        self.status = status;
        self
    }

    /// Set `body`.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set `locale`.
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Restrict visibility relative to `region_id`.
    pub fn region(mut self, mode: RegionMode, region_id: Uuid) -> Self {
        self.region_mode = mode;
        self.region_id = Some(region_id);
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

    /// Set `published_at`.
    pub fn published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }
}

impl CreateData for CreateInput {
    type Model = ContentItem;

    fn into_values(self) -> Vec<(&'static str, FilterValue)> {
        let now = Utc::now();
        vec![
            ("id", self.id.unwrap_or_else(Uuid::new_v4).into()),
            ("topic_id", self.topic_id.into()),
            ("kind", self.kind.into()),
            ("status", self.status.into()),
            ("title", self.title.into()),
            ("body", self.body.into()),
            ("locale", self.locale.into()),
            ("region_mode", self.region_mode.into()),
            ("region_id", self.region_id.into()),
            ("position", self.position.into()),
            ("metadata", self.metadata.into()),
            ("published_at", self.published_at.into()),
            ("created_at", now.into()),
            ("updated_at", now.into()),
        ]
    }
}

/// Changes to a content item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateInput {
    topic_id: Option<Uuid>,
    kind: Option<ContentKind>,
    status: Option<PublishStatus>,
    title: Option<String>,
    body: Option<Option<String>>,
    locale: Option<Locale>,
    region_mode: Option<RegionMode>,
    region_id: Option<Option<Uuid>>,
    position: Option<FieldUpdate<i32>>,
    metadata: Option<Option<serde_json::Value>>,
    published_at: Option<Option<DateTime<Utc>>>,
}

impl UpdateInput {
    /// Move to another topic.
    pub fn topic_id(mut self, topic_id: Uuid) -> Self {
        self.topic_id = Some(topic_id);
        self
    }

    /// Set `kind`.
    pub fn kind(mut self, kind: ContentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set `status`.
    pub fn status(mut self, status: PublishStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set `status` to published and stamp `published_at`.
    pub fn publish(mut self, at: DateTime<Utc>) -> Self {
        self.status = Some(PublishStatus::Published);
        self.published_at = Some(Some(at));
        self
    }

    /// Set `title`.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set `body`.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Some(body.into()));
        self
    }

    /// Set `body` to null.
    pub fn clear_body(mut self) -> Self {
        self.body = Some(None);
        self
    }

    /// Set `locale`.
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    /// Restrict visibility relative to `region_id`.
    pub fn region(mut self, mode: RegionMode, region_id: Uuid) -> Self {
        self.region_mode = Some(mode);
        self.region_id = Some(Some(region_id));
        self
    }

    /// Drop any region restriction.
    pub fn clear_region(mut self) -> Self {
        self.region_mode = Some(RegionMode::All);
        self.region_id = Some(None);
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

    /// Set `published_at` to null.
    pub fn clear_published_at(mut self) -> Self {
        self.published_at = Some(None);
        self
    }
}

impl UpdateData for UpdateInput {
    type Model = ContentItem;

    fn into_assignments(self) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(v) = self.topic_id {
            out.push(Assignment::set("topic_id", v));
        }
        if let Some(v) = self.kind {
            out.push(Assignment::set("kind", v));
        }
        if let Some(v) = self.status {
            out.push(Assignment::set("status", v));
        }
        if let Some(v) = self.title {
            out.push(Assignment::set("title", v));
        }
        if let Some(v) = self.body {
            out.push(Assignment::set("body", v));
        }
        if let Some(v) = self.locale {
            out.push(Assignment::set("locale", v));
        }
        if let Some(v) = self.region_mode {
            out.push(Assignment::set("region_mode", v));
        }
        if let Some(v) = self.region_id {
            out.push(Assignment::set("region_id", v));
        }
        if let Some(v) = self.position {
            out.push(v.into_assignment("position"));
        }
        if let Some(v) = self.metadata {
            out.push(Assignment::set("metadata", v));
        }
        if let Some(v) = self.published_at {
            out.push(Assignment::set("published_at", v));
        }
        out
    }
}

/// Operations on content items.
pub type Actions<E> = model::Actions<E, ContentItem>;

impl<E: QueryEngine> model::Actions<E, ContentItem> {
    /// Answer options of an item, by position.
    pub fn answer_options_of(&self, item_id: Uuid) -> FindManyOperation<E, answer_option::AnswerOption> {
        FindManyOperation::new(self.engine().clone())
            .r#where(answer_option::item_id().equals(item_id))
            .order_by(answer_option::position().asc())
    }

    /// Tags on an item, by slug.
    pub fn tags_of(&self, item_id: Uuid) -> FindManyOperation<E, tag::Tag> {
        FindManyOperation::new(self.engine().clone())
            .r#where(tag::item_links_some(item_tag::item_id().equals(item_id)))
            .order_by(tag::slug().asc())
    }

    /// Contributions to an item, newest first.
    pub fn contributions_of(&self, item_id: Uuid) -> FindManyOperation<E, contribution::Contribution> {
        FindManyOperation::new(self.engine().clone())
            .r#where(contribution::item_id().equals(item_id))
            .order_by(contribution::created_at().desc())
    }

    /// Published items of a topic that a viewer in `region` may see.
    pub fn published_in(&self, topic_id: Uuid, region: Option<Uuid>) -> FindManyOperation<E, ContentItem> {
        self.find_many()
            .r#where(Filter::and([
                self::topic_id().equals(topic_id),
                status().equals(PublishStatus::Published),
                visible_in(region),
            ]))
            .order_by(position().asc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockEngine;
    use pretty_assertions::assert_eq;

    fn item(mode: RegionMode, region: Option<Uuid>) -> ContentItem {
        let now = Utc::now();
        ContentItem {
            id: Uuid::new_v4(),
            topic_id: Uuid::new_v4(),
            kind: ContentKind::Question,
            status: PublishStatus::Published,
            title: "Should the town build a bike lane?".into(),
            body: None,
            locale: Locale::De,
            region_mode: mode,
            region_id: region,
            position: 0,
            metadata: None,
            published_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_visible_in() {
        let bern = Uuid::new_v4();
        let zurich = Uuid::new_v4();

        assert!(item(RegionMode::All, Some(bern)).visible_in(Some(zurich)));
        assert!(item(RegionMode::Include, Some(bern)).visible_in(Some(bern)));
        assert!(!item(RegionMode::Include, Some(bern)).visible_in(Some(zurich)));
        assert!(!item(RegionMode::Include, Some(bern)).visible_in(None));
        assert!(!item(RegionMode::Exclude, Some(bern)).visible_in(Some(bern)));
        assert!(item(RegionMode::Exclude, Some(bern)).visible_in(None));
        assert!(item(RegionMode::Include, None).visible_in(Some(zurich)));
    }

    #[test]
    fn test_visible_in_filter() {
        let bern = Uuid::new_v4();
        let (sql, params) = visible_in(Some(bern)).to_sql(0);
        assert_eq!(
            sql,
            "((region_mode = $1 OR region_id IS NULL) OR (region_mode = $2 AND region_id = $3) \
             OR (region_mode = $4 AND region_id <> $5))"
        );
        assert_eq!(params[2], FilterValue::Uuid(bern));
    }

    #[test]
    fn test_create_input_columns() {
        let columns: Vec<_> = CreateInput::new(Uuid::new_v4(), ContentKind::Article, "Intro")
            .into_values()
            .into_iter()
            .map(|(c, _)| c)
            .collect();
        assert_eq!(columns, ContentItem::COLUMNS.to_vec());
    }

    #[test]
    fn test_publish_sets_timestamp() {
        let at = Utc::now();
        let assignments = UpdateInput::default().publish(at).into_assignments();
        assert_eq!(
            assignments,
            vec![
                Assignment::set("status", PublishStatus::Published),
                Assignment::set("published_at", at),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_many_moves_position() {
        let engine = MockEngine::with_affected(3);
        let topic = Uuid::new_v4();
        let moved = Actions::new(engine.clone())
            .update_many(
                Filter::and([topic_id().equals(topic), position().gte(2)]),
                UpdateInput::default().position(FieldUpdate::Increment(1)),
            )
            .exec()
            .await
            .unwrap();

        assert_eq!(moved, 3);
        let (sql, params) = engine.last_statement();
        assert_eq!(
            sql,
            "UPDATE content_items SET position = position + $1, updated_at = CURRENT_TIMESTAMP \
             WHERE (topic_id = $2 AND position >= $3)"
        );
        assert_eq!(params, vec![FilterValue::Int(1), FilterValue::Uuid(topic), FilterValue::Int(2)]);
    }

    #[tokio::test]
    async fn test_group_by_kind() {
        let engine = MockEngine::with_rows(vec![Row::new().with("kind", "QUESTION").with("_count", 4i64)]);
        let groups = Actions::new(engine.clone())
            .group_by(["kind"])
            .count()
            .r#where(status().equals(PublishStatus::Published))
            .exec()
            .await
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key::<ContentKind>("kind").unwrap(), ContentKind::Question);
        assert!(engine.last_sql().contains("FROM content_items WHERE status = $1 GROUP BY kind"));
    }

    #[tokio::test]
    async fn test_contributions_of() {
        let engine = MockEngine::new();
        let id = Uuid::new_v4();
        Actions::new(engine.clone()).contributions_of(id).exec().await.unwrap();
        assert!(engine
            .last_sql()
            .ends_with("FROM contributions WHERE item_id = $1 ORDER BY created_at DESC"));
    }
}
