//! `TopicTag`: links a topic to a tag.

use agora_query::{
    Assignment, CreateData, Filter, FilterValue, Model, QueryResult, RelationKind, Row, RowError,
    ScalarField, UpdateData,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{tag, topic};
use crate::model::{self, to_one_filters, ClientModel, UniqueSelector};

/// Table name.
pub const TABLE: &str = "topic_tags";

/// A topic/tag link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicTag {
    /// Linked topic.
    pub topic_id: Uuid,
    /// Linked tag.
    pub tag_id: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl TopicTag {
    fn read(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            topic_id: row.get("topic_id")?,
            tag_id: row.get("tag_id")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl Model for TopicTag {
    const MODEL_NAME: &'static str = "TopicTag";
    const TABLE_NAME: &'static str = TABLE;
    const PRIMARY_KEY: &'static [&'static str] = &["topic_id", "tag_id"];
    const COLUMNS: &'static [&'static str] = &["topic_id", "tag_id", "created_at"];

    fn from_row(row: &Row) -> QueryResult<Self> {
        Self::read(row).map_err(model::row_error::<Self>)
    }
}

impl ClientModel for TopicTag {
    type Unique = UniqueWhere;
    type Create = CreateInput;
    type Update = UpdateInput;
}

/// `topic_id`
pub const fn topic_id() -> ScalarField<Uuid> {
    ScalarField::new("topic_id")
}

/// `tag_id`
pub const fn tag_id() -> ScalarField<Uuid> {
    ScalarField::new("tag_id")
}

/// `created_at`
pub const fn created_at() -> ScalarField<DateTime<Utc>> {
    ScalarField::new("created_at")
}

const TOPIC: &[(&str, &str)] = &[("id", "topic_id")];
const TAG: &[(&str, &str)] = &[("id", "tag_id")];

fn to_topic(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, topic::TABLE, TOPIC, filter)
}

fn to_tag(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, tag::TABLE, TAG, filter)
}

to_one_filters!(to_topic, "topic": topic_is, topic_is_not);
to_one_filters!(to_tag, "tag": tag_is, tag_is_not);

/// Selects one link by its composite key.
#[derive(Debug, Clone, PartialEq)]
pub enum UniqueWhere {
    /// By `(topic_id, tag_id)`.
    TopicIdTagId {
        /// Topic.
        topic_id: Uuid,
        /// Tag.
        tag_id: Uuid,
    },
}

impl UniqueSelector for UniqueWhere {
    fn conflict_columns(&self) -> &'static [&'static str] {
        TopicTag::PRIMARY_KEY
    }

    fn values(&self) -> Vec<(&'static str, FilterValue)> {
        match self {
            Self::TopicIdTagId { topic_id, tag_id } => {
                vec![("topic_id", (*topic_id).into()), ("tag_id", (*tag_id).into())]
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
    topic_id: Uuid,
    tag_id: Uuid,
}

impl CreateInput {
    /// Link `topic_id` to `tag_id`.
    pub fn new(topic_id: Uuid, tag_id: Uuid) -> Self {
        Self { topic_id, tag_id }
    }
}

impl CreateData for CreateInput {
    type Model = TopicTag;

    fn into_values(self) -> Vec<(&'static str, FilterValue)> {
        vec![
            ("topic_id", self.topic_id.into()),
            ("tag_id", self.tag_id.into()),
            ("created_at", Utc::now().into()),
        ]
    }
}

/// Moves a link to another topic or tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateInput {
    topic_id: Option<Uuid>,
    tag_id: Option<Uuid>,
}

impl UpdateInput {
    /// Set `topic_id`.
    pub fn topic_id(mut self, topic_id: Uuid) -> Self {
        self.topic_id = Some(topic_id);
        self
    }

    /// Set `tag_id`.
    pub fn tag_id(mut self, tag_id: Uuid) -> Self {
        self.tag_id = Some(tag_id);
        self
    }
}

impl UpdateData for UpdateInput {
    type Model = TopicTag;

    fn into_assignments(self) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(v) = self.topic_id {
            out.push(Assignment::set("topic_id", v));
        }
        if let Some(v) = self.tag_id {
            out.push(Assignment::set("tag_id", v));
        }
        out
    }
}

/// Operations on topic/tag links.
pub type Actions<E> = model::Actions<E, TopicTag>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockEngine;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_delete_by_composite_key() {
        let (topic_id, tag_id) = (Uuid::new_v4(), Uuid::new_v4());
        let engine = MockEngine::with_rows(vec![Row::new()
            .with("topic_id", topic_id)
            .with("tag_id", tag_id)
            .with("created_at", Utc::now())]);

        let link = Actions::new(engine.clone())
            .delete(UniqueWhere::TopicIdTagId { topic_id, tag_id })
            .exec()
            .await
            .unwrap();

        assert_eq!(link.tag_id, tag_id);
        let (sql, params) = engine.last_statement();
        assert_eq!(
            sql,
            "DELETE FROM topic_tags WHERE (topic_id = $1 AND tag_id = $2) RETURNING topic_id, tag_id, created_at"
        );
        assert_eq!(params, vec![FilterValue::Uuid(topic_id), FilterValue::Uuid(tag_id)]);
    }

    #[tokio::test]
    async fn test_create_many_skip_duplicates() {
        let engine = MockEngine::with_affected(2);
        let topic_id = Uuid::new_v4();
        let inserted = Actions::new(engine.clone())
            .create_many([
                CreateInput::new(topic_id, Uuid::new_v4()),
                CreateInput::new(topic_id, Uuid::new_v4()),
            ])
            .skip_duplicates()
            .exec()
            .await
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(
            engine.last_sql(),
            "INSERT INTO topic_tags (topic_id, tag_id, created_at) VALUES ($1, $2, $3), ($4, $5, $6) ON CONFLICT DO NOTHING"
        );
    }

    #[test]
    fn test_tag_is() {
        let (sql, _) = tag_is(tag::slug().equals("energy")).to_sql(0);
        assert_eq!(
            sql,
            "EXISTS (SELECT 1 FROM tags AS r1 WHERE r1.id = topic_tags.tag_id AND r1.slug = $1)"
        );
    }
}
