//! `Contribution`: a participant's answer or comment on a content item.

use agora_query::{
    Assignment, CreateData, Filter, FilterValue, FindManyOperation, JsonField, Model,
    NullableField, QueryEngine, QueryResult, RelationKind, Row, RowError, ScalarField, UpdateData,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{answer_option, content_item, contribution_statement, user_profile};
use crate::enums::PublishStatus;
use crate::model::{self, to_many_filters, to_one_filters, ClientModel, UniqueSelector};

/// Table name.
pub const TABLE: &str = "contributions";

/// A contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// Primary key.
    pub id: Uuid,
    /// Item answered or commented on.
    pub item_id: Uuid,
    /// Author, absent for anonymous contributions.
    pub profile_id: Option<Uuid>,
    /// Chosen option, for questions.
    pub answer_option_id: Option<Uuid>,
    /// Free text.
    pub body: Option<String>,
    /// Moderation state.
    pub status: PublishStatus,
    /// Free-form attributes.
    pub metadata: Option<Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl Contribution {
    fn read(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            item_id: row.get("item_id")?,
            profile_id: row.get("profile_id")?,
            answer_option_id: row.get("answer_option_id")?,
            body: row.get("body")?,
            status: row.get("status")?,
            metadata: row.get("metadata")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl Model for Contribution {
    const MODEL_NAME: &'static str = "Contribution";
    const TABLE_NAME: &'static str = TABLE;
    const PRIMARY_KEY: &'static [&'static str] = &["id"];
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "item_id",
        "profile_id",
        "answer_option_id",
        "body",
        "status",
        "metadata",
        "created_at",
        "updated_at",
    ];
    const UPDATED_AT: Option<&'static str> = Some("updated_at");

    fn from_row(row: &Row) -> QueryResult<Self> {
        Self::read(row).map_err(model::row_error::<Self>)
    }
}

impl ClientModel for Contribution {
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

/// `profile_id`
pub const fn profile_id() -> NullableField<Uuid> {
    NullableField::new("profile_id")
}

/// `answer_option_id`
pub const fn answer_option_id() -> NullableField<Uuid> {
    NullableField::new("answer_option_id")
}

/// `body`
pub const fn body() -> NullableField<String> {
    NullableField::new("body")
}

/// `status`
pub const fn status() -> ScalarField<PublishStatus> {
    ScalarField::new("status")
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

const ITEM: &[(&str, &str)] = &[("id", "item_id")];
const PROFILE: &[(&str, &str)] = &[("id", "profile_id")];
const ANSWER_OPTION: &[(&str, &str)] = &[("id", "answer_option_id")];
const STATEMENTS: &[(&str, &str)] = &[("contribution_id", "id")];

fn to_item(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, content_item::TABLE, ITEM, filter)
}

fn to_profile(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, user_profile::TABLE, PROFILE, filter)
}

fn to_answer_option(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, answer_option::TABLE, ANSWER_OPTION, filter)
}

fn statements(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, contribution_statement::TABLE, STATEMENTS, filter)
}

to_one_filters!(to_item, "content item": item_is, item_is_not);
to_one_filters!(to_profile, "author profile": profile_is, profile_is_not);
to_one_filters!(to_answer_option, "chosen answer option": answer_option_is, answer_option_is_not);
to_many_filters!(statements, "statements": statements_some, statements_none, statements_every);

/// Selects one contribution.
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

/// Data for a new contribution.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    id: Option<Uuid>,
    item_id: Uuid,
    profile_id: Option<Uuid>,
    answer_option_id: Option<Uuid>,
    body: Option<String>,
    status: PublishStatus,
    metadata: Option<Value>,
}

impl CreateInput {
    /// An anonymous draft contribution to `item_id`.
    pub fn new(item_id: Uuid) -> Self {
        Self {
            id: None,
            item_id,
            profile_id: None,
            answer_option_id: None,
            body: None,
            status: PublishStatus::default(),
            metadata: None,
        }
    }

    /// Use a known id instead of a generated one.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the author.
    pub fn profile(mut self, profile_id: Uuid) -> Self {
        self.profile_id = Some(profile_id);
        self
    }

    /// Set the chosen option.
    pub fn answer_option(mut self, answer_option_id: Uuid) -> Self {
        self.answer_option_id = Some(answer_option_id);
        self
    }

    /// Set `body`.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set `status`.
    pub fn status(mut self, status: PublishStatus) -> Self {
        self.status = status;
        self
    }

    /// Set `metadata`.
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl CreateData for CreateInput {
    type Model = Contribution;

    fn into_values(self) -> Vec<(&'static str, FilterValue)> {
        let now = Utc::now();
        vec![
            ("id", self.id.unwrap_or_else(Uuid::new_v4).into()),
            ("item_id", self.item_id.into()),
            ("profile_id", self.profile_id.into()),
            ("answer_option_id", self.answer_option_id.into()),
            ("body", self.body.into()),
            ("status", self.status.into()),
            ("metadata", self.metadata.into()),
            ("created_at", now.into()),
            ("updated_at", now.into()),
        ]
    }
}

/// Changes to a contribution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateInput {
    answer_option_id: Option<Option<Uuid>>,
    body: Option<Option<String>>,
    status: Option<PublishStatus>,
    metadata: Option<Option<Value>>,
}

impl UpdateInput {
    /// Change the chosen option.
    pub fn answer_option(mut self, answer_option_id: Uuid) -> Self {
        self.answer_option_id = Some(Some(answer_option_id));
        self
    }

    /// Withdraw the chosen option.
    pub fn clear_answer_option(mut self) -> Self {
        self.answer_option_id = Some(None);
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

    /// Set `status`.
    pub fn status(mut self, status: PublishStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Replace `metadata`.
    pub fn metadata(mut self, metadata: Value) -> Self {
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
    type Model = Contribution;

    fn into_assignments(self) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(v) = self.answer_option_id {
            out.push(Assignment::set("answer_option_id", v));
        }
        if let Some(v) = self.body {
            out.push(Assignment::set("body", v));
        }
        if let Some(v) = self.status {
            out.push(Assignment::set("status", v));
        }
        if let Some(v) = self.metadata {
            out.push(Assignment::set("metadata", v));
        }
        out
    }
}

/// Operations on contributions.
pub type Actions<E> = model::Actions<E, Contribution>;

impl<E: QueryEngine> model::Actions<E, Contribution> {
    /// The statements of a contribution in position order.
    pub fn statements_of(
        &self,
        contribution_id: Uuid,
    ) -> FindManyOperation<E, contribution_statement::ContributionStatement> {
        FindManyOperation::new(self.engine().clone())
            .r#where(contribution_statement::contribution_id().equals(contribution_id))
            .order_by(contribution_statement::position().asc())
    }
}
