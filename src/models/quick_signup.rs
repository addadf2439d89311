//! `QuickSignup`: an email-only registration, optionally tied to a topic.

use agora_query::{
    Assignment, CreateData, Filter, FilterValue, JsonField, Model, NullableField, QueryEngine,
    QueryResult, RelationKind, Row, RowError, ScalarField, UpdateData, UpdateOperation,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{region, topic};
use crate::enums::Locale;
use crate::model::{self, to_one_filters, ClientModel, UniqueSelector};

/// Table name.
pub const TABLE: &str = "quick_signups";

/// A quick signup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickSignup {
    /// Primary key.
    pub id: Uuid,
    /// Email, unique.
    pub email: String,
    /// Preferred language.
    pub locale: Locale,
    /// Region given at signup.
    pub region_id: Option<Uuid>,
    /// Topic the signup came from.
    pub topic_id: Option<Uuid>,
    /// Whether contact was consented to.
    pub consent: bool,
    /// When the address was confirmed.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Free-form attributes.
    pub metadata: Option<Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl QuickSignup {
    fn read(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            email: row.get("email")?,
            locale: row.get("locale")?,
            region_id: row.get("region_id")?,
            topic_id: row.get("topic_id")?,
            consent: row.get("consent")?,
            confirmed_at: row.get("confirmed_at")?,
            metadata: row.get("metadata")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Whether the address has been confirmed.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

impl Model for QuickSignup {
    const MODEL_NAME: &'static str = "QuickSignup";
    const TABLE_NAME: &'static str = TABLE;
    const PRIMARY_KEY: &'static [&'static str] = &["id"];
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "email",
        "locale",
        "region_id",
        "topic_id",
        "consent",
        "confirmed_at",
        "metadata",
        "created_at",
    ];

    fn from_row(row: &Row) -> QueryResult<Self> {
        Self::read(row).map_err(model::row_error::<Self>)
    }
}

impl ClientModel for QuickSignup {
    type Unique = UniqueWhere;
    type Create = CreateInput;
    type Update = UpdateInput;
}

/// `id`
pub const fn id() -> ScalarField<Uuid> {
    ScalarField::new("id")
}

/// `email`
pub const fn email() -> ScalarField<String> {
    ScalarField::new("email")
}

/// `locale`
pub const fn locale() -> ScalarField<Locale> {
    ScalarField::new("locale")
}

/// `region_id`
pub const fn region_id() -> NullableField<Uuid> {
    NullableField::new("region_id")
}

/// `topic_id`
pub const fn topic_id() -> NullableField<Uuid> {
    NullableField::new("topic_id")
}

/// `consent`
pub const fn consent() -> ScalarField<bool> {
    ScalarField::new("consent")
}

/// `confirmed_at`
pub const fn confirmed_at() -> NullableField<DateTime<Utc>> {
    NullableField::new("confirmed_at")
}

/// `metadata`
pub const fn metadata() -> JsonField {
    JsonField::new("metadata")
}

/// `created_at`
pub const fn created_at() -> ScalarField<DateTime<Utc>> {
    ScalarField::new("created_at")
}

const REGION: &[(&str, &str)] = &[("id", "region_id")];
const TOPIC: &[(&str, &str)] = &[("id", "topic_id")];

fn to_region(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, region::TABLE, REGION, filter)
}

fn to_topic(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, topic::TABLE, TOPIC, filter)
}

to_one_filters!(to_region, "region": region_is, region_is_not);
to_one_filters!(to_topic, "topic": topic_is, topic_is_not);

/// Selects one signup.
#[derive(Debug, Clone, PartialEq)]
pub enum UniqueWhere {
    /// By primary key.
    Id(Uuid),
    /// By email.
    Email(String),
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
            Self::Email(_) => &["email"],
        }
    }

    fn values(&self) -> Vec<(&'static str, FilterValue)> {
        match self {
            Self::Id(id) => vec![("id", (*id).into())],
            Self::Email(email) => vec![("email", email.into())],
        }
    }
}

impl From<UniqueWhere> for Filter {
    fn from(unique: UniqueWhere) -> Self {
        unique.to_filter()
    }
}

/// Data for a new signup.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    id: Option<Uuid>,
    email: String,
    locale: Locale,
    region_id: Option<Uuid>,
    topic_id: Option<Uuid>,
    consent: bool,
    metadata: Option<Value>,
}

impl CreateInput {
    /// A signup for `email` with the given consent.
    pub fn new(email: impl Into<String>, consent: bool) -> Self {
        Self {
            id: None,
            email: email.into(),
            locale: Locale::default(),
            region_id: None,
            topic_id: None,
            consent,
            metadata: None,
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

    /// Set `region_id`.
    pub fn region(mut self, region_id: Uuid) -> Self {
        self.region_id = Some(region_id);
        self
    }

    /// Set `topic_id`.
    pub fn topic(mut self, topic_id: Uuid) -> Self {
        self.topic_id = Some(topic_id);
        self
    }

    /// Set `metadata`.
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl CreateData for CreateInput {
    type Model = QuickSignup;

    fn into_values(self) -> Vec<(&'static str, FilterValue)> {
        vec![
            ("id", self.id.unwrap_or_else(Uuid::new_v4).into()),
            ("email", self.email.into()),
            ("locale", self.locale.into()),
            ("region_id", self.region_id.into()),
            ("topic_id", self.topic_id.into()),
            ("consent", self.consent.into()),
            ("confirmed_at", FilterValue::Null),
            ("metadata", self.metadata.into()),
            ("created_at", Utc::now().into()),
        ]
    }
}

/// Changes to a signup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateInput {
    locale: Option<Locale>,
    region_id: Option<Option<Uuid>>,
    topic_id: Option<Option<Uuid>>,
    consent: Option<bool>,
    confirmed_at: Option<Option<DateTime<Utc>>>,
    metadata: Option<Option<Value>>,
}

impl UpdateInput {
    /// Set `locale`.
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    /// Set `region_id`.
    pub fn region(mut self, region_id: Uuid) -> Self {
        self.region_id = Some(Some(region_id));
        self
    }

    /// Set `region_id` to null.
    pub fn clear_region(mut self) -> Self {
        self.region_id = Some(None);
        self
    }

    /// Set `topic_id`.
    pub fn topic(mut self, topic_id: Uuid) -> Self {
        self.topic_id = Some(Some(topic_id));
        self
    }

    /// Set `topic_id` to null.
    pub fn clear_topic(mut self) -> Self {
        self.topic_id = Some(None);
        self
    }

    /// Set `consent`.
    pub fn consent(mut self, consent: bool) -> Self {
        self.consent = Some(consent);
        self
    }

    /// Mark confirmed at `at`.
    pub fn confirm(mut self, at: DateTime<Utc>) -> Self {
        self.confirmed_at = Some(Some(at));
        self
    }

    /// Mark unconfirmed.
    pub fn unconfirm(mut self) -> Self {
        self.confirmed_at = Some(None);
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
    type Model = QuickSignup;

    fn into_assignments(self) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(v) = self.locale {
            out.push(Assignment::set("locale", v));
        }
        if let Some(v) = self.region_id {
            out.push(Assignment::set("region_id", v));
        }
        if let Some(v) = self.topic_id {
            out.push(Assignment::set("topic_id", v));
        }
        if let Some(v) = self.consent {
            out.push(Assignment::set("consent", v));
        }
        if let Some(v) = self.confirmed_at {
            out.push(Assignment::set("confirmed_at", v));
        }
        if let Some(v) = self.metadata {
            out.push(Assignment::set("metadata", v));
        }
        out
    }
}

/// Operations on quick signups.
pub type Actions<E> = model::Actions<E, QuickSignup>;

impl<E: QueryEngine> model::Actions<E, QuickSignup> {
    /// Confirm the signup of `email` now.
    pub fn confirm(&self, email: impl Into<String>) -> UpdateOperation<E, QuickSignup> {
        self.update(
            UniqueWhere::Email(email.into()),
            UpdateInput::default().confirm(Utc::now()),
        )
    }
}
