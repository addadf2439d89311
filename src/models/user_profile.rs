//! `UserProfile`: a registered participant.

use agora_query::{
    Assignment, CreateData, Filter, FilterValue, FindManyOperation, JsonField, Model,
    NullableField, QueryEngine, QueryResult, RelationKind, Row, RowError, ScalarField, UpdateData,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{contribution, region};
use crate::enums::Locale;
use crate::model::{self, to_many_filters, to_one_filters, ClientModel, UniqueSelector};

/// Table name.
pub const TABLE: &str = "user_profiles";

/// A user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Primary key.
    pub id: Uuid,
    /// Login email, unique.
    pub email: String,
    /// Public name.
    pub display_name: Option<String>,
    /// Preferred language.
    pub locale: Locale,
    /// Home region.
    pub region_id: Option<Uuid>,
    /// Free-form attributes.
    pub metadata: Option<Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    fn read(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            email: row.get("email")?,
            display_name: row.get("display_name")?,
            locale: row.get("locale")?,
            region_id: row.get("region_id")?,
            metadata: row.get("metadata")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl Model for UserProfile {
    const MODEL_NAME: &'static str = "UserProfile";
    const TABLE_NAME: &'static str = TABLE;
    const PRIMARY_KEY: &'static [&'static str] = &["id"];
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "email",
        "display_name",
        "locale",
        "region_id",
        "metadata",
        "created_at",
        "updated_at",
    ];
    const UPDATED_AT: Option<&'static str> = Some("updated_at");

    fn from_row(row: &Row) -> QueryResult<Self> {
        Self::read(row).map_err(model::row_error::<Self>)
    }
}

impl ClientModel for UserProfile {
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

/// `display_name`
pub const fn display_name() -> NullableField<String> {
    NullableField::new("display_name")
}

/// `locale`
pub const fn locale() -> ScalarField<Locale> {
    ScalarField::new("locale")
}

/// `region_id`
pub const fn region_id() -> NullableField<Uuid> {
    NullableField::new("region_id")
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

const REGION: &[(&str, &str)] = &[("id", "region_id")];
const CONTRIBUTIONS: &[(&str, &str)] = &[("profile_id", "id")];

fn to_region(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, region::TABLE, REGION, filter)
}

fn contributions(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, contribution::TABLE, CONTRIBUTIONS, filter)
}

to_one_filters!(to_region, "home region": region_is, region_is_not);
to_many_filters!(contributions, "contributions": contributions_some, contributions_none, contributions_every);

/// Selects one profile.
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

/// Data for a new profile.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    id: Option<Uuid>,
    email: String,
    display_name: Option<String>,
    locale: Locale,
    region_id: Option<Uuid>,
    metadata: Option<Value>,
}

impl CreateInput {
    /// A profile for `email`.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
            display_name: None,
            locale: Locale::default(),
            region_id: None,
            metadata: None,
        }
    }

    /// Use a known id instead of a generated one.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Set `display_name`.
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
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

    /// Set `metadata`.
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl CreateData for CreateInput {
    type Model = UserProfile;

    fn into_values(self) -> Vec<(&'static str, FilterValue)> {
        let now = Utc::now();
        vec![
            ("id", self.id.unwrap_or_else(Uuid::new_v4).into()),
            ("email", self.email.into()),
            ("display_name", self.display_name.into()),
            ("locale", self.locale.into()),
            ("region_id", self.region_id.into()),
            ("metadata", self.metadata.into()),
            ("created_at", now.into()),
            ("updated_at", now.into()),
        ]
    }
}

/// Changes to a profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateInput {
    email: Option<String>,
    display_name: Option<Option<String>>,
    locale: Option<Locale>,
    region_id: Option<Option<Uuid>>,
    metadata: Option<Option<Value>>,
}

impl UpdateInput {
    /// Set `email`.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set `display_name`.
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(Some(name.into()));
        self
    }

    /// Set `display_name` to null.
    pub fn clear_display_name(mut self) -> Self {
        self.display_name = Some(None);
        self
    }

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
    type Model = UserProfile;

    fn into_assignments(self) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(v) = self.email {
            out.push(Assignment::set("email", v));
        }
        if let Some(v) = self.display_name {
            out.push(Assignment::set("display_name", v));
        }
        if let Some(v) = self.locale {
            out.push(Assignment::set("locale", v));
        }
        if let Some(v) = self.region_id {
            out.push(Assignment::set("region_id", v));
        }
        if let Some(v) = self.metadata {
            out.push(Assignment::set("metadata", v));
        }
        out
    }
}

/// Operations on user profiles.
pub type Actions<E> = model::Actions<E, UserProfile>;

impl<E: QueryEngine> model::Actions<E, UserProfile> {
    /// A profile's contributions, newest first.
    pub fn contributions_of(
        &self,
        profile_id: Uuid,
    ) -> FindManyOperation<E, contribution::Contribution> {
        FindManyOperation::new(self.engine().clone())
            .r#where(contribution::profile_id().equals(profile_id))
            .order_by(contribution::created_at().desc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockEngine;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn profile_row(email: &str) -> Row {
        Row::new()
            .with("id", Uuid::new_v4())
            .with("email", email)
            .with("display_name", Option::<String>::None)
            .with("locale", "FR")
            .with("region_id", Option::<Uuid>::None)
            .with("metadata", json!({"newsletter": true}))
            .with("created_at", Utc::now())
            .with("updated_at", Utc::now())
    }

    #[tokio::test]
    async fn test_update_by_email_touches_updated_at() {
        let engine = MockEngine::with_rows(vec![profile_row("a@example.ch")]);
        let profile = Actions::new(engine.clone())
            .update(
                UniqueWhere::Email("a@example.ch".into()),
                UpdateInput::default().locale(Locale::Fr).clear_display_name(),
            )
            .exec()
            .await
            .unwrap();

        assert_eq!(profile.locale, Locale::Fr);
        let (sql, params) = engine.last_statement();
        assert!(sql.starts_with(
            "UPDATE user_profiles SET display_name = $1, locale = $2, updated_at = CURRENT_TIMESTAMP WHERE email = $3"
        ));
        assert_eq!(params[0], FilterValue::Null);
    }

    #[tokio::test]
    async fn test_find_many_with_json_filter() {
        let engine = MockEngine::with_rows(vec![profile_row("b@example.ch")]);
        let profiles = Actions::new(engine.clone())
            .find_many()
            .r#where(metadata().has_key("newsletter"))
            .exec()
            .await
            .unwrap();

        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].metadata, Some(json!({"newsletter": true})));
    }

    #[test]
    fn test_contributions_none() {
        let (sql, _) = contributions_none(Filter::None).to_sql(0);
        assert_eq!(
            sql,
            "NOT EXISTS (SELECT 1 FROM contributions AS r1 WHERE r1.profile_id = user_profiles.id)"
        );
    }
}
