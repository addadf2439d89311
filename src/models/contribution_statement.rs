//! `ContributionStatement`: an ordered paragraph of a contribution.

use agora_query::{
    Assignment, CreateData, FieldUpdate, Filter, FilterValue, Model, QueryResult, RelationKind,
    Row, RowError, ScalarField, UpdateData,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::contribution;
use crate::model::{self, to_one_filters, ClientModel, UniqueSelector};

/// Table name.
pub const TABLE: &str = "contribution_statements";

/// A contribution statement. Deleted together with its contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionStatement {
    /// Primary key.
    pub id: Uuid,
    /// Owning contribution.
    pub contribution_id: Uuid,
    /// Statement text.
    pub body: String,
    /// Sort position.
    pub position: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ContributionStatement {
    fn read(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            contribution_id: row.get("contribution_id")?,
            body: row.get("body")?,
            position: row.get("position")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl Model for ContributionStatement {
    const MODEL_NAME: &'static str = "ContributionStatement";
    const TABLE_NAME: &'static str = TABLE;
    const PRIMARY_KEY: &'static [&'static str] = &["id"];
    const COLUMNS: &'static [&'static str] =
        &["id", "contribution_id", "body", "position", "created_at"];

    fn from_row(row: &Row) -> QueryResult<Self> {
        Self::read(row).map_err(model::row_error::<Self>)
    }
}

impl ClientModel for ContributionStatement {
    type Unique = UniqueWhere;
    type Create = CreateInput;
    type Update = UpdateInput;
}

/// `id`
pub const fn id() -> ScalarField<Uuid> {
    ScalarField::new("id")
}

/// `contribution_id`
pub const fn contribution_id() -> ScalarField<Uuid> {
    ScalarField::new("contribution_id")
}

/// `body`
pub const fn body() -> ScalarField<String> {
    ScalarField::new("body")
}

/// `position`
pub const fn position() -> ScalarField<i32> {
    ScalarField::new("position")
}

/// `created_at`
pub const fn created_at() -> ScalarField<DateTime<Utc>> {
    ScalarField::new("created_at")
}

const CONTRIBUTION: &[(&str, &str)] = &[("id", "contribution_id")];

fn to_contribution(kind: RelationKind, filter: Filter) -> Filter {
    model::related(kind, TABLE, contribution::TABLE, CONTRIBUTION, filter)
}

to_one_filters!(to_contribution, "contribution": contribution_is, contribution_is_not);

/// Selects one statement.
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

/// Data for a new statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    id: Option<Uuid>,
    contribution_id: Uuid,
    body: String,
    position: i32,
}

impl CreateInput {
    /// Statement `body` at `position` of `contribution_id`.
    pub fn new(contribution_id: Uuid, body: impl Into<String>, position: i32) -> Self {
        Self {
            id: None,
            contribution_id,
            body: body.into(),
            position,
        }
    }

    /// Use a known id instead of a generated one.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }
}

impl CreateData for CreateInput {
    type Model = ContributionStatement;

    fn into_values(self) -> Vec<(&'static str, FilterValue)> {
        vec![
            ("id", self.id.unwrap_or_else(Uuid::new_v4).into()),
            ("contribution_id", self.contribution_id.into()),
            ("body", self.body.into()),
            ("position", self.position.into()),
            ("created_at", Utc::now().into()),
        ]
    }
}

/// Changes to a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateInput {
    body: Option<String>,
    position: Option<FieldUpdate<i32>>,
}

impl UpdateInput {
    /// Set `body`.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set or atomically change `position`.
    pub fn position(mut self, position: impl Into<FieldUpdate<i32>>) -> Self {
        self.position = Some(position.into());
        self
    }
}

impl UpdateData for UpdateInput {
    type Model = ContributionStatement;

    fn into_assignments(self) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(v) = self.body {
            out.push(Assignment::set("body", v));
        }
        if let Some(v) = self.position {
            out.push(v.into_assignment("position"));
        }
        out
    }
}

/// Operations on contribution statements.
pub type Actions<E> = model::Actions<E, ContributionStatement>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockEngine;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_shift_positions() {
        let engine = MockEngine::with_affected(3);
        let contribution = Uuid::new_v4();
        let moved = Actions::new(engine.clone())
            .update_many(
                Filter::and([
                    contribution_id().equals(contribution),
                    position().gte(2),
                ]),
                UpdateInput::default().position(FieldUpdate::Increment(1)),
            )
            .exec()
            .await
            .unwrap();

        assert_eq!(moved, 3);
        let (sql, params) = engine.last_statement();
        assert_eq!(
            sql,
            "UPDATE contribution_statements SET position = position + $1 \
             WHERE (contribution_id = $2 AND position >= $3)"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_contribution_is() {
        let (sql, _) = contribution_is(contribution::status().equals(crate::enums::PublishStatus::Archived)).to_sql(0);
        assert_eq!(
            sql,
            "EXISTS (SELECT 1 FROM contributions AS r1 \
             WHERE r1.id = contribution_statements.contribution_id AND r1.status = $1)"
        );
    }
}
