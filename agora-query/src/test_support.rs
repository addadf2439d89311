//! Recording engine shared by the unit tests.

use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::QueryResult;
use crate::filter::FilterValue;
use crate::row::Row;
use crate::traits::{BoxFuture, Model, QueryEngine};

#[derive(Debug)]
pub(crate) struct Article {
    pub id: Uuid,
    pub title: String,
    pub views: i32,
}

impl Model for Article {
    const MODEL_NAME: &'static str = "Article";
    const TABLE_NAME: &'static str = "articles";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];
    const COLUMNS: &'static [&'static str] = &["id", "title", "views", "updated_at"];
    const UPDATED_AT: Option<&'static str> = Some("updated_at");

    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            views: row.get("views")?,
        })
    }
}

pub(crate) fn article_row(title: &str, views: i32) -> Row {
    Row::new()
        .with("id", Uuid::new_v4())
        .with("title", title)
        .with("views", views)
        .with("updated_at", chrono::Utc::now())
}

/// Remembers every statement and answers with canned rows.
#[derive(Clone, Default)]
pub(crate) struct MockEngine {
    pub statements: Arc<Mutex<Vec<(String, Vec<FilterValue>)>>>,
    pub rows: Arc<Mutex<Vec<Row>>>,
    pub affected: u64,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Row>) -> Self {
        let engine = Self::default();
        *engine.rows.lock() = rows;
        engine
    }

    pub fn with_affected(affected: u64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    pub fn last_sql(&self) -> String {
        self.statements
            .lock()
            .last()
            .map(|(sql, _)| sql.clone())
            .unwrap_or_default()
    }

    pub fn statement_count(&self) -> usize {
        self.statements.lock().len()
    }
}

impl QueryEngine for MockEngine {
    fn query_rows(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        self.statements.lock().push((sql.to_string(), params));
        let rows = self.rows.lock().clone();
        Box::pin(async move { Ok(rows) })
    }

    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
        self.statements.lock().push((sql.to_string(), params));
        let affected = self.affected;
        Box::pin(async move { Ok(affected) })
    }
}
