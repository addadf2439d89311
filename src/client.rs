//! The client: one accessor per model plus raw SQL and transactions.

use std::future::Future;

use agora_postgres::{PgEngine, PgPool};
use agora_query::{
    Model, QueryEngine, QueryError, QueryResult, RawExecuteOperation, RawQueryOperation,
    RawRowsOperation, Sql, TransactionConfig, TransactionEngine, TransactionalEngine,
};
use tracing::{debug, info, warn};

use crate::config::AgoraConfig;
use crate::models::{
    answer_option, content_item, contribution, contribution_statement, item_tag, quick_signup,
    region, tag, topic, topic_tag, user_profile,
};

/// Entry point for every query.
///
/// ```rust,no_run
/// use agora::{AgoraClient, topic};
///
/// # async fn run() -> agora::QueryResult<()> {
/// let client = AgoraClient::from_env().await?;
/// let published = client
///     .topic()
///     .find_many()
///     .r#where(topic::status().equals(agora::enums::PublishStatus::Published))
///     .order_by(topic::position().asc())
///     .exec()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct AgoraClient<E: QueryEngine> {
    engine: E,
}

impl<E: QueryEngine> AgoraClient<E> {
    /// Wrap an engine.
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// The engine statements run on.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// `Topic` operations.
    pub fn topic(&self) -> topic::Actions<E> {
        topic::Actions::new(self.engine.clone())
    }

    /// `Tag` operations.
    pub fn tag(&self) -> tag::Actions<E> {
        tag::Actions::new(self.engine.clone())
    }

    /// `TopicTag` operations.
    pub fn topic_tag(&self) -> topic_tag::Actions<E> {
        topic_tag::Actions::new(self.engine.clone())
    }

    /// `ItemTag` operations.
    pub fn item_tag(&self) -> item_tag::Actions<E> {
        item_tag::Actions::new(self.engine.clone())
    }

    /// `ContentItem` operations.
    pub fn content_item(&self) -> content_item::Actions<E> {
        content_item::Actions::new(self.engine.clone())
    }

    /// `AnswerOption` operations.
    pub fn answer_option(&self) -> answer_option::Actions<E> {
        answer_option::Actions::new(self.engine.clone())
    }

    /// `Region` operations.
    pub fn region(&self) -> region::Actions<E> {
        region::Actions::new(self.engine.clone())
    }

    /// `UserProfile` operations.
    pub fn user_profile(&self) -> user_profile::Actions<E> {
        user_profile::Actions::new(self.engine.clone())
    }

    /// `Contribution` operations.
    pub fn contribution(&self) -> contribution::Actions<E> {
        contribution::Actions::new(self.engine.clone())
    }

    /// `ContributionStatement` operations.
    pub fn contribution_statement(&self) -> contribution_statement::Actions<E> {
        contribution_statement::Actions::new(self.engine.clone())
    }

    /// `QuickSignup` operations.
    pub fn quick_signup(&self) -> quick_signup::Actions<E> {
        quick_signup::Actions::new(self.engine.clone())
    }

    /// Raw query decoded into `M`.
    pub fn query_raw<M: Model>(&self, sql: impl Into<Sql>) -> RawQueryOperation<E, M> {
        RawQueryOperation::new(self.engine.clone(), sql)
    }

    /// Raw query returning untyped rows.
    pub fn query_raw_rows(&self, sql: impl Into<Sql>) -> RawRowsOperation<E> {
        RawRowsOperation::new(self.engine.clone(), sql)
    }

    /// Raw statement returning the affected row count.
    pub fn execute_raw(&self, sql: impl Into<Sql>) -> RawExecuteOperation<E> {
        RawExecuteOperation::new(self.engine.clone(), sql)
    }
}

impl<E: TransactionalEngine> AgoraClient<E> {
    /// Run `body` inside one transaction.
    ///
    /// Commits when `body` returns `Ok` and rolls back when it returns `Err`
    /// or outlives `config.timeout`, which fails with `TransactionFailed`.
    ///
    /// ```rust,ignore
    /// let item = client
    ///     .transaction(TransactionConfig::new(), |tx| async move {
    ///         let item = tx.content_item().create(input).exec().await?;
    ///         tx.answer_option()
    ///             .create_many(options.map(|(label, pos)| answer_option::CreateInput::new(item.id, label, pos)))
    ///             .exec()
    ///             .await?;
    ///         Ok(item)
    ///     })
    ///     .await?;
    /// ```
    pub async fn transaction<T, F, Fut>(&self, config: TransactionConfig, body: F) -> QueryResult<T>
    where
        F: FnOnce(AgoraClient<E::Transaction>) -> Fut,
        Fut: Future<Output = QueryResult<T>>,
    {
        let tx = self.engine.begin(config.clone()).await?;
        let scoped = AgoraClient::new(tx.clone());

        let outcome = match config.timeout {
            Some(limit) => match tokio::time::timeout(limit, body(scoped)).await {
                Ok(result) => result,
                Err(_) => Err(QueryError::transaction_timeout(limit.as_millis() as u64)),
            },
            None => body(scoped).await,
        };

        match outcome {
            Ok(value) => {
                tx.commit().await?;
                debug!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                debug!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }
}

impl<E: TransactionEngine> AgoraClient<E> {
    /// Run `body` behind a savepoint of the open transaction.
    ///
    /// An `Err` rolls back to the savepoint and is returned; the outer
    /// transaction stays usable.
    pub async fn savepoint<T, F, Fut>(&self, body: F) -> QueryResult<T>
    where
        F: FnOnce(AgoraClient<E>) -> Fut,
        Fut: Future<Output = QueryResult<T>>,
    {
        let name = self.engine.next_savepoint_name();
        self.engine.savepoint(&name).await?;
        match body(self.clone()).await {
            Ok(value) => {
                self.engine.release_savepoint(&name).await?;
                Ok(value)
            }
            Err(err) => {
                self.engine.rollback_to(&name).await?;
                debug!(savepoint = %name, error = %err, "rolled back to savepoint");
                Err(err)
            }
        }
    }
}

impl AgoraClient<PgEngine> {
    /// Build the pool described by `config` and open its minimum connections.
    pub async fn connect(config: &AgoraConfig) -> QueryResult<Self> {
        let pg = config.pg_config()?;
        let host = pg.host.clone();
        let pool = PgPool::with_pool_config(pg, config.pool_config()?)?
            .with_logging(config.query_logging());
        pool.warm_up().await?;
        info!(host = %host, "agora client connected");
        Ok(Self::new(PgEngine::new(pool)))
    }

    /// [`connect`](Self::connect) with [`AgoraConfig::from_env`].
    pub async fn from_env() -> QueryResult<Self> {
        let config = AgoraConfig::from_env()?;
        Self::connect(&config).await
    }

    /// The connection pool.
    pub fn pool(&self) -> &PgPool {
        self.engine.pool()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::PublishStatus;
    use crate::test_support::MockEngine;
    use agora_query::{raw_query, IsolationLevel, Row};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use uuid::Uuid;

    fn topic_row() -> Row {
        Row::new()
            .with("id", Uuid::new_v4())
            .with("slug", "climate")
            .with("title", "Climate")
            .with("summary", Option::<String>::None)
            .with("locale", "DE")
            .with("status", "PUBLISHED")
            .with("position", 0)
            .with("metadata", Option::<serde_json::Value>::None)
            .with("created_at", Utc::now())
            .with("updated_at", Utc::now())
    }

    #[tokio::test]
    async fn test_transaction_commits() {
        let engine = MockEngine::with_rows(vec![topic_row()]);
        let client = AgoraClient::new(engine.clone());

        let slug = client
            .transaction(TransactionConfig::new().isolation(IsolationLevel::Serializable), |tx| async move {
                let topic = tx
                    .topic()
                    .update(
                        topic::UniqueWhere::Slug("climate".into()),
                        topic::UpdateInput::default().status(PublishStatus::Published),
                    )
                    .exec()
                    .await?;
                Ok(topic.slug)
            })
            .await
            .unwrap();

        assert_eq!(slug, "climate");
        let log = engine.sql_log();
        assert_eq!(log.first().map(String::as_str), Some("BEGIN ISOLATION LEVEL SERIALIZABLE READ WRITE"));
        assert_eq!(log.last().map(String::as_str), Some("COMMIT"));
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_error() {
        let engine = MockEngine::new();
        let client = AgoraClient::new(engine.clone());

        let err = client
            .transaction(TransactionConfig::new(), |tx| async move {
                tx.topic().find_unique(Uuid::new_v4()).exec_or_throw().await
            })
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(engine.sql_log().last().map(String::as_str), Some("ROLLBACK"));
    }

    #[tokio::test]
    async fn test_transaction_timeout() {
        let engine = MockEngine::new();
        let client = AgoraClient::new(engine.clone());

        let err = client
            .transaction(TransactionConfig::new().timeout(Duration::from_millis(10)), |_tx| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, agora_query::ErrorCode::TransactionFailed);
        assert_eq!(engine.sql_log().last().map(String::as_str), Some("ROLLBACK"));
    }

    #[tokio::test]
    async fn test_savepoint_rolls_back_inner_failure() {
        let engine = MockEngine::new();
        let client = AgoraClient::new(engine.clone());

        client
            .transaction(TransactionConfig::new(), |tx| async move {
                let inner: QueryResult<()> = tx
                    .savepoint(|sp| async move {
                        sp.tag().delete(Uuid::new_v4()).exec().await.map(|_| ())
                    })
                    .await;
                assert!(inner.unwrap_err().is_not_found());
                Ok(())
            })
            .await
            .unwrap();

        let log = engine.sql_log();
        assert_eq!(log[1], "SAVEPOINT sp_1");
        assert!(log[2].starts_with("DELETE FROM tags"));
        assert_eq!(log[3], "ROLLBACK TO SAVEPOINT sp_1");
        assert_eq!(log[4], "COMMIT");
    }

    #[tokio::test]
    async fn test_raw_entry_points() {
        let engine = MockEngine::with_rows(vec![topic_row()]).affecting(2);
        let client = AgoraClient::new(engine.clone());

        let topics = client
            .query_raw::<topic::Topic>(raw_query!(
                "SELECT * FROM topics WHERE position > {} AND locale = {}",
                1,
                crate::enums::Locale::De
            ))
            .exec()
            .await
            .unwrap();
        assert_eq!(topics.len(), 1);
        let (sql, params) = engine.last_statement();
        assert_eq!(sql, "SELECT * FROM topics WHERE position > $1 AND locale = $2");
        assert_eq!(params.len(), 2);

        let rows = client.query_raw_rows("SELECT slug FROM topics").exec_json().await.unwrap();
        assert_eq!(rows[0]["slug"], "climate");

        let n = client
            .execute_raw(Sql::new("UPDATE topics SET position = position + 1"))
            .exec()
            .await
            .unwrap();
        assert_eq!(n, 2);
    }
}
