//! # Agora
//!
//! Typed PostgreSQL client for the Agora participation schema: topics and
//! their content items, answer options, tags, regions, user profiles,
//! contributions and quick signups.
//!
//! Every table has a module ([`topic`], [`content_item`], ...) holding the
//! record type, typed column handles, relation filters and the create and
//! update inputs. [`AgoraClient`] hands out one set of operations per model
//! and adds raw SQL and transactions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agora::prelude::*;
//! use agora::{content_item, topic};
//!
//! #[tokio::main]
//! async fn main() -> QueryResult<()> {
//!     let client = AgoraClient::from_env().await?;
//!
//!     let climate = client
//!         .topic()
//!         .create(topic::CreateInput::new("climate", "Climate").status(PublishStatus::Published))
//!         .exec()
//!         .await?;
//!
//!     let questions = client
//!         .content_item()
//!         .find_many()
//!         .r#where(Filter::and([
//!             content_item::topic_id().equals(climate.id),
//!             content_item::kind().equals(ContentKind::Question),
//!         ]))
//!         .order_by(content_item::position().asc())
//!         .take(20)
//!         .exec()
//!         .await?;
//!
//!     println!("{} questions", questions.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! [`AgoraClient::from_env`] reads `agora.toml` (see [`config`]), applies
//! the overrides of the environment named by `AGORA_ENV` and lets
//! `DATABASE_URL` replace the configured URL.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod client;
pub mod config;
pub mod enums;
pub mod model;
pub mod models;
pub mod schema;

#[cfg(test)]
mod test_support;

pub use models::{
    answer_option, content_item, contribution, contribution_statement, item_tag, quick_signup,
    region, tag, topic, topic_tag, user_profile,
};

pub use client::AgoraClient;
pub use config::{AgoraConfig, ConfigError};
pub use model::{Actions, ClientModel, UniqueSelector};

pub use agora_postgres::{PgEngine, PgPool, PgTransactionEngine};
pub use agora_query::{
    logging, raw_query, Cursor, FieldUpdate, Filter, FilterValue, IsolationLevel, Model,
    QueryEngine, QueryError, QueryResult, Sql, TransactionConfig,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::AgoraClient;
    pub use crate::config::AgoraConfig;
    pub use crate::enums::{ContentKind, Locale, PublishStatus, RegionMode};
    pub use crate::model::{ClientModel, UniqueSelector};
    pub use agora_query::prelude::*;
}
