//! PostgreSQL DDL for the Agora schema and [`push`] to apply it.
//!
//! Every statement is idempotent (`IF NOT EXISTS`), so `push` can run on
//! each start. Enum columns are `TEXT` with a `CHECK` over their values.
//! Nullable foreign keys are cleared when the referenced row goes away;
//! join rows and contribution statements are deleted with their parent.

use agora_query::{QueryEngine, QueryResult};
use tracing::{debug, info};

/// One table: its `CREATE TABLE` and the indexes created after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    /// Table name.
    pub name: &'static str,
    /// `CREATE TABLE IF NOT EXISTS ...`
    pub create: &'static str,
    /// `CREATE INDEX IF NOT EXISTS ...`
    pub indexes: &'static [&'static str],
}

/// Every table, referenced tables first.
pub const TABLES: &[Table] = &[
    Table {
        name: "regions",
        create: r#"CREATE TABLE IF NOT EXISTS regions (
    id UUID PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    parent_id UUID REFERENCES regions (id) ON DELETE SET NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT regions_parent_not_self CHECK (parent_id <> id)
)"#,
        indexes: &["CREATE INDEX IF NOT EXISTS regions_parent_id_idx ON regions (parent_id)"],
    },
    Table {
        name: "topics",
        create: r#"CREATE TABLE IF NOT EXISTS topics (
    id UUID PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    summary TEXT,
    locale TEXT NOT NULL DEFAULT 'DE' CHECK (locale IN ('DE', 'FR', 'IT', 'EN')),
    status TEXT NOT NULL DEFAULT 'DRAFT' CHECK (status IN ('DRAFT', 'PUBLISHED', 'ARCHIVED')),
    position INTEGER NOT NULL DEFAULT 0,
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#,
        indexes: &[],
    },
    Table {
        name: "tags",
        create: r#"CREATE TABLE IF NOT EXISTS tags (
    id UUID PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    label TEXT NOT NULL,
    locale TEXT NOT NULL DEFAULT 'DE' CHECK (locale IN ('DE', 'FR', 'IT', 'EN')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#,
        indexes: &[],
    },
    Table {
        name: "topic_tags",
        create: r#"CREATE TABLE IF NOT EXISTS topic_tags (
    topic_id UUID NOT NULL REFERENCES topics (id) ON DELETE CASCADE,
    tag_id UUID NOT NULL REFERENCES tags (id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (topic_id, tag_id)
)"#,
        indexes: &["CREATE INDEX IF NOT EXISTS topic_tags_tag_id_idx ON topic_tags (tag_id)"],
    },
    Table {
        name: "content_items",
        create: r#"CREATE TABLE IF NOT EXISTS content_items (
    id UUID PRIMARY KEY,
    topic_id UUID NOT NULL REFERENCES topics (id),
    kind TEXT NOT NULL CHECK (kind IN ('QUESTION', 'STATEMENT', 'ARTICLE', 'VIDEO')),
    status TEXT NOT NULL DEFAULT 'DRAFT' CHECK (status IN ('DRAFT', 'PUBLISHED', 'ARCHIVED')),
    title TEXT NOT NULL,
    body TEXT,
    locale TEXT NOT NULL DEFAULT 'DE' CHECK (locale IN ('DE', 'FR', 'IT', 'EN')),
    region_mode TEXT NOT NULL DEFAULT 'ALL' CHECK (region_mode IN ('ALL', 'INCLUDE', 'EXCLUDE')),
    region_id UUID REFERENCES regions (id) ON DELETE SET NULL,
    position INTEGER NOT NULL DEFAULT 0,
    metadata JSONB,
    published_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#,
        indexes: &[
            "CREATE INDEX IF NOT EXISTS content_items_topic_id_idx ON content_items (topic_id)",
            "CREATE INDEX IF NOT EXISTS content_items_region_id_idx ON content_items (region_id)",
        ],
    },
    Table {
        name: "item_tags",
        create: r#"CREATE TABLE IF NOT EXISTS item_tags (
    item_id UUID NOT NULL REFERENCES content_items (id) ON DELETE CASCADE,
    tag_id UUID NOT NULL REFERENCES tags (id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (item_id, tag_id)
)"#,
        indexes: &["CREATE INDEX IF NOT EXISTS item_tags_tag_id_idx ON item_tags (tag_id)"],
    },
    Table {
        name: "answer_options",
        create: r#"CREATE TABLE IF NOT EXISTS answer_options (
    id UUID PRIMARY KEY,
    item_id UUID NOT NULL REFERENCES content_items (id),
    label TEXT NOT NULL,
    description TEXT,
    position INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#,
        indexes: &["CREATE INDEX IF NOT EXISTS answer_options_item_id_idx ON answer_options (item_id)"],
    },
    Table {
        name: "user_profiles",
        create: r#"CREATE TABLE IF NOT EXISTS user_profiles (
    id UUID PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    display_name TEXT,
    locale TEXT NOT NULL DEFAULT 'DE' CHECK (locale IN ('DE', 'FR', 'IT', 'EN')),
    region_id UUID REFERENCES regions (id) ON DELETE SET NULL,
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#,
        indexes: &["CREATE INDEX IF NOT EXISTS user_profiles_region_id_idx ON user_profiles (region_id)"],
    },
    Table {
        name: "contributions",
        create: r#"CREATE TABLE IF NOT EXISTS contributions (
    id UUID PRIMARY KEY,
    item_id UUID NOT NULL REFERENCES content_items (id),
    profile_id UUID REFERENCES user_profiles (id) ON DELETE SET NULL,
    answer_option_id UUID REFERENCES answer_options (id) ON DELETE SET NULL,
    body TEXT,
    status TEXT NOT NULL DEFAULT 'DRAFT' CHECK (status IN ('DRAFT', 'PUBLISHED', 'ARCHIVED')),
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#,
        indexes: &[
            "CREATE INDEX IF NOT EXISTS contributions_item_id_idx ON contributions (item_id)",
            "CREATE INDEX IF NOT EXISTS contributions_profile_id_idx ON contributions (profile_id)",
            "CREATE INDEX IF NOT EXISTS contributions_answer_option_id_idx ON contributions (answer_option_id)",
        ],
    },
    Table {
        name: "contribution_statements",
        create: r#"CREATE TABLE IF NOT EXISTS contribution_statements (
    id UUID PRIMARY KEY,
    contribution_id UUID NOT NULL REFERENCES contributions (id) ON DELETE CASCADE,
    body TEXT NOT NULL,
    position INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#,
        indexes: &[
            "CREATE INDEX IF NOT EXISTS contribution_statements_contribution_id_idx ON contribution_statements (contribution_id)",
        ],
    },
    Table {
        name: "quick_signups",
        create: r#"CREATE TABLE IF NOT EXISTS quick_signups (
    id UUID PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    locale TEXT NOT NULL DEFAULT 'DE' CHECK (locale IN ('DE', 'FR', 'IT', 'EN')),
    region_id UUID REFERENCES regions (id) ON DELETE SET NULL,
    topic_id UUID REFERENCES topics (id) ON DELETE SET NULL,
    consent BOOLEAN NOT NULL DEFAULT FALSE,
    confirmed_at TIMESTAMPTZ,
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#,
        indexes: &[
            "CREATE INDEX IF NOT EXISTS quick_signups_region_id_idx ON quick_signups (region_id)",
            "CREATE INDEX IF NOT EXISTS quick_signups_topic_id_idx ON quick_signups (topic_id)",
        ],
    },
];

/// Look up a table by name.
pub fn table(name: &str) -> Option<&'static Table> {
    TABLES.iter().find(|t| t.name == name)
}

/// Every statement in execution order.
pub fn statements() -> impl Iterator<Item = &'static str> {
    TABLES
        .iter()
        .flat_map(|t| std::iter::once(t.create).chain(t.indexes.iter().copied()))
}

/// The whole schema as one script.
pub fn script() -> String {
    statements().map(|s| format!("{};\n", s)).collect::<Vec<_>>().join("\n")
}

/// Create every missing table and index.
///
/// Run it through a transaction engine to apply all or nothing.
pub async fn push<E: QueryEngine>(engine: &E) -> QueryResult<()> {
    for statement in statements() {
        debug!(sql = %statement, "applying schema statement");
        engine.execute(statement, Vec::new()).await?;
    }
    info!(tables = TABLES.len(), "schema pushed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{ContentKind, Locale, PublishStatus, RegionMode};
    use crate::models::*;
    use crate::test_support::MockEngine;
    use agora_query::Model;
    use pretty_assertions::assert_eq;

    /// Column names in DDL order, skipping table constraints.
    fn ddl_columns(create: &str) -> Vec<&str> {
        let body = &create[create.find('(').map_or(0, |i| i + 1)..create.rfind(')').unwrap_or(create.len())];
        body.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("PRIMARY KEY") && !line.starts_with("CONSTRAINT"))
            .filter_map(|line| line.split_whitespace().next())
            .collect()
    }

    fn ddl_primary_key(table: &Table) -> Vec<String> {
        let create = table.create;
        if let Some(start) = create.find("PRIMARY KEY (") {
            let rest = &create[start + "PRIMARY KEY (".len()..];
            let end = rest.find(')').unwrap();
            return rest[..end].split(", ").map(String::from).collect();
        }
        ddl_columns(create)
            .into_iter()
            .zip(create.lines().skip(1))
            .filter(|(_, line)| line.contains("PRIMARY KEY"))
            .map(|(column, _)| column.to_string())
            .collect()
    }

    fn assert_model<M: Model>() {
        let table = table(M::TABLE_NAME).unwrap_or_else(|| panic!("no DDL for {}", M::TABLE_NAME));
        assert_eq!(ddl_columns(table.create), M::COLUMNS.to_vec(), "{}", M::MODEL_NAME);
        assert_eq!(ddl_primary_key(table), M::PRIMARY_KEY.to_vec(), "{}", M::MODEL_NAME);
        if let Some(updated_at) = M::UPDATED_AT {
            assert!(M::COLUMNS.contains(&updated_at));
        }
    }

    #[test]
    fn test_models_match_ddl() {
        assert_model::<topic::Topic>();
        assert_model::<tag::Tag>();
        assert_model::<topic_tag::TopicTag>();
        assert_model::<item_tag::ItemTag>();
        assert_model::<content_item::ContentItem>();
        assert_model::<answer_option::AnswerOption>();
        assert_model::<region::Region>();
        assert_model::<user_profile::UserProfile>();
        assert_model::<contribution::Contribution>();
        assert_model::<contribution_statement::ContributionStatement>();
        assert_model::<quick_signup::QuickSignup>();
        assert_eq!(TABLES.len(), 11);
    }

    #[test]
    fn test_unique_columns() {
        for (name, column) in [
            ("topics", "slug"),
            ("tags", "slug"),
            ("regions", "code"),
            ("user_profiles", "email"),
            ("quick_signups", "email"),
        ] {
            let create = table(name).unwrap().create;
            assert!(
                create.contains(&format!("    {} TEXT NOT NULL UNIQUE", column)),
                "{}.{} is not unique",
                name,
                column
            );
        }
    }

    #[test]
    fn test_enum_checks_list_every_value() {
        fn check(values: impl Iterator<Item = &'static str>) -> String {
            let quoted: Vec<String> = values.map(|v| format!("'{}'", v)).collect();
            format!("IN ({}))", quoted.join(", "))
        }
        let script = script();
        assert!(script.contains(&check(ContentKind::variants().iter().map(|v| v.as_str()))));
        assert!(script.contains(&check(PublishStatus::variants().iter().map(|v| v.as_str()))));
        assert!(script.contains(&check(RegionMode::variants().iter().map(|v| v.as_str()))));
        assert!(script.contains(&check(Locale::variants().iter().map(|v| v.as_str()))));
    }

    #[test]
    fn test_region_cannot_parent_itself() {
        assert!(table("regions").unwrap().create.contains("CHECK (parent_id <> id)"));
    }

    #[test]
    fn test_referenced_tables_come_first() {
        for (i, t) in TABLES.iter().enumerate() {
            for (j, other) in TABLES.iter().enumerate() {
                if t.create.contains(&format!("REFERENCES {} (", other.name)) && other.name != t.name {
                    assert!(j < i, "{} references {} before it exists", t.name, other.name);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_push_runs_every_statement() {
        let engine = MockEngine::new();
        push(&engine).await.unwrap();
        let log = engine.sql_log();
        assert_eq!(log.len(), statements().count());
        assert!(log[0].starts_with("CREATE TABLE IF NOT EXISTS regions"));
        assert!(log.last().unwrap().starts_with("CREATE INDEX IF NOT EXISTS quick_signups_topic_id_idx"));
    }
}
