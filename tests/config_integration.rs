//! Loading `agora.toml` from disk and the process environment.

use std::io::Write;
use std::time::Duration;

use agora::prelude::*;
use agora::ConfigError;
use agora_query::{ErrorCode, ErrorKind};
use pretty_assertions::assert_eq;

const CONFIG: &str = r#"
[database]
url = "postgresql://agora@localhost:5433/agora"

[database.pool]
min_connections = 2
max_connections = 16
connect_timeout = "3s"
idle_timeout = "5m"
statement_cache_size = 64

[debug]
log_queries = false
slow_query_threshold = 500

[environments.ci.database]
url = "postgresql://ci@postgres/agora_ci"

[environments.ci.database.pool]
max_connections = 4

[environments.ci.debug]
log_queries = true
"#;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_from_file_builds_engine_settings() {
    let file = write_config(CONFIG);
    let config = AgoraConfig::from_file(file.path()).unwrap();

    let pg = config.pg_config().unwrap();
    assert_eq!(pg.host, "localhost");
    assert_eq!(pg.port, 5433);
    assert_eq!(pg.database, "agora");
    assert_eq!(pg.connect_timeout, Duration::from_secs(3));

    let pool = config.pool_config().unwrap();
    assert_eq!(pool.min_connections, 2);
    assert_eq!(pool.max_connections, 16);
    assert_eq!(pool.idle_timeout, Some(Duration::from_secs(300)));
    assert_eq!(pool.statement_cache_size, 64);

    let logging = config.query_logging();
    assert!(!logging.log_queries);
    assert_eq!(logging.slow_query_threshold, Some(Duration::from_millis(500)));
}

// Environment variables are process-wide, so every `from_env` case runs
// in this one test.
#[test]
fn test_from_env() {
    let file = write_config(CONFIG);
    // SAFETY: no other test in this binary reads these variables.
    unsafe {
        std::env::set_var("AGORA_CONFIG", file.path());
        std::env::set_var("AGORA_ENV", "ci");
        std::env::remove_var("DATABASE_URL");
    }

    let config = AgoraConfig::from_env().unwrap();
    assert_eq!(config.database_url().unwrap(), "postgresql://ci@postgres/agora_ci");
    assert_eq!(config.database.pool.max_connections, 4);
    assert_eq!(config.database.pool.min_connections, 1);
    assert!(config.query_logging().log_queries);

    unsafe {
        std::env::set_var("DATABASE_URL", "postgres://override@db/agora");
    }
    let config = AgoraConfig::from_env().unwrap();
    assert_eq!(config.database_url().unwrap(), "postgres://override@db/agora");

    unsafe {
        std::env::set_var("AGORA_CONFIG", file.path().with_extension("missing"));
        std::env::remove_var("AGORA_ENV");
        std::env::remove_var("DATABASE_URL");
    }
    let config = AgoraConfig::from_env().unwrap();
    assert_eq!(config, AgoraConfig::default());

    unsafe {
        std::env::remove_var("AGORA_CONFIG");
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AgoraConfig::from_file(dir.path().join("agora.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("agora.toml"));
}

#[test]
fn test_invalid_duration_is_configuration_error() {
    let config: AgoraConfig = r#"
        [database]
        url = "postgresql://localhost/agora"

        [database.pool]
        idle_timeout = "forever"
    "#
    .parse()
    .unwrap();

    let err: QueryError = config.pool_config().unwrap_err().into();
    assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    assert!(err.message.contains("idle_timeout"));
}

#[tokio::test]
async fn test_connect_rejects_bad_url_before_dialing() {
    let config = AgoraConfig::default().resolve(None, Some("mysql://localhost/agora".into()));
    let err = AgoraClient::connect(&config).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConnectionString);
    assert_eq!(err.code.kind(), ErrorKind::Configuration);

    let err = AgoraClient::connect(&AgoraConfig::default()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConfiguration);
}
