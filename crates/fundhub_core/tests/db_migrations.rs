use fundhub_core::db::migrations::{current_version, latest_version};
use fundhub_core::db::{open_db, open_db_in_memory, open_db_with_config, DbError};
use fundhub_core::{
    new_id, ConfigError, InMemoryUserDirectory, NewProject, ProjectService,
    SqliteProjectRepository, StoreConfig,
};
use rusqlite::Connection;

#[test]
fn fresh_database_is_at_latest_version() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(current_version(&conn).unwrap(), latest_version());

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn file_database_uses_wal_and_reopens_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.sqlite3");

    let project_id = {
        let conn = open_db(&path).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_ascii_lowercase(), "wal");

        let service = ProjectService::new(
            SqliteProjectRepository::new(&conn),
            InMemoryUserDirectory::new(),
        );
        service
            .create_project(NewProject::default(), &new_id().to_string())
            .unwrap()
            .id
    };

    let conn = open_db(&path).unwrap();
    assert_eq!(current_version(&conn).unwrap(), latest_version());
    let service = ProjectService::new(
        SqliteProjectRepository::new(&conn),
        InMemoryUserDirectory::new(),
    );
    assert!(service.get_project(&project_id.to_string()).is_ok());
}

#[test]
fn newer_schema_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    {
        let raw = Connection::open(&path).unwrap();
        raw.execute_batch(&format!("PRAGMA user_version = {};", latest_version() + 1))
            .unwrap();
    }

    match open_db(&path) {
        Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, latest_version() + 1);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("expected unsupported schema version, got {other:?}"),
    }
}

#[test]
fn zero_timeouts_are_rejected_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        operation_timeout_ms: 0,
        ..StoreConfig::default()
    };

    match open_db_with_config(dir.path().join("zero.sqlite3"), &config) {
        Err(DbError::InvalidConfig(ConfigError::ZeroTimeout(field))) => {
            assert_eq!(field, "operation_timeout_ms");
        }
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn held_write_lock_surfaces_as_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.sqlite3");
    let config = StoreConfig {
        busy_timeout_ms: 50,
        ..StoreConfig::default()
    };

    let conn = open_db_with_config(&path, &config).unwrap();
    let service = ProjectService::new(
        SqliteProjectRepository::with_config(&conn, &config),
        InMemoryUserDirectory::new(),
    );
    let project_id = service
        .create_project(NewProject::default(), &new_id().to_string())
        .unwrap()
        .id
        .to_string();

    let holder = open_db(&path).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();

    let err = service.view_project(&project_id).unwrap_err();
    assert!(err.is_timeout(), "unexpected error: {err}");

    let err = service
        .add_comment(&project_id, &new_id().to_string(), "blocked")
        .unwrap_err();
    assert!(err.is_timeout(), "unexpected error: {err}");

    holder.execute_batch("ROLLBACK;").unwrap();
    service.view_project(&project_id).unwrap();
    assert_eq!(service.get_project(&project_id).unwrap().views, 1);
}
