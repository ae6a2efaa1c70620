use fundhub_core::db::open_db_in_memory;
use fundhub_core::{
    new_id, EditProject, InMemoryUserDirectory, NewProject, ProjectService,
    SqliteProjectRepository, StoreError, UserSnapshot,
};
use rusqlite::Connection;

fn service<'a>(
    conn: &'a Connection,
    directory: &'a InMemoryUserDirectory,
) -> ProjectService<SqliteProjectRepository<'a>, &'a InMemoryUserDirectory> {
    ProjectService::new(SqliteProjectRepository::new(conn), directory)
}

fn draft(title: &str) -> NewProject {
    NewProject {
        title: title.to_string(),
        subtitle: "sub".to_string(),
        description: "long text".to_string(),
        category: "salud".to_string(),
        location: "Monterrey".to_string(),
        tags: vec!["AI".to_string(), "Climate".to_string()],
        duration: 30,
        image_url: "https://cdn.example.com/cover.png".to_string(),
        video_url: String::new(),
    }
}

#[test]
fn create_assigns_server_fields_and_lowercases_tags() {
    let conn = open_db_in_memory().unwrap();
    let directory = InMemoryUserDirectory::new();
    let service = service(&conn, &directory);
    let owner = new_id();

    let created = service
        .create_project(draft("Clean water"), &owner.to_string())
        .unwrap();
    assert_eq!(created.owner, owner);
    assert_eq!(created.views, 0);
    assert_eq!(created.votes_count, 0);
    assert!(created.created_at > 0);
    assert_eq!(created.tags, vec!["ai", "climate"]);

    let loaded = service.get_project(&created.id.to_string()).unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn create_ignores_server_fields_in_payload() {
    let conn = open_db_in_memory().unwrap();
    let directory = InMemoryUserDirectory::new();
    let service = service(&conn, &directory);

    let payload: NewProject = serde_json::from_str(
        r#"{"title":"Bees","views":99,"votes_count":5,"owner":"someone","tags":["Honey"]}"#,
    )
    .unwrap();
    let created = service
        .create_project(payload, &new_id().to_string())
        .unwrap();
    assert_eq!(created.views, 0);
    assert_eq!(created.votes_count, 0);
    assert_eq!(created.tags, vec!["honey"]);
}

#[test]
fn create_keeps_duplicate_tags_in_order() {
    let conn = open_db_in_memory().unwrap();
    let directory = InMemoryUserDirectory::new();
    let service = service(&conn, &directory);

    let created = service
        .create_project(
            NewProject {
                tags: vec!["Solar".into(), "wind".into(), "SOLAR".into()],
                ..NewProject::default()
            },
            &new_id().to_string(),
        )
        .unwrap();
    let loaded = service.get_project(&created.id.to_string()).unwrap();
    assert_eq!(loaded.tags, vec!["solar", "wind", "solar"]);
}

#[test]
fn create_rejects_malformed_owner() {
    let conn = open_db_in_memory().unwrap();
    let directory = InMemoryUserDirectory::new();
    let service = service(&conn, &directory);

    let err = service.create_project(draft("x"), "not-an-id").unwrap_err();
    assert!(matches!(err, StoreError::InvalidIdentifier(_)));
}

#[test]
fn get_discriminates_not_found_from_invalid_identifier() {
    let conn = open_db_in_memory().unwrap();
    let directory = InMemoryUserDirectory::new();
    let service = service(&conn, &directory);
    let missing = new_id();

    let err = service.get_project(&missing.to_string()).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(id) if id == missing));

    let err = service.get_project("zzz").unwrap_err();
    assert!(matches!(err, StoreError::InvalidIdentifier(_)));
}

#[test]
fn update_changes_display_fields_only() {
    let conn = open_db_in_memory().unwrap();
    let directory = InMemoryUserDirectory::new();
    let service = service(&conn, &directory);
    let owner = new_id();
    let voter = new_id();

    let created = service
        .create_project(draft("Old title"), &owner.to_string())
        .unwrap();
    let project_id = created.id.to_string();
    service.vote(&project_id, &voter.to_string(), true).unwrap();
    service.view_project(&project_id).unwrap();
    service
        .add_comment(&project_id, &voter.to_string(), "first!")
        .unwrap();
    service
        .add_contribution(&project_id, &voter.to_string(), 10.0)
        .unwrap();

    let mut stale = created.clone();
    let edit: EditProject = serde_json::from_str(
        r#"{"title":"New title","category":"educacion","tags":["Kids"],
            "duration":45,"views":1000,"owner":"x","votes":[]}"#,
    )
    .unwrap();
    service.update_project(&mut stale, &edit).unwrap();
    assert_eq!(stale.title, "New title");

    let loaded = service.get_project(&project_id).unwrap();
    assert_eq!(loaded.title, "New title");
    assert_eq!(loaded.category, "educacion");
    assert_eq!(loaded.tags, vec!["kids"]);
    assert_eq!(loaded.duration, 45);
    assert_eq!(loaded.subtitle, "");
    assert_eq!(loaded.id, created.id);
    assert_eq!(loaded.owner, owner);
    assert_eq!(loaded.created_at, created.created_at);
    assert_eq!(loaded.votes, vec![voter]);
    assert_eq!(loaded.votes_count, 1);
    assert_eq!(loaded.views, 1);
    assert_eq!(loaded.comments.len(), 1);
    assert_eq!(loaded.contributions.len(), 1);
}

#[test]
fn update_of_deleted_project_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let directory = InMemoryUserDirectory::new();
    let service = service(&conn, &directory);

    let mut created = service
        .create_project(draft("Gone"), &new_id().to_string())
        .unwrap();
    service.delete_project(&created.id.to_string()).unwrap();

    let err = service
        .update_project(&mut created, &EditProject::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn delete_is_permanent_and_removes_children() {
    let conn = open_db_in_memory().unwrap();
    let directory = InMemoryUserDirectory::new();
    let service = service(&conn, &directory);
    let user = new_id().to_string();

    let created = service.create_project(draft("Temp"), &user).unwrap();
    let id = created.id.to_string();
    service.vote(&id, &user, true).unwrap();
    service.add_comment(&id, &user, "bye").unwrap();
    service.delete_project(&id).unwrap();

    assert!(matches!(
        service.get_project(&id).unwrap_err(),
        StoreError::NotFound(_)
    ));
    assert!(matches!(
        service.delete_project(&id).unwrap_err(),
        StoreError::NotFound(_)
    ));
    for table in ["project_tags", "project_votes", "project_comments"] {
        let leftover: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(leftover, 0, "{table} should be empty");
    }
}

#[test]
fn delete_owned_checks_owner() {
    let conn = open_db_in_memory().unwrap();
    let directory = InMemoryUserDirectory::new();
    let service = service(&conn, &directory);
    let owner = new_id().to_string();
    let stranger = new_id().to_string();

    let created = service.create_project(draft("Mine"), &owner).unwrap();
    let id = created.id.to_string();

    let err = service.delete_owned_project(&id, &stranger).unwrap_err();
    assert!(matches!(err, StoreError::NotOwner { .. }));
    service.delete_owned_project(&id, &owner).unwrap();
    assert!(matches!(
        service.delete_owned_project(&id, &owner).unwrap_err(),
        StoreError::NotFound(_)
    ));
}

#[test]
fn view_increments_and_reports_missing() {
    let conn = open_db_in_memory().unwrap();
    let directory = InMemoryUserDirectory::new();
    let service = service(&conn, &directory);

    let created = service
        .create_project(draft("Seen"), &new_id().to_string())
        .unwrap();
    let id = created.id.to_string();
    for _ in 0..3 {
        service.view_project(&id).unwrap();
    }
    assert_eq!(service.get_project(&id).unwrap().views, 3);

    let err = service.view_project(&new_id().to_string()).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn comments_and_contributions_append_in_order_with_fresh_authors() {
    let conn = open_db_in_memory().unwrap();
    let directory = InMemoryUserDirectory::new();
    let service = service(&conn, &directory);
    let alice = new_id();
    let bob = new_id();
    directory.insert(UserSnapshot {
        id: alice,
        name: "Alice".into(),
        avatar: "alice.png".into(),
    });
    directory.insert(UserSnapshot {
        id: bob,
        name: "Bob".into(),
        avatar: "bob.png".into(),
    });

    let created = service
        .create_project(draft("Thread"), &alice.to_string())
        .unwrap();
    let id = created.id.to_string();
    service.add_comment(&id, &alice.to_string(), "one").unwrap();
    service.add_comment(&id, &bob.to_string(), "two").unwrap();
    service
        .add_contribution(&id, &bob.to_string(), 12.5)
        .unwrap();

    let loaded = service.get_project(&id).unwrap();
    let texts: Vec<_> = loaded.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two"]);
    assert_eq!(loaded.comments[1].author.name, "Bob");
    assert_eq!(loaded.contributions[0].amount, 12.5);
    assert_eq!(loaded.contributions[0].user.avatar, "bob.png");

    let stored_name: String = conn
        .query_row(
            "SELECT author_name FROM project_comments ORDER BY seq LIMIT 1;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(stored_name.is_empty(), "author snapshot is filled on read only");
}

#[test]
fn appends_to_missing_project_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let directory = InMemoryUserDirectory::new();
    let service = service(&conn, &directory);
    let missing = new_id().to_string();
    let user = new_id().to_string();

    assert!(matches!(
        service.add_comment(&missing, &user, "hi").unwrap_err(),
        StoreError::NotFound(_)
    ));
    assert!(matches!(
        service.add_contribution(&missing, &user, 1.0).unwrap_err(),
        StoreError::NotFound(_)
    ));
    assert!(matches!(
        service.add_comment(&missing, "bad", "hi").unwrap_err(),
        StoreError::InvalidIdentifier(_)
    ));
}

#[test]
fn negative_contribution_is_rejected_before_storage() {
    let conn = open_db_in_memory().unwrap();
    let directory = InMemoryUserDirectory::new();
    let service = service(&conn, &directory);

    let created = service
        .create_project(draft("Fund me"), &new_id().to_string())
        .unwrap();
    let err = service
        .add_contribution(&created.id.to_string(), &new_id().to_string(), -5.0)
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidAmount(_)));
    assert!(service
        .get_project(&created.id.to_string())
        .unwrap()
        .contributions
        .is_empty());
}
