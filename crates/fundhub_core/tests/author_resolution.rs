use fundhub_core::db::open_db_in_memory;
use fundhub_core::{
    new_id, NewProject, ProjectService, SqliteProjectRepository, SqliteUserDirectory, UserDirectory,
    UserId, REMOVED_USER_NAME,
};
use rusqlite::{params, Connection};

fn insert_user(conn: &Connection, id: UserId, name: &str, avatar: &str) {
    conn.execute(
        "INSERT INTO users (uuid, name, avatar_url) VALUES (?1, ?2, ?3);",
        params![id.to_string(), name, avatar],
    )
    .unwrap();
}

#[test]
fn deleted_author_renders_as_sentinel_without_error() {
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::new(
        SqliteProjectRepository::new(&conn),
        SqliteUserDirectory::new(&conn),
    );
    let author = new_id();
    insert_user(&conn, author, "Carla", "carla.png");

    let project = service
        .create_project(NewProject::default(), &author.to_string())
        .unwrap();
    let id = project.id.to_string();
    service
        .add_comment(&id, &author.to_string(), "count me in")
        .unwrap();

    let loaded = service.get_project(&id).unwrap();
    assert_eq!(loaded.comments[0].author.name, "Carla");
    assert_eq!(loaded.comments[0].author.avatar, "carla.png");

    conn.execute("DELETE FROM users WHERE uuid = ?1;", [author.to_string()])
        .unwrap();

    let loaded = service.get_project(&id).unwrap();
    let rendered = &loaded.comments[0].author;
    assert_eq!(rendered.id, author);
    assert_eq!(rendered.name, REMOVED_USER_NAME);
    assert!(rendered.avatar.is_empty());
    assert_eq!(loaded.comments[0].text, "count me in");
}

#[test]
fn renamed_user_is_picked_up_on_next_read() {
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::new(
        SqliteProjectRepository::new(&conn),
        SqliteUserDirectory::new(&conn),
    );
    let backer = new_id();
    insert_user(&conn, backer, "Old name", "");

    let project = service
        .create_project(NewProject::default(), &new_id().to_string())
        .unwrap();
    let id = project.id.to_string();
    service
        .add_contribution(&id, &backer.to_string(), 100.0)
        .unwrap();

    conn.execute(
        "UPDATE users SET name = 'New name', avatar_url = 'new.png' WHERE uuid = ?1;",
        [backer.to_string()],
    )
    .unwrap();

    let listed = service.contributed_projects(&backer.to_string()).unwrap();
    assert_eq!(listed[0].contributions[0].user.name, "New name");
    assert_eq!(listed[0].contributions[0].user.avatar, "new.png");
}

#[test]
fn list_results_are_resolved_without_touching_storage() {
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::new(
        SqliteProjectRepository::new(&conn),
        SqliteUserDirectory::new(&conn),
    );
    let present = new_id();
    let absent = new_id();
    insert_user(&conn, present, "Dana", "dana.png");

    for title in ["first", "second"] {
        let project = service
            .create_project(
                NewProject {
                    title: title.to_string(),
                    ..NewProject::default()
                },
                &present.to_string(),
            )
            .unwrap();
        let id = project.id.to_string();
        service.add_comment(&id, &present.to_string(), "hi").unwrap();
        service.add_comment(&id, &absent.to_string(), "yo").unwrap();
    }

    let projects = service.full_search("", "todos", "").unwrap();
    assert_eq!(projects.len(), 2);
    for project in &projects {
        assert_eq!(project.comments[0].author.name, "Dana");
        assert_eq!(project.comments[1].author.name, REMOVED_USER_NAME);
        assert_eq!(project.comments[1].author.id, absent);
    }

    let stored: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM project_comments WHERE author_name <> '';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, 0);
}

#[test]
fn sqlite_directory_batch_lookup() {
    let conn = open_db_in_memory().unwrap();
    let directory = SqliteUserDirectory::new(&conn);
    let ids: Vec<UserId> = (0..3).map(|_| new_id()).collect();
    insert_user(&conn, ids[0], "A", "a.png");
    insert_user(&conn, ids[2], "C", "c.png");

    let found = directory.lookup_many(&ids).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[&ids[2]].avatar, "c.png");
    assert!(directory.lookup(ids[1]).is_err());
    assert_eq!(directory.lookup(ids[0]).unwrap().name, "A");
}
