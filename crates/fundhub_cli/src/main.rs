//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `fundhub_core` linkage.
//! - Exercise a full store round trip against an in-memory database.

use fundhub_core::db::migrations::current_version;
use fundhub_core::db::open_db_in_memory;
use fundhub_core::{
    new_id, InMemoryUserDirectory, NewProject, ProjectService, SqliteProjectRepository,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("fundhub_core ping={}", fundhub_core::ping());
    println!("fundhub_core version={}", fundhub_core::core_version());

    match smoke() {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("fundhub_core smoke failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn smoke() -> Result<String, Box<dyn std::error::Error>> {
    let conn = open_db_in_memory()?;
    let directory = InMemoryUserDirectory::new();
    let service = ProjectService::new(SqliteProjectRepository::new(&conn), &directory);

    let owner = new_id().to_string();
    let created = service.create_project(
        NewProject {
            title: "smoke".to_string(),
            ..NewProject::default()
        },
        &owner,
    )?;
    service.vote(&created.id.to_string(), &owner, true)?;
    let loaded = service.get_project(&created.id.to_string())?;

    Ok(format!(
        "fundhub_core schema={} votes_count={}",
        current_version(&conn)?,
        loaded.votes_count
    ))
}
