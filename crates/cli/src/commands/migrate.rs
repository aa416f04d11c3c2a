//! Synchronous migration run from the command line.

use anyhow::Result;
use ora2pg_assist_core::{ClientId, MigrationOptions, ObjectType, WorkflowStatus};

use crate::build_state;

pub(crate) fn options(
    clean_slate: bool,
    no_auto_create: bool,
    session_name: Option<String>,
    types: Vec<ObjectType>,
) -> MigrationOptions {
    MigrationOptions {
        clean_slate,
        auto_create_ddl: !no_auto_create,
        session_name,
        object_types: if types.is_empty() { None } else { Some(types) },
    }
}

pub(crate) async fn run(
    database_url: Option<&str>,
    client_id: ClientId,
    options: MigrationOptions,
) -> Result<()> {
    let state = build_state(database_url).await?;
    let session = state.orchestrator.run_migration(client_id, options).await?;
    println!("{}", serde_json::to_string_pretty(&session.redacted())?);
    if session.status == WorkflowStatus::Failed {
        anyhow::bail!("migration session {} failed", session.id);
    }
    Ok(())
}
