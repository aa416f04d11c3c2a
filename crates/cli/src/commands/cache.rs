use anyhow::Result;
use ora2pg_assist_core::ClientId;

use crate::build_state;

pub(crate) async fn stats(database_url: Option<&str>, client_id: ClientId) -> Result<()> {
    let state = build_state(database_url).await?;
    state.sessions.get_client(client_id).await?;
    let stats = state.cache.stats(client_id).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

pub(crate) async fn clear(database_url: Option<&str>, client_id: ClientId, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("refusing to clear the cache of client {client_id} without --yes");
    }
    let state = build_state(database_url).await?;
    state.sessions.get_client(client_id).await?;
    let removed = state.cache.clear(client_id).await?;
    println!("Removed {removed} cached correction(s) for client {client_id}");
    Ok(())
}
