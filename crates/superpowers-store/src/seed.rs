use crate::{Result, SqliteStore};
use superpowers_types::{Agent, Superpower};
use tracing::info;

/// Populate an empty store with one superpower and one agent using it.
///
/// Returns `false` without touching anything when superpowers already exist.
pub async fn seed_defaults(store: &SqliteStore) -> Result<bool> {
    if !store.list_superpowers().await?.is_empty() {
        info!("Default data already present, skipping seed");
        return Ok(false);
    }

    let superpower = Superpower::new("HTTP Fetcher", "Call external APIs via HTTP.")
        .with_content("Uses http_call to perform curl-like requests and return responses.")
        .with_tool("http_call");
    store.add_superpower(&superpower).await?;

    let agent = Agent::new(
        "Researcher Bot",
        "You are a helpful researcher. Use your superpower to answer questions.",
    )
    .with_superpower(superpower.id.clone());
    store.add_agent(&agent).await?;

    info!(superpower = %superpower.name, agent = %agent.name, "Seeded default data");
    Ok(true)
}
