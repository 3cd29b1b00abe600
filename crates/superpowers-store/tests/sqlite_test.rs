//! SQLite record store against a private in-memory database

use superpowers_store::{seed_defaults, RecordStore, SqliteStore, StoreError};
use superpowers_types::{Agent, Document, Script, Superpower};

async fn store() -> SqliteStore {
    SqliteStore::in_memory().await.expect("in-memory store")
}

#[tokio::test]
async fn test_seed_is_idempotent() {
    let store = store().await;

    assert!(seed_defaults(&store).await.unwrap());
    assert!(!seed_defaults(&store).await.unwrap());

    let agents = store.list_agents().await.unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].name, "Researcher Bot");

    let skills = store.get_superpowers(&agents[0].superpower_ids).await.unwrap();
    assert_eq!(skills.len(), 1);
    assert_eq!(skills[0].tools, vec![serde_json::json!("http_call")]);
}

#[tokio::test]
async fn test_superpower_round_trips_scripts_and_tools() {
    let store = store().await;
    let skill = Superpower::new("Appointment Scheduler", "Books appointments")
        .with_content("Use run_script.")
        .with_tool("run_script")
        .with_tool(serde_json::json!(7))
        .with_script(Script::new("checkAvailability", "function main() { return []; }"));
    store.add_superpower(&skill).await.unwrap();

    let loaded = store.get_superpowers(&[skill.id.clone()]).await.unwrap();
    assert_eq!(loaded, vec![skill.clone()]);

    let mut edited = skill.clone();
    edited.description = "Books and cancels appointments".into();
    assert!(store.update_superpower(&edited).await.unwrap());
    assert!(!store
        .update_superpower(&Superpower::new("ghost", "").with_id("missing"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_agent_links_keep_order_and_collapse_duplicates() {
    let store = store().await;
    let a = Superpower::new("B skill", "").with_id("sp-b");
    let b = Superpower::new("A skill", "").with_id("sp-a");
    store.add_superpower(&a).await.unwrap();
    store.add_superpower(&b).await.unwrap();

    let agent = Agent::new("Bot", "base")
        .with_superpower("sp-b")
        .with_superpower("sp-a")
        .with_superpower("sp-b");
    store.add_agent(&agent).await.unwrap();

    let loaded = store.get_agent(&agent.id).await.unwrap().unwrap();
    assert_eq!(loaded.superpower_ids, vec!["sp-b".to_string(), "sp-a".to_string()]);

    let mut edited = loaded.clone();
    edited.superpower_ids = vec!["sp-a".into()];
    assert!(store.update_agent(&edited).await.unwrap());
    let reloaded = store.get_agent(&agent.id).await.unwrap().unwrap();
    assert_eq!(reloaded.superpower_ids, vec!["sp-a".to_string()]);

    assert!(store.delete_superpower("sp-a").await.unwrap());
    let reloaded = store.get_agent(&agent.id).await.unwrap().unwrap();
    assert!(reloaded.superpower_ids.is_empty());
}

#[tokio::test]
async fn test_documents_belong_to_agents() {
    let store = store().await;
    let agent = Agent::new("Bot", "base");
    store.add_agent(&agent).await.unwrap();

    store
        .add_document(&Document::new(&agent.id, "products.csv", "id,name\n1,Widget"))
        .await
        .unwrap();

    let rejected = store
        .add_document(&Document::new(&agent.id, "notes.txt", "hello"))
        .await;
    assert!(matches!(rejected, Err(StoreError::InvalidDocument { .. })));

    let orphan = store
        .add_document(&Document::new("nobody", "x.csv", "a"))
        .await;
    assert!(matches!(orphan, Err(StoreError::NotFound { kind: "agent", .. })));

    let docs = store.get_documents(&agent.id).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].name, "products.csv");

    assert!(store.delete_agent(&agent.id).await.unwrap());
    assert!(store.get_documents(&agent.id).await.unwrap().is_empty());
    assert!(store.get_agent(&agent.id).await.unwrap().is_none());
}
