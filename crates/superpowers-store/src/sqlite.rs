use crate::{parse_scripts, parse_tools, RecordStore, Result, StoreError};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use superpowers_types::{Agent, Document, Superpower};
use tracing::{debug, info};

/// Record store backed by SQLite
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a database file and run migrations
    pub async fn new(database_path: &str) -> Result<Self> {
        let database_url = format!("sqlite:{}?mode=rwc", database_path);
        let pool = SqlitePool::connect(&database_url).await?;

        let store = Self { pool };
        store.run_migrations().await?;

        info!("Record store initialized with database: {}", database_path);
        Ok(store)
    }

    /// Private in-memory database; a single connection keeps it alive
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS superpowers (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                tools TEXT NOT NULL DEFAULT '[]',
                scripts TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                base_prompt TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS agent_superpowers (
                agent_id TEXT NOT NULL,
                superpower_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (agent_id, superpower_id),
                FOREIGN KEY (agent_id) REFERENCES agents(id) ON DELETE CASCADE,
                FOREIGN KEY (superpower_id) REFERENCES superpowers(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                name TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (agent_id) REFERENCES agents(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_documents_agent_id ON documents(agent_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("Database migrations completed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Superpowers
    // ------------------------------------------------------------------

    /// All superpowers, ordered by name
    pub async fn list_superpowers(&self) -> Result<Vec<Superpower>> {
        let rows = sqlx::query(
            "SELECT id, name, description, content, tools, scripts FROM superpowers ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(superpower_from_row).collect()
    }

    /// Insert a superpower, keeping its id
    pub async fn add_superpower(&self, superpower: &Superpower) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO superpowers (id, name, description, content, tools, scripts)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&superpower.id)
        .bind(&superpower.name)
        .bind(&superpower.description)
        .bind(&superpower.content)
        .bind(serde_json::to_string(&superpower.tools)?)
        .bind(serde_json::to_string(&superpower.scripts)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace a superpower's fields; `false` when the id is unknown
    pub async fn update_superpower(&self, superpower: &Superpower) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE superpowers
            SET name = ?, description = ?, content = ?, tools = ?, scripts = ?
            WHERE id = ?
            "#,
        )
        .bind(&superpower.name)
        .bind(&superpower.description)
        .bind(&superpower.content)
        .bind(serde_json::to_string(&superpower.tools)?)
        .bind(serde_json::to_string(&superpower.scripts)?)
        .bind(&superpower.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a superpower; agent links go with it
    pub async fn delete_superpower(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM superpowers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------
    // Agents
    // ------------------------------------------------------------------

    /// All agents, ordered by name
    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        let rows = sqlx::query("SELECT id, name, base_prompt FROM agents ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut agents = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id")?;
            let superpower_ids = self.superpower_ids_for(&id).await?;
            agents.push(Agent {
                id,
                name: row.try_get("name")?,
                base_prompt: row.try_get("base_prompt")?,
                superpower_ids,
            });
        }
        Ok(agents)
    }

    /// Insert an agent and its superpower links
    pub async fn add_agent(&self, agent: &Agent) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO agents (id, name, base_prompt) VALUES (?, ?, ?)")
            .bind(&agent.id)
            .bind(&agent.name)
            .bind(&agent.base_prompt)
            .execute(&mut *tx)
            .await?;

        for (position, superpower_id) in agent.superpower_ids.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO agent_superpowers (agent_id, superpower_id, position) VALUES (?, ?, ?)",
            )
            .bind(&agent.id)
            .bind(superpower_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Replace an agent's fields and superpower links in one transaction
    pub async fn update_agent(&self, agent: &Agent) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE agents SET name = ?, base_prompt = ? WHERE id = ?")
            .bind(&agent.name)
            .bind(&agent.base_prompt)
            .bind(&agent.id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM agent_superpowers WHERE agent_id = ?")
            .bind(&agent.id)
            .execute(&mut *tx)
            .await?;

        for (position, superpower_id) in agent.superpower_ids.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO agent_superpowers (agent_id, superpower_id, position) VALUES (?, ?, ?)",
            )
            .bind(&agent.id)
            .bind(superpower_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Delete an agent together with its links and documents
    pub async fn delete_agent(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM agents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn superpower_ids_for(&self, agent_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT superpower_id FROM agent_superpowers WHERE agent_id = ? ORDER BY position ASC",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get("superpower_id").map_err(StoreError::from))
            .collect()
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// Store an uploaded CSV document for an agent
    pub async fn add_document(&self, document: &Document) -> Result<()> {
        if !document.name.to_lowercase().ends_with(".csv") {
            return Err(StoreError::InvalidDocument {
                name: document.name.clone(),
                reason: "only .csv files are accepted".to_string(),
            });
        }

        if self.get_agent(&document.agent_id).await?.is_none() {
            return Err(StoreError::NotFound {
                kind: "agent",
                id: document.agent_id.clone(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO documents (id, agent_id, name, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.agent_id)
        .bind(&document.name)
        .bind(&document.content)
        .bind(document.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>> {
        let row = sqlx::query("SELECT id, name, base_prompt FROM agents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Agent {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            base_prompt: row.try_get("base_prompt")?,
            superpower_ids: self.superpower_ids_for(id).await?,
        }))
    }

    async fn get_superpowers(&self, ids: &[String]) -> Result<Vec<Superpower>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, name, description, content, tools, scripts FROM superpowers WHERE id IN ({}) ORDER BY name ASC",
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(superpower_from_row).collect()
    }

    async fn get_documents(&self, agent_id: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            r#"
            SELECT id, agent_id, name, content, created_at
            FROM documents
            WHERE agent_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let created_at: String = row.try_get("created_at")?;
                let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .unwrap_or_else(|_| chrono::Utc::now());

                Ok(Document {
                    id: row.try_get("id")?,
                    agent_id: row.try_get("agent_id")?,
                    name: row.try_get("name")?,
                    content: row.try_get("content")?,
                    created_at,
                })
            })
            .collect()
    }
}

fn superpower_from_row(row: &SqliteRow) -> Result<Superpower> {
    let tools: String = row.try_get("tools")?;
    let scripts: String = row.try_get("scripts")?;

    Ok(Superpower {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        content: row.try_get("content")?,
        tools: parse_tools(&tools),
        scripts: parse_scripts(&scripts),
    })
}
