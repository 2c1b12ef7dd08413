use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::quest::persistence::{self, SAVE_VERSION};
use crate::quest::PlayerQuestState;

/// SQLite store for per-player quest saves
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        // Run migrations
        Self::migrate(&pool).await?;

        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS player_quest_state (
                player_id TEXT PRIMARY KEY NOT NULL,
                save_version INTEGER NOT NULL,
                state_json TEXT NOT NULL DEFAULT '{}',
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Insert or replace a player's quest state
    pub async fn save_quest_state(
        &self,
        player_id: &str,
        state: &PlayerQuestState,
    ) -> Result<(), String> {
        let state_json = persistence::to_json(state)
            .map_err(|e| format!("Failed to encode quest state: {}", e))?;

        sqlx::query(
            r#"INSERT INTO player_quest_state (player_id, save_version, state_json)
            VALUES (?, ?, ?)
            ON CONFLICT(player_id) DO UPDATE SET
                save_version = excluded.save_version,
                state_json = excluded.state_json,
                updated_at = CURRENT_TIMESTAMP"#,
        )
        .bind(player_id)
        .bind(SAVE_VERSION as i64)
        .bind(&state_json)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Database error: {}", e))?;

        tracing::debug!(
            "Saved quest state for {}: {} active, {} completed",
            player_id,
            state.active_quests.len(),
            state.completed_quests.len()
        );
        Ok(())
    }

    /// Load a player's quest state, migrating older saves
    pub async fn load_quest_state(
        &self,
        player_id: &str,
    ) -> Result<Option<PlayerQuestState>, String> {
        let row = sqlx::query("SELECT state_json FROM player_quest_state WHERE player_id = ?")
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| format!("Database error: {}", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let state_json: String = row.get("state_json");
        persistence::from_json(&state_json)
            .map(Some)
            .map_err(|e| format!("Failed to decode quest state for {}: {}", player_id, e))
    }

    /// Remove a player's save; returns whether one existed
    pub async fn delete_quest_state(&self, player_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM player_quest_state WHERE player_id = ?")
            .bind(player_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
