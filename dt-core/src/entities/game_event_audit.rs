//! The `game_event_audit` table.
//!
//! Append-only snapshot of every lifecycle transition: previous and next
//! state by name, the triggering event code, who did it and the payload
//! that went with it.

use sqlx::Postgres;

use crate::clock::now_ms;

#[derive(Debug, Clone)]
pub struct GameEventAudit {
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    pub event_type: i16,
    pub prev_state: String,
    pub next_state: String,
    pub operator: String,
    pub source: String,
    pub payload: String,
    pub trace_id: String,
}

impl GameEventAudit {
    pub async fn insert_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO game_event_audit
                (game_id, room_id, game_round_id, event_type, prev_state, next_state,
                 operator, source, payload, trace_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&self.game_id)
        .bind(&self.room_id)
        .bind(&self.game_round_id)
        .bind(self.event_type)
        .bind(&self.prev_state)
        .bind(&self.next_state)
        .bind(&self.operator)
        .bind(&self.source)
        .bind(&self.payload)
        .bind(&self.trace_id)
        .bind(now_ms())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
