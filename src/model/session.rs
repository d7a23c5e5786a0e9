use crate::model::data::TokenResponse;
use crate::model::Db;
use crate::error::Error;
use crate::Result;
use chrono::{NaiveDateTime, TimeDelta};
use log::debug;
use sqlx::FromRow;

/// Signed-in staff member for one chat. Carries the WordPress bearer token.
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct Session {
    pub chat_id: i64,
    pub user_id: i64,
    pub display_name: String,
    pub email: String,
    pub token: String,
    pub created_on: NaiveDateTime,
    pub expires_on: NaiveDateTime,
}

impl Session {
    pub fn issue(chat_id: i64, auth: TokenResponse, now: NaiveDateTime, days: i64) -> Result<Session> {
        let token = auth
            .token
            .filter(|t| !t.is_empty())
            .ok_or(Error::AuthFailed)?;
        Ok(Session {
            chat_id,
            user_id: auth.user_id.and_then(|id| id.as_i64()).unwrap_or_default(),
            display_name: auth.user_display_name.unwrap_or_default(),
            email: auth.user_email.unwrap_or_default(),
            token,
            created_on: now,
            expires_on: now + TimeDelta::days(days),
        })
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_on <= now
    }
}

impl Db {
    pub async fn save_session(&self, s: &Session) -> Result<()> {
        debug!("save session for chat {} user {}", s.chat_id, s.user_id);
        sqlx::query(
            r#"
                INSERT INTO session (chat_id, user_id, display_name, email, token, created_on, expires_on)
                VALUES($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT(chat_id) DO UPDATE SET
                    user_id = excluded.user_id,
                    display_name = excluded.display_name,
                    email = excluded.email,
                    token = excluded.token,
                    created_on = excluded.created_on,
                    expires_on = excluded.expires_on"#,
        )
        .bind(s.chat_id)
        .bind(s.user_id)
        .bind(&s.display_name)
        .bind(&s.email)
        .bind(&s.token)
        .bind(s.created_on)
        .bind(s.expires_on)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// The live session of a chat, if it has not expired.
    pub async fn read_session(&self, chat_id: i64, now: NaiveDateTime) -> Result<Option<Session>> {
        let session: Option<Session> = sqlx::query_as("SELECT * FROM session WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(session.filter(|s| !s.is_expired(now)))
    }

    pub async fn delete_session(&self, chat_id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM session WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn purge_expired_sessions(&self, now: NaiveDateTime) -> Result<u64> {
        let res = sqlx::query("DELETE FROM session WHERE expires_on <= $1")
            .bind(now)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
