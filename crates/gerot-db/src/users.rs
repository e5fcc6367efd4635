use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    models::{NewUser, SessionRecord, UserRecord, UserUpdate},
    password, Database, Error, Result,
};

const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, role, sector_id, \
     is_active, first_login, last_login, created_at, updated_at";

pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

impl Database {
    // ========================================================================
    // Users
    // ========================================================================

    pub async fn create_user(&self, user: &NewUser) -> Result<UserRecord> {
        let username = normalize_username(&user.username);
        if username.is_empty() {
            return Err(Error::Validation("username is required".to_string()));
        }
        let password_hash = match user.password.as_deref() {
            Some(p) => Some(password::hash_password(p)?),
            None => None,
        };
        let email = user
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (
                username, email, password_hash, full_name, role, sector_id,
                is_active, first_login, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, 1, 1, ?, ?)
            "#,
        )
        .bind(&username)
        .bind(email)
        .bind(password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.sector_id)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|e| Error::conflict_on_unique(e, "user"))?;

        self.get_user(result.last_insert_rowid())
            .await?
            .ok_or_else(|| Error::NotFound("user".to_string()))
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(normalize_username(username))
        .fetch_optional(self.pool())
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(self.pool())
        .await?;

        Ok(user)
    }

    /// Looks a login identifier up as a username first, then as an email.
    pub async fn find_login(&self, identifier: &str) -> Result<Option<UserRecord>> {
        if let Some(user) = self.get_user_by_username(identifier).await? {
            return Ok(Some(user));
        }
        if identifier.contains('@') {
            return self.get_user_by_email(identifier).await;
        }
        Ok(None)
    }

    pub async fn list_users(&self, sector_id: Option<i64>) -> Result<Vec<UserRecord>> {
        let users = match sector_id {
            Some(sector_id) => {
                sqlx::query_as::<_, UserRecord>(&format!(
                    "SELECT {} FROM users WHERE sector_id = ? ORDER BY username",
                    USER_COLUMNS
                ))
                .bind(sector_id)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, UserRecord>(&format!(
                    "SELECT {} FROM users ORDER BY username",
                    USER_COLUMNS
                ))
                .fetch_all(self.pool())
                .await?
            }
        };

        Ok(users)
    }

    /// Active users holding `role` in a sector.
    pub async fn users_in_sector_with_role(
        &self,
        sector_id: i64,
        role: gerot_core::Role,
    ) -> Result<Vec<UserRecord>> {
        let users = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE sector_id = ? AND role = ? AND is_active = 1 ORDER BY id",
            USER_COLUMNS
        ))
        .bind(sector_id)
        .bind(role.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(users)
    }

    /// Absent fields are left unchanged; a blank email clears it.
    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<UserRecord> {
        let email = update.email.as_deref().map(|e| e.trim().to_lowercase());

        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = CASE WHEN ? = '' THEN NULL ELSE COALESCE(?, email) END,
                full_name = COALESCE(?, full_name),
                role = COALESCE(?, role),
                sector_id = COALESCE(?, sector_id),
                is_active = COALESCE(?, is_active),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&email)
        .bind(&email)
        .bind(&update.full_name)
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.sector_id)
        .bind(update.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| Error::conflict_on_unique(e, "email"))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {}", id)));
        }
        self.get_user(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {}", id)))
    }

    /// Stores a new password and clears the first-login flag.
    pub async fn set_password(&self, id: i64, new_password: &str) -> Result<()> {
        let hash = password::hash_password(new_password)?;
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, first_login = 0, updated_at = ? WHERE id = ?",
        )
        .bind(hash)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    pub async fn touch_last_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Soft delete: the row stays for history, but the user can no longer log in.
    pub async fn deactivate_user(&self, id: i64) -> Result<()> {
        let now = Utc::now();
        let result = sqlx::query("UPDATE users SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {}", id)));
        }

        sqlx::query("UPDATE sessions SET revoked_at = ? WHERE user_id = ? AND revoked_at IS NULL")
            .bind(now)
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    pub async fn count_users(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = 1")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    pub async fn create_session(&self, user_id: i64, ttl: Duration) -> Result<SessionRecord> {
        let now = Utc::now();
        let session = SessionRecord {
            id: Uuid::new_v4().to_string(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
            revoked_at: None,
        };

        sqlx::query(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(self.pool())
        .await?;

        Ok(session)
    }

    /// Returns the session only while it is neither revoked nor expired.
    pub async fn get_active_session(&self, id: &str) -> Result<Option<SessionRecord>> {
        let session = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, user_id, created_at, expires_at, revoked_at FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(session.filter(|s| is_live(s, Utc::now())))
    }

    /// Deletes revoked and expired sessions. Returns how many were removed.
    pub async fn prune_sessions(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM sessions WHERE revoked_at IS NOT NULL OR expires_at <= ?",
        )
        .bind(Utc::now())
        .execute(self.pool())
        .await?;

        if result.rows_affected() > 0 {
            tracing::debug!("Pruned {} stale session(s)", result.rows_affected());
        }
        Ok(result.rows_affected())
    }

    pub async fn revoke_session(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE sessions SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

fn is_live(session: &SessionRecord, now: DateTime<Utc>) -> bool {
    session.revoked_at.is_none() && session.expires_at > now
}
