use chrono::Utc;

use crate::{models::NotificationRecord, Database, Error, Result};

impl Database {
    pub async fn create_notification(
        &self,
        user_id: i64,
        kind: &str,
        message: &str,
        entity: Option<(&str, i64)>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, message, entity_type, entity_id, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(message)
        .bind(entity.map(|(t, _)| t))
        .bind(entity.map(|(_, id)| id))
        .bind(Utc::now())
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn list_notifications(
        &self,
        user_id: i64,
        unread_only: bool,
    ) -> Result<Vec<NotificationRecord>> {
        let sql = if unread_only {
            "SELECT * FROM notifications WHERE user_id = ? AND is_read = 0 ORDER BY created_at DESC, id DESC"
        } else {
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        };

        let notifications = sqlx::query_as::<_, NotificationRecord>(sql)
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;
        Ok(notifications)
    }

    /// Marks one of the user's notifications read; other users' notifications are not found.
    pub async fn mark_notification_read(&self, id: i64, user_id: i64) -> Result<()> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("notification {}", id)));
        }
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self, user_id: i64) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
                .bind(user_id)
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_notification_count(&self, user_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use gerot_core::Role;

    #[tokio::test]
    async fn test_notification_lifecycle() {
        let db = Database::in_memory().await.unwrap();
        let mut ids = Vec::new();
        for name in ["lider", "outro"] {
            let user = db
                .create_user(&NewUser {
                    username: name.to_string(),
                    email: None,
                    password: None,
                    full_name: None,
                    role: Role::Lider,
                    sector_id: None,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        let (lider, outro) = (ids[0], ids[1]);

        let first = db
            .create_notification(lider, "task_completed", "Ana concluiu: relatório", Some(("checklist", 1)))
            .await
            .unwrap();
        db.create_notification(lider, "info", "Bem-vindo", None).await.unwrap();
        assert_eq!(db.unread_notification_count(lider).await.unwrap(), 2);

        assert!(matches!(
            db.mark_notification_read(first, outro).await,
            Err(Error::NotFound(_))
        ));
        db.mark_notification_read(first, lider).await.unwrap();

        let unread = db.list_notifications(lider, true).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].kind, "info");
        assert_eq!(db.list_notifications(lider, false).await.unwrap().len(), 2);

        assert_eq!(db.mark_all_notifications_read(lider).await.unwrap(), 1);
        assert_eq!(db.unread_notification_count(lider).await.unwrap(), 0);
    }
}
