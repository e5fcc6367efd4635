use chrono::Utc;

use crate::{
    models::{ActivityLog, NewActivity},
    Database, Result,
};

const ACTIVITY_SELECT: &str = r#"
    SELECT a.id, a.user_id, u.username, a.action, a.details, a.ip_address, a.user_agent,
           a.created_at
    FROM activity_logs a
    LEFT JOIN users u ON u.id = a.user_id
"#;

impl Database {
    pub async fn log_activity(&self, activity: &NewActivity) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO activity_logs (user_id, action, details, ip_address, user_agent, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(activity.user_id)
        .bind(&activity.action)
        .bind(&activity.details)
        .bind(&activity.ip_address)
        .bind(&activity.user_agent)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityLog>> {
        let logs = sqlx::query_as::<_, ActivityLog>(&format!(
            "{} ORDER BY a.created_at DESC, a.id DESC LIMIT ?",
            ACTIVITY_SELECT
        ))
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(logs)
    }

    pub async fn activity_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<ActivityLog>> {
        let logs = sqlx::query_as::<_, ActivityLog>(&format!(
            "{} WHERE a.user_id = ? ORDER BY a.created_at DESC, a.id DESC LIMIT ?",
            ACTIVITY_SELECT
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(logs)
    }

    pub async fn activity_for_sector(&self, sector_id: i64, limit: i64) -> Result<Vec<ActivityLog>> {
        let logs = sqlx::query_as::<_, ActivityLog>(&format!(
            "{} WHERE u.sector_id = ? ORDER BY a.created_at DESC, a.id DESC LIMIT ?",
            ACTIVITY_SELECT
        ))
        .bind(sector_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewSector, NewUser};
    use gerot_core::Role;

    #[tokio::test]
    async fn test_activity_scopes() {
        let db = Database::in_memory().await.unwrap();
        let ti = db
            .create_sector(&NewSector {
                name: "TI".to_string(),
                description: None,
                leader_email: None,
            })
            .await
            .unwrap();
        let mut ids = Vec::new();
        for (name, sector) in [("ana", Some(ti.id)), ("beto", None)] {
            let user = db
                .create_user(&NewUser {
                    username: name.to_string(),
                    email: None,
                    password: None,
                    full_name: None,
                    role: Role::Colaborador,
                    sector_id: sector,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }

        db.log_activity(&NewActivity::new(ids[0], "login").origin(Some("10.0.0.1".into()), None))
            .await
            .unwrap();
        db.log_activity(&NewActivity::new(ids[1], "login")).await.unwrap();
        db.log_activity(&NewActivity::new(ids[0], "complete_task").details("item 3"))
            .await
            .unwrap();

        let recent = db.recent_activity(10).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].action, "complete_task");
        assert_eq!(recent[0].username.as_deref(), Some("ana"));

        assert_eq!(db.recent_activity(1).await.unwrap().len(), 1);
        assert_eq!(db.activity_for_user(ids[1], 10).await.unwrap().len(), 1);

        let sector_logs = db.activity_for_sector(ti.id, 10).await.unwrap();
        assert_eq!(sector_logs.len(), 2);
        assert!(sector_logs.iter().all(|l| l.user_id == Some(ids[0])));
    }
}
