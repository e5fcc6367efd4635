use chrono::Utc;

use crate::{
    models::{NewSector, SectorRecord, SectorSummary, SectorUpdate},
    Database, Error, Result,
};

impl Database {
    pub async fn create_sector(&self, sector: &NewSector) -> Result<SectorRecord> {
        let name = sector.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("sector name is required".to_string()));
        }
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO sectors (name, description, leader_email, is_active, created_at, updated_at)
            VALUES (?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(name)
        .bind(&sector.description)
        .bind(&sector.leader_email)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|e| Error::conflict_on_unique(e, "sector"))?;

        self.get_sector(result.last_insert_rowid())
            .await?
            .ok_or_else(|| Error::NotFound("sector".to_string()))
    }

    pub async fn get_sector(&self, id: i64) -> Result<Option<SectorRecord>> {
        let sector = sqlx::query_as::<_, SectorRecord>("SELECT * FROM sectors WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(sector)
    }

    /// All sectors with the number of active users in each, ordered by name.
    pub async fn list_sectors(&self) -> Result<Vec<SectorSummary>> {
        let sectors = sqlx::query_as::<_, SectorSummary>(
            r#"
            SELECT s.id, s.name, s.description, s.leader_email, s.is_active,
                   COUNT(u.id) AS users_count
            FROM sectors s
            LEFT JOIN users u ON u.sector_id = s.id AND u.is_active = 1
            GROUP BY s.id
            ORDER BY s.name
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        Ok(sectors)
    }

    pub async fn update_sector(&self, id: i64, update: &SectorUpdate) -> Result<SectorRecord> {
        let result = sqlx::query(
            r#"
            UPDATE sectors
            SET name = COALESCE(?, name),
                description = COALESCE(?, description),
                leader_email = COALESCE(?, leader_email),
                is_active = COALESCE(?, is_active),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.name.as_deref().map(str::trim))
        .bind(&update.description)
        .bind(&update.leader_email)
        .bind(update.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| Error::conflict_on_unique(e, "sector"))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("sector {}", id)));
        }
        self.get_sector(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("sector {}", id)))
    }

    /// Deletes a sector that no active user belongs to.
    pub async fn delete_sector(&self, id: i64) -> Result<()> {
        let active_users: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE sector_id = ? AND is_active = 1",
        )
        .bind(id)
        .fetch_one(self.pool())
        .await?;

        if active_users > 0 {
            return Err(Error::Conflict(format!(
                "sector {} still has {} active users",
                id, active_users
            )));
        }

        let mut tx = self.pool().begin().await?;

        // Detach history that still points at the sector.
        sqlx::query("UPDATE users SET sector_id = NULL WHERE sector_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE routines SET sector_id = NULL WHERE sector_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM goals WHERE sector_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM sectors WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("sector {}", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use gerot_core::Role;

    fn sector(name: &str) -> NewSector {
        NewSector {
            name: name.to_string(),
            description: None,
            leader_email: None,
        }
    }

    #[tokio::test]
    async fn test_list_sectors_counts_active_users() {
        let db = Database::in_memory().await.unwrap();
        let ti = db.create_sector(&sector("TI")).await.unwrap();
        db.create_sector(&sector("Comercial")).await.unwrap();

        for name in ["a", "b"] {
            db.create_user(&NewUser {
                username: name.to_string(),
                email: None,
                password: None,
                full_name: None,
                role: Role::Colaborador,
                sector_id: Some(ti.id),
            })
            .await
            .unwrap();
        }
        let b = db.get_user_by_username("b").await.unwrap().unwrap();
        db.deactivate_user(b.id).await.unwrap();

        let sectors = db.list_sectors().await.unwrap();
        assert_eq!(sectors[0].name, "Comercial");
        assert_eq!(sectors[0].users_count, 0);
        assert_eq!(sectors[1].name, "TI");
        assert_eq!(sectors[1].users_count, 1);

        assert!(matches!(
            db.create_sector(&sector("TI")).await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_sector_refused_with_active_users() {
        let db = Database::in_memory().await.unwrap();
        let ops = db.create_sector(&sector("Operacional")).await.unwrap();
        let user = db
            .create_user(&NewUser {
                username: "carlos".to_string(),
                email: None,
                password: None,
                full_name: None,
                role: Role::Colaborador,
                sector_id: Some(ops.id),
            })
            .await
            .unwrap();

        assert!(matches!(db.delete_sector(ops.id).await, Err(Error::Conflict(_))));

        db.deactivate_user(user.id).await.unwrap();
        db.delete_sector(ops.id).await.unwrap();
        assert!(db.get_sector(ops.id).await.unwrap().is_none());
        assert_eq!(db.get_user(user.id).await.unwrap().unwrap().sector_id, None);

        assert!(matches!(db.delete_sector(ops.id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_sector() {
        let db = Database::in_memory().await.unwrap();
        let fin = db.create_sector(&sector("Financeiro")).await.unwrap();

        let updated = db
            .update_sector(
                fin.id,
                &SectorUpdate {
                    leader_email: Some("chefe@portoex.com.br".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Financeiro");
        assert_eq!(updated.leader_email.as_deref(), Some("chefe@portoex.com.br"));
    }
}
