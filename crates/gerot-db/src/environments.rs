use chrono::Utc;
use gerot_core::ResourceType;

use crate::{
    models::{EnvironmentRecord, EnvironmentSummary, EnvironmentUpdate, NewEnvironment, NewResource, ResourceRecord},
    Database, Error, Result,
};

impl Database {
    pub async fn create_environment(&self, env: &NewEnvironment) -> Result<EnvironmentRecord> {
        let code = env.code.trim().to_lowercase();
        if code.is_empty() || env.name.trim().is_empty() {
            return Err(Error::Validation("code and name are required".to_string()));
        }
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO environments (
                code, name, description, icon, capacity, area_m2, floor, display_order,
                is_active, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&code)
        .bind(env.name.trim())
        .bind(&env.description)
        .bind(&env.icon)
        .bind(env.capacity)
        .bind(env.area_m2)
        .bind(env.floor)
        .bind(env.display_order)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|e| Error::conflict_on_unique(e, "environment"))?;

        tracing::info!(code = %code, "Environment created");
        self.get_environment(result.last_insert_rowid())
            .await?
            .ok_or_else(|| Error::NotFound("environment".to_string()))
    }

    /// Active environments only.
    pub async fn get_environment(&self, id: i64) -> Result<Option<EnvironmentRecord>> {
        let env = sqlx::query_as::<_, EnvironmentRecord>(
            "SELECT * FROM environments WHERE id = ? AND is_active = 1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(env)
    }

    pub async fn list_environments(&self) -> Result<Vec<EnvironmentSummary>> {
        let envs = sqlx::query_as::<_, EnvironmentSummary>(
            r#"
            SELECT e.id, e.code, e.name, e.description, e.icon, e.capacity, e.area_m2,
                   e.floor, e.display_order,
                   COUNT(r.id) AS resource_count,
                   COALESCE(SUM(CASE WHEN r.resource_type = 'model_3d' THEN 1 ELSE 0 END), 0) AS models_3d,
                   COALESCE(SUM(CASE WHEN r.resource_type = 'plant_2d' THEN 1 ELSE 0 END), 0) AS plants_2d,
                   COALESCE(SUM(CASE WHEN r.resource_type = 'photo' THEN 1 ELSE 0 END), 0) AS photos
            FROM environments e
            LEFT JOIN environment_resources r ON r.environment_id = e.id
            WHERE e.is_active = 1
            GROUP BY e.id
            ORDER BY e.display_order, e.name
            "#,
        )
        .fetch_all(self.pool())
        .await?;
        Ok(envs)
    }

    pub async fn update_environment(
        &self,
        id: i64,
        update: &EnvironmentUpdate,
    ) -> Result<EnvironmentRecord> {
        if update.name.as_deref().map_or(false, |n| n.trim().is_empty()) {
            return Err(Error::Validation("name cannot be empty".to_string()));
        }

        let result = sqlx::query(
            r#"
            UPDATE environments
            SET name = COALESCE(?, name),
                description = COALESCE(?, description),
                icon = COALESCE(?, icon),
                capacity = COALESCE(?, capacity),
                area_m2 = COALESCE(?, area_m2),
                floor = COALESCE(?, floor),
                display_order = COALESCE(?, display_order),
                updated_at = ?
            WHERE id = ? AND is_active = 1
            "#,
        )
        .bind(update.name.as_deref().map(str::trim))
        .bind(&update.description)
        .bind(&update.icon)
        .bind(update.capacity)
        .bind(update.area_m2)
        .bind(update.floor)
        .bind(update.display_order)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("environment {}", id)));
        }
        self.get_environment(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("environment {}", id)))
    }

    /// Soft delete; resources stay attached.
    pub async fn deactivate_environment(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE environments SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("environment {}", id)));
        }
        Ok(())
    }

    /// Primary resources first, then by display order.
    pub async fn list_resources(
        &self,
        environment_id: i64,
        kind: Option<ResourceType>,
    ) -> Result<Vec<ResourceRecord>> {
        let resources = sqlx::query_as::<_, ResourceRecord>(
            r#"
            SELECT * FROM environment_resources
            WHERE environment_id = ? AND (? IS NULL OR resource_type = ?)
            ORDER BY is_primary DESC, display_order, id
            "#,
        )
        .bind(environment_id)
        .bind(kind.map(|k| k.as_str()))
        .bind(kind.map(|k| k.as_str()))
        .fetch_all(self.pool())
        .await?;
        Ok(resources)
    }

    /// A new primary resource demotes the previous primary of the same type.
    pub async fn add_resource(
        &self,
        environment_id: i64,
        resource: &NewResource,
    ) -> Result<ResourceRecord> {
        if resource.file_name.trim().is_empty() || resource.file_url.trim().is_empty() {
            return Err(Error::Validation("file_name and file_url are required".to_string()));
        }
        if self.get_environment(environment_id).await?.is_none() {
            return Err(Error::NotFound(format!("environment {}", environment_id)));
        }
        let kind = resource.resource_type.as_str();

        let mut tx = self.pool().begin().await?;
        if resource.is_primary {
            sqlx::query(
                r#"
                UPDATE environment_resources SET is_primary = 0
                WHERE environment_id = ? AND resource_type = ?
                "#,
            )
            .bind(environment_id)
            .bind(kind)
            .execute(&mut *tx)
            .await?;
        }

        let result = sqlx::query(
            r#"
            INSERT INTO environment_resources (
                environment_id, resource_type, file_name, file_url, file_size, mime_type,
                description, is_primary, display_order, uploaded_by, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(environment_id)
        .bind(kind)
        .bind(resource.file_name.trim())
        .bind(resource.file_url.trim())
        .bind(resource.file_size)
        .bind(&resource.mime_type)
        .bind(&resource.description)
        .bind(resource.is_primary)
        .bind(resource.display_order)
        .bind(resource.uploaded_by)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.get_resource(result.last_insert_rowid())
            .await?
            .ok_or_else(|| Error::NotFound("resource".to_string()))
    }

    pub async fn get_resource(&self, id: i64) -> Result<Option<ResourceRecord>> {
        let resource =
            sqlx::query_as::<_, ResourceRecord>("SELECT * FROM environment_resources WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(resource)
    }

    pub async fn delete_resource(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM environment_resources WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("resource {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warehouse() -> NewEnvironment {
        NewEnvironment {
            code: "CD-Norte".to_string(),
            name: "Centro de Distribuição Norte".to_string(),
            description: None,
            icon: Some("🏭".to_string()),
            capacity: Some(40),
            area_m2: Some(1250.5),
            floor: 1,
            display_order: 0,
        }
    }

    fn resource(kind: ResourceType, name: &str, primary: bool) -> NewResource {
        NewResource {
            resource_type: kind,
            file_name: name.to_string(),
            file_url: format!("https://files.example.com/{}", name),
            file_size: Some(2048),
            mime_type: None,
            description: None,
            is_primary: primary,
            display_order: 0,
            uploaded_by: None,
        }
    }

    #[tokio::test]
    async fn test_environment_codes_are_unique() {
        let db = Database::in_memory().await.unwrap();
        let env = db.create_environment(&warehouse()).await.unwrap();
        assert_eq!(env.code, "cd-norte");
        assert_eq!(env.floor, 1);

        let again = db.create_environment(&warehouse()).await;
        assert!(matches!(again, Err(Error::Conflict(_))));

        let renamed = db
            .update_environment(
                env.id,
                &EnvironmentUpdate {
                    name: Some("CD Norte".to_string()),
                    capacity: Some(55),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "CD Norte");
        assert_eq!(renamed.capacity, Some(55));
        assert_eq!(renamed.area_m2, Some(1250.5));

        db.deactivate_environment(env.id).await.unwrap();
        assert!(db.get_environment(env.id).await.unwrap().is_none());
        assert!(db.list_environments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_primary_resource_is_unique_per_type() {
        let db = Database::in_memory().await.unwrap();
        let env = db.create_environment(&warehouse()).await.unwrap();

        let first = db
            .add_resource(env.id, &resource(ResourceType::Model3d, "v1.glb", true))
            .await
            .unwrap();
        let photo = db
            .add_resource(env.id, &resource(ResourceType::Photo, "doca.jpg", true))
            .await
            .unwrap();
        let second = db
            .add_resource(env.id, &resource(ResourceType::Model3d, "v2.glb", true))
            .await
            .unwrap();

        let models = db
            .list_resources(env.id, Some(ResourceType::Model3d))
            .await
            .unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, second.id);
        assert!(models[0].is_primary);
        assert!(!models.iter().any(|r| r.id == first.id && r.is_primary));
        assert!(models.iter().all(|r| r.resource_type() == Some(ResourceType::Model3d)));

        // Other types keep their primary.
        assert!(db.get_resource(photo.id).await.unwrap().unwrap().is_primary);

        let summary = db.list_environments().await.unwrap();
        assert_eq!(summary[0].resource_count, 3);
        assert_eq!(summary[0].models_3d, 2);
        assert_eq!(summary[0].photos, 1);
        assert_eq!(summary[0].plants_2d, 0);

        db.delete_resource(first.id).await.unwrap();
        assert_eq!(db.list_resources(env.id, None).await.unwrap().len(), 2);
        assert!(matches!(
            db.delete_resource(first.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resource_needs_active_environment() {
        let db = Database::in_memory().await.unwrap();
        let missing = db
            .add_resource(999, &resource(ResourceType::Document, "planta.pdf", false))
            .await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }
}
