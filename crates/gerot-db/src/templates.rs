use chrono::Utc;
use serde_json::json;
use sqlx::types::Json;

use crate::{
    models::{DashboardTemplateInput, DashboardTemplateRecord},
    Database, Error, Result,
};

impl Database {
    /// Missing fields fall back to an empty "Novo Dashboard" in the "Outros" category.
    pub async fn create_template(
        &self,
        created_by: i64,
        input: &DashboardTemplateInput,
    ) -> Result<DashboardTemplateRecord> {
        let title = input
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Novo Dashboard");
        let category = input
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("Outros");
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO agent_dashboard_templates (
                title, description, category, query_config, charts_config, layout_config,
                is_published, is_public, created_by, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(title)
        .bind(&input.description)
        .bind(category)
        .bind(Json(input.query_config.clone().unwrap_or_else(|| json!({}))))
        .bind(Json(input.charts_config.clone().unwrap_or_else(|| json!([]))))
        .bind(Json(input.layout_config.clone().unwrap_or_else(|| json!({}))))
        .bind(input.is_published.unwrap_or(false))
        .bind(input.is_public.unwrap_or(false))
        .bind(created_by)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!(template_id = id, created_by, "Dashboard template created");
        self.get_template(id)
            .await?
            .ok_or_else(|| Error::NotFound("template".to_string()))
    }

    pub async fn get_template(&self, id: i64) -> Result<Option<DashboardTemplateRecord>> {
        let template = sqlx::query_as::<_, DashboardTemplateRecord>(
            "SELECT * FROM agent_dashboard_templates WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(template)
    }

    /// `visible_to = None` lists every template; otherwise the user's own plus public ones.
    pub async fn list_templates(
        &self,
        visible_to: Option<i64>,
    ) -> Result<Vec<DashboardTemplateRecord>> {
        let templates = sqlx::query_as::<_, DashboardTemplateRecord>(
            r#"
            SELECT * FROM agent_dashboard_templates
            WHERE ? IS NULL OR created_by = ? OR is_public = 1
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .bind(visible_to)
        .bind(visible_to)
        .fetch_all(self.pool())
        .await?;
        Ok(templates)
    }

    pub async fn update_template(
        &self,
        id: i64,
        input: &DashboardTemplateInput,
    ) -> Result<DashboardTemplateRecord> {
        if input.title.as_deref().map_or(false, |t| t.trim().is_empty()) {
            return Err(Error::Validation("title cannot be empty".to_string()));
        }

        let result = sqlx::query(
            r#"
            UPDATE agent_dashboard_templates
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                category = COALESCE(?, category),
                query_config = COALESCE(?, query_config),
                charts_config = COALESCE(?, charts_config),
                layout_config = COALESCE(?, layout_config),
                is_published = COALESCE(?, is_published),
                is_public = COALESCE(?, is_public),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(input.title.as_deref().map(str::trim))
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.query_config.as_ref().map(Json))
        .bind(input.charts_config.as_ref().map(Json))
        .bind(input.layout_config.as_ref().map(Json))
        .bind(input.is_published)
        .bind(input.is_public)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("template {}", id)));
        }
        self.get_template(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("template {}", id)))
    }

    pub async fn delete_template(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM agent_dashboard_templates WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("template {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use gerot_core::Role;

    async fn user(db: &Database, username: &str) -> i64 {
        db.create_user(&NewUser {
            username: username.to_string(),
            email: None,
            password: None,
            full_name: None,
            role: Role::Colaborador,
            sector_id: None,
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_template_defaults() {
        let db = Database::in_memory().await.unwrap();
        let owner = user(&db, "ana").await;

        let template = db
            .create_template(owner, &DashboardTemplateInput::default())
            .await
            .unwrap();
        assert_eq!(template.title, "Novo Dashboard");
        assert_eq!(template.category, "Outros");
        assert_eq!(template.charts_config.as_ref().map(|c| c.0.clone()), Some(json!([])));
        assert!(!template.is_public);
        assert!(template.is_owned_by(owner));
    }

    #[tokio::test]
    async fn test_template_visibility_and_update() {
        let db = Database::in_memory().await.unwrap();
        let ana = user(&db, "ana").await;
        let bruno = user(&db, "bruno").await;

        let private = db
            .create_template(
                ana,
                &DashboardTemplateInput {
                    title: Some("Faturamento".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let public = db
            .create_template(
                ana,
                &DashboardTemplateInput {
                    title: Some("Estoque".to_string()),
                    is_public: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let seen_by_bruno = db.list_templates(Some(bruno)).await.unwrap();
        assert_eq!(seen_by_bruno.len(), 1);
        assert_eq!(seen_by_bruno[0].id, public.id);
        assert_eq!(db.list_templates(Some(ana)).await.unwrap().len(), 2);
        assert_eq!(db.list_templates(None).await.unwrap().len(), 2);

        let updated = db
            .update_template(
                private.id,
                &DashboardTemplateInput {
                    charts_config: Some(json!([{"type": "bar"}])),
                    is_published: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Faturamento");
        assert!(updated.is_published);
        assert_eq!(
            updated.charts_config.map(|c| c.0),
            Some(json!([{"type": "bar"}]))
        );

        db.delete_template(private.id).await.unwrap();
        assert!(matches!(
            db.update_template(private.id, &DashboardTemplateInput::default()).await,
            Err(Error::NotFound(_))
        ));
    }
}
