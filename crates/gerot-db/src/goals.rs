use chrono::Utc;
use gerot_core::RoutineStatus;
use sqlx::{QueryBuilder, Sqlite};

use crate::{
    models::{GoalRecord, GoalUpdate, NewGoal},
    Database, Error, Result,
};

impl Database {
    pub async fn create_goal(&self, goal: &NewGoal) -> Result<GoalRecord> {
        if goal.title.trim().is_empty() {
            return Err(Error::Validation("goal title is required".to_string()));
        }
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO goals (
                sector_id, title, description, target_value, current_value, unit,
                deadline, status, created_by, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, 0.0, ?, ?, 'active', ?, ?, ?)
            "#,
        )
        .bind(goal.sector_id)
        .bind(goal.title.trim())
        .bind(&goal.description)
        .bind(goal.target_value)
        .bind(&goal.unit)
        .bind(goal.deadline)
        .bind(goal.created_by)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_goal(result.last_insert_rowid())
            .await?
            .ok_or_else(|| Error::NotFound("goal".to_string()))
    }

    pub async fn get_goal(&self, id: i64) -> Result<Option<GoalRecord>> {
        let goal = sqlx::query_as::<_, GoalRecord>("SELECT * FROM goals WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(goal)
    }

    pub async fn list_goals(
        &self,
        sector_id: Option<i64>,
        status: Option<RoutineStatus>,
    ) -> Result<Vec<GoalRecord>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM goals WHERE 1 = 1");
        if let Some(sector_id) = sector_id {
            query.push(" AND sector_id = ").push_bind(sector_id);
        }
        if let Some(status) = status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY deadline IS NULL, deadline ASC, id ASC");

        let goals = query
            .build_query_as::<GoalRecord>()
            .fetch_all(self.pool())
            .await?;
        Ok(goals)
    }

    /// Applies the update; an active goal whose progress reaches its target becomes completed.
    pub async fn update_goal(&self, id: i64, update: &GoalUpdate) -> Result<GoalRecord> {
        let result = sqlx::query(
            r#"
            UPDATE goals
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                target_value = COALESCE(?, target_value),
                current_value = COALESCE(?, current_value),
                unit = COALESCE(?, unit),
                deadline = COALESCE(?, deadline),
                status = COALESCE(?, status),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.target_value)
        .bind(update.current_value)
        .bind(&update.unit)
        .bind(update.deadline)
        .bind(update.status.map(|s| s.as_str()))
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("goal {}", id)));
        }

        sqlx::query(
            r#"
            UPDATE goals SET status = 'completed'
            WHERE id = ? AND status = 'active'
              AND target_value IS NOT NULL AND current_value >= target_value
            "#,
        )
        .bind(id)
        .execute(self.pool())
        .await?;

        self.get_goal(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("goal {}", id)))
    }

    pub async fn delete_goal(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM goals WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("goal {}", id)));
        }
        Ok(())
    }
}
