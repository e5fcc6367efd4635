use chrono::{NaiveDate, Utc};
use gerot_core::RoutineStatus;
use sqlx::{QueryBuilder, Sqlite};

use crate::{
    models::{
        ChecklistItemRecord, ChecklistItemUpdate, NewChecklistItem, NewRoutine, RoutineFilter,
        RoutineRecord, RoutineUpdate, TaskView,
    },
    Database, Error, Result,
};

const ITEM_ORDER: &str = "ORDER BY priority DESC, id ASC";

impl Database {
    // ========================================================================
    // Routines
    // ========================================================================

    /// Creates a routine together with its checklist items in one transaction.
    pub async fn create_routine(&self, routine: &NewRoutine) -> Result<RoutineRecord> {
        if routine.title.trim().is_empty() {
            return Err(Error::Validation("routine title is required".to_string()));
        }
        if let (Some(start), Some(end)) = (routine.start_time, routine.end_time) {
            if end < start {
                return Err(Error::Validation(
                    "end_time must not be before start_time".to_string(),
                ));
            }
        }
        let now = Utc::now();
        let mut tx = self.pool().begin().await?;

        let routine_id = sqlx::query(
            r#"
            INSERT INTO routines (
                user_id, sector_id, title, description, date, start_time, end_time,
                priority, status, created_by, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, ?, ?)
            "#,
        )
        .bind(routine.user_id)
        .bind(routine.sector_id)
        .bind(routine.title.trim())
        .bind(&routine.description)
        .bind(routine.date)
        .bind(routine.start_time)
        .bind(routine.end_time)
        .bind(routine.priority.value())
        .bind(routine.created_by)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for item in &routine.items {
            validate_task(&item.task)?;
            sqlx::query(
                r#"
                INSERT INTO checklists (
                    routine_id, task, completed, break_type, priority,
                    estimated_minutes, created_at, updated_at
                )
                VALUES (?, ?, 0, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(routine_id)
            .bind(item.task.trim())
            .bind(item.break_type.map(|b| b.as_str()))
            .bind(item.priority.value())
            .bind(item.estimated_minutes)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_routine(routine_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("routine {}", routine_id)))
    }

    pub async fn get_routine(&self, id: i64) -> Result<Option<RoutineRecord>> {
        let routine = sqlx::query_as::<_, RoutineRecord>("SELECT * FROM routines WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(routine)
    }

    pub async fn list_routines(&self, filter: &RoutineFilter) -> Result<Vec<RoutineRecord>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM routines WHERE 1 = 1");

        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(sector_id) = filter.sector_id {
            query.push(" AND sector_id = ").push_bind(sector_id);
        }
        if let Some(date) = filter.date {
            query.push(" AND date = ").push_bind(date);
        }
        if let Some(from) = filter.from {
            query.push(" AND date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND date <= ").push_bind(to);
        }
        query.push(" ORDER BY date DESC, start_time ASC, id ASC");

        let routines = query
            .build_query_as::<RoutineRecord>()
            .fetch_all(self.pool())
            .await?;
        Ok(routines)
    }

    pub async fn routines_for_user_on(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<RoutineRecord>> {
        self.list_routines(&RoutineFilter {
            user_id: Some(user_id),
            date: Some(date),
            ..Default::default()
        })
        .await
    }

    pub async fn update_routine(&self, id: i64, update: &RoutineUpdate) -> Result<RoutineRecord> {
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(Error::Validation("routine title is required".to_string()));
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE routines
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                date = COALESCE(?, date),
                start_time = COALESCE(?, start_time),
                end_time = COALESCE(?, end_time),
                priority = COALESCE(?, priority),
                status = COALESCE(?, status),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.title.as_deref().map(str::trim))
        .bind(&update.description)
        .bind(update.date)
        .bind(update.start_time)
        .bind(update.end_time)
        .bind(update.priority.map(|p| p.value()))
        .bind(update.status.map(|s| s.as_str()))
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("routine {}", id)));
        }
        self.get_routine(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("routine {}", id)))
    }

    /// Deletes a routine; its checklist items go with it.
    pub async fn delete_routine(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM routines WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("routine {}", id)));
        }
        Ok(())
    }

    // ========================================================================
    // Checklist items
    // ========================================================================

    pub async fn add_item(
        &self,
        routine_id: i64,
        item: &NewChecklistItem,
    ) -> Result<ChecklistItemRecord> {
        validate_task(&item.task)?;
        if self.get_routine(routine_id).await?.is_none() {
            return Err(Error::NotFound(format!("routine {}", routine_id)));
        }
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO checklists (
                routine_id, task, completed, break_type, priority,
                estimated_minutes, created_at, updated_at
            )
            VALUES (?, ?, 0, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(routine_id)
        .bind(item.task.trim())
        .bind(item.break_type.map(|b| b.as_str()))
        .bind(item.priority.value())
        .bind(item.estimated_minutes)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_item(result.last_insert_rowid())
            .await?
            .ok_or_else(|| Error::NotFound("checklist item".to_string()))
    }

    pub async fn get_item(&self, id: i64) -> Result<Option<ChecklistItemRecord>> {
        let item = sqlx::query_as::<_, ChecklistItemRecord>("SELECT * FROM checklists WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(item)
    }

    /// Items of a routine, highest priority first.
    pub async fn items_for_routine(&self, routine_id: i64) -> Result<Vec<ChecklistItemRecord>> {
        let items = sqlx::query_as::<_, ChecklistItemRecord>(&format!(
            "SELECT * FROM checklists WHERE routine_id = ? {}",
            ITEM_ORDER
        ))
        .bind(routine_id)
        .fetch_all(self.pool())
        .await?;
        Ok(items)
    }

    pub async fn update_item(
        &self,
        id: i64,
        update: &ChecklistItemUpdate,
    ) -> Result<ChecklistItemRecord> {
        if let Some(task) = &update.task {
            validate_task(task)?;
        }

        let result = sqlx::query(
            r#"
            UPDATE checklists
            SET task = COALESCE(?, task),
                break_type = COALESCE(?, break_type),
                priority = COALESCE(?, priority),
                estimated_minutes = COALESCE(?, estimated_minutes),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.task.as_deref().map(str::trim))
        .bind(update.break_type.map(|b| b.as_str()))
        .bind(update.priority.map(|p| p.value()))
        .bind(update.estimated_minutes)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("checklist item {}", id)));
        }
        self.get_item(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("checklist item {}", id)))
    }

    pub async fn delete_item(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM checklists WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("checklist item {}", id)));
        }
        Ok(())
    }

    /// Marks an item done. Completing an already completed item keeps its original timestamp.
    pub async fn set_completed(&self, id: i64, completed_by: i64) -> Result<ChecklistItemRecord> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE checklists
            SET completed = 1,
                completed_at = COALESCE(completed_at, ?),
                completed_by = COALESCE(completed_by, ?),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(completed_by)
        .bind(now)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("checklist item {}", id)));
        }
        self.get_item(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("checklist item {}", id)))
    }

    pub async fn set_uncompleted(&self, id: i64) -> Result<ChecklistItemRecord> {
        let result = sqlx::query(
            r#"
            UPDATE checklists
            SET completed = 0, completed_at = NULL, completed_by = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("checklist item {}", id)));
        }
        self.get_item(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("checklist item {}", id)))
    }

    /// Every checklist item the user has on a date, across routines.
    pub async fn tasks_for_user_on(&self, user_id: i64, date: NaiveDate) -> Result<Vec<TaskView>> {
        let tasks = sqlx::query_as::<_, TaskView>(
            r#"
            SELECT c.id, c.routine_id, r.title AS routine_title, r.date, c.task, c.completed,
                   c.break_type, c.priority, c.estimated_minutes, c.completed_at
            FROM checklists c
            JOIN routines r ON r.id = c.routine_id
            WHERE r.user_id = ? AND r.date = ? AND r.status != 'cancelled'
            ORDER BY c.completed ASC, c.priority DESC, c.id ASC
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(self.pool())
        .await?;
        Ok(tasks)
    }

    /// Marks the routine completed once every item is done, and back to active otherwise.
    pub async fn refresh_routine_status(&self, routine_id: i64) -> Result<RoutineStatus> {
        let (total, done): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM checklists WHERE routine_id = ?",
        )
        .bind(routine_id)
        .fetch_one(self.pool())
        .await?;

        let status = if total > 0 && total == done {
            RoutineStatus::Completed
        } else {
            RoutineStatus::Active
        };

        sqlx::query(
            "UPDATE routines SET status = ?, updated_at = ? WHERE id = ? AND status != 'cancelled'",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(routine_id)
        .execute(self.pool())
        .await?;

        Ok(status)
    }
}

fn validate_task(task: &str) -> Result<()> {
    if task.trim().is_empty() {
        return Err(Error::Validation("task description is required".to_string()));
    }
    Ok(())
}
