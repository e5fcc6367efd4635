use chrono::NaiveDate;
use gerot_core::{completion_percentage, DaySummary};
use sqlx::{QueryBuilder, Sqlite};

use crate::{
    models::{
        DayCompletion, GlobalStats, SectorBreakdown, SectorDayStats, TableCounts, UserCompletion,
    },
    Database, Result,
};

impl Database {
    // ========================================================================
    // Dashboards
    // ========================================================================

    pub async fn global_stats(&self, date: NaiveDate) -> Result<GlobalStats> {
        let mut stats = sqlx::query_as::<_, GlobalStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE is_active = 1) AS total_users,
                (SELECT COUNT(*) FROM sectors WHERE is_active = 1) AS total_sectors,
                (SELECT COUNT(*) FROM routines WHERE date = ?1) AS routines_today,
                (SELECT COUNT(*) FROM checklists c JOIN routines r ON r.id = c.routine_id
                    WHERE r.date = ?1) AS tasks_today,
                (SELECT COUNT(*) FROM checklists c JOIN routines r ON r.id = c.routine_id
                    WHERE r.date = ?1 AND c.completed = 1) AS completed_today
            "#,
        )
        .bind(date)
        .fetch_one(self.pool())
        .await?;

        stats.percentage = completion_percentage(stats.tasks_today, stats.completed_today);
        Ok(stats)
    }

    /// Active users and leaders per sector.
    pub async fn sector_breakdown(&self) -> Result<Vec<SectorBreakdown>> {
        let rows = sqlx::query_as::<_, SectorBreakdown>(
            r#"
            SELECT s.id, s.name,
                   COUNT(u.id) AS users_count,
                   COALESCE(SUM(CASE WHEN u.role = 'lider' THEN 1 ELSE 0 END), 0) AS leaders_count
            FROM sectors s
            LEFT JOIN users u ON u.sector_id = s.id AND u.is_active = 1
            WHERE s.is_active = 1
            GROUP BY s.id
            ORDER BY s.name
            "#,
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Routine and task totals per sector for one day, optionally limited to one sector.
    pub async fn sector_stats_on(
        &self,
        date: NaiveDate,
        sector_id: Option<i64>,
    ) -> Result<Vec<SectorDayStats>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT s.id AS sector_id, s.name,
                (SELECT COUNT(*) FROM users u
                    WHERE u.sector_id = s.id AND u.is_active = 1) AS team_members,
                (SELECT COUNT(*) FROM routines r
                    WHERE r.sector_id = s.id AND r.date = "#,
        );
        query.push_bind(date);
        query.push(
            r#") AS routines,
                (SELECT COUNT(*) FROM checklists c JOIN routines r ON r.id = c.routine_id
                    WHERE r.sector_id = s.id AND r.date = "#,
        );
        query.push_bind(date);
        query.push(
            r#") AS total_tasks,
                (SELECT COUNT(*) FROM checklists c JOIN routines r ON r.id = c.routine_id
                    WHERE r.sector_id = s.id AND c.completed = 1 AND r.date = "#,
        );
        query.push_bind(date);
        query.push(") AS completed_tasks FROM sectors s WHERE s.is_active = 1");
        if let Some(sector_id) = sector_id {
            query.push(" AND s.id = ").push_bind(sector_id);
        }
        query.push(" ORDER BY s.name");

        let mut rows = query
            .build_query_as::<SectorDayStats>()
            .fetch_all(self.pool())
            .await?;
        for row in &mut rows {
            row.percentage = completion_percentage(row.total_tasks, row.completed_tasks);
        }
        Ok(rows)
    }

    pub async fn day_summary(&self, user_id: i64, date: NaiveDate) -> Result<DaySummary> {
        let (total, completed): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(c.id), COALESCE(SUM(c.completed), 0)
            FROM checklists c
            JOIN routines r ON r.id = c.routine_id
            WHERE r.user_id = ? AND r.date = ? AND r.status != 'cancelled'
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_one(self.pool())
        .await?;

        Ok(DaySummary::new(total, completed))
    }

    // ========================================================================
    // Reports
    // ========================================================================

    /// Completion per active user over `[from, to]`.
    pub async fn user_completion(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        sector_id: Option<i64>,
    ) -> Result<Vec<UserCompletion>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT u.id AS user_id, u.username, u.full_name,
                   COUNT(c.id) AS total_tasks,
                   COALESCE(SUM(c.completed), 0) AS completed_tasks
            FROM users u
            LEFT JOIN routines r ON r.user_id = u.id AND r.date >= "#,
        );
        query.push_bind(from);
        query.push(" AND r.date <= ");
        query.push_bind(to);
        query.push(" LEFT JOIN checklists c ON c.routine_id = r.id WHERE u.is_active = 1");
        if let Some(sector_id) = sector_id {
            query.push(" AND u.sector_id = ").push_bind(sector_id);
        }
        query.push(" GROUP BY u.id ORDER BY u.username");

        let mut rows = query
            .build_query_as::<UserCompletion>()
            .fetch_all(self.pool())
            .await?;
        for row in &mut rows {
            row.percentage = completion_percentage(row.total_tasks, row.completed_tasks);
        }
        Ok(rows)
    }

    /// Completion per day over `[from, to]`; days without routines are omitted.
    pub async fn daily_completion(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        sector_id: Option<i64>,
    ) -> Result<Vec<DayCompletion>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT r.date,
                   COUNT(c.id) AS total_tasks,
                   COALESCE(SUM(c.completed), 0) AS completed_tasks
            FROM routines r
            LEFT JOIN checklists c ON c.routine_id = r.id
            WHERE r.date >= "#,
        );
        query.push_bind(from);
        query.push(" AND r.date <= ");
        query.push_bind(to);
        if let Some(sector_id) = sector_id {
            query.push(" AND r.sector_id = ").push_bind(sector_id);
        }
        query.push(" GROUP BY r.date ORDER BY r.date");

        let mut rows = query
            .build_query_as::<DayCompletion>()
            .fetch_all(self.pool())
            .await?;
        for row in &mut rows {
            row.percentage = completion_percentage(row.total_tasks, row.completed_tasks);
        }
        Ok(rows)
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    pub async fn table_counts(&self) -> Result<TableCounts> {
        let counts = sqlx::query_as::<_, TableCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM users WHERE is_active = 1) AS active_users,
                (SELECT COUNT(*) FROM users WHERE role = 'admin_master') AS admin_masters,
                (SELECT COUNT(*) FROM users WHERE role = 'lider') AS lideres,
                (SELECT COUNT(*) FROM users WHERE role = 'colaborador') AS colaboradores,
                (SELECT COUNT(*) FROM sectors) AS sectors,
                (SELECT COUNT(*) FROM routines) AS routines,
                (SELECT COUNT(*) FROM checklists) AS checklist_items,
                (SELECT COUNT(*) FROM checklists WHERE completed = 1) AS completed_items,
                (SELECT COUNT(*) FROM activity_logs) AS activity_logs,
                (SELECT COUNT(*) FROM agent_rpas WHERE status = 'pending') AS pending_rpas
            "#,
        )
        .fetch_one(self.pool())
        .await?;
        Ok(counts)
    }
}
