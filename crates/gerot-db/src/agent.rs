use chrono::Utc;
use gerot_core::{DashboardStatus, ExecutionReport, PendingDashboard, PendingRpa, RpaStatus};
use serde_json::{json, Value};
use sqlx::types::Json;

use crate::{
    models::{
        AgentLogRecord, DashboardRequestRecord, NewDashboardRequest, NewRpa, RpaRecord,
        RpaTypeRecord, StoredResult,
    },
    Database, Error, Result,
};

const RPA_SELECT: &str = r#"
    SELECT r.id, r.name, r.description, r.rpa_type_id, t.name AS type_name, r.priority,
           r.frequency, r.parameters, r.status, r.result, r.error_message, r.created_by,
           r.executed_at, r.completed_at, r.created_at, r.updated_at
    FROM agent_rpas r
    LEFT JOIN agent_rpa_types t ON t.id = r.rpa_type_id
"#;

impl From<RpaRecord> for PendingRpa {
    fn from(rpa: RpaRecord) -> Self {
        Self {
            id: rpa.id,
            name: rpa.name,
            description: rpa.description,
            parameters: rpa.parameters.map(|p| p.0),
            priority: rpa.priority,
            type_name: rpa.type_name,
        }
    }
}

impl From<DashboardRequestRecord> for PendingDashboard {
    fn from(request: DashboardRequestRecord) -> Self {
        Self {
            id: request.id,
            title: request.title,
            description: request.description,
            category: request.category,
            chart_types: request.chart_types.map(|c| c.0).unwrap_or_default(),
            filters: request.filters.map(|f| f.0),
            created_by: request.created_by,
        }
    }
}

impl Database {
    // ========================================================================
    // RPA types
    // ========================================================================

    pub async fn list_rpa_types(&self) -> Result<Vec<RpaTypeRecord>> {
        let types = sqlx::query_as::<_, RpaTypeRecord>(
            "SELECT * FROM agent_rpa_types WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(types)
    }

    // ========================================================================
    // RPAs
    // ========================================================================

    pub async fn create_rpa(&self, rpa: &NewRpa) -> Result<RpaRecord> {
        if rpa.name.trim().is_empty() {
            return Err(Error::Validation("RPA name is required".to_string()));
        }
        if let Some(params) = &rpa.parameters {
            if !params.is_object() {
                return Err(Error::Validation(
                    "parameters must be a JSON object".to_string(),
                ));
            }
        }
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO agent_rpas (
                name, description, rpa_type_id, priority, frequency, parameters,
                status, created_by, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?)
            "#,
        )
        .bind(rpa.name.trim())
        .bind(&rpa.description)
        .bind(rpa.rpa_type_id)
        .bind(rpa.priority.as_str())
        .bind(&rpa.frequency)
        .bind(rpa.parameters.as_ref().map(Json))
        .bind(rpa.created_by)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.log_agent_action("create", "rpa", Some(id), rpa.created_by, None)
            .await?;

        self.get_rpa(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("RPA {}", id)))
    }

    pub async fn get_rpa(&self, id: i64) -> Result<Option<RpaRecord>> {
        let rpa = sqlx::query_as::<_, RpaRecord>(&format!("{} WHERE r.id = ?", RPA_SELECT))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(rpa)
    }

    /// Newest first; `created_by` narrows the list to one user's jobs.
    pub async fn list_rpas(&self, created_by: Option<i64>) -> Result<Vec<RpaRecord>> {
        let rpas = match created_by {
            Some(user_id) => {
                sqlx::query_as::<_, RpaRecord>(&format!(
                    "{} WHERE r.created_by = ? ORDER BY r.created_at DESC, r.id DESC",
                    RPA_SELECT
                ))
                .bind(user_id)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, RpaRecord>(&format!(
                    "{} ORDER BY r.created_at DESC, r.id DESC",
                    RPA_SELECT
                ))
                .fetch_all(self.pool())
                .await?
            }
        };
        Ok(rpas)
    }

    pub async fn delete_rpa(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM agent_rpas WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("RPA {}", id)));
        }
        Ok(())
    }

    /// Puts a job back in the queue, discarding its previous outcome.
    pub async fn requeue_rpa(&self, id: i64, user_id: Option<i64>) -> Result<RpaRecord> {
        let result = sqlx::query(
            r#"
            UPDATE agent_rpas
            SET status = 'pending', result = NULL, error_message = NULL,
                executed_at = NULL, completed_at = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("RPA {}", id)));
        }
        self.log_agent_action("execute", "rpa", Some(id), user_id, None)
            .await?;

        self.get_rpa(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("RPA {}", id)))
    }

    /// Hands out up to `limit` pending query jobs and marks them running.
    ///
    /// Jobs are ordered by priority rank, then age. The status guard on the
    /// update means a job is claimed by at most one caller.
    pub async fn claim_pending_rpas(&self, limit: i64) -> Result<Vec<PendingRpa>> {
        let mut tx = self.pool().begin().await?;

        let candidates = sqlx::query_as::<_, RpaRecord>(&format!(
            r#"
            {}
            WHERE r.status = 'pending'
              AND (t.name LIKE '%Data Extraction%'
                   OR t.name LIKE '%Extração%'
                   OR r.parameters LIKE '%brudam%'
                   OR r.parameters LIKE '%query%')
            ORDER BY CASE r.priority
                         WHEN 'critical' THEN 1
                         WHEN 'high' THEN 2
                         WHEN 'medium' THEN 3
                         ELSE 4
                     END,
                     r.created_at ASC,
                     r.id ASC
            LIMIT ?
            "#,
            RPA_SELECT
        ))
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        let now = Utc::now();
        let mut claimed = Vec::with_capacity(candidates.len());
        for rpa in candidates {
            let result = sqlx::query(
                r#"
                UPDATE agent_rpas
                SET status = ?, executed_at = ?, updated_at = ?
                WHERE id = ? AND status = 'pending'
                "#,
            )
            .bind(RpaStatus::Running.as_str())
            .bind(now)
            .bind(now)
            .bind(rpa.id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 1 {
                claimed.push(PendingRpa::from(rpa));
            }
        }

        tx.commit().await?;
        Ok(claimed)
    }

    /// Stores the agent's outcome for a job and records it in the agent log.
    pub async fn complete_rpa(&self, id: i64, report: &ExecutionReport) -> Result<RpaRecord> {
        let status = if report.success {
            RpaStatus::Completed
        } else {
            RpaStatus::Failed
        };
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE agent_rpas
            SET status = ?, result = ?, error_message = ?, completed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(Json(StoredResult::from_report(report)))
        .bind(&report.error)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("RPA {}", id)));
        }

        self.log_agent_action(
            "execute_remote",
            "rpa",
            Some(id),
            None,
            Some(json!({
                "success": report.success,
                "row_count": report.row_count,
                "error": report.error,
                "logs": report.logs,
            })),
        )
        .await?;

        self.get_rpa(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("RPA {}", id)))
    }

    // ========================================================================
    // Dashboard requests
    // ========================================================================

    pub async fn create_dashboard_request(
        &self,
        request: &NewDashboardRequest,
    ) -> Result<DashboardRequestRecord> {
        if request.title.trim().is_empty() {
            return Err(Error::Validation("dashboard title is required".to_string()));
        }
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO agent_dashboard_requests (
                title, description, category, chart_types, filters,
                status, created_by, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, 'pending', ?, ?, ?)
            "#,
        )
        .bind(request.title.trim())
        .bind(&request.description)
        .bind(&request.category)
        .bind(Json(&request.chart_types))
        .bind(request.filters.as_ref().map(Json))
        .bind(request.created_by)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.log_agent_action("create", "dashboard", Some(id), request.created_by, None)
            .await?;

        self.get_dashboard_request(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("dashboard request {}", id)))
    }

    pub async fn get_dashboard_request(&self, id: i64) -> Result<Option<DashboardRequestRecord>> {
        let request = sqlx::query_as::<_, DashboardRequestRecord>(
            "SELECT * FROM agent_dashboard_requests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(request)
    }

    pub async fn list_dashboard_requests(
        &self,
        created_by: Option<i64>,
    ) -> Result<Vec<DashboardRequestRecord>> {
        let requests = match created_by {
            Some(user_id) => {
                sqlx::query_as::<_, DashboardRequestRecord>(
                    "SELECT * FROM agent_dashboard_requests WHERE created_by = ? \
                     ORDER BY created_at DESC, id DESC",
                )
                .bind(user_id)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, DashboardRequestRecord>(
                    "SELECT * FROM agent_dashboard_requests ORDER BY created_at DESC, id DESC",
                )
                .fetch_all(self.pool())
                .await?
            }
        };
        Ok(requests)
    }

    pub async fn delete_dashboard_request(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM agent_dashboard_requests WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("dashboard request {}", id)));
        }
        Ok(())
    }

    pub async fn requeue_dashboard_request(
        &self,
        id: i64,
        user_id: Option<i64>,
    ) -> Result<DashboardRequestRecord> {
        let result = sqlx::query(
            r#"
            UPDATE agent_dashboard_requests
            SET status = 'pending', result_data = NULL, error_message = NULL,
                processed_at = NULL, completed_at = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("dashboard request {}", id)));
        }
        self.log_agent_action("refresh", "dashboard", Some(id), user_id, None)
            .await?;

        self.get_dashboard_request(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("dashboard request {}", id)))
    }

    /// Hands out up to `limit` pending dashboard requests that carry a query, oldest first.
    pub async fn claim_pending_dashboards(&self, limit: i64) -> Result<Vec<PendingDashboard>> {
        let mut tx = self.pool().begin().await?;

        let candidates = sqlx::query_as::<_, DashboardRequestRecord>(
            r#"
            SELECT * FROM agent_dashboard_requests
            WHERE status = 'pending' AND filters LIKE '%query%'
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        let now = Utc::now();
        let mut claimed = Vec::with_capacity(candidates.len());
        for request in candidates {
            let result = sqlx::query(
                r#"
                UPDATE agent_dashboard_requests
                SET status = ?, processed_at = ?, updated_at = ?
                WHERE id = ? AND status = 'pending'
                "#,
            )
            .bind(DashboardStatus::Processing.as_str())
            .bind(now)
            .bind(now)
            .bind(request.id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 1 {
                claimed.push(PendingDashboard::from(request));
            }
        }

        tx.commit().await?;
        Ok(claimed)
    }

    pub async fn complete_dashboard(
        &self,
        id: i64,
        report: &ExecutionReport,
    ) -> Result<DashboardRequestRecord> {
        let status = if report.success {
            DashboardStatus::Completed
        } else {
            DashboardStatus::Failed
        };
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE agent_dashboard_requests
            SET status = ?, result_data = ?, error_message = ?, completed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(Json(StoredResult::from_report(report)))
        .bind(&report.error)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("dashboard request {}", id)));
        }

        self.log_agent_action(
            "execute_remote",
            "dashboard",
            Some(id),
            None,
            Some(json!({
                "success": report.success,
                "row_count": report.row_count,
                "error": report.error,
            })),
        )
        .await?;

        self.get_dashboard_request(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("dashboard request {}", id)))
    }

    // ========================================================================
    // Agent log
    // ========================================================================

    pub async fn log_agent_action(
        &self,
        action_type: &str,
        entity_type: &str,
        entity_id: Option<i64>,
        user_id: Option<i64>,
        details: Option<Value>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO agent_logs (action_type, entity_type, entity_id, user_id, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(action_type)
        .bind(entity_type)
        .bind(entity_id)
        .bind(user_id)
        .bind(details.map(Json))
        .bind(Utc::now())
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn agent_logs_for(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<Vec<AgentLogRecord>> {
        let logs = sqlx::query_as::<_, AgentLogRecord>(
            r#"
            SELECT * FROM agent_logs
            WHERE entity_type = ? AND entity_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(self.pool())
        .await?;
        Ok(logs)
    }
}
