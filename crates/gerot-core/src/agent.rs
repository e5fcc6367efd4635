//! Remote query jobs (RPAs) and dashboard requests shared between the API and
//! the polling agent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::{Error, Result};

/// Rows kept when a result is stored.
pub const MAX_RESULT_ROWS: usize = 1000;

pub const DEFAULT_QUERY: &str = "SELECT 1 as test";
pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpaStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RpaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpaStatus::Pending => "pending",
            RpaStatus::Running => "running",
            RpaStatus::Completed => "completed",
            RpaStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DashboardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DashboardStatus::Pending => "pending",
            DashboardStatus::Processing => "processing",
            DashboardStatus::Completed => "completed",
            DashboardStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpaPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl RpaPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpaPriority::Critical => "critical",
            RpaPriority::High => "high",
            RpaPriority::Medium => "medium",
            RpaPriority::Low => "low",
        }
    }

    /// Queue position; lower runs first.
    pub fn rank(&self) -> u8 {
        match self {
            RpaPriority::Critical => 1,
            RpaPriority::High => 2,
            RpaPriority::Medium => 3,
            RpaPriority::Low => 4,
        }
    }
}

impl Default for RpaPriority {
    fn default() -> Self {
        RpaPriority::Medium
    }
}

impl FromStr for RpaPriority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "critical" => Ok(RpaPriority::Critical),
            "high" => Ok(RpaPriority::High),
            "medium" => Ok(RpaPriority::Medium),
            "low" => Ok(RpaPriority::Low),
            other => Err(Error::InvalidValue(format!("unknown priority: {}", other))),
        }
    }
}

/// A job handed to the agent by `GET /api/agent/rpas/pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRpa {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<Value>,
    pub priority: String,
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingRpasResponse {
    #[serde(default)]
    pub rpas: Vec<PendingRpa>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDashboard {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub chart_types: Vec<String>,
    #[serde(default)]
    pub filters: Option<Value>,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingDashboardsResponse {
    #[serde(default)]
    pub dashboards: Vec<PendingDashboard>,
}

/// What the agent reports back after running a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub row_count: usize,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl ExecutionReport {
    /// Rows to persist, capped at [`MAX_RESULT_ROWS`].
    pub fn stored_rows(&self) -> Vec<Map<String, Value>> {
        self.data
            .as_ref()
            .map(|rows| rows.iter().take(MAX_RESULT_ROWS).cloned().collect())
            .unwrap_or_default()
    }
}

/// Builds the statement the agent is allowed to run from a job's parameters.
///
/// Only a single `SELECT` is accepted. A `LIMIT` clause is appended when the
/// query has none.
pub fn prepare_query(params: Option<&Value>) -> Result<String> {
    let object = match params {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            return Err(Error::QueryRejected(
                "parameters must be a JSON object".to_string(),
            ))
        }
    };

    let query = match object.and_then(|m| m.get("query")) {
        None | Some(Value::Null) => DEFAULT_QUERY.to_string(),
        Some(Value::String(q)) => q.clone(),
        Some(_) => return Err(Error::QueryRejected("query must be a string".to_string())),
    };

    let limit = match object.and_then(|m| m.get("limit")) {
        None | Some(Value::Null) => DEFAULT_LIMIT,
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| Error::QueryRejected(format!("invalid limit: {}", n)))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::QueryRejected(format!("invalid limit: {}", s)))?,
        Some(other) => return Err(Error::QueryRejected(format!("invalid limit: {}", other))),
    };
    if limit == 0 || limit > MAX_LIMIT {
        return Err(Error::QueryRejected(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    let mut sql = query.trim();
    if let Some(stripped) = sql.strip_suffix(';') {
        sql = stripped.trim_end();
    }

    let starts_with_select = sql
        .get(..6)
        .map(|head| head.eq_ignore_ascii_case("select"))
        .unwrap_or(false);
    if !starts_with_select {
        return Err(Error::QueryRejected(
            "only SELECT queries are allowed".to_string(),
        ));
    }
    if sql.contains(';') {
        return Err(Error::QueryRejected(
            "multiple statements are not allowed".to_string(),
        ));
    }

    let has_limit = sql
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .any(|token| token.eq_ignore_ascii_case("limit"));

    if has_limit {
        Ok(sql.to_string())
    } else {
        Ok(format!("{} LIMIT {}", sql, limit))
    }
}
