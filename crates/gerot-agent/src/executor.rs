use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use gerot_core::{prepare_query, ExecutionReport};
use serde_json::{Map, Number, Value};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::types::Json;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::time::Duration;

use crate::{Error, Result};

pub type JsonRow = Map<String, Value>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const QUERY_TIMEOUT: Duration = Duration::from_secs(120);

/// Source database the agent runs job queries against.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Cheap round trip used at startup.
    async fn ping(&self) -> Result<()>;

    async fn run(&self, sql: &str) -> Result<Vec<JsonRow>>;
}

pub struct MySqlRunner {
    pool: MySqlPool,
}

impl MySqlRunner {
    /// Builds the pool without connecting; the first query opens the connection.
    pub fn connect_lazy(options: MySqlConnectOptions) -> Self {
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_lazy_with(options);
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl QueryRunner for MySqlRunner {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1 as test").execute(&self.pool).await?;
        Ok(())
    }

    async fn run(&self, sql: &str) -> Result<Vec<JsonRow>> {
        let rows = tokio::time::timeout(QUERY_TIMEOUT, sqlx::query(sql).fetch_all(&self.pool))
            .await
            .map_err(|_| Error::Timeout(QUERY_TIMEOUT.as_secs()))??;

        rows.iter().map(row_to_json).collect()
    }
}

fn row_to_json(row: &MySqlRow) -> Result<JsonRow> {
    let mut object = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let index = column.ordinal();
        let value = if row.try_get_raw(index)?.is_null() {
            Value::Null
        } else {
            column_value(row, index, column.type_info().name())?
        };
        object.insert(column.name().to_string(), value);
    }
    Ok(object)
}

fn column_value(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value> {
    let type_name = type_name.to_ascii_uppercase();
    let value = match type_name.as_str() {
        "BOOLEAN" => Value::Bool(row.try_get_unchecked::<bool, _>(index)?),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => Value::from(row.try_get_unchecked::<u64, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Value::from(row.try_get_unchecked::<i64, _>(index)?)
        }
        "FLOAT" => float_value(row.try_get_unchecked::<f32, _>(index)? as f64),
        "DOUBLE" => float_value(row.try_get_unchecked::<f64, _>(index)?),
        "DECIMAL" | "NUMERIC" => decimal_value(&row.try_get_unchecked::<String, _>(index)?),
        "DATETIME" | "TIMESTAMP" => Value::String(
            row.try_get_unchecked::<NaiveDateTime, _>(index)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        "DATE" => Value::String(row.try_get_unchecked::<NaiveDate, _>(index)?.to_string()),
        // TIME columns may exceed a day; fall back to the raw text
        "TIME" => match row.try_get_unchecked::<NaiveTime, _>(index) {
            Ok(time) => Value::String(time.format("%H:%M:%S%.f").to_string()),
            Err(_) => Value::String(lossy_text(row, index)?),
        },
        "JSON" => row.try_get_unchecked::<Json<Value>, _>(index)?.0,
        "VARCHAR" | "CHAR" | "TEXT" | "ENUM" | "SET" => {
            Value::String(row.try_get_unchecked::<String, _>(index)?)
        }
        _ => Value::String(lossy_text(row, index)?),
    };
    Ok(value)
}

fn lossy_text(row: &MySqlRow, index: usize) -> Result<String> {
    let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn float_value(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// DECIMAL arrives as text; it is reported as a float like every other number.
fn decimal_value(text: &str) -> Value {
    match text.trim().parse::<f64>() {
        Ok(parsed) => float_value(parsed),
        Err(_) => Value::String(text.to_string()),
    }
}

#[derive(Default)]
struct JobLog(Vec<String>);

impl JobLog {
    fn push(&mut self, message: impl AsRef<str>) {
        self.0.push(format!(
            "[{}] {}",
            Local::now().format("%Y-%m-%dT%H:%M:%S%.6f"),
            message.as_ref()
        ));
    }
}

/// Runs one job's query and packages the outcome for the API.
///
/// Never fails: rejected queries and database errors end up in the report.
pub async fn execute_job<R>(runner: &R, label: &str, params: Option<&Value>) -> ExecutionReport
where
    R: QueryRunner + ?Sized,
{
    let mut log = JobLog::default();
    log.push(format!("Starting: {}", label));

    match run_query(runner, params, &mut log).await {
        Ok(rows) => {
            log.push(format!("Query finished: {} rows", rows.len()));
            ExecutionReport {
                success: true,
                row_count: rows.len(),
                data: Some(rows),
                error: None,
                logs: log.0,
            }
        }
        Err(e) => {
            log.push(format!("ERROR: {}", e));
            ExecutionReport {
                success: false,
                data: None,
                error: Some(e.to_string()),
                row_count: 0,
                logs: log.0,
            }
        }
    }
}

async fn run_query<R>(runner: &R, params: Option<&Value>, log: &mut JobLog) -> Result<Vec<JsonRow>>
where
    R: QueryRunner + ?Sized,
{
    let sql = prepare_query(params)?;
    log.push("Running query");
    runner.run(&sql).await
}
