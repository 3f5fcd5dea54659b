//! Request log store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use reqlog_core::{Error, RequestLog, RequestLogSink, Result};

/// PostgreSQL-backed store for request logs.
///
/// A batch is written as a single multi-row INSERT, so it lands atomically:
/// either every record in the batch is stored or the statement fails and
/// the whole batch is reported failed.
#[derive(Clone)]
pub struct PgRequestLogStore {
    pool: Pool<Postgres>,
}

impl PgRequestLogStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Fetch all records carrying the given request id, oldest first.
    pub async fn find_by_request_id(&self, request_id: &str) -> Result<Vec<RequestLog>> {
        let rows = sqlx::query(
            "SELECT request_id, service_name, method, path, query_string,
                    status_code, remote_ip, user_agent, content_type, request_time,
                    created_at, file_name, file_size, content_json
             FROM request_logs
             WHERE request_id = $1
             ORDER BY id",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_row).collect())
    }

    /// Fetch the most recently stored records, newest first, optionally
    /// restricted to one request path.
    pub async fn list_recent(&self, limit: i64, path: Option<&str>) -> Result<Vec<RequestLog>> {
        let rows = if let Some(path) = path {
            sqlx::query(
                "SELECT request_id, service_name, method, path, query_string,
                        status_code, remote_ip, user_agent, content_type, request_time,
                        created_at, file_name, file_size, content_json
                 FROM request_logs
                 WHERE path = $1
                 ORDER BY id DESC
                 LIMIT $2",
            )
            .bind(path)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?
        } else {
            sqlx::query(
                "SELECT request_id, service_name, method, path, query_string,
                        status_code, remote_ip, user_agent, content_type, request_time,
                        created_at, file_name, file_size, content_json
                 FROM request_logs
                 ORDER BY id DESC
                 LIMIT $1",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?
        };

        Ok(rows.into_iter().map(Self::parse_row).collect())
    }

    /// Count all stored records.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM request_logs")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }

    /// Parse a request_logs row into a RequestLog struct.
    fn parse_row(row: sqlx::postgres::PgRow) -> RequestLog {
        RequestLog {
            request_id: row.get("request_id"),
            service_name: row.get("service_name"),
            method: row.get("method"),
            path: row.get("path"),
            query_string: row.get("query_string"),
            status_code: row.get("status_code"),
            remote_ip: row.get("remote_ip"),
            user_agent: row.get("user_agent"),
            content_type: row.get("content_type"),
            request_time: row.get("request_time"),
            created_at: row.get("created_at"),
            file_name: row.get("file_name"),
            file_size: row.get("file_size"),
            content_json: row.get("content_json"),
        }
    }
}

#[async_trait]
impl RequestLogSink for PgRequestLogStore {
    async fn write_batch(&self, records: &[RequestLog]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let request_ids: Vec<String> = records.iter().map(|r| r.request_id.clone()).collect();
        let service_names: Vec<String> = records.iter().map(|r| r.service_name.clone()).collect();
        let methods: Vec<String> = records.iter().map(|r| r.method.clone()).collect();
        let paths: Vec<String> = records.iter().map(|r| r.path.clone()).collect();
        let query_strings: Vec<String> = records.iter().map(|r| r.query_string.clone()).collect();
        let status_codes: Vec<i32> = records.iter().map(|r| r.status_code).collect();
        let remote_ips: Vec<String> = records.iter().map(|r| r.remote_ip.clone()).collect();
        let user_agents: Vec<String> = records.iter().map(|r| r.user_agent.clone()).collect();
        let content_types: Vec<String> = records.iter().map(|r| r.content_type.clone()).collect();
        let request_times: Vec<f64> = records.iter().map(|r| r.request_time).collect();
        let created_ats: Vec<DateTime<Utc>> = records.iter().map(|r| r.created_at).collect();
        let file_names: Vec<Option<String>> = records.iter().map(|r| r.file_name.clone()).collect();
        let file_sizes: Vec<Option<i64>> = records.iter().map(|r| r.file_size).collect();
        let content_jsons: Vec<Option<JsonValue>> =
            records.iter().map(|r| r.content_json.clone()).collect();

        sqlx::query(
            "INSERT INTO request_logs (
                 request_id, service_name, method, path, query_string,
                 status_code, remote_ip, user_agent, content_type, request_time,
                 created_at, file_name, file_size, content_json
             )
             SELECT * FROM UNNEST(
                 $1::text[], $2::text[], $3::text[], $4::text[], $5::text[],
                 $6::int4[], $7::text[], $8::text[], $9::text[], $10::float8[],
                 $11::timestamptz[], $12::text[], $13::int8[], $14::jsonb[]
             )",
        )
        .bind(&request_ids)
        .bind(&service_names)
        .bind(&methods)
        .bind(&paths)
        .bind(&query_strings)
        .bind(&status_codes)
        .bind(&remote_ips)
        .bind(&user_agents)
        .bind(&content_types)
        .bind(&request_times)
        .bind(&created_ats)
        .bind(&file_names)
        .bind(&file_sizes)
        .bind(&content_jsons)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "request_log_store",
            op = "write_batch",
            count = records.len(),
            "Batch inserted"
        );
        Ok(())
    }
}
