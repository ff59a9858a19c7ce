use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Row, params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{Database, DbError};

const LLM_CALL_COLUMNS: &str = "id, user_id, model, request_json, response_json, input_tokens, output_tokens, latency_ms, error, created_at";
const DEFAULT_LIST_LIMIT: i64 = 100;

#[derive(Debug, Error)]
pub enum LlmCallError {
    #[error("database error: {0}")]
    Database(#[from] DbError),
    #[error("sql error: {0}")]
    Sql(#[from] libsql::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("datetime parse error: {0}")]
    DateTimeParse(#[from] chrono::ParseError),
    #[error("insert failed: {0}")]
    InsertFailed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewLlmCall {
    pub user_id: i64,
    pub model: String,
    pub request_json: Value,
    pub response_json: Option<Value>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

/// One audit row per model call, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmCall {
    pub id: String,
    pub user_id: i64,
    pub model: String,
    pub request_json: Value,
    pub response_json: Option<Value>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct LlmCallRepository {
    db: Database,
}

impl LlmCallRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, call: NewLlmCall) -> Result<LlmCall, LlmCallError> {
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();
        let request_json = serde_json::to_string(&call.request_json)?;
        let response_json = match &call.response_json {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                &format!(
                    "INSERT INTO llm_calls (
                        id, user_id, model, request_json, response_json,
                        input_tokens, output_tokens, latency_ms, error, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    RETURNING {LLM_CALL_COLUMNS}"
                ),
                params![
                    id,
                    call.user_id,
                    call.model,
                    request_json,
                    response_json,
                    call.input_tokens.map(|v| v as i64),
                    call.output_tokens.map(|v| v as i64),
                    call.latency_ms.map(|v| v as i64),
                    call.error,
                    now,
                ],
            )
            .await?;

        match rows.next().await? {
            Some(row) => row_to_llm_call(row),
            None => Err(LlmCallError::InsertFailed(
                "insert failed: no rows returned".into(),
            )),
        }
    }

    pub async fn list_for_user(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<LlmCall>, LlmCallError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {LLM_CALL_COLUMNS}
                     FROM llm_calls
                     WHERE user_id = ?1
                     ORDER BY created_at DESC
                     LIMIT ?2"
                ),
                params![user_id, limit.unwrap_or(DEFAULT_LIST_LIMIT)],
            )
            .await?;

        let mut calls = Vec::new();
        while let Some(row) = rows.next().await? {
            calls.push(row_to_llm_call(row)?);
        }
        Ok(calls)
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn row_to_llm_call(row: Row) -> Result<LlmCall, LlmCallError> {
    let request_json: String = row.get(3)?;
    let response_json: Option<String> = row.get(4)?;
    let input_tokens: Option<i64> = row.get(5)?;
    let output_tokens: Option<i64> = row.get(6)?;
    let latency_ms: Option<i64> = row.get(7)?;
    let created_at: String = row.get(9)?;

    Ok(LlmCall {
        id: row.get(0)?,
        user_id: row.get(1)?,
        model: row.get(2)?,
        request_json: serde_json::from_str(&request_json)?,
        response_json: response_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        input_tokens: input_tokens.and_then(|v| u32::try_from(v).ok()),
        output_tokens: output_tokens.and_then(|v| u32::try_from(v).ok()),
        latency_ms: latency_ms.and_then(|v| u64::try_from(v).ok()),
        error: row.get(8)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
    })
}
