use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::store::{StoreError, VarRecord};

const VAR_COLUMNS: &str = "id, application_id, key, value, updated_at";

pub async fn get_var(pool: &PgPool, application_id: i64, key: &str) -> Result<Option<VarRecord>, StoreError> {
    let rec = sqlx::query_as::<_, VarRecord>(&format!(
        "SELECT {VAR_COLUMNS} FROM var_store WHERE application_id = $1 AND key = $2"
    ))
    .bind(application_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(rec)
}

pub async fn upsert_var(
    pool: &PgPool,
    application_id: i64,
    key: &str,
    value: JsonValue,
) -> Result<VarRecord, StoreError> {
    let rec = sqlx::query_as::<_, VarRecord>(&format!(
        r#"
INSERT INTO var_store (application_id, key, value)
VALUES ($1, $2, $3)
ON CONFLICT (application_id, key) DO UPDATE SET
  value = EXCLUDED.value,
  updated_at = now()
RETURNING {VAR_COLUMNS}
        "#
    ))
    .bind(application_id)
    .bind(key)
    .bind(&value)
    .fetch_one(pool)
    .await?;
    Ok(rec)
}
