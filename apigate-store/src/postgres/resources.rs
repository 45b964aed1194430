use sqlx::PgPool;

use crate::store::{NewResource, ResourceRecord, StoreError};

const RESOURCE_COLUMNS: &str = "id, application_id, method, uri, name, description, ttl, format, raw, tree, created_at, updated_at";

pub async fn find_resource(
    pool: &PgPool,
    application_id: i64,
    method: &str,
    uri: &str,
) -> Result<Option<ResourceRecord>, StoreError> {
    let rec = sqlx::query_as::<_, ResourceRecord>(&format!(
        "SELECT {RESOURCE_COLUMNS} FROM resources WHERE application_id = $1 AND method = $2 AND uri = $3"
    ))
    .bind(application_id)
    .bind(method)
    .bind(uri)
    .fetch_optional(pool)
    .await?;
    Ok(rec)
}

pub async fn get_resource(pool: &PgPool, id: i64) -> Result<Option<ResourceRecord>, StoreError> {
    let rec = sqlx::query_as::<_, ResourceRecord>(&format!(
        "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(rec)
}

pub async fn upsert_resource(pool: &PgPool, r: NewResource) -> Result<ResourceRecord, StoreError> {
    let rec = sqlx::query_as::<_, ResourceRecord>(&format!(
        r#"
INSERT INTO resources (application_id, method, uri, name, description, ttl, format, raw, tree)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
ON CONFLICT (application_id, method, uri) DO UPDATE SET
  name = EXCLUDED.name,
  description = EXCLUDED.description,
  ttl = EXCLUDED.ttl,
  format = EXCLUDED.format,
  raw = EXCLUDED.raw,
  tree = EXCLUDED.tree,
  updated_at = now()
RETURNING {RESOURCE_COLUMNS}
        "#
    ))
    .bind(r.application_id)
    .bind(r.method.as_str())
    .bind(&r.uri)
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.ttl)
    .bind(r.format.as_str())
    .bind(&r.raw)
    .bind(&r.tree)
    .fetch_one(pool)
    .await?;
    Ok(rec)
}

pub async fn delete_resource(pool: &PgPool, id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM resources WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
