use sqlx::PgPool;

use crate::store::{ApplicationRecord, RoleRecord, StoreError, UserRecord};

pub async fn get_application(pool: &PgPool, id: i64) -> Result<Option<ApplicationRecord>, StoreError> {
    let rec = sqlx::query_as::<_, ApplicationRecord>(
        r#"SELECT id, account_id, name FROM applications WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(rec)
}

pub async fn find_user_by_token(pool: &PgPool, token: &str) -> Result<Option<UserRecord>, StoreError> {
    let rec = sqlx::query_as::<_, UserRecord>(
        r#"
SELECT id, username, active, token, token_expires_at
FROM users WHERE token = $1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(rec)
}

pub async fn user_roles(pool: &PgPool, user_id: i64, application_id: i64) -> Result<Vec<RoleRecord>, StoreError> {
    let recs = sqlx::query_as::<_, RoleRecord>(
        r#"
SELECT DISTINCT r.id, r.name
FROM user_roles ur
JOIN roles r ON r.id = ur.role_id
WHERE ur.user_id = $1 AND (ur.application_id = $2 OR ur.application_id IS NULL)
ORDER BY r.id
        "#,
    )
    .bind(user_id)
    .bind(application_id)
    .fetch_all(pool)
    .await?;
    Ok(recs)
}

pub async fn find_role_by_name(pool: &PgPool, name: &str) -> Result<Option<RoleRecord>, StoreError> {
    let rec = sqlx::query_as::<_, RoleRecord>(r#"SELECT id, name FROM roles WHERE lower(name) = lower($1)"#)
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(rec)
}
