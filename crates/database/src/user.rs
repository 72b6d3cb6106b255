//! User operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::User;
use crate::validation::validate_public_key;

/// Create a new user.
pub async fn create_user(
    pool: &SqlitePool,
    public_key: &str,
    username: Option<&str>,
) -> Result<User> {
    validate_public_key(public_key)?;

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (public_key, username)
        VALUES (?, ?)
        RETURNING id, public_key, username, created_at
        "#,
    )
    .bind(public_key)
    .bind(username)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "User",
                    id: public_key.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })
}

/// Get a user by ID.
pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, public_key, username, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })
}

/// Get a user by public key.
pub async fn get_user_by_public_key(pool: &SqlitePool, public_key: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, public_key, username, created_at
        FROM users
        WHERE public_key = ?
        "#,
    )
    .bind(public_key)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Return the user owning `public_key`, creating it on first sight.
pub async fn find_or_create_by_public_key(pool: &SqlitePool, public_key: &str) -> Result<User> {
    if let Some(user) = get_user_by_public_key(pool, public_key).await? {
        return Ok(user);
    }

    match create_user(pool, public_key, None).await {
        Ok(user) => Ok(user),
        // Lost a race with a concurrent insert.
        Err(DatabaseError::AlreadyExists { .. }) => get_user_by_public_key(pool, public_key)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "User",
                id: public_key.to_string(),
            }),
        Err(err) => Err(err),
    }
}

/// Delete a user by ID. Their bookmarks and publications go with them.
pub async fn delete_user(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        });
    }

    Ok(())
}
