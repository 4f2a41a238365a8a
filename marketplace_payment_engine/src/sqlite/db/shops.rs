use sqlx::SqliteConnection;

use crate::db_types::Shop;

pub async fn fetch_shop(id: i64, conn: &mut SqliteConnection) -> Result<Option<Shop>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM shops WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// A user owns at most one shop.
pub async fn fetch_shop_for_owner(owner_id: i64, conn: &mut SqliteConnection) -> Result<Option<Shop>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM shops WHERE owner_id = $1").bind(owner_id).fetch_optional(conn).await
}

pub async fn insert_shop(name: &str, owner_id: i64, conn: &mut SqliteConnection) -> Result<Shop, sqlx::Error> {
    sqlx::query_as("INSERT INTO shops (name, owner_id) VALUES ($1, $2) RETURNING *;")
        .bind(name)
        .bind(owner_id)
        .fetch_one(conn)
        .await
}
