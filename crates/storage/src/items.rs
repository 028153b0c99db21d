use crate::models::{Item, ItemStatus, NewItem};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

const ITEM_COLUMNS: &str = "id, name, user_id, expiry_date, added_at, status";

fn item_from_row(row: &SqliteRow) -> anyhow::Result<Item> {
    let status: String = row.try_get("status")?;
    Ok(Item {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        user_id: row.try_get("user_id")?,
        expiry_date: row.try_get::<Option<NaiveDate>, _>("expiry_date")?,
        added_at: row.try_get::<DateTime<Utc>, _>("added_at")?,
        status: status.parse().map_err(anyhow::Error::msg)?,
    })
}

/// Appends a new active item.
pub async fn insert_item(pool: &SqlitePool, item: &NewItem) -> anyhow::Result<Item> {
    let id = sqlx::query(
        "INSERT INTO items (name, user_id, expiry_date, added_at, status) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&item.name)
    .bind(&item.user_id)
    .bind(item.expiry_date)
    .bind(item.added_at)
    .bind(ItemStatus::Active.as_str())
    .execute(pool)
    .await?
    .last_insert_rowid();
    info!(id, name = %item.name, user = %item.user_id, "item stored");
    Ok(Item {
        id,
        name: item.name.clone(),
        user_id: item.user_id.clone(),
        expiry_date: item.expiry_date,
        added_at: item.added_at,
        status: ItemStatus::Active,
    })
}

/// Active items, soonest expiry first; items without a date go last.
pub async fn list_active(pool: &SqlitePool, user_id: Option<&str>) -> anyhow::Result<Vec<Item>> {
    let mut sql = format!("SELECT {} FROM items WHERE status = 'active'", ITEM_COLUMNS);
    if user_id.is_some() {
        sql.push_str(" AND user_id = ?");
    }
    sql.push_str(" ORDER BY expiry_date IS NULL, expiry_date, id");
    let mut query = sqlx::query(&sql);
    if let Some(user) = user_id {
        query = query.bind(user);
    }
    let rows = query.fetch_all(pool).await?;
    rows.iter().map(item_from_row).collect()
}

pub async fn get_item(pool: &SqlitePool, id: i64) -> anyhow::Result<Option<Item>> {
    let sql = format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(item_from_row).transpose()
}

/// Moves an item from active to consumed.
///
/// Returns `false` when no item has this id. Consumed items stay consumed.
pub async fn mark_consumed(pool: &SqlitePool, id: i64) -> anyhow::Result<bool> {
    let updated = sqlx::query("UPDATE items SET status = 'consumed' WHERE id = ? AND status = 'active'")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if updated > 0 {
        info!(id, "item consumed");
        return Ok(true);
    }
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM items WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    debug!(id, exists = exists.is_some(), "consume matched no active item");
    Ok(exists.is_some())
}
