//! Postgres-backed cart store
//!
//! Carts live in `ezbuy.user_info`, one row per client, with the item list
//! kept as a JSONB array of strings in display order. Each trait operation is
//! a single statement, so the item cap and the "add if absent" check hold
//! under concurrent requests for the same client. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) to avoid a compile-time DB requirement.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::cart::store::Result;
use crate::cart::{AddedItem, Cart, CartStore, RemovedItem, ITEM_LIMIT};
use crate::error::StoreError;

/// DDL for the cart table, run by `DatabaseManager::ensure_schema`
pub fn schema_statements() -> Vec<String> {
    vec![
        "CREATE SCHEMA IF NOT EXISTS ezbuy".to_string(),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS ezbuy.user_info (
                client_id      TEXT PRIMARY KEY,
                client_name    TEXT NOT NULL DEFAULT '',
                shopping_cart  JSONB NOT NULL DEFAULT '[]'::jsonb,
                posts_notified JSONB NOT NULL DEFAULT '[]'::jsonb,
                created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
                CONSTRAINT shopping_cart_limit CHECK (jsonb_array_length(shopping_cart) <= {limit})
            )
            "#,
            limit = ITEM_LIMIT
        ),
    ]
}

const CART_COLUMNS: &str = "client_id, client_name, shopping_cart, posts_notified";

fn cart_from_row(row: &PgRow) -> Result<Cart> {
    let client_id: String = row.try_get("client_id")?;
    let items = json_list(row, &client_id, "shopping_cart")?;
    let posts_notified = json_list(row, &client_id, "posts_notified")?;
    Ok(Cart {
        client_name: row.try_get("client_name")?,
        client_id,
        items,
        posts_notified,
    })
}

fn json_list(row: &PgRow, client_id: &str, column: &str) -> Result<Vec<String>> {
    row.try_get::<Json<Vec<String>>, _>(column)
        .map(|Json(list)| list)
        .map_err(|e| decode_error(client_id, e))
}

/// A JSONB column that is not a list of strings is a corrupt document
fn decode_error(client_id: &str, error: sqlx::Error) -> StoreError {
    match error {
        sqlx::Error::ColumnDecode { index, source } => StoreError::Corrupt {
            client_id: client_id.to_string(),
            message: format!("{}: {}", index, source),
        },
        other => other.into(),
    }
}

/// [`CartStore`] over a Postgres pool
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn find(&self, client_id: &str) -> Result<Option<Cart>> {
        let query = format!(
            "SELECT {} FROM ezbuy.user_info WHERE client_id = $1",
            CART_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(cart_from_row).transpose()
    }

    async fn create_with_first_item(
        &self,
        client_id: &str,
        client_name: &str,
        item_name: &str,
    ) -> Result<Option<Cart>> {
        let query = format!(
            r#"
            INSERT INTO ezbuy.user_info (client_id, client_name, shopping_cart)
            VALUES ($1, $2, jsonb_build_array($3::text))
            ON CONFLICT (client_id) DO NOTHING
            RETURNING {}
            "#,
            CART_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(client_id)
            .bind(client_name)
            .bind(item_name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(cart_from_row).transpose()
    }

    async fn add_item_if_room(
        &self,
        client_id: &str,
        client_name: &str,
        item_name: &str,
    ) -> Result<Option<AddedItem>> {
        let row = sqlx::query(
            r#"
            WITH prior AS (
                SELECT client_id, shopping_cart @> jsonb_build_array($3::text) AS present
                FROM ezbuy.user_info
                WHERE client_id = $1
                  AND jsonb_array_length(shopping_cart) < $4
                FOR UPDATE
            )
            UPDATE ezbuy.user_info AS u
            SET shopping_cart = CASE
                    WHEN prior.present THEN u.shopping_cart
                    ELSE u.shopping_cart || jsonb_build_array($3::text)
                END,
                client_name = $2,
                updated_at = now()
            FROM prior
            WHERE u.client_id = prior.client_id
            RETURNING u.client_id, u.client_name, u.shopping_cart, u.posts_notified,
                      NOT prior.present AS inserted
            "#,
        )
        .bind(client_id)
        .bind(client_name)
        .bind(item_name)
        .bind(ITEM_LIMIT as i32)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let inserted: bool = row.try_get("inserted")?;
        Ok(Some(AddedItem {
            cart: cart_from_row(&row)?,
            inserted,
        }))
    }

    async fn remove_item_at(&self, client_id: &str, index: usize) -> Result<Option<RemovedItem>> {
        let Ok(index) = i32::try_from(index) else {
            return Ok(None);
        };
        let row = sqlx::query(
            r#"
            WITH target AS (
                SELECT client_id, shopping_cart -> $2::int AS item
                FROM ezbuy.user_info
                WHERE client_id = $1
                  AND $2::int < jsonb_array_length(shopping_cart)
                FOR UPDATE
            )
            UPDATE ezbuy.user_info AS u
            SET shopping_cart = COALESCE(
                    (SELECT jsonb_agg(e.value ORDER BY e.ord)
                     FROM jsonb_array_elements(u.shopping_cart) WITH ORDINALITY AS e(value, ord)
                     WHERE e.value <> target.item),
                    '[]'::jsonb),
                updated_at = now()
            FROM target
            WHERE u.client_id = target.client_id
            RETURNING u.client_id, u.client_name, u.shopping_cart, u.posts_notified,
                      target.item #>> '{}' AS removed_item
            "#,
        )
        .bind(client_id)
        .bind(index)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let item_name: String = row.try_get("removed_item")?;
        let cart = cart_from_row(&row)?;
        Ok(Some(RemovedItem { item_name, cart }))
    }

    async fn clear_all(&self, client_id: &str) -> Result<Option<Cart>> {
        let query = format!(
            r#"
            UPDATE ezbuy.user_info
            SET shopping_cart = '[]'::jsonb, updated_at = now()
            WHERE client_id = $1
            RETURNING {}
            "#,
            CART_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(cart_from_row).transpose()
    }

    async fn list_carts(&self) -> Result<Vec<Cart>> {
        let query = format!(
            r#"
            SELECT {}
            FROM ezbuy.user_info
            WHERE jsonb_array_length(shopping_cart) > 0
            ORDER BY client_id
            "#,
            CART_COLUMNS
        );
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(cart_from_row).collect()
    }

    async fn record_notified(&self, client_id: &str, post_ids: &[String]) -> Result<()> {
        let mut unique: Vec<String> = Vec::with_capacity(post_ids.len());
        for id in post_ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }
        if unique.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE ezbuy.user_info AS u
            SET posts_notified = u.posts_notified || COALESCE(
                    (SELECT jsonb_agg(t.post_id ORDER BY t.ord)
                     FROM unnest($2::text[]) WITH ORDINALITY AS t(post_id, ord)
                     WHERE NOT u.posts_notified @> jsonb_build_array(t.post_id)),
                    '[]'::jsonb),
                updated_at = now()
            WHERE u.client_id = $1
            "#,
        )
        .bind(client_id)
        .bind(&unique)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
