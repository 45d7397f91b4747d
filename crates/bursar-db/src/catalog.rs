//! Product catalog reads and the few writes the store engine owns.
//!
//! Catalog management proper (names, categories, pricing) belongs to the
//! school-admin side of the platform; this module carries only what the
//! cart/checkout path and the admin seeding tools need.

use bursar_schemas::{Cents, ShopError};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ProductRow {
    pub product_id: i64,
    pub school_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub price_cents: Cents,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub school_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub price_cents: Cents,
    pub stock_quantity: i32,
    pub is_active: bool,
}

fn product_from_row(row: &sqlx::postgres::PgRow) -> Result<ProductRow, ShopError> {
    Ok(ProductRow {
        product_id: row.try_get("product_id")?,
        school_id: row.try_get("school_id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        price_cents: Cents::new(row.try_get("price_cents")?),
        stock_quantity: row.try_get("stock_quantity")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a product, returning its generated id.
pub async fn insert_product(pool: &PgPool, p: &NewProduct) -> Result<i64, ShopError> {
    let row = sqlx::query(
        r#"
        insert into products (school_id, name, category, price_cents, stock_quantity, is_active)
        values ($1, $2, $3, $4, $5, $6)
        returning product_id
        "#,
    )
    .bind(p.school_id)
    .bind(&p.name)
    .bind(&p.category)
    .bind(p.price_cents.raw())
    .bind(p.stock_quantity)
    .bind(p.is_active)
    .fetch_one(pool)
    .await?;

    Ok(row.try_get("product_id")?)
}

pub async fn fetch_product(pool: &PgPool, product_id: i64) -> Result<ProductRow, ShopError> {
    let row = sqlx::query(
        r#"
        select product_id, school_id, name, category, price_cents,
               stock_quantity, is_active, created_at, updated_at
        from products
        where product_id = $1
        "#,
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ShopError::NotFound(format!("product {product_id}")))?;

    product_from_row(&row)
}

/// Flip a product's availability. Carts may still reference a deactivated
/// product; checkout re-validates under lock and rejects it.
pub async fn set_product_active(
    pool: &PgPool,
    product_id: i64,
    is_active: bool,
) -> Result<(), ShopError> {
    let res = sqlx::query(
        "update products set is_active = $2, updated_at = now() where product_id = $1",
    )
    .bind(product_id)
    .bind(is_active)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(ShopError::NotFound(format!("product {product_id}")));
    }
    Ok(())
}
