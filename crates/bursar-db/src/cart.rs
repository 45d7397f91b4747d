//! Per-user cart store.
//!
//! One cart per user, created lazily on first access. Cart mutation needs no
//! locking: it is user-scoped and every quantity/activity check done here is
//! only advisory feedback — checkout re-validates everything under row locks
//! and never trusts cart-time validity.

use bursar_schemas::{Cents, ShopError};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CartRow {
    pub cart_id: Uuid,
    pub user_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

/// One cart line joined with its product, so a cart read is a single query
/// with no per-item lookups.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i32,
    pub name: String,
    pub category: Option<String>,
    pub unit_price_cents: Cents,
    pub is_active: bool,
    pub stock_quantity: i32,
}

#[derive(Debug, Clone)]
pub struct HydratedCart {
    pub cart: CartRow,
    pub items: Vec<CartLine>,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Return the user's cart, creating an empty one on first use.
pub async fn get_or_create(pool: &PgPool, user_id: Uuid) -> Result<HydratedCart, ShopError> {
    let cart = get_or_create_row(pool, user_id).await?;
    hydrate(pool, cart).await
}

async fn get_or_create_row(pool: &PgPool, user_id: Uuid) -> Result<CartRow, ShopError> {
    // Upsert so concurrent first-access races converge on one row; the
    // no-op DO UPDATE makes RETURNING yield the existing row on conflict.
    let row = sqlx::query(
        r#"
        insert into carts (cart_id, user_id)
        values ($1, $2)
        on conflict (user_id) do update set user_id = excluded.user_id
        returning cart_id, user_id, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(CartRow {
        cart_id: row.try_get("cart_id")?,
        user_id: row.try_get("user_id")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn hydrate(pool: &PgPool, cart: CartRow) -> Result<HydratedCart, ShopError> {
    let rows = sqlx::query(
        r#"
        select ci.product_id, ci.quantity,
               p.name, p.category, p.price_cents, p.is_active, p.stock_quantity
        from cart_items ci
        join products p on p.product_id = ci.product_id
        where ci.cart_id = $1
        order by ci.product_id
        "#,
    )
    .bind(cart.cart_id)
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(CartLine {
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            unit_price_cents: Cents::new(row.try_get("price_cents")?),
            is_active: row.try_get("is_active")?,
            stock_quantity: row.try_get("stock_quantity")?,
        });
    }

    Ok(HydratedCart { cart, items })
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Add `quantity` of a product to the user's cart (additive: the new line
/// quantity is the existing quantity plus the request).
///
/// Fails `NotFound` for an absent product, `InvalidState` for an inactive
/// one, and `InsufficientStock` when the new total would exceed the current
/// stock. These checks are optimistic feedback only; checkout repeats them
/// under lock.
pub async fn add_item(
    pool: &PgPool,
    user_id: Uuid,
    product_id: i64,
    quantity: i32,
) -> Result<HydratedCart, ShopError> {
    if quantity < 1 {
        return Err(ShopError::InvalidState(
            "quantity must be at least 1".to_string(),
        ));
    }

    let cart = get_or_create_row(pool, user_id).await?;
    let product = crate::catalog::fetch_product(pool, product_id).await?;

    if !product.is_active {
        return Err(ShopError::InvalidState(format!(
            "{} is no longer available",
            product.name
        )));
    }

    let existing: i32 = sqlx::query(
        "select quantity from cart_items where cart_id = $1 and product_id = $2",
    )
    .bind(cart.cart_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?
    .map(|r| r.try_get("quantity"))
    .transpose()?
    .unwrap_or(0);

    let new_total = existing.saturating_add(quantity);
    if new_total > product.stock_quantity {
        return Err(ShopError::InsufficientStock {
            product: product.name,
            requested: new_total,
            available: product.stock_quantity,
        });
    }

    sqlx::query(
        r#"
        insert into cart_items (cart_id, product_id, quantity)
        values ($1, $2, $3)
        on conflict (cart_id, product_id) do update set quantity = excluded.quantity
        "#,
    )
    .bind(cart.cart_id)
    .bind(product_id)
    .bind(new_total)
    .execute(pool)
    .await?;

    touch(pool, cart.cart_id).await?;
    get_or_create(pool, user_id).await
}

/// Set a cart line to an absolute quantity (the `update_quantity` surface).
/// The item must already be in the cart.
pub async fn set_item_quantity(
    pool: &PgPool,
    user_id: Uuid,
    product_id: i64,
    quantity: i32,
) -> Result<HydratedCart, ShopError> {
    if quantity < 1 {
        return Err(ShopError::InvalidState(
            "quantity must be at least 1".to_string(),
        ));
    }

    let cart = get_or_create_row(pool, user_id).await?;
    let product = crate::catalog::fetch_product(pool, product_id).await?;

    if !product.is_active {
        return Err(ShopError::InvalidState(format!(
            "{} is no longer available",
            product.name
        )));
    }
    if quantity > product.stock_quantity {
        return Err(ShopError::InsufficientStock {
            product: product.name,
            requested: quantity,
            available: product.stock_quantity,
        });
    }

    let res = sqlx::query(
        "update cart_items set quantity = $3 where cart_id = $1 and product_id = $2",
    )
    .bind(cart.cart_id)
    .bind(product_id)
    .bind(quantity)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(ShopError::NotFound(format!(
            "product {product_id} is not in the cart"
        )));
    }

    touch(pool, cart.cart_id).await?;
    get_or_create(pool, user_id).await
}

/// Remove one line from the user's cart. `NotFound` if it isn't there.
pub async fn remove_item(
    pool: &PgPool,
    user_id: Uuid,
    product_id: i64,
) -> Result<HydratedCart, ShopError> {
    let cart = get_or_create_row(pool, user_id).await?;

    let res = sqlx::query("delete from cart_items where cart_id = $1 and product_id = $2")
        .bind(cart.cart_id)
        .bind(product_id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(ShopError::NotFound(format!(
            "product {product_id} is not in the cart"
        )));
    }

    touch(pool, cart.cart_id).await?;
    get_or_create(pool, user_id).await
}

/// Delete all lines from the user's cart.
pub async fn clear(pool: &PgPool, user_id: Uuid) -> Result<HydratedCart, ShopError> {
    let cart = get_or_create_row(pool, user_id).await?;

    sqlx::query("delete from cart_items where cart_id = $1")
        .bind(cart.cart_id)
        .execute(pool)
        .await?;

    touch(pool, cart.cart_id).await?;
    get_or_create(pool, user_id).await
}

async fn touch(pool: &PgPool, cart_id: Uuid) -> Result<(), ShopError> {
    sqlx::query("update carts set updated_at = now() where cart_id = $1")
        .bind(cart_id)
        .execute(pool)
        .await?;
    Ok(())
}
