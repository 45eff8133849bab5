//! # Sale Repository
//!
//! The sale transaction engine: validated, atomic stock decrements paired
//! with sale records.
//!
//! ## Recording A Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 record(): one SQLite transaction                        │
//! │                                                                         │
//! │  1. UPDATE products                                                     │
//! │        SET quantity = quantity - q                                      │
//! │      WHERE id = ? AND is_active = 1 AND quantity >= q                   │
//! │       │                                                                 │
//! │       ├── 0 rows → re-read product to classify:                         │
//! │       │     missing/inactive → ProductNotFound                          │
//! │       │     otherwise        → InsufficientStock { available }          │
//! │       │                                                                 │
//! │  2. Re-read updated product (price snapshot + new quantity)             │
//! │  3. INSERT sale (unit price frozen, total = q × unit price)             │
//! │  4. COMMIT                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why The Guarded UPDATE Comes First
//! The UPDATE is the first statement of the transaction, so it acquires
//! SQLite's single writer lock before the stock check is evaluated. Two
//! concurrent sales of the same product serialize on that lock and each
//! sees the other's committed decrement. A stale read can never let both
//! pass the check and jointly oversell.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use amantena_core::{CoreError, CoreResult, Money, Product, Sale};

/// A sale row joined with display fields for the caller.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct SaleWithNames {
    pub id: String,
    pub product_id: String,
    pub quantity_sold: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    pub user_id: String,
    pub notes: Option<String>,
    pub sold_at: chrono::DateTime<Utc>,
    pub product_name: String,
    pub product_category: String,
    pub sold_by: String,
}

/// Repository for sale database operations.
///
/// Owns the two transactions with real invariants: `record` and `reverse`.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale: atomically decrements stock and inserts the sale row.
    ///
    /// ## Arguments
    /// * `product_id` - Product being sold (must be active)
    /// * `quantity` - Units to sell; caller validates positivity
    /// * `user_id` - The user recording the sale
    /// * `notes` - Optional free-form notes
    ///
    /// ## Failure Order
    /// 1. `ProductNotFound` - no active product with that ID
    /// 2. `InsufficientStock` - carries the actual available quantity
    ///
    /// ## Returns
    /// The created sale and the post-decrement product, both as committed.
    pub async fn record(
        &self,
        product_id: &str,
        quantity: i64,
        user_id: &str,
        notes: Option<&str>,
    ) -> CoreResult<(Sale, Product)> {
        debug!(product_id = %product_id, quantity = %quantity, "Recording sale");

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        // Guarded decrement: the stock check and the write are one statement,
        // evaluated under the writer lock.
        let decremented = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity - ?2, updated_at = ?3
            WHERE id = ?1 AND is_active = 1 AND quantity >= ?2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if decremented.rows_affected() == 0 {
            // Classify: missing/inactive product vs. not enough stock.
            let product = sqlx::query_as::<_, Product>(
                r#"
                SELECT id, name, category, price_cents, quantity, threshold,
                       is_active, created_at, updated_at
                FROM products
                WHERE id = ?1 AND is_active = 1
                "#,
            )
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from)?;

            tx.rollback().await.map_err(DbError::from)?;

            return match product {
                None => Err(CoreError::ProductNotFound(product_id.to_string())),
                Some(p) => Err(CoreError::InsufficientStock {
                    product: p.name,
                    available: p.quantity,
                    requested: quantity,
                }),
            };
        }

        // Re-read the updated row. The decrement doesn't touch price, so
        // price_cents here IS the at-sale snapshot.
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, category, price_cents, quantity, threshold,
                   is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::from)?;

        let unit_price = Money::from_cents(product.price_cents);
        let sale = Sale {
            id: generate_sale_id(),
            product_id: product_id.to_string(),
            quantity_sold: quantity,
            unit_price_cents: unit_price.cents(),
            total_cents: unit_price.multiply_quantity(quantity).cents(),
            user_id: user_id.to_string(),
            notes: notes.map(str::to_string),
            sold_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, product_id, quantity_sold, unit_price_cents, total_cents,
                user_id, notes, sold_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.product_id)
        .bind(sale.quantity_sold)
        .bind(sale.unit_price_cents)
        .bind(sale.total_cents)
        .bind(&sale.user_id)
        .bind(&sale.notes)
        .bind(sale.sold_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        debug!(
            sale_id = %sale.id,
            total_cents = %sale.total_cents,
            remaining = %product.quantity,
            "Sale recorded"
        );

        Ok((sale, product))
    }

    /// Reverses a sale: atomically restores stock and deletes the sale row.
    ///
    /// No ceiling is applied to the restored quantity; reversal only undoes
    /// a prior decrement.
    ///
    /// ## Returns
    /// The quantity that was restored to the product.
    pub async fn reverse(&self, sale_id: &str) -> CoreResult<i64> {
        debug!(sale_id = %sale_id, "Reversing sale");

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, product_id, quantity_sold, unit_price_cents,
                   total_cents, user_id, notes, sold_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DbError::from)?;

        let Some(sale) = sale else {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(CoreError::SaleNotFound(sale_id.to_string()));
        };

        sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(&sale.product_id)
        .bind(sale.quantity_sold)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        debug!(sale_id = %sale_id, restored = %sale.quantity_sold, "Sale reversed");

        Ok(sale.quantity_sold)
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, product_id, quantity_sold, unit_price_cents,
                   total_cents, user_id, notes, sold_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Lists the most recent sales with product and seller display fields.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<SaleWithNames>> {
        let sales = sqlx::query_as::<_, SaleWithNames>(
            r#"
            SELECT s.id, s.product_id, s.quantity_sold, s.unit_price_cents,
                   s.total_cents, s.user_id, s.notes, s.sold_at,
                   p.name AS product_name, p.category AS product_category,
                   u.name AS sold_by
            FROM sales s
            INNER JOIN products p ON p.id = s.product_id
            INNER JOIN users u ON u.id = s.user_id
            ORDER BY s.sold_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Updates a sale's notes (the only mutable field).
    pub async fn update_notes(&self, id: &str, notes: Option<&str>) -> DbResult<()> {
        let result = sqlx::query("UPDATE sales SET notes = ?2 WHERE id = ?1")
            .bind(id)
            .bind(notes)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }

    /// Counts sales for a product (used to decide soft vs. hard delete).
    pub async fn count_for_product(&self, product_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE product_id = ?1")
            .bind(product_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
