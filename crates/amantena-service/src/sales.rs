//! Sale recording and reversal.
//!
//! Thin orchestration over the sale transaction engine in the storage
//! layer: input validation up front, event fan-out after commit. The
//! atomicity story lives entirely in `amantena_db::repository::sale`.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use amantena_core::{validate_sale_quantity, CoreError, CoreResult, Product, Sale};
use amantena_db::{Database, DbError, SaleWithNames};

use crate::notify::{EventBus, TOPIC_LOW_STOCK_ALERT, TOPIC_PRODUCT_UPDATED, TOPIC_SALE_CREATED};

/// A request to record a sale.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordSaleRequest {
    pub product_id: String,
    pub quantity: i64,
    pub notes: Option<String>,
}

/// A recorded sale with its context, as returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    /// The product as committed, stock already decremented
    pub product: Product,
    pub sold_by: String,
}

/// Service for recording and reversing sales.
#[derive(Debug, Clone)]
pub struct SaleService {
    db: Database,
    events: EventBus,
}

impl SaleService {
    /// Creates a new SaleService.
    pub fn new(db: Database, events: EventBus) -> Self {
        SaleService { db, events }
    }

    /// Records a sale on behalf of `user_id`.
    ///
    /// Validation happens before any storage work; the decrement and the
    /// sale insert are one transaction. Events go out after commit and are
    /// best-effort.
    ///
    /// ## Failure Order
    /// 1. `Validation` - quantity must be positive
    /// 2. `ProductNotFound` / `InsufficientStock` - from the engine
    pub async fn record_sale(
        &self,
        user_id: &str,
        request: RecordSaleRequest,
    ) -> CoreResult<SaleReceipt> {
        validate_sale_quantity(request.quantity)?;

        let (sale, product) = self
            .db
            .sales()
            .record(
                &request.product_id,
                request.quantity,
                user_id,
                request.notes.as_deref(),
            )
            .await?;

        let sold_by = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| user_id.to_string());

        info!(
            sale_id = %sale.id,
            product = %product.name,
            quantity = %sale.quantity_sold,
            total_cents = %sale.total_cents,
            sold_by = %sold_by,
            "Sale recorded"
        );

        self.events.publish(
            TOPIC_SALE_CREATED,
            json!({ "sale": sale, "soldBy": sold_by }),
        );
        self.events
            .publish(TOPIC_PRODUCT_UPDATED, json!({ "product": product }));

        if product.is_low_stock() {
            let message = format!(
                "Low stock alert: {} has only {} units left",
                product.name, product.quantity
            );
            warn!(product = %product.name, quantity = %product.quantity, "Low stock");
            self.events.publish(
                TOPIC_LOW_STOCK_ALERT,
                json!({
                    "productId": product.id,
                    "quantity": product.quantity,
                    "threshold": product.threshold,
                    "message": message,
                }),
            );
        }

        Ok(SaleReceipt {
            sale,
            product,
            sold_by,
        })
    }

    /// Reverses a sale, restoring its stock.
    ///
    /// ## Returns
    /// The quantity restored to the product.
    pub async fn reverse_sale(&self, sale_id: &str) -> CoreResult<i64> {
        // Captured before the row disappears, for the post-commit event
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        let restored = self.db.sales().reverse(sale_id).await?;

        info!(sale_id = %sale_id, restored = %restored, "Sale reversed");

        if let Some(product) = self.db.products().get_by_id(&sale.product_id).await? {
            self.events
                .publish(TOPIC_PRODUCT_UPDATED, json!({ "product": product }));
        }

        Ok(restored)
    }

    /// Updates a sale's notes, the only field that stays editable after
    /// the fact.
    ///
    /// ## Returns
    /// The sale with its notes updated.
    pub async fn update_notes(
        &self,
        sale_id: &str,
        notes: Option<&str>,
    ) -> CoreResult<Sale> {
        match self.db.sales().update_notes(sale_id, notes).await {
            Ok(()) => {}
            Err(DbError::NotFound { .. }) => {
                return Err(CoreError::SaleNotFound(sale_id.to_string()));
            }
            Err(other) => return Err(other.into()),
        }

        self.db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))
    }

    /// Lists the most recent sales with display fields.
    pub async fn list_recent(&self, limit: u32) -> CoreResult<Vec<SaleWithNames>> {
        Ok(self.db.sales().list_recent(limit).await?)
    }

    /// Lists active products at or below their reorder threshold.
    pub async fn low_stock_report(&self) -> CoreResult<Vec<Product>> {
        Ok(self.db.products().list_low_stock().await?)
    }
}
