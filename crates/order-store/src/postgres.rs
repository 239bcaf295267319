use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, SubmitContext};
use domain::{IdempotencyKey, Order, OrderItem, OrderStatus};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{OrderStore, Result, StoreError};

const UNIQUE_KEY_CONSTRAINT: &str = "unique_order_idempotency_key";

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_item(row: PgRow) -> Result<OrderItem> {
        let product_id: String = row.try_get("product_id")?;
        let quantity: i64 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity)
            .map_err(|_| StoreError::Corrupt(format!("quantity {quantity} out of range")))?;
        Ok(OrderItem::new(product_id, quantity))
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let key: String = row.try_get("idempotency_key")?;
        let key = IdempotencyKey::new(key).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let status: String = row.try_get("status")?;
        let status: OrderStatus = status
            .parse()
            .map_err(|e: domain::OrderError| StoreError::Corrupt(e.to_string()))?;

        Ok(Order::restore(
            OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            key,
            items,
            status,
            row.try_get::<DateTime<Utc>, _>("created_at")?,
            row.try_get::<DateTime<Utc>, _>("updated_at")?,
        ))
    }

    async fn fetch_by_key(&self, key: &IdempotencyKey) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, idempotency_key, status, created_at, updated_at
            FROM orders
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let order_id: Uuid = row.try_get("id")?;
        let item_rows = sqlx::query(
            r#"
            SELECT product_id, quantity
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .into_iter()
            .map(Self::row_to_item)
            .collect::<Result<Vec<_>>>()?;
        if items.is_empty() {
            return Err(StoreError::Corrupt(format!("order {order_id} has no items")));
        }

        Self::row_to_order(&row, items).map(Some)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, ctx, order), fields(order_id = %order.id(), key = %order.idempotency_key()))]
    async fn create(&self, ctx: &SubmitContext, order: &Order) -> Result<Order> {
        // Waiting for a connection honours the context. Once statements are
        // issued the write runs to completion so its outcome is known.
        let key = order.idempotency_key();
        let mut tx = ctx.run(self.pool.begin()).await??;

        sqlx::query(
            r#"
            INSERT INTO orders (id, idempotency_key, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(key.as_str())
        .bind(order.status().as_str())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(UNIQUE_KEY_CONSTRAINT)
            {
                return StoreError::Conflict { key: key.clone() };
            }
            StoreError::Database(e)
        })?;

        for (position, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, quantity)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_str())
            .bind(i64::from(item.quantity))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        metrics::counter!("order_store_writes_total").increment(1);

        Ok(order.clone())
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn find_by_idempotency_key(
        &self,
        ctx: &SubmitContext,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>> {
        ctx.run(self.fetch_by_key(key)).await?
    }
}
