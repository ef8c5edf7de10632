//! Catalog gateway: the only part of the product record the checkout core
//! mutates is the stock count, and that mutation is a single conditional
//! UPDATE so concurrent checkouts cannot decrement from a stale baseline.

use crate::{entities::product, errors::ServiceError};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::error;

/// Looks up a product on the given connection (pool or open transaction).
pub async fn find_product<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
) -> Result<Option<product::Model>, ServiceError> {
    let product = product::Entity::find_by_id(product_id)
        .one(conn)
        .await
        .map_err(|e| {
            error!(error = %e, product_id, "Failed to fetch product");
            ServiceError::DatabaseError(e)
        })?;
    Ok(product)
}

/// Decrements a product's stock by `quantity`, clamped at zero, as one
/// atomic statement:
///
/// `SET stock = CASE WHEN stock >= q THEN stock - q ELSE 0 END`
///
/// Returns the number of rows touched (zero when the product is gone).
pub async fn decrement_stock_clamped<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    quantity: i32,
) -> Result<u64, ServiceError> {
    let result = product::Entity::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::case(
                Expr::col(product::Column::Stock).gte(quantity),
                Expr::col(product::Column::Stock).sub(quantity),
            )
            .finally(0)
            .into(),
        )
        .filter(product::Column::Id.eq(product_id))
        .exec(conn)
        .await
        .map_err(|e| {
            error!(error = %e, product_id, quantity, "Failed to decrement stock");
            ServiceError::DatabaseError(e)
        })?;

    Ok(result.rows_affected)
}
