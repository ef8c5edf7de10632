use crate::{
    db::DbPool,
    entities::{
        checkout_information::{self, Entity as CheckoutInformationEntity},
        customer::Entity as CustomerEntity,
        order::{self, Entity as OrderEntity},
        order_item::{self, Entity as OrderItemEntity},
    },
    errors::ServiceError,
    services::{
        checkout::{CheckoutInfoDraft, OrderDraft},
        inventory::LineItem,
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub const DEFAULT_ORDER_STATUS: &str = "Processing";

/// Order persistence: the writer used inside the checkout transaction plus
/// the read and status-update paths.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Persists the order header and its checkout information on the
    /// caller's connection, stamping the shared external order id onto
    /// both rows. Returns the storage id and the external id.
    pub async fn create_order<C: ConnectionTrait>(
        &self,
        conn: &C,
        order: &OrderDraft,
        info: &CheckoutInfoDraft,
        external_order_id: &str,
        customer_id: i64,
    ) -> Result<(i64, String), ServiceError> {
        if external_order_id.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Order id cannot be empty".to_string(),
            ));
        }

        let customer = CustomerEntity::find_by_id(customer_id)
            .one(conn)
            .await
            .map_err(|e| {
                error!(error = %e, customer_id, "Failed to resolve customer for order");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer with ID {customer_id} not found"))
            })?;

        let saved_order = order::ActiveModel {
            id: NotSet,
            order_id: Set(external_order_id.to_string()),
            customer_id: Set(customer.id),
            total: Set(order.total),
            status: Set(DEFAULT_ORDER_STATUS.to_string()),
            order_date: Set(Utc::now()),
            shipping_street: Set(order.shipping_street.clone()),
            shipping_city: Set(order.shipping_city.clone()),
            shipping_province: Set(order.shipping_province.clone()),
            shipping_zip_code: Set(order.shipping_zip_code.clone()),
            shipping_country: Set(order.shipping_country.clone()),
            shipping_method: Set(order.shipping_method.clone()),
        }
        .insert(conn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = external_order_id, "Failed to insert order");
            ServiceError::DatabaseError(e)
        })?;

        checkout_information::ActiveModel {
            id: NotSet,
            order_id: Set(external_order_id.to_string()),
            customer_id: Set(customer.id),
            first_name: Set(info.first_name.clone()),
            last_name: Set(info.last_name.clone()),
            email: Set(info.email.clone()),
            phone: Set(info.phone.clone()),
            shipping_address: Set(info.shipping_address.clone()),
            city: Set(info.city.clone()),
            state: Set(info.state.clone()),
            zip: Set(info.zip.clone()),
            country: Set(info.country.clone()),
            shipping_method: Set(info.shipping_method.clone()),
            payment_method: Set(info.payment_method.clone()),
            terms_accepted: Set(info.terms_accepted),
        }
        .insert(conn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = external_order_id, "Failed to insert checkout information");
            ServiceError::DatabaseError(e)
        })?;

        Ok((saved_order.id, saved_order.order_id))
    }

    /// Persists reconciled line items for an order on the caller's
    /// connection.
    pub async fn insert_items<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_pk: i64,
        items: &[LineItem],
    ) -> Result<(), ServiceError> {
        for item in items {
            order_item::ActiveModel {
                id: NotSet,
                order_id: Set(order_pk),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                price: Set(item.price),
                name: Set(item.name.clone()),
                image: Set(item.image.clone()),
            }
            .insert(conn)
            .await
            .map_err(|e| {
                error!(error = %e, order_pk, "Failed to insert order item");
                ServiceError::DatabaseError(e)
            })?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find_by_order_id(
        &self,
        external_order_id: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        let order = OrderEntity::find()
            .filter(order::Column::OrderId.eq(external_order_id))
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = external_order_id, "Failed to fetch order");
                ServiceError::DatabaseError(e)
            })?;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn checkout_info_for(
        &self,
        external_order_id: &str,
    ) -> Result<Option<checkout_information::Model>, ServiceError> {
        let info = CheckoutInformationEntity::find()
            .filter(checkout_information::Column::OrderId.eq(external_order_id))
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = external_order_id, "Failed to fetch checkout information");
                ServiceError::DatabaseError(e)
            })?;
        Ok(info)
    }

    #[instrument(skip(self))]
    pub async fn items_for(&self, order_pk: i64) -> Result<Vec<order_item::Model>, ServiceError> {
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_pk))
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, order_pk, "Failed to fetch order items");
                ServiceError::DatabaseError(e)
            })?;
        Ok(items)
    }

    /// Most recent orders first.
    #[instrument(skip(self))]
    pub async fn list_for_customer(
        &self,
        customer_id: i64,
    ) -> Result<Vec<order::Model>, ServiceError> {
        let orders = OrderEntity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::OrderDate)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, customer_id, "Failed to fetch orders for customer");
                ServiceError::DatabaseError(e)
            })?;

        if orders.is_empty() {
            warn!(customer_id, "No orders found for customer");
        }

        Ok(orders)
    }

    /// Overwrites an order's status unconditionally; there is no status
    /// state machine. Empty statuses are rejected before any lookup.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        external_order_id: &str,
        new_status: &str,
    ) -> Result<(), ServiceError> {
        let new_status = new_status.trim();
        if new_status.is_empty() {
            warn!(order_id = external_order_id, "Missing or empty status in update request");
            return Err(ServiceError::ValidationError("Missing status".to_string()));
        }

        let order = self
            .find_by_order_id(external_order_id)
            .await?
            .ok_or_else(|| {
                error!(order_id = external_order_id, "Order not found for status update");
                ServiceError::NotFound("Order not found".to_string())
            })?;

        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status.to_string());
        active.update(&*self.db).await.map_err(|e| {
            error!(error = %e, order_id = external_order_id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = external_order_id, new_status, "Updated order status");
        Ok(())
    }
}
