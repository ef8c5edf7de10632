use crate::{
    db::DbPool,
    entities::customer::{self, Entity as CustomerEntity},
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::{error, instrument};

/// Customer directory: lookup by id or email plus the blocked-account gate.
/// Account CRUD and credentials live outside this service.
#[derive(Clone)]
pub struct CustomerDirectory {
    db: Arc<DbPool>,
}

impl CustomerDirectory {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i64) -> Result<Option<customer::Model>, ServiceError> {
        let customer = CustomerEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, customer_id = id, "Failed to fetch customer");
                ServiceError::DatabaseError(e)
            })?;
        Ok(customer)
    }

    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<customer::Model>, ServiceError> {
        let customer = CustomerEntity::find()
            .filter(customer::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, email, "Failed to fetch customer by email");
                ServiceError::DatabaseError(e)
            })?;
        Ok(customer)
    }

    /// Resolves an authenticated identity to a customer account that is
    /// allowed to transact. Unknown emails are NotFound; blocked accounts
    /// are Forbidden.
    pub async fn require_active_by_email(
        &self,
        email: &str,
    ) -> Result<customer::Model, ServiceError> {
        let customer = self.find_by_email(email).await?.ok_or_else(|| {
            error!(email, "Customer not found for authenticated email");
            ServiceError::NotFound(format!("Customer not found for email: {email}"))
        })?;

        if customer.blocked {
            error!(customer_id = customer.id, "Blocked customer refused");
            return Err(ServiceError::Forbidden(
                "Your account is blocked. Please contact support.".to_string(),
            ));
        }

        Ok(customer)
    }
}
