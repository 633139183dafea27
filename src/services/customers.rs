use crate::{
    db::DbPool,
    entities::{customer, customer_group, sales_order, sales_return},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Strips separators from a raw phone number; `None` when nothing usable
/// remains. Grouping compares normalized values so "050-123 4567" and
/// "0501234567" land in the same household.
pub(crate) fn normalize_phone(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Service for managing customers and their household groups
#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a customer. A phone number that matches an existing group
    /// attaches the customer to it; an unseen number opens a new group.
    /// The lookup and insert share one transaction so two members of a
    /// household created back-to-back cannot open duplicate groups.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_customer(&self, input: NewCustomer) -> Result<customer::Model, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await?;

        let phone = input.phone.as_deref().and_then(normalize_phone);
        let group_id = match &phone {
            Some(phone) => Some(self.resolve_group(&txn, &input.name, phone).await?),
            None => None,
        };

        let model = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(phone),
            address: Set(input.address),
            status: Set(customer::CustomerStatus::Active.as_str().to_owned()),
            group_id: Set(group_id),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let created = model.insert(&txn).await?;
        txn.commit().await?;

        info!(customer_id = %created.id, group_id = ?created.group_id, "Customer created");
        if let Err(e) = self.event_sender.send(Event::CustomerCreated(created.id)).await {
            warn!(customer_id = %created.id, error = %e, "Failed to send customer created event");
        }

        Ok(created)
    }

    /// Finds the group owning `phone`, creating one named after the first
    /// member when the number is new.
    async fn resolve_group<C: ConnectionTrait>(
        &self,
        conn: &C,
        customer_name: &str,
        phone: &str,
    ) -> Result<Uuid, ServiceError> {
        if let Some(existing) = customer_group::Entity::find()
            .filter(customer_group::Column::Phone.eq(phone))
            .one(conn)
            .await?
        {
            return Ok(existing.id);
        }

        let group = customer_group::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(customer_name.to_owned()),
            phone: Set(phone.to_owned()),
            created_at: Set(Utc::now()),
        };
        let created = group.insert(conn).await?;

        info!(group_id = %created.id, "Customer group opened");
        if let Err(e) = self
            .event_sender
            .send(Event::CustomerGroupCreated(created.id))
            .await
        {
            warn!(group_id = %created.id, error = %e, "Failed to send group created event");
        }

        Ok(created.id)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        patch: CustomerPatch,
    ) -> Result<customer::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let existing = customer::Entity::find_by_id(customer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;

        if let Some(status) = &patch.status {
            status
                .parse::<customer::CustomerStatus>()
                .map_err(|_| ServiceError::InvalidStatus(format!("Unknown customer status '{}'", status)))?;
        }

        let name = patch.name.clone().unwrap_or_else(|| existing.name.clone());
        let mut active: customer::ActiveModel = existing.clone().into();

        if let Some(new_name) = patch.name {
            active.name = Set(new_name);
        }
        if let Some(email) = patch.email {
            active.email = Set(Some(email));
        }
        if let Some(address) = patch.address {
            active.address = Set(Some(address));
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(notes) = patch.notes {
            active.notes = Set(Some(notes));
        }
        // A changed phone re-runs household attachment.
        if let Some(raw_phone) = patch.phone {
            let phone = normalize_phone(&raw_phone);
            if phone != existing.phone {
                let group_id = match &phone {
                    Some(phone) => Some(self.resolve_group(&txn, &name, phone).await?),
                    None => None,
                };
                active.group_id = Set(group_id);
            }
            active.phone = Set(phone);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        if let Err(e) = self.event_sender.send(Event::CustomerUpdated(updated.id)).await {
            warn!(customer_id = %updated.id, error = %e, "Failed to send customer updated event");
        }

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<customer::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(customer::Entity::find_by_id(customer_id).one(db).await?)
    }

    /// Lists customers newest-first with optional search over name, email,
    /// and phone.
    #[instrument(skip(self))]
    pub async fn list_customers(
        &self,
        page: u64,
        limit: u64,
        search: Option<&str>,
    ) -> Result<(Vec<customer::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = customer::Entity::find().order_by_desc(customer::Column::CreatedAt);
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term);
            query = query.filter(
                sea_orm::Condition::any()
                    .add(customer::Column::Name.like(pattern.as_str()))
                    .add(customer::Column::Email.like(pattern.as_str()))
                    .add(customer::Column::Phone.like(pattern.as_str())),
            );
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((customers, total))
    }

    #[instrument(skip(self))]
    pub async fn delete_customer(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let existing = customer::Entity::find_by_id(customer_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;

        customer::Entity::delete_by_id(existing.id).exec(db).await?;

        if let Err(e) = self.event_sender.send(Event::CustomerDeleted(customer_id)).await {
            warn!(customer_id = %customer_id, error = %e, "Failed to send customer deleted event");
        }

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_customer_orders(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<sales_order::Model>, ServiceError> {
        let db = &*self.db_pool;

        customer::Entity::find_by_id(customer_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;

        Ok(sales_order::Entity::find()
            .filter(sales_order::Column::CustomerId.eq(customer_id))
            .order_by_desc(sales_order::Column::CreatedAt)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_customer_returns(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<sales_return::Model>, ServiceError> {
        let db = &*self.db_pool;

        customer::Entity::find_by_id(customer_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;

        Ok(sales_return::Entity::find()
            .filter(sales_return::Column::CustomerId.eq(customer_id))
            .order_by_desc(sales_return::Column::CreatedAt)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_groups(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<customer_group::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let paginator = customer_group::Entity::find()
            .order_by_desc(customer_group::Column::CreatedAt)
            .paginate(db, limit);
        let total = paginator.num_items().await?;
        let groups = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((groups, total))
    }

    /// A group together with its member customers.
    #[instrument(skip(self))]
    pub async fn get_group(
        &self,
        group_id: Uuid,
    ) -> Result<Option<(customer_group::Model, Vec<customer::Model>)>, ServiceError> {
        let db = &*self.db_pool;

        let Some(group) = customer_group::Entity::find_by_id(group_id).one(db).await? else {
            return Ok(None);
        };

        let members = customer::Entity::find()
            .filter(customer::Column::GroupId.eq(group_id))
            .order_by_asc(customer::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(Some((group, members)))
    }

    /// Explicitly opens a group; a phone already owned by a group is a
    /// conflict rather than a silent attach.
    #[instrument(skip(self))]
    pub async fn create_group(
        &self,
        name: String,
        raw_phone: String,
    ) -> Result<customer_group::Model, ServiceError> {
        let db = &*self.db_pool;

        let phone = normalize_phone(&raw_phone).ok_or_else(|| {
            ServiceError::ValidationError("Phone number must contain digits".to_string())
        })?;

        if customer_group::Entity::find()
            .filter(customer_group::Column::Phone.eq(phone.clone()))
            .one(db)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "A customer group already owns phone number {}",
                phone
            )));
        }

        let group = customer_group::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            phone: Set(phone),
            created_at: Set(Utc::now()),
        };
        let created = group.insert(db).await?;

        if let Err(e) = self
            .event_sender
            .send(Event::CustomerGroupCreated(created.id))
            .await
        {
            warn!(group_id = %created.id, error = %e, "Failed to send group created event");
        }

        Ok(created)
    }
}
