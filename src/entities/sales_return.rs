use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A post-sale reversal of previously sold order items, with refund tracking.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_returns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub return_number: String,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub reason: String,
    pub status: String,
    pub refund_amount: Option<Decimal>,
    pub refund_method: Option<String>,
    pub refunded_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales_order::Entity",
        from = "Column::OrderId",
        to = "super::sales_order::Column::Id"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::sales_return_item::Entity")]
    Items,
}

impl Related<super::sales_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::sales_return_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl ReturnStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Rejected returns stop counting against the order's returnable
    /// balance; everything else still holds quantity.
    pub fn holds_quantity(&self) -> bool {
        !matches!(self, ReturnStatus::Rejected)
    }

    pub fn can_transition_to(&self, next: ReturnStatus) -> bool {
        use ReturnStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Approved, Completed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ReturnStatus::*;

    #[test]
    fn pending_splits_into_approved_or_rejected() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn only_approved_returns_complete() {
        assert!(Approved.can_transition_to(Completed));
        assert!(!Rejected.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Approved));
    }

    #[test]
    fn rejected_releases_the_balance() {
        assert!(Pending.holds_quantity());
        assert!(Approved.holds_quantity());
        assert!(Completed.holds_quantity());
        assert!(!Rejected.holds_quantity());
    }
}
