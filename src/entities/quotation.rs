use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A pre-sale estimate with line items, convertible to a sales order.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "quotations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Quote number must be between 1 and 50 characters"
    ))]
    #[sea_orm(unique)]
    pub quote_number: String,

    pub customer_id: Uuid,
    pub status: String,
    pub valid_until: Option<DateTimeUtc>,
    pub total_amount: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub converted_order_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::quotation_item::Entity")]
    Items,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::quotation_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum QuotationStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
    Converted,
}

impl QuotationStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Item sets may only change while the quote is still negotiable.
    pub fn is_editable(&self) -> bool {
        matches!(self, QuotationStatus::Draft | QuotationStatus::Sent)
    }

    pub fn can_transition_to(&self, next: QuotationStatus) -> bool {
        use QuotationStatus::*;
        matches!(
            (self, next),
            (Draft, Sent)
                | (Sent, Accepted)
                | (Sent, Rejected)
                | (Sent, Expired)
                | (Draft, Expired)
                | (Accepted, Converted)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::QuotationStatus::*;

    #[test]
    fn lifecycle_edges() {
        assert!(Draft.can_transition_to(Sent));
        assert!(Sent.can_transition_to(Accepted));
        assert!(Sent.can_transition_to(Rejected));
        assert!(Accepted.can_transition_to(Converted));
        assert!(!Draft.can_transition_to(Accepted));
        assert!(!Converted.can_transition_to(Sent));
        assert!(!Rejected.can_transition_to(Converted));
    }

    #[test]
    fn editability_tracks_negotiation_states() {
        assert!(Draft.is_editable());
        assert!(Sent.is_editable());
        assert!(!Accepted.is_editable());
        assert!(!Converted.is_editable());
    }
}
