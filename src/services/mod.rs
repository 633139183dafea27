pub mod customers;
pub mod invoicing;
pub mod orders;
pub mod quotations;
pub mod returns;
pub mod staff;

use rust_decimal::Decimal;
use uuid::Uuid;

/// Generates a human-facing document number, e.g. `SO-9F2C41D0`.
pub(crate) fn generate_number(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, id[..8].to_uppercase())
}

pub(crate) fn line_total(quantity: i32, unit_price: Decimal) -> Decimal {
    unit_price * Decimal::from(quantity)
}
