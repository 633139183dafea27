pub mod customers;
pub mod invoices;
pub mod orders;
pub mod quotations;
pub mod returns;
pub mod staff;

use crate::{db::DbPool, events::EventSender};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub customers: Arc<crate::services::customers::CustomerService>,
    pub quotations: Arc<crate::services::quotations::QuotationService>,
    pub orders: Arc<crate::services::orders::OrderService>,
    pub returns: Arc<crate::services::returns::ReturnService>,
    pub invoicing: Arc<crate::services::invoicing::InvoicingService>,
    pub staff: Arc<crate::services::staff::StaffService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        default_currency: String,
    ) -> Self {
        let customers = Arc::new(crate::services::customers::CustomerService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let quotations = Arc::new(crate::services::quotations::QuotationService::new(
            db_pool.clone(),
            event_sender.clone(),
            default_currency.clone(),
        ));
        let orders = Arc::new(crate::services::orders::OrderService::new(
            db_pool.clone(),
            event_sender.clone(),
            default_currency,
        ));
        let returns = Arc::new(crate::services::returns::ReturnService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let invoicing = Arc::new(crate::services::invoicing::InvoicingService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let staff = Arc::new(crate::services::staff::StaffService::new(
            db_pool,
            event_sender,
        ));

        Self {
            customers,
            quotations,
            orders,
            returns,
            invoicing,
            staff,
        }
    }
}
