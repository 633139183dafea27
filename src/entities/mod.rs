pub mod customer;
pub mod customer_group;
pub mod invoice;
pub mod invoice_payment;
pub mod project;
pub mod quotation;
pub mod quotation_item;
pub mod sales_order;
pub mod sales_order_item;
pub mod sales_return;
pub mod sales_return_item;
pub mod staff;
