use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Nubras ERP Core API",
        description = r#"
Core API for the Nubras tailoring ERP.

Customers and household groups, quotations, sales orders, returns with
refund tracking, invoicing, and the staff workload report. All `/api/v1`
endpoints (except `status` and `health`) require the shared session
cookie issued by the magic-link sign-in flow, or an equivalent
`Authorization: Bearer` token.

List endpoints paginate with `page` (1-indexed) and `limit` (max 100);
some accept `search` or `status` filters.
        "#,
        contact(name = "Nubras Engineering", email = "engineering@nubras.com")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Customers", description = "Customer and household group management"),
        (name = "Quotations", description = "Pre-sale estimates and conversion to orders"),
        (name = "Orders", description = "Sales order management"),
        (name = "Returns", description = "Post-sale returns and refunds"),
        (name = "Invoices", description = "Invoicing and payment tracking"),
        (name = "Staff", description = "Staff, projects, and the workload report"),
        (name = "Auth", description = "Magic-link sign-in and shared sessions")
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::auth::SessionUser,
        crate::auth::SignInRequest,
        crate::auth::SessionResponse,
        crate::handlers::customers::CustomerSummary,
        crate::handlers::customers::CustomerGroupSummary,
        crate::handlers::customers::CreateCustomerRequest,
        crate::handlers::customers::UpdateCustomerRequest,
        crate::handlers::customers::CreateGroupRequest,
        crate::handlers::quotations::QuotationSummary,
        crate::handlers::quotations::QuotationItemSummary,
        crate::handlers::quotations::CreateQuotationRequest,
        crate::handlers::quotations::UpdateQuotationRequest,
        crate::handlers::orders::OrderSummary,
        crate::handlers::orders::OrderItemSummary,
        crate::handlers::orders::CreateOrderRequest,
        crate::handlers::orders::UpdateOrderStatusRequest,
        crate::handlers::returns::ReturnSummary,
        crate::handlers::returns::ReturnItemSummary,
        crate::handlers::returns::CreateReturnRequest,
        crate::handlers::returns::CompleteReturnRequest,
        crate::handlers::invoices::InvoiceSummary,
        crate::handlers::invoices::PaymentSummary,
        crate::handlers::invoices::RecordPaymentRequest,
        crate::handlers::staff::StaffSummary,
        crate::handlers::staff::ProjectSummary,
        crate::handlers::staff::WorkloadSummary,
        crate::handlers::staff::CreateStaffRequest,
        crate::handlers::staff::AssignProjectRequest,
    ))
)]
pub struct ApiDoc;

/// Swagger UI at `/docs`, serving the generated document from
/// `/api-docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_builds_and_names_the_service() {
        let doc = ApiDoc::openapi();
        assert_eq!(doc.info.title, "Nubras ERP Core API");
        assert!(doc
            .components
            .as_ref()
            .expect("components registered")
            .schemas
            .contains_key("ErrorResponse"));
    }
}
