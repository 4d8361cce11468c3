//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, health, holds, items, loans, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Liberis API",
        version = "1.0.0",
        description = "Library Circulation & Holds REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Items
        items::create_item,
        items::get_item,
        // Users
        users::create_user,
        users::get_user,
        // Loans
        loans::issue_item,
        loans::return_item,
        loans::return_item_for_user,
        loans::extend_due_date,
        loans::request_renewal,
        loans::approve_renewal,
        loans::reject_renewal,
        loans::get_user_loans,
        loans::get_user_fines,
        loans::pay_fine,
        // Holds
        holds::join_queue,
        holds::list_queue,
        holds::admit_next,
        holds::allocate_direct,
        holds::withdraw,
        // Admin
        admin::run_overdue_sweep,
        admin::run_reminder_sweep,
    ),
    components(
        schemas(
            // Items
            crate::models::item::Item,
            crate::models::item::CreateItem,
            crate::models::item::CopyStatus,
            // Users
            crate::models::user::User,
            crate::models::user::CreateUser,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanStatus,
            crate::models::loan::ReturnCondition,
            crate::fines::DamageSeverity,
            loans::IssueRequest,
            loans::ExtendRequest,
            loans::RenewalRequestBody,
            loans::ReturnResponse,
            // Renewals
            crate::models::renewal::RenewalRequest,
            crate::models::renewal::RenewalStatus,
            // Holds
            crate::models::hold::HoldRequest,
            crate::models::hold::HoldStatus,
            crate::models::hold::HoldQueue,
            crate::models::hold::QueueMember,
            crate::models::hold::JoinQueue,
            holds::AllocateRequest,
            crate::services::holds::AdmitOutcome,
            // Fines
            crate::models::fine::Fine,
            crate::models::fine::FinePayment,
            crate::models::fine::FineReason,
            crate::models::fine::FineStatus,
            loans::PaymentRequest,
            // Admin
            admin::SweepResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "items", description = "Catalog item management"),
        (name = "users", description = "User management"),
        (name = "loans", description = "Circulation: issue, return, extend, renew"),
        (name = "holds", description = "Wait queues and admissions"),
        (name = "admin", description = "Administrative operations")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
