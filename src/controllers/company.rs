use std::sync::Arc;

use uuid::Uuid;

use crate::app::AppState;
use crate::constants::messages;
use crate::database::models::{CompanyChanges, NewCompany};
use crate::database::CompanyRepository;
use crate::error::ApiError;
use crate::middleware::authorization;
use crate::routing::{Controller, ControllerBuilder, ControllerDescriptor, HandlerArgs, HandlerResult, InstantiationError};
use crate::services::CompanyService;

pub struct CompanyController {
    companies: CompanyService,
}

impl CompanyController {
    async fn get_all_companies(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let companies = self.companies.list(args.arg(0)).await?;
        Ok(args.response.ok(messages::COMPANIES_FETCHED, companies))
    }

    async fn get_company_by_id(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let id: Uuid = args.parse(0, "id")?;
        let company = self.companies.get(id).await?;
        Ok(args.response.ok(messages::COMPANY_FETCHED, company))
    }

    async fn create_company(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let company: NewCompany = args.request.json()?;
        let created = self.companies.create(company).await?;
        Ok(args.response.created(messages::COMPANY_CREATED, created))
    }

    async fn update_company(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let id: Uuid = args.parse(0, "id")?;
        let changes: CompanyChanges = args.request.json()?;
        let updated = self.companies.update(id, changes).await?;
        Ok(args.response.updated(messages::COMPANY_UPDATED, updated))
    }

    async fn delete_company(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let id: Uuid = args.parse(0, "id")?;
        self.companies.delete(id).await?;
        Ok(args.response.deleted(messages::COMPANY_DELETED))
    }

    async fn enable_disable_company(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let id: Uuid = args.parse(0, "id")?;
        let is_active = parse_flag(args.arg(1))?;
        let company = self.companies.set_active(id, is_active).await?;
        Ok(args.response.updated(messages::COMPANY_STATUS_UPDATED, company))
    }
}

/// Strict `true` / `false`; anything else, including absence, is rejected.
fn parse_flag(raw: Option<&str>) -> Result<bool, ApiError> {
    match raw {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        _ => Err(ApiError::field_error("isActive", messages::INVALID_ACTIVE_FLAG)),
    }
}

impl Controller<AppState> for CompanyController {
    const NAME: &'static str = "CompanyController";

    fn describe() -> ControllerDescriptor<Self> {
        ControllerBuilder::new("/companies")
            .get("/", "get_all_companies", [authorization()], Self::get_all_companies)
            .query_param("get_all_companies", "search", 0)
            .get("/:id", "get_company_by_id", [authorization()], Self::get_company_by_id)
            .path_param("get_company_by_id", "id", 0)
            .post("/", "create_company", [authorization()], Self::create_company)
            .patch("/:id", "update_company", [authorization()], Self::update_company)
            .path_param("update_company", "id", 0)
            .delete("/:id", "delete_company", [authorization()], Self::delete_company)
            .path_param("delete_company", "id", 0)
            .patch("/:id/status", "enable_disable_company", [authorization()], Self::enable_disable_company)
            .path_param("enable_disable_company", "id", 0)
            .query_param("enable_disable_company", "isActive", 1)
            .build()
    }

    fn instantiate(state: &AppState) -> Result<Self, InstantiationError> {
        Ok(Self {
            companies: CompanyService::new(CompanyRepository::new(state.database.clone())),
        })
    }
}
