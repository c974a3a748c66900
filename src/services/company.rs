use uuid::Uuid;

use super::ServiceError;
use crate::constants::messages;
use crate::database::models::{Company, CompanyChanges, NewCompany};
use crate::database::CompanyRepository;

pub struct CompanyService {
    companies: CompanyRepository,
}

impl CompanyService {
    pub fn new(companies: CompanyRepository) -> Self {
        Self { companies }
    }

    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Company>, ServiceError> {
        tracing::debug!("Fetching companies (search: {:?})", search);
        Ok(self.companies.find_all(search).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Company, ServiceError> {
        self.companies.find_by_id(id).await?.ok_or_else(not_found)
    }

    pub async fn create(&self, company: NewCompany) -> Result<Company, ServiceError> {
        if company.name.trim().is_empty() {
            return Err(ServiceError::Validation("Company name is required".to_string()));
        }
        let created = self.companies.insert(&company).await?;
        tracing::info!("Created company {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, changes: CompanyChanges) -> Result<Company, ServiceError> {
        if changes.is_empty() {
            return Err(ServiceError::Validation(messages::NOTHING_TO_UPDATE.to_string()));
        }
        self.companies.update(id, &changes).await?.ok_or_else(not_found)
    }

    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Company, ServiceError> {
        self.companies.set_active(id, is_active).await?.ok_or_else(not_found)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        if self.companies.delete(id).await? {
            tracing::info!("Deleted company {}", id);
            Ok(())
        } else {
            Err(not_found())
        }
    }
}

fn not_found() -> ServiceError {
    ServiceError::NotFound(messages::COMPANY_NOT_FOUND.to_string())
}
