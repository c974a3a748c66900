pub mod company_repository;
pub mod manager;
pub mod models;
pub mod user_repository;

pub use company_repository::CompanyRepository;
pub use manager::{Database, DatabaseError, RetryPolicy};
pub use user_repository::{UserInsert, UserRepository};
