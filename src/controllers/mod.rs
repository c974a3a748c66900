pub mod auth;
pub mod company;
pub mod user;

pub use auth::AuthController;
pub use company::CompanyController;
pub use user::UserController;
