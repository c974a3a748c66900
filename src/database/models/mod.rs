pub mod company;
pub mod user;

pub use company::{Company, CompanyChanges, NewCompany};
pub use user::{NewUser, User, UserChanges, UserCredentials};
