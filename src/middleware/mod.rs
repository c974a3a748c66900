pub mod access_log;
pub mod auth;
pub mod response;
pub mod upload;

pub use access_log::access_log;
pub use auth::{authorization, require_auth, AuthUser, AUTHORIZATION_MIDDLEWARE};
pub use response::ResponseEntity;
pub use upload::{single_file, UploadedFile, UPLOAD_MIDDLEWARE};
