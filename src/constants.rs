/// User-facing response messages.
pub mod messages {
    pub const ERROR: &str = "An error occurred";
    pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";
    pub const SERVICE_RUNNING_SUFFIX: &str = " is running smoothly!";

    pub const USER_LOGGED_IN: &str = "User logged in";
    pub const USER_LOGGED_OUT: &str = "User logged out";
    pub const PROFILE_FETCHED: &str = "Profile fetched successfully";
    pub const NO_TOKEN_PROVIDED: &str = "No token provided";
    pub const INVALID_TOKEN: &str = "Invalid token";
    pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
    pub const USER_INACTIVE: &str = "User is inactive, please contact the administrator";

    pub const USERS_FETCHED: &str = "Users fetched successfully";
    pub const USER_FETCHED: &str = "User fetched successfully";
    pub const USER_NOT_FOUND: &str = "User not found";
    pub const USER_CREATED: &str = "User created successfully";
    pub const USER_UPDATED: &str = "User updated successfully";
    pub const USER_DELETED: &str = "User deleted successfully";
    pub const ROLE_NOT_FOUND: &str = "Role not found";
    pub const NO_FILE_UPLOADED: &str = "No file uploaded";
    pub const PASSWORDS_REQUIRED: &str = "Both old and new password are required";
    pub const NOTHING_TO_UPDATE: &str = "No fields to update";

    pub const COMPANIES_FETCHED: &str = "Companies fetched successfully";
    pub const COMPANY_FETCHED: &str = "Company fetched successfully";
    pub const COMPANY_NOT_FOUND: &str = "Company not found";
    pub const COMPANY_CREATED: &str = "Company created successfully";
    pub const COMPANY_UPDATED: &str = "Company updated successfully";
    pub const COMPANY_DELETED: &str = "Company deleted successfully";
    pub const COMPANY_STATUS_UPDATED: &str = "Company status updated successfully";
    pub const INVALID_ACTIVE_FLAG: &str = "isActive must be true or false";
}
