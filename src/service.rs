//! The collaborator surface the flows are written against. The production
//! deployment talks to a remote backend-as-a-service; the crate ships a
//! SQLite implementation in `db` that the CLI and the tests use. Callers
//! treat every operation as opaque I/O: errors are surfaced, never retried.

use std::fmt;

use crate::types::{
    AuthUser, Badge, Category, NewRegistration, Product, Registration, Role, User,
};

#[derive(Debug)]
pub enum ServiceError {
    Database(rusqlite::Error),
    Io(std::io::Error),
    /// The row to mutate does not exist.
    NotFound(String),
    /// A uniqueness rule on the backend rejected the write.
    Conflict(String),
    /// Credentials or badge rejected.
    Auth(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Database(e) => write!(f, "database error: {}", e),
            ServiceError::Io(e) => write!(f, "io error: {}", e),
            ServiceError::NotFound(what) => write!(f, "not found: {}", what),
            ServiceError::Conflict(what) => write!(f, "conflict: {}", what),
            ServiceError::Auth(why) => write!(f, "authentication failed: {}", why),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        ServiceError::Database(value)
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(value: std::io::Error) -> Self {
        ServiceError::Io(value)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Fields accepted when creating a product.
#[derive(Clone, Debug, Default)]
pub struct NewProduct {
    pub name: String,
    pub qrcode: Option<String>,
    pub category_id: Option<i64>,
}

/// Full product update; every field is written (last writer wins, no version
/// checks).
#[derive(Clone, Debug)]
pub struct ProductUpdate {
    pub name: String,
    pub qrcode: Option<String>,
    pub category_id: Option<i64>,
    pub attachment_url: Option<String>,
    pub attachment_name: Option<String>,
}

pub trait DataService {
    fn fetch_users(&self) -> ServiceResult<Vec<User>>;
    fn save_user(&self, name: &str, role: Role) -> ServiceResult<()>;
    fn update_user(&self, old_name: &str, new_name: &str, role: Role) -> ServiceResult<()>;
    fn delete_user(&self, name: &str) -> ServiceResult<()>;

    fn fetch_products(&self) -> ServiceResult<Vec<Product>>;
    fn save_product(&self, product: &NewProduct) -> ServiceResult<Product>;
    fn update_product(&self, id: i64, update: &ProductUpdate) -> ServiceResult<()>;
    fn delete_product(&self, id: i64) -> ServiceResult<()>;

    fn fetch_categories(&self) -> ServiceResult<Vec<Category>>;
    fn save_category(&self, name: &str) -> ServiceResult<Category>;
    fn update_category(&self, id: i64, name: &str) -> ServiceResult<()>;
    fn delete_category(&self, id: i64) -> ServiceResult<()>;

    fn fetch_locations(&self) -> ServiceResult<Vec<String>>;
    fn save_location(&self, name: &str) -> ServiceResult<()>;
    fn update_location(&self, old_name: &str, new_name: &str) -> ServiceResult<()>;
    fn delete_location(&self, name: &str) -> ServiceResult<()>;

    fn fetch_purposes(&self) -> ServiceResult<Vec<String>>;
    fn save_purpose(&self, name: &str) -> ServiceResult<()>;
    fn update_purpose(&self, old_name: &str, new_name: &str) -> ServiceResult<()>;
    fn delete_purpose(&self, name: &str) -> ServiceResult<()>;

    fn fetch_registrations(&self) -> ServiceResult<Vec<Registration>>;
    fn save_registration(&self, registration: &NewRegistration) -> ServiceResult<()>;

    fn fetch_badges(&self) -> ServiceResult<Vec<Badge>>;
    /// Replaces any badge the user already has (delete-then-insert).
    fn save_badge(&self, badge_id: &str, user_email: &str, user_name: &str) -> ServiceResult<()>;
    fn delete_badge_for(&self, user_name: &str) -> ServiceResult<()>;
    fn find_badge(&self, badge_id: &str) -> ServiceResult<Option<Badge>>;

    /// Creates a login account and the matching app user record.
    fn create_account(&self, email: &str, password: &str, name: &str, role: Role)
    -> ServiceResult<()>;
    fn sign_in(&self, email: &str, password: &str) -> ServiceResult<AuthUser>;

    /// Stores a file attachment and returns its url.
    fn store_attachment(
        &self,
        product_id: i64,
        file_name: &str,
        contents: &[u8],
    ) -> ServiceResult<String>;
    fn delete_attachment(&self, url: &str) -> ServiceResult<()>;
}
