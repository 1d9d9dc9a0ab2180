use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Anything that is not exactly "admin" is a regular user, matching how
    /// the level column is read during CSV import.
    pub fn parse(value: &str) -> Role {
        if value.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub role: Role,
    /// Merged in from the badge table on refresh; empty when the user has no
    /// badge.
    pub badge_code: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub qrcode: Option<String>,
    pub category_id: Option<i64>,
    pub attachment_url: Option<String>,
    pub attachment_name: Option<String>,
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A usage event. Entities are referenced by name, not by id; deleting a
/// user/product/location leaves existing registrations untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: i64,
    pub user: String,
    pub product: String,
    pub location: String,
    pub purpose: String,
    pub qrcode: Option<String>,
    /// RFC 3339 timestamp (UTC).
    pub timestamp: String,
    /// UTC calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Local wall-clock time, `HH:MM`.
    pub time: String,
}

/// Input for a new registration; the id and derived fields are filled in by
/// the backend and the submission flow.
#[derive(Clone, Debug)]
pub struct NewRegistration {
    pub user: String,
    pub product: String,
    pub location: String,
    pub purpose: String,
    pub qrcode: Option<String>,
    pub timestamp: String,
    pub date: String,
    pub time: String,
}

/// NFC badge credential mapped to a user.
#[derive(Clone, Debug, PartialEq)]
pub struct Badge {
    pub badge_id: String,
    pub user_email: String,
    pub user_name: String,
}

/// A signed-in identity, from either the password or the badge flow.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthUser {
    pub email: String,
    pub name: String,
    pub role: Role,
}
