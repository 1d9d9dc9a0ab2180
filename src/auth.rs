//! Password and NFC-badge sign-in. Credential verification is delegated to
//! the backend; this module only validates the form input and shapes the
//! resulting identity.

use std::fmt;

use crate::service::{DataService, ServiceError};
use crate::types::{AuthUser, Role};

#[derive(Debug)]
pub enum AuthError {
    /// Form-level validation, before the backend is contacted.
    Validation(String),
    /// The backend rejected the credentials or the badge.
    Rejected(String),
    Service(ServiceError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Validation(message) | AuthError::Rejected(message) => {
                write!(f, "{}", message)
            }
            AuthError::Service(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AuthError {}

/// Display name for a signed-in account: the stored name, or the local part
/// of the e-mail address when no name is known.
fn display_name(email: &str, name: &str) -> String {
    if !name.is_empty() {
        name.to_string()
    } else {
        email
            .split('@')
            .next()
            .filter(|part| !part.is_empty())
            .unwrap_or("Gebruiker")
            .to_string()
    }
}

pub fn sign_in<S: DataService>(
    service: &S,
    email: &str,
    password: &str,
) -> Result<AuthUser, AuthError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::Validation("Voer je email adres in".to_string()));
    }
    if password.is_empty() {
        return Err(AuthError::Validation("Voer je wachtwoord in".to_string()));
    }

    log::info!("inlogpoging voor {}", email);
    match service.sign_in(email, password) {
        Ok(user) => Ok(AuthUser {
            name: display_name(&user.email, &user.name),
            ..user
        }),
        Err(ServiceError::Auth(_)) => Err(AuthError::Rejected("Inloggen mislukt".to_string())),
        Err(e) => Err(AuthError::Service(e)),
    }
}

pub fn sign_in_with_badge<S: DataService>(
    service: &S,
    badge_id: &str,
) -> Result<AuthUser, AuthError> {
    let badge_id = badge_id.trim();
    if badge_id.is_empty() {
        return Err(AuthError::Validation("Voer je badge ID in".to_string()));
    }

    log::info!("badge-inlogpoging voor {}", badge_id);
    let badge = service
        .find_badge(badge_id)
        .map_err(AuthError::Service)?
        .ok_or_else(|| AuthError::Rejected("Badge niet gevonden".to_string()))?;

    Ok(AuthUser {
        name: display_name(&badge.user_email, &badge.user_name),
        email: badge.user_email,
        role: Role::User,
    })
}
