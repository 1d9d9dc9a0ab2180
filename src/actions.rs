//! Orchestration of the interactive flows: every function validates its
//! input, performs the remote mutation, refetches the affected collection
//! into the state and returns the transient message shown to the user.
//! Remote failures leave the local state untouched and are never retried.

use std::fmt;

use chrono::Utc;

use crate::qrcode::{self, ScannerProfile};
use crate::service::{DataService, NewProduct, ProductUpdate, ServiceError};
use crate::state::AppState;
use crate::types::{NewRegistration, Role};
use crate::utils::{company_email, registration_timestamp};

#[derive(Debug)]
pub enum ActionError {
    /// Rejected before the backend was contacted.
    Validation(String),
    /// A collaborator call failed; `message` is what the user sees.
    Service {
        message: String,
        source: ServiceError,
    },
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::Validation(message) => write!(f, "{}", message),
            ActionError::Service { message, .. } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ActionError::Validation(_) => None,
            ActionError::Service { source, .. } => Some(source),
        }
    }
}

/// Success message for the transient status line.
pub type ActionResult = Result<String, ActionError>;

fn remote(message: &str) -> impl FnOnce(ServiceError) -> ActionError + '_ {
    move |source| {
        log::error!("{}: {}", message, source);
        ActionError::Service {
            message: message.to_string(),
            source,
        }
    }
}

/// Registration form state; mirrors what the form view binds to.
#[derive(Clone, Debug, Default)]
pub struct RegistrationForm {
    pub user: String,
    pub product: String,
    pub location: String,
    pub purpose: String,
    pub qr_scan_result: String,
    /// Category filter for the product picker; `None` shows everything.
    pub selected_category: Option<i64>,
}

impl RegistrationForm {
    fn reset(&mut self) {
        self.product.clear();
        self.location.clear();
        self.purpose.clear();
        self.qr_scan_result.clear();
    }
}

/// Submits a registration: who used what, where and why, stamped now.
pub fn submit_registration<S: DataService>(
    service: &S,
    state: &mut AppState,
    form: &mut RegistrationForm,
) -> ActionResult {
    if form.user.is_empty()
        || form.product.is_empty()
        || form.location.is_empty()
        || form.purpose.is_empty()
    {
        return Err(ActionError::Validation("Vul alle velden in".to_string()));
    }

    let (timestamp, date, time) = registration_timestamp(Utc::now());
    let product_code = state
        .products
        .iter()
        .find(|p| p.name == form.product)
        .and_then(|p| p.qrcode.clone());
    let qrcode = product_code.or_else(|| {
        if form.qr_scan_result.is_empty() {
            None
        } else {
            Some(form.qr_scan_result.clone())
        }
    });

    service
        .save_registration(&NewRegistration {
            user: form.user.clone(),
            product: form.product.clone(),
            location: form.location.clone(),
            purpose: form.purpose.clone(),
            qrcode,
            timestamp,
            date,
            time,
        })
        .map_err(remote("Fout bij opslaan"))?;

    state.replace_registrations(
        service
            .fetch_registrations()
            .map_err(remote("Fout bij opslaan"))?,
    );
    form.reset();
    Ok("Product succesvol geregistreerd!".to_string())
}

/// Handles a scanned token: cleans it, resolves it to a product and
/// auto-selects the product (and its category filter) on the form.
pub fn handle_scan(
    state: &AppState,
    form: &mut RegistrationForm,
    raw: &str,
    profile: &ScannerProfile,
) -> ActionResult {
    let cleaned = profile.clean(raw);
    log::debug!("scan {} opgeschoond tot {}", raw, cleaned);
    form.qr_scan_result = cleaned.clone();

    match qrcode::resolve(raw, &cleaned, &state.products) {
        Some(product) => {
            form.product = product.name.clone();
            if let Some(category_id) = product.category_id {
                form.selected_category = Some(category_id);
            }
            Ok(format!("Product gevonden: {}", product.name))
        }
        None => Err(ActionError::Validation(format!(
            "Geen product gevonden voor QR code: {} (origineel: {})",
            cleaned, raw
        ))),
    }
}

pub fn add_user<S: DataService>(service: &S, state: &mut AppState, name: &str) -> ActionResult {
    let name = name.trim();
    if name.is_empty() {
        return Err(ActionError::Validation(
            "Gebruikersnaam is verplicht".to_string(),
        ));
    }
    if state.users.iter().any(|u| u.name == name) {
        return Err(ActionError::Validation("Gebruiker bestaat al".to_string()));
    }

    service
        .save_user(name, Role::User)
        .map_err(remote("Fout bij opslaan gebruiker"))?;
    state
        .refresh_users_with_badges(service)
        .map_err(remote("Fout bij opslaan gebruiker"))?;
    Ok("Gebruiker toegevoegd!".to_string())
}

/// Creates a user together with a login account and an optional badge.
pub fn add_user_with_login<S: DataService>(
    service: &S,
    state: &mut AppState,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
    badge_code: &str,
) -> ActionResult {
    let (name, email, badge_code) = (name.trim(), email.trim(), badge_code.trim());
    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ActionError::Validation("Vul alle velden in".to_string()));
    }
    if password.chars().count() < 6 {
        return Err(ActionError::Validation(
            "Wachtwoord moet minimaal 6 tekens lang zijn".to_string(),
        ));
    }

    service
        .create_account(email, password, name, role)
        .map_err(remote("Fout bij aanmaken"))?;

    let mut message = "Gebruiker en inlog-account succesvol aangemaakt!".to_string();
    if !badge_code.is_empty() {
        if service.save_badge(badge_code, email, name).is_ok() {
            message = "Gebruiker, inlog-account en badge succesvol aangemaakt!".to_string();
        } else {
            log::warn!("gebruiker aangemaakt maar badge mislukt voor {}", name);
            message = "Gebruiker aangemaakt maar badge kon niet worden opgeslagen".to_string();
        }
    }

    state
        .refresh_users_with_badges(service)
        .map_err(remote("Fout bij aanmaken"))?;
    Ok(message)
}

/// Saves an edited user: rename, role and badge changes. A cleared badge
/// code removes the badge row.
pub fn update_user<S: DataService>(
    service: &S,
    state: &mut AppState,
    original_name: &str,
    new_name: &str,
    role: Role,
    badge_code: &str,
) -> ActionResult {
    let new_name = new_name.trim();
    let badge_code = badge_code.trim();
    if new_name.is_empty() {
        return Err(ActionError::Validation(
            "Gebruikersnaam is verplicht".to_string(),
        ));
    }

    let original_badge = state
        .users
        .iter()
        .find(|u| u.name == original_name)
        .map(|u| u.badge_code.clone())
        .unwrap_or_default();

    service
        .update_user(original_name, new_name, role)
        .map_err(remote("Fout bij opslaan gebruiker"))?;

    let mut message = "Gebruiker succesvol aangepast!".to_string();
    if badge_code != original_badge {
        if badge_code.is_empty() {
            service
                .delete_badge_for(original_name)
                .map_err(remote("Fout bij opslaan gebruiker"))?;
            message = "Gebruiker aangepast en badge verwijderd!".to_string();
        } else if service
            .save_badge(badge_code, &company_email(new_name), new_name)
            .is_ok()
        {
            message = "Gebruiker en badge succesvol aangepast!".to_string();
        } else {
            message = "Gebruiker opgeslagen maar badge kon niet worden opgeslagen".to_string();
        }
    }

    state
        .refresh_users_with_badges(service)
        .map_err(remote("Fout bij opslaan gebruiker"))?;
    Ok(message)
}

pub fn remove_user<S: DataService>(service: &S, state: &mut AppState, name: &str) -> ActionResult {
    service
        .delete_user(name)
        .map_err(remote("Fout bij verwijderen gebruiker"))?;
    state
        .refresh_users_with_badges(service)
        .map_err(remote("Fout bij verwijderen gebruiker"))?;
    Ok("Gebruiker verwijderd!".to_string())
}

pub fn add_product<S: DataService>(
    service: &S,
    state: &mut AppState,
    name: &str,
    qrcode: &str,
    category_id: Option<i64>,
) -> ActionResult {
    let name = name.trim();
    if name.is_empty() {
        return Err(ActionError::Validation(
            "Productnaam is verplicht".to_string(),
        ));
    }

    let qrcode = qrcode.trim();
    service
        .save_product(&NewProduct {
            name: name.to_string(),
            qrcode: (!qrcode.is_empty()).then(|| qrcode.to_string()),
            category_id,
        })
        .map_err(remote("Fout bij opslaan product"))?;
    state.replace_products(
        service
            .fetch_products()
            .map_err(remote("Fout bij opslaan product"))?,
    );
    Ok("Product toegevoegd!".to_string())
}

pub fn update_product<S: DataService>(
    service: &S,
    state: &mut AppState,
    id: i64,
    update: &ProductUpdate,
) -> ActionResult {
    service
        .update_product(id, update)
        .map_err(remote("Fout bij opslaan product"))?;
    state.replace_products(
        service
            .fetch_products()
            .map_err(remote("Fout bij opslaan product"))?,
    );
    Ok("Product aangepast!".to_string())
}

pub fn remove_product<S: DataService>(service: &S, state: &mut AppState, id: i64) -> ActionResult {
    service
        .delete_product(id)
        .map_err(remote("Fout bij verwijderen product"))?;
    state.replace_products(
        service
            .fetch_products()
            .map_err(remote("Fout bij verwijderen product"))?,
    );
    Ok("Product verwijderd!".to_string())
}

pub fn add_category<S: DataService>(service: &S, state: &mut AppState, name: &str) -> ActionResult {
    let name = name.trim();
    if name.is_empty() {
        return Err(ActionError::Validation(
            "Categorienaam is verplicht".to_string(),
        ));
    }
    if state.categories.iter().any(|c| c.name == name) {
        return Err(ActionError::Validation("Categorie bestaat al".to_string()));
    }

    service
        .save_category(name)
        .map_err(remote("Fout bij opslaan categorie"))?;
    state.replace_categories(
        service
            .fetch_categories()
            .map_err(remote("Fout bij opslaan categorie"))?,
    );
    Ok("Categorie toegevoegd!".to_string())
}

pub fn update_category<S: DataService>(
    service: &S,
    state: &mut AppState,
    id: i64,
    name: &str,
) -> ActionResult {
    service
        .update_category(id, name)
        .map_err(remote("Fout bij opslaan categorie"))?;
    state.replace_categories(
        service
            .fetch_categories()
            .map_err(remote("Fout bij opslaan categorie"))?,
    );
    Ok("Categorie aangepast!".to_string())
}

pub fn remove_category<S: DataService>(service: &S, state: &mut AppState, id: i64) -> ActionResult {
    service
        .delete_category(id)
        .map_err(remote("Fout bij verwijderen categorie"))?;
    state.replace_categories(
        service
            .fetch_categories()
            .map_err(remote("Fout bij verwijderen categorie"))?,
    );
    Ok("Categorie verwijderd!".to_string())
}

pub fn add_location<S: DataService>(service: &S, state: &mut AppState, name: &str) -> ActionResult {
    let name = name.trim();
    if name.is_empty() {
        return Err(ActionError::Validation(
            "Locatienaam is verplicht".to_string(),
        ));
    }
    if state.locations.iter().any(|l| l == name) {
        return Err(ActionError::Validation("Locatie bestaat al".to_string()));
    }

    service
        .save_location(name)
        .map_err(remote("Fout bij opslaan locatie"))?;
    state.replace_locations(
        service
            .fetch_locations()
            .map_err(remote("Fout bij opslaan locatie"))?,
    );
    Ok("Locatie toegevoegd!".to_string())
}

pub fn update_location<S: DataService>(
    service: &S,
    state: &mut AppState,
    old_name: &str,
    new_name: &str,
) -> ActionResult {
    let new_name = new_name.trim();
    if new_name.is_empty() || new_name == old_name {
        return Err(ActionError::Validation(
            "Locatienaam is verplicht".to_string(),
        ));
    }

    service
        .update_location(old_name, new_name)
        .map_err(remote("Fout bij opslaan locatie"))?;
    state.replace_locations(
        service
            .fetch_locations()
            .map_err(remote("Fout bij opslaan locatie"))?,
    );
    Ok("Locatie aangepast!".to_string())
}

/// Deletes a location. Existing registrations keep their location string;
/// there is no cascade.
pub fn remove_location<S: DataService>(
    service: &S,
    state: &mut AppState,
    name: &str,
) -> ActionResult {
    service
        .delete_location(name)
        .map_err(remote("Fout bij verwijderen locatie"))?;
    state.replace_locations(
        service
            .fetch_locations()
            .map_err(remote("Fout bij verwijderen locatie"))?,
    );
    Ok("Locatie verwijderd!".to_string())
}

pub fn add_purpose<S: DataService>(service: &S, state: &mut AppState, name: &str) -> ActionResult {
    let name = name.trim();
    if name.is_empty() {
        return Err(ActionError::Validation("Doel is verplicht".to_string()));
    }
    if state.purposes.iter().any(|p| p == name) {
        return Err(ActionError::Validation("Doel bestaat al".to_string()));
    }

    service
        .save_purpose(name)
        .map_err(remote("Fout bij opslaan doel"))?;
    state.replace_purposes(
        service
            .fetch_purposes()
            .map_err(remote("Fout bij opslaan doel"))?,
    );
    Ok("Doel toegevoegd!".to_string())
}

pub fn update_purpose<S: DataService>(
    service: &S,
    state: &mut AppState,
    old_name: &str,
    new_name: &str,
) -> ActionResult {
    let new_name = new_name.trim();
    if new_name.is_empty() || new_name == old_name {
        return Err(ActionError::Validation("Doel is verplicht".to_string()));
    }

    service
        .update_purpose(old_name, new_name)
        .map_err(remote("Fout bij opslaan doel"))?;
    state.replace_purposes(
        service
            .fetch_purposes()
            .map_err(remote("Fout bij opslaan doel"))?,
    );
    Ok("Doel aangepast!".to_string())
}

pub fn remove_purpose<S: DataService>(
    service: &S,
    state: &mut AppState,
    name: &str,
) -> ActionResult {
    service
        .delete_purpose(name)
        .map_err(remote("Fout bij verwijderen doel"))?;
    state.replace_purposes(
        service
            .fetch_purposes()
            .map_err(remote("Fout bij verwijderen doel"))?,
    );
    Ok("Doel verwijderd!".to_string())
}

/// Generates and persists a code for a product that lacks one, avoiding
/// every code already in the catalog.
pub fn generate_qr<S: DataService>(
    service: &S,
    state: &mut AppState,
    product_id: i64,
) -> ActionResult {
    let Some(product) = state.products.iter().find(|p| p.id == product_id) else {
        return Err(ActionError::Validation("Product niet gevonden".to_string()));
    };

    let existing: Vec<&str> = state
        .products
        .iter()
        .filter_map(|p| p.qrcode.as_deref())
        .collect();
    let code = qrcode::generate(&product.name, &existing);

    service
        .update_product(
            product_id,
            &ProductUpdate {
                name: product.name.clone(),
                qrcode: Some(code.clone()),
                category_id: product.category_id,
                attachment_url: product.attachment_url.clone(),
                attachment_name: product.attachment_name.clone(),
            },
        )
        .map_err(remote("Fout bij genereren QR code"))?;
    state.replace_products(
        service
            .fetch_products()
            .map_err(remote("Fout bij genereren QR code"))?,
    );
    Ok(format!("QR Code gegenereerd: {}", code))
}

/// Stores a file with the backend and records it on the product.
pub fn attach_file<S: DataService>(
    service: &S,
    state: &mut AppState,
    product_id: i64,
    file_name: &str,
    contents: &[u8],
) -> ActionResult {
    let Some(product) = state.products.iter().find(|p| p.id == product_id) else {
        return Err(ActionError::Validation("Product niet gevonden".to_string()));
    };

    let url = service
        .store_attachment(product_id, file_name, contents)
        .map_err(remote("Fout bij uploaden bestand"))?;

    service
        .update_product(
            product_id,
            &ProductUpdate {
                name: product.name.clone(),
                qrcode: product.qrcode.clone(),
                category_id: product.category_id,
                attachment_url: Some(url),
                attachment_name: Some(file_name.to_string()),
            },
        )
        .map_err(remote("Fout bij opslaan product"))?;
    state.replace_products(
        service
            .fetch_products()
            .map_err(remote("Fout bij opslaan product"))?,
    );
    Ok("Bestand geupload!".to_string())
}

pub fn remove_attachment<S: DataService>(
    service: &S,
    state: &mut AppState,
    product_id: i64,
) -> ActionResult {
    let Some(product) = state.products.iter().find(|p| p.id == product_id) else {
        return Err(ActionError::Validation("Product niet gevonden".to_string()));
    };
    let Some(url) = product.attachment_url.clone() else {
        return Err(ActionError::Validation(
            "Geen bijlage om te verwijderen".to_string(),
        ));
    };

    service
        .delete_attachment(&url)
        .map_err(remote("Fout bij verwijderen bestand"))?;
    service
        .update_product(
            product_id,
            &ProductUpdate {
                name: product.name.clone(),
                qrcode: product.qrcode.clone(),
                category_id: product.category_id,
                attachment_url: None,
                attachment_name: None,
            },
        )
        .map_err(remote("Fout bij opslaan product"))?;
    state.replace_products(
        service
            .fetch_products()
            .map_err(remote("Fout bij opslaan product"))?,
    );
    Ok("Bestand verwijderd!".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteBackend;

    fn seeded() -> (SqliteBackend, AppState) {
        let db = SqliteBackend::in_memory().unwrap();
        let mut state = AppState::new();
        state.refresh_all(&db).unwrap();
        (db, state)
    }

    #[test]
    fn submit_requires_all_fields() {
        let (db, mut state) = seeded();
        let mut form = RegistrationForm {
            user: "Tom Peckstadt".to_string(),
            ..RegistrationForm::default()
        };
        let err = submit_registration(&db, &mut state, &mut form).unwrap_err();
        assert_eq!(err.to_string(), "Vul alle velden in");
    }

    #[test]
    fn submit_carries_the_product_code_and_resets_the_form() {
        let (db, mut state) = seeded();
        add_product(&db, &mut state, "Interflon Fin Super", "IFMK006", None).unwrap();

        let mut form = RegistrationForm {
            user: "Tom Peckstadt".to_string(),
            product: "Interflon Fin Super".to_string(),
            location: "Kantoor 1.1".to_string(),
            purpose: "Demonstratie".to_string(),
            ..RegistrationForm::default()
        };
        let message = submit_registration(&db, &mut state, &mut form).unwrap();
        assert_eq!(message, "Product succesvol geregistreerd!");
        assert_eq!(state.registrations.len(), 1);
        assert_eq!(state.registrations[0].qrcode.as_deref(), Some("IFMK006"));
        assert!(form.product.is_empty());
        // The user stays selected for the next registration.
        assert_eq!(form.user, "Tom Peckstadt");
    }

    #[test]
    fn scan_selects_product_and_category() {
        let (db, mut state) = seeded();
        add_category(&db, &mut state, "Smeermiddelen").unwrap();
        let category_id = state.categories[0].id;
        add_product(
            &db,
            &mut state,
            "Interflon Metal Clean spray 500ml",
            "IFLS001",
            Some(category_id),
        )
        .unwrap();

        let mut form = RegistrationForm::default();
        // The scanner rendered the digits through an AZERTY layout.
        let message =
            handle_scan(&state, &mut form, "IFLSàà&", &ScannerProfile::default()).unwrap();
        assert_eq!(message, "Product gevonden: Interflon Metal Clean spray 500ml");
        assert_eq!(form.product, "Interflon Metal Clean spray 500ml");
        assert_eq!(form.selected_category, Some(category_id));
        assert_eq!(form.qr_scan_result, "IFLS001");
    }

    #[test]
    fn scan_miss_names_both_codes() {
        let (_db, state) = seeded();
        let mut form = RegistrationForm::default();
        let err = handle_scan(&state, &mut form, "ààà", &ScannerProfile::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Geen product gevonden voor QR code: 000 (origineel: ààà)"
        );
    }

    #[test]
    fn duplicate_location_is_rejected_client_side() {
        let (db, mut state) = seeded();
        add_location(&db, &mut state, "Warehouse Interflon").unwrap();
        let err = add_location(&db, &mut state, "Warehouse Interflon").unwrap_err();
        assert_eq!(err.to_string(), "Locatie bestaat al");
    }

    #[test]
    fn generate_qr_avoids_existing_codes() {
        let (db, mut state) = seeded();
        add_product(&db, &mut state, "Interflon Fin Super", "IFS001", None).unwrap();
        add_product(&db, &mut state, "Interflon Food Safe", "", None).unwrap();
        let target = state
            .products
            .iter()
            .find(|p| p.name == "Interflon Food Safe")
            .unwrap()
            .id;

        let message = generate_qr(&db, &mut state, target).unwrap();
        assert_eq!(message, "QR Code gegenereerd: IFS002");
        let product = state.products.iter().find(|p| p.id == target).unwrap();
        assert_eq!(product.qrcode.as_deref(), Some("IFS002"));
    }

    #[test]
    fn badge_edit_replaces_and_clears() {
        let (db, mut state) = seeded();
        add_user(&db, &mut state, "Tom Peckstadt").unwrap();

        update_user(&db, &mut state, "Tom Peckstadt", "Tom Peckstadt", Role::Admin, "BADGE001")
            .unwrap();
        assert_eq!(state.users[0].badge_code, "BADGE001");

        update_user(&db, &mut state, "Tom Peckstadt", "Tom Peckstadt", Role::Admin, "")
            .unwrap();
        assert_eq!(state.users[0].badge_code, "");
    }

    #[test]
    fn attachment_round_trip() {
        let (db, mut state) = seeded();
        add_product(&db, &mut state, "Interflon Fin Super", "", None).unwrap();
        let id = state.products[0].id;

        attach_file(&db, &mut state, id, "datasheet.pdf", b"%PDF-1.4").unwrap();
        let product = &state.products[0];
        assert_eq!(product.attachment_name.as_deref(), Some("datasheet.pdf"));
        assert!(product.attachment_url.is_some());

        remove_attachment(&db, &mut state, id).unwrap();
        assert!(state.products[0].attachment_url.is_none());
    }

    #[test]
    fn remove_location_keeps_registrations() {
        let (db, mut state) = seeded();
        add_product(&db, &mut state, "Interflon Fin Super", "", None).unwrap();
        add_location(&db, &mut state, "Warehouse Interflon").unwrap();
        let mut form = RegistrationForm {
            user: "Tom Peckstadt".to_string(),
            product: "Interflon Fin Super".to_string(),
            location: "Warehouse Interflon".to_string(),
            purpose: "Reparatie".to_string(),
            ..RegistrationForm::default()
        };
        submit_registration(&db, &mut state, &mut form).unwrap();

        remove_location(&db, &mut state, "Warehouse Interflon").unwrap();
        assert!(state.locations.is_empty());
        assert_eq!(state.registrations[0].location, "Warehouse Interflon");
    }
}
