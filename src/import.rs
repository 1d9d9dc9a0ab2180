//! Batch CSV import for users and products. Rows are processed one by one;
//! invalid rows are counted and skipped, and a batch is never rolled back.

use std::fmt;
use std::thread;
use std::time::Duration;

use crate::csv::parse_line;
use crate::service::{DataService, NewProduct, ServiceError};
use crate::state::AppState;
use crate::types::Role;

#[derive(Debug)]
pub enum ImportError {
    EmptyFile,
    InvalidHeader(String),
    Service(ServiceError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::EmptyFile => write!(f, "Bestand is leeg"),
            ImportError::InvalidHeader(message) => write!(f, "{}", message),
            ImportError::Service(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<ServiceError> for ImportError {
    fn from(value: ServiceError) -> Self {
        ImportError::Service(value)
    }
}

pub struct ImportOptions {
    /// Pause between rows so a batch does not overwhelm the backend.
    pub row_delay: Duration,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            row_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub success: usize,
    pub errors: usize,
}

impl ImportReport {
    /// Aggregate message shown after a user import.
    pub fn summary(&self) -> String {
        if self.success > 0 {
            let mut message = format!("{} gebruikers succesvol geïmporteerd!", self.success);
            if self.errors > 0 {
                message.push_str(&format!(" ({} fouten)", self.errors));
            }
            message
        } else {
            format!(
                "Geen gebruikers geïmporteerd. {} fouten gevonden.",
                self.errors
            )
        }
    }
}

/// Imports users from CSV text: `Naam, Email, Wachtwoord, Niveau, Badge
/// Code`. Each valid row creates a login account and optionally a badge.
///
/// Duplicate names are checked against the user list as it was when the
/// batch started; a file containing the same row twice therefore passes
/// validation twice, and the second insert fails at the backend and is
/// counted as an error.
pub fn import_users<S: DataService>(
    service: &S,
    text: &str,
    state: &mut AppState,
    options: &ImportOptions,
) -> Result<ImportReport, ImportError> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.is_empty() {
        return Err(ImportError::EmptyFile);
    }

    let header = parse_line(lines[0]);
    if header.len() < 3 {
        return Err(ImportError::InvalidHeader(
            "Ongeldig bestandsformaat. Verwacht: Naam, Email, Wachtwoord, Niveau, Badge Code"
                .to_string(),
        ));
    }

    let snapshot = state.users.clone();
    let mut report = ImportReport::default();

    for line in &lines[1..] {
        let data = parse_line(line);
        if data.len() < 3 {
            continue;
        }

        let name = data[0].as_str();
        let email = data[1].as_str();
        let password = data[2].as_str();
        let level = data
            .get(3)
            .filter(|v| !v.is_empty())
            .map_or("user", |v| v.as_str());
        let badge_code = data.get(4).map_or("", |v| v.as_str());

        if name.is_empty() || email.is_empty() || password.is_empty() {
            log::warn!("rij overgeslagen, verplicht veld ontbreekt: {:?}", data);
            report.errors += 1;
            continue;
        }
        if password.chars().count() < 6 {
            log::warn!("rij overgeslagen, wachtwoord te kort: {}", name);
            report.errors += 1;
            continue;
        }
        if snapshot.iter().any(|user| user.name == name) {
            log::warn!("rij overgeslagen, gebruiker bestaat al: {}", name);
            report.errors += 1;
            continue;
        }

        log::info!("gebruiker aanmaken: {}", name);
        if let Err(e) = service.create_account(email, password, name, Role::parse(level)) {
            log::error!("aanmaken van {} mislukt: {}", name, e);
            report.errors += 1;
            continue;
        }

        if !badge_code.is_empty() {
            if let Err(e) = service.save_badge(badge_code, email, name) {
                log::warn!("gebruiker aangemaakt maar badge mislukt voor {}: {}", name, e);
            }
        }

        report.success += 1;
        thread::sleep(options.row_delay);
    }

    state.refresh_users_with_badges(service)?;
    Ok(report)
}

/// Imports products from CSV text: column A product name, column B category.
/// Deliberately a plain comma split, not the quote-aware parser. Unknown
/// categories are created on the fly; existing products are skipped.
pub fn import_products<S: DataService>(
    service: &S,
    text: &str,
    state: &mut AppState,
) -> Result<usize, ImportError> {
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().unwrap_or("").split(',').collect();
    if header.is_empty() {
        return Err(ImportError::InvalidHeader(
            "Ongeldig CSV formaat: kolom A: Productnaam, kolom B: Categorie".to_string(),
        ));
    }

    let snapshot = state.products.clone();
    let mut imported = 0;

    for line in lines {
        let data: Vec<&str> = line.split(',').collect();
        let product_name = data.first().map_or("", |v| v.trim());
        let category_name = data.get(1).map_or("", |v| v.trim());

        if product_name.is_empty() {
            continue;
        }

        let mut category_id = None;
        if !category_name.is_empty() {
            if let Some(existing) = state.categories.iter().find(|c| c.name == category_name) {
                category_id = Some(existing.id);
            } else {
                match service.save_category(category_name) {
                    Ok(category) => {
                        category_id = Some(category.id);
                        state.replace_categories(service.fetch_categories()?);
                    }
                    Err(e) => {
                        log::warn!("categorie {} aanmaken mislukt: {}", category_name, e);
                    }
                }
            }
        }

        if snapshot.iter().any(|p| p.name == product_name) {
            continue;
        }

        match service.save_product(&NewProduct {
            name: product_name.to_string(),
            qrcode: None,
            category_id,
        }) {
            Ok(_) => imported += 1,
            Err(e) => log::error!("product {} opslaan mislukt: {}", product_name, e),
        }
    }

    state.replace_products(service.fetch_products()?);
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteBackend;

    fn no_delay() -> ImportOptions {
        ImportOptions {
            row_delay: Duration::ZERO,
        }
    }

    const HEADER: &str = "Naam,Email,Wachtwoord,Niveau,Badge Code\n";

    #[test]
    fn empty_file_is_rejected() {
        let db = SqliteBackend::in_memory().unwrap();
        let mut state = AppState::new();
        let err = import_users(&db, "\n  \n", &mut state, &no_delay()).unwrap_err();
        assert!(matches!(err, ImportError::EmptyFile));
    }

    #[test]
    fn short_header_is_rejected() {
        let db = SqliteBackend::in_memory().unwrap();
        let mut state = AppState::new();
        let err = import_users(&db, "Naam,Email\n", &mut state, &no_delay()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidHeader(_)));
    }

    #[test]
    fn valid_rows_create_accounts_and_badges() {
        let db = SqliteBackend::in_memory().unwrap();
        let mut state = AppState::new();
        let text = format!(
            "{}Jan Janssen,jan.janssen@dematic.com,wachtwoord123,user,BADGE001\n\
             Marie Peeters,marie.peeters@dematic.com,veiligwachtwoord,admin,\n",
            HEADER
        );

        let report = import_users(&db, &text, &mut state, &no_delay()).unwrap();
        assert_eq!(report, ImportReport { success: 2, errors: 0 });

        let jan = state.users.iter().find(|u| u.name == "Jan Janssen").unwrap();
        assert_eq!(jan.badge_code, "BADGE001");
        let marie = state.users.iter().find(|u| u.name == "Marie Peeters").unwrap();
        assert_eq!(marie.role, Role::Admin);
        assert!(db.sign_in("jan.janssen@dematic.com", "wachtwoord123").is_ok());
    }

    #[test]
    fn short_password_counts_as_error() {
        let db = SqliteBackend::in_memory().unwrap();
        let mut state = AppState::new();
        let text = format!("{}Jan Janssen,jan@dematic.com,abc,user,\n", HEADER);

        let report = import_users(&db, &text, &mut state, &no_delay()).unwrap();
        assert_eq!(report, ImportReport { success: 0, errors: 1 });
        assert_eq!(report.summary(), "Geen gebruikers geïmporteerd. 1 fouten gevonden.");
    }

    #[test]
    fn duplicate_row_in_same_file_fails_at_backend() {
        let db = SqliteBackend::in_memory().unwrap();
        let mut state = AppState::new();
        // Both rows pass the snapshot check; the second insert hits the
        // unique account constraint.
        let row = "Jan Janssen,jan.janssen@dematic.com,wachtwoord123,user,\n";
        let text = format!("{}{}{}", HEADER, row, row);

        let report = import_users(&db, &text, &mut state, &no_delay()).unwrap();
        assert_eq!(report, ImportReport { success: 1, errors: 1 });
        assert_eq!(report.summary(), "1 gebruikers succesvol geïmporteerd! (1 fouten)");
    }

    #[test]
    fn existing_user_is_skipped() {
        let db = SqliteBackend::in_memory().unwrap();
        db.save_user("Jan Janssen", Role::User).unwrap();
        let mut state = AppState::new();
        state.refresh_users_with_badges(&db).unwrap();

        let text = format!("{}Jan Janssen,jan.janssen@dematic.com,wachtwoord123,user,\n", HEADER);
        let report = import_users(&db, &text, &mut state, &no_delay()).unwrap();
        assert_eq!(report, ImportReport { success: 0, errors: 1 });
    }

    #[test]
    fn level_defaults_to_user() {
        let db = SqliteBackend::in_memory().unwrap();
        let mut state = AppState::new();
        let text = format!("{}Jan Janssen,jan.janssen@dematic.com,wachtwoord123\n", HEADER);

        import_users(&db, &text, &mut state, &no_delay()).unwrap();
        assert_eq!(state.users[0].role, Role::User);
    }

    #[test]
    fn product_import_creates_categories_on_the_fly() {
        let db = SqliteBackend::in_memory().unwrap();
        let mut state = AppState::new();
        let text = "Productnaam,Categorie\n\
                    Interflon Fin Super,Smeermiddelen\n\
                    Interflon Foam Cleaner spray 500ml,Reinigers\n\
                    Interflon Metal Clean spray 500ml,Smeermiddelen\n";

        let imported = import_products(&db, text, &mut state).unwrap();
        assert_eq!(imported, 3);
        assert_eq!(state.products.len(), 3);
        // Two distinct categories, reused for the third product.
        assert_eq!(state.categories.len(), 2);
        let smeer = state.categories.iter().find(|c| c.name == "Smeermiddelen").unwrap();
        let metal = state
            .products
            .iter()
            .find(|p| p.name == "Interflon Metal Clean spray 500ml")
            .unwrap();
        assert_eq!(metal.category_id, Some(smeer.id));
    }

    #[test]
    fn product_import_skips_blank_and_existing_names() {
        let db = SqliteBackend::in_memory().unwrap();
        db.save_product(&NewProduct {
            name: "Interflon Fin Super".to_string(),
            ..NewProduct::default()
        })
        .unwrap();
        let mut state = AppState::new();
        state.replace_products(db.fetch_products().unwrap());

        let text = "Productnaam,Categorie\n\
                    ,Smeermiddelen\n\
                    Interflon Fin Super,\n\
                    Interflon Maintenance Kit,\n";
        let imported = import_products(&db, text, &mut state).unwrap();
        assert_eq!(imported, 1);
        assert_eq!(state.products.len(), 2);
    }
}
