//! Spreadsheet-compatible CSV handling for the import/export flows.
//!
//! The codec is deliberately minimal: one line per record, RFC 4180-style
//! quoting for the subset the app produces. Quoted fields never span lines.

use crate::types::{Category, Product, User};
use crate::utils::company_email;

pub const USERS_EXPORT_FILE: &str = "gebruikers_export.csv";
pub const USERS_TEMPLATE_FILE: &str = "gebruikers_template.csv";
pub const PRODUCTS_EXPORT_FILE: &str = "producten.csv";
pub const QR_CODES_EXPORT_FILE: &str = "qr_codes.csv";

/// Quotes a value when it contains a comma, a double quote or a newline,
/// doubling any embedded quotes. Everything else passes through unchanged.
pub fn escape_value(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Splits one CSV line into trimmed fields, honoring double-quoted fields
/// and `""` escapes inside them.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if ch == ',' && !in_quotes {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }

    fields.push(current.trim().to_string());
    fields
}

/// `Naam,Email,Wachtwoord,Niveau,Badge Code` plus one row per user. The
/// e-mail is synthesized from the name; the password column stays empty so
/// an export can never leak credentials.
pub fn users_export(users: &[User]) -> String {
    let header = ["Naam", "Email", "Wachtwoord", "Niveau", "Badge Code"];
    let mut rows = vec![
        header
            .iter()
            .map(|h| escape_value(h))
            .collect::<Vec<_>>()
            .join(","),
    ];
    for user in users {
        let row = [
            escape_value(&user.name),
            escape_value(&company_email(&user.name)),
            escape_value(""),
            escape_value(user.role.as_str()),
            escape_value(&user.badge_code),
        ];
        rows.push(row.join(","));
    }
    rows.join("\n")
}

/// Import template: the user header plus two example rows.
pub fn users_template() -> String {
    let rows = [
        vec!["Naam", "Email", "Wachtwoord", "Niveau", "Badge Code"],
        vec![
            "Jan Janssen",
            "jan.janssen@dematic.com",
            "wachtwoord123",
            "user",
            "BADGE001",
        ],
        vec![
            "Marie Peeters",
            "marie.peeters@dematic.com",
            "veiligwachtwoord",
            "admin",
            "BADGE002",
        ],
    ];
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|value| escape_value(value))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `Productnaam,Categorie` per product. Plain comma join, mirroring the
/// equally plain product importer; the category name is resolved against the
/// in-memory category list and left empty when absent.
pub fn products_export(products: &[Product], categories: &[Category]) -> String {
    let mut rows = vec!["Productnaam,Categorie".to_string()];
    for product in products {
        let category_name = product
            .category_id
            .and_then(|id| categories.iter().find(|c| c.id == id))
            .map(|c| c.name.as_str())
            .unwrap_or("");
        rows.push(format!("{},{}", product.name, category_name));
    }
    rows.join("\n")
}

/// `Productnaam,QR Code` for the label printer; products without a code are
/// skipped.
pub fn qr_codes_export(products: &[Product]) -> String {
    let mut rows = vec!["Productnaam,QR Code".to_string()];
    for product in products {
        if let Some(code) = &product.qrcode {
            rows.push(format!("{},{}", product.name, code));
        }
    }
    rows.join("\n")
}
