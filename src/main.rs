use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use registratie::actions::{self, RegistrationForm};
use registratie::auth;
use registratie::csv;
use registratie::db::SqliteBackend;
use registratie::history::{self, HistoryFilter, SortBy, SortOrder};
use registratie::import::{self, ImportOptions};
use registratie::labels;
use registratie::qrcode::{self, ScannerProfile};
use registratie::state::AppState;

#[derive(Parser)]
#[command(name = "registratie", about = "Productregistratie voor de demo-ruimte")]
struct Cli {
    /// Database file.
    #[arg(long, default_value = "registratie.db")]
    db: PathBuf,

    /// Directory for product attachments.
    #[arg(long, default_value = "attachments")]
    attachments: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Users,
    Products,
    QrCodes,
    /// Empty user-import template with example rows.
    Template,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortField {
    Date,
    User,
    Product,
    Location,
}

impl From<SortField> for SortBy {
    fn from(value: SortField) -> Self {
        match value {
            SortField::Date => SortBy::Date,
            SortField::User => SortBy::User,
            SortField::Product => SortBy::Product,
            SortField::Location => SortBy::Location,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    Newest,
    Oldest,
}

#[derive(Subcommand)]
enum Command {
    /// Register a product usage.
    Register {
        #[arg(long)]
        user: String,
        /// Product name; may be omitted when --scan resolves one.
        #[arg(long, default_value = "")]
        product: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        purpose: String,
        /// Raw scanner input, cleaned and resolved before submitting.
        #[arg(long)]
        scan: Option<String>,
    },

    /// Clean a raw scan and look up the product.
    Scan { code: String },

    /// Generate and store a QR code for a product without one.
    GenerateQr { product: String },

    /// Browse the registration history.
    History {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Inclusive, YYYY-MM-DD.
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, value_enum, default_value = "date")]
        sort: SortField,
        #[arg(long, value_enum, default_value = "newest")]
        order: Order,
        #[arg(long)]
        json: bool,
    },

    /// Top users and products by registration count.
    Stats,

    /// Import users from a CSV file (Naam, Email, Wachtwoord, Niveau, Badge Code).
    ImportUsers {
        file: PathBuf,
        /// Pause between rows, in milliseconds.
        #[arg(long, default_value_t = 500)]
        delay_ms: u64,
    },

    /// Import products from a CSV file (kolom A: Productnaam, kolom B: Categorie).
    ImportProducts { file: PathBuf },

    /// Write one of the CSV exports.
    Export {
        #[arg(value_enum)]
        kind: ExportKind,
        /// Output file; defaults to the standard name per export.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write a printable HTML sheet of QR labels.
    Labels {
        /// Limit the sheet to one product.
        #[arg(long)]
        product: Option<String>,
        #[arg(long, default_value = "qr_labels.html")]
        out: PathBuf,
    },

    /// Verify credentials or a badge against the stored accounts.
    Login {
        #[arg(long, conflicts_with = "badge")]
        email: Option<String>,
        #[arg(long, conflicts_with = "badge", requires = "email")]
        password: Option<String>,
        #[arg(long)]
        badge: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let db = SqliteBackend::open(&cli.db, &cli.attachments)?;
    let mut state = AppState::new();
    state.refresh_all(&db)?;

    match cli.command {
        Command::Register {
            user,
            product,
            location,
            purpose,
            scan,
        } => {
            let mut form = RegistrationForm {
                user,
                product,
                location,
                purpose,
                ..RegistrationForm::default()
            };
            if let Some(raw) = scan {
                println!("{}", actions::handle_scan(&state, &mut form, &raw, &ScannerProfile::default())?);
            }
            println!("{}", actions::submit_registration(&db, &mut state, &mut form)?);
        }

        Command::Scan { code } => {
            let cleaned = ScannerProfile::default().clean(&code);
            match qrcode::resolve(&code, &cleaned, &state.products) {
                Some(product) => println!("Product gevonden: {}", product.name),
                None => println!(
                    "Geen product gevonden voor QR code: {} (origineel: {})",
                    cleaned, code
                ),
            }
        }

        Command::GenerateQr { product } => {
            let Some(id) = state
                .products
                .iter()
                .find(|p| p.name == product)
                .map(|p| p.id)
            else {
                return Err(format!("onbekend product: {}", product).into());
            };
            println!("{}", actions::generate_qr(&db, &mut state, id)?);
        }

        Command::History {
            search,
            user,
            location,
            from,
            to,
            sort,
            order,
            json,
        } => {
            let filter = HistoryFilter {
                search,
                user,
                location,
                date_from: from,
                date_to: to,
                sort_by: sort.into(),
                order: match order {
                    Order::Newest => SortOrder::Newest,
                    Order::Oldest => SortOrder::Oldest,
                },
            };
            let rows = history::filter_and_sort(&state.registrations, &filter);
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for r in &rows {
                    println!(
                        "{} {}  {}  {}  {}  {}",
                        r.date, r.time, r.user, r.product, r.location, r.purpose
                    );
                }
                println!("{} registraties", rows.len());
            }
        }

        Command::Stats => {
            println!("Top gebruikers:");
            for (name, count) in history::top_users(&state.registrations) {
                println!("  {:>4}  {}", count, name);
            }
            println!("Top producten:");
            for (name, count) in history::top_products(&state.registrations) {
                println!("  {:>4}  {}", count, name);
            }
        }

        Command::ImportUsers { file, delay_ms } => {
            let text = fs::read_to_string(&file)?;
            let options = ImportOptions {
                row_delay: Duration::from_millis(delay_ms),
            };
            let report = import::import_users(&db, &text, &mut state, &options)?;
            println!("{}", report.summary());
        }

        Command::ImportProducts { file } => {
            let text = fs::read_to_string(&file)?;
            let imported = import::import_products(&db, &text, &mut state)?;
            println!("{} producten geïmporteerd!", imported);
        }

        Command::Export { kind, out } => {
            let (default_name, contents) = match kind {
                ExportKind::Users => (csv::USERS_EXPORT_FILE, csv::users_export(&state.users)),
                ExportKind::Template => (csv::USERS_TEMPLATE_FILE, csv::users_template()),
                ExportKind::Products => (
                    csv::PRODUCTS_EXPORT_FILE,
                    csv::products_export(&state.products, &state.categories),
                ),
                ExportKind::QrCodes => {
                    (csv::QR_CODES_EXPORT_FILE, csv::qr_codes_export(&state.products))
                }
            };
            let path = out.unwrap_or_else(|| PathBuf::from(default_name));
            fs::write(&path, contents)?;
            println!("Geschreven naar {}", path.display());
        }

        Command::Labels { product, out } => match product {
            Some(name) => {
                let Some(product) = state.products.iter().find(|p| p.name == name) else {
                    return Err(format!("onbekend product: {}", name).into());
                };
                labels::write_product_label(&out, product)?;
                println!("Label geschreven naar {}", out.display());
            }
            None => {
                let count = labels::write_label_sheet(&out, &state.products)?;
                println!("{} labels geschreven naar {}", count, out.display());
            }
        },

        Command::Login { email, password, badge } => {
            let user = if let Some(badge) = badge {
                auth::sign_in_with_badge(&db, &badge)?
            } else {
                let email = email.unwrap_or_default();
                let password = password.unwrap_or_default();
                auth::sign_in(&db, &email, &password)?
            };
            println!("Ingelogd als {} ({})", user.name, user.role.as_str());
        }
    }

    Ok(())
}
