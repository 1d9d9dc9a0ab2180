//! SQLite reference implementation of [`DataService`]. Schema and access
//! style follow the rest of the small-tools family: one connection, prepared
//! statements, no ORM.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::Connection;

use crate::service::{DataService, NewProduct, ProductUpdate, ServiceError, ServiceResult};
use crate::types::{
    AuthUser, Badge, Category, NewRegistration, Product, Registration, Role, User,
};

pub struct SqliteBackend {
    conn: Connection,
    attachments_dir: PathBuf,
}

impl SqliteBackend {
    pub fn open(db_path: &Path, attachments_dir: &Path) -> ServiceResult<SqliteBackend> {
        let conn = Connection::open(db_path)?;
        let backend = SqliteBackend {
            conn,
            attachments_dir: attachments_dir.to_path_buf(),
        };
        backend.init_schema()?;
        Ok(backend)
    }

    pub fn in_memory() -> ServiceResult<SqliteBackend> {
        let conn = Connection::open_in_memory()?;
        let backend = SqliteBackend {
            conn,
            attachments_dir: std::env::temp_dir().join("registratie-attachments"),
        };
        backend.init_schema()?;
        Ok(backend)
    }

    fn init_schema(&self) -> ServiceResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                name TEXT PRIMARY KEY,
                role TEXT NOT NULL DEFAULT 'user'
            );
            CREATE TABLE IF NOT EXISTS accounts (
                email TEXT PRIMARY KEY,
                password TEXT NOT NULL,
                name TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user'
            );
            CREATE TABLE IF NOT EXISTS user_badges (
                badge_id TEXT PRIMARY KEY,
                user_email TEXT NOT NULL,
                user_name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                qr_code TEXT,
                category_id INTEGER,
                attachment_url TEXT,
                attachment_name TEXT,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS locations (
                name TEXT PRIMARY KEY
            );
            CREATE TABLE IF NOT EXISTS purposes (
                name TEXT PRIMARY KEY
            );
            CREATE TABLE IF NOT EXISTS registrations (
                id INTEGER PRIMARY KEY,
                user_name TEXT NOT NULL,
                product_name TEXT NOT NULL,
                location TEXT NOT NULL,
                purpose TEXT NOT NULL,
                qr_code TEXT,
                timestamp TEXT NOT NULL,
                date TEXT NOT NULL,
                time TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn product_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
        Ok(Product {
            id: row.get(0)?,
            name: row.get(1)?,
            qrcode: row.get(2)?,
            category_id: row.get(3)?,
            attachment_url: row.get(4)?,
            attachment_name: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl DataService for SqliteBackend {
    fn fetch_users(&self) -> ServiceResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, role FROM users ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(User {
                name: row.get(0)?,
                role: Role::parse(&row.get::<_, String>(1)?),
                badge_code: String::new(),
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_user(&self, name: &str, role: Role) -> ServiceResult<()> {
        self.conn.execute(
            "INSERT INTO users (name, role) VALUES (?, ?)",
            rusqlite::params![name, role.as_str()],
        )?;
        Ok(())
    }

    fn update_user(&self, old_name: &str, new_name: &str, role: Role) -> ServiceResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET name = ?, role = ? WHERE name = ?",
            rusqlite::params![new_name, role.as_str(), old_name],
        )?;
        if changed == 0 {
            return Err(ServiceError::NotFound(format!("user {}", old_name)));
        }
        Ok(())
    }

    fn delete_user(&self, name: &str) -> ServiceResult<()> {
        self.conn
            .execute("DELETE FROM users WHERE name = ?", rusqlite::params![name])?;
        Ok(())
    }

    fn fetch_products(&self) -> ServiceResult<Vec<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, qr_code, category_id, attachment_url, attachment_name, created_at
             FROM products ORDER BY id DESC",
        )?;
        let rows = stmt.query_map([], Self::product_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_product(&self, product: &NewProduct) -> ServiceResult<Product> {
        let created_at = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO products (name, qr_code, category_id, created_at) VALUES (?, ?, ?, ?)",
            rusqlite::params![
                product.name,
                product.qrcode,
                product.category_id,
                created_at
            ],
        )?;
        Ok(Product {
            id: self.conn.last_insert_rowid(),
            name: product.name.clone(),
            qrcode: product.qrcode.clone(),
            category_id: product.category_id,
            attachment_url: None,
            attachment_name: None,
            created_at,
        })
    }

    fn update_product(&self, id: i64, update: &ProductUpdate) -> ServiceResult<()> {
        let changed = self.conn.execute(
            "UPDATE products SET name = ?, qr_code = ?, category_id = ?,
             attachment_url = ?, attachment_name = ? WHERE id = ?",
            rusqlite::params![
                update.name,
                update.qrcode,
                update.category_id,
                update.attachment_url,
                update.attachment_name,
                id
            ],
        )?;
        if changed == 0 {
            return Err(ServiceError::NotFound(format!("product {}", id)));
        }
        Ok(())
    }

    fn delete_product(&self, id: i64) -> ServiceResult<()> {
        self.conn
            .execute("DELETE FROM products WHERE id = ?", rusqlite::params![id])?;
        Ok(())
    }

    fn fetch_categories(&self) -> ServiceResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_category(&self, name: &str) -> ServiceResult<Category> {
        self.conn.execute(
            "INSERT INTO categories (name) VALUES (?)",
            rusqlite::params![name],
        )?;
        Ok(Category {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn update_category(&self, id: i64, name: &str) -> ServiceResult<()> {
        let changed = self.conn.execute(
            "UPDATE categories SET name = ? WHERE id = ?",
            rusqlite::params![name, id],
        )?;
        if changed == 0 {
            return Err(ServiceError::NotFound(format!("category {}", id)));
        }
        Ok(())
    }

    fn delete_category(&self, id: i64) -> ServiceResult<()> {
        self.conn
            .execute("DELETE FROM categories WHERE id = ?", rusqlite::params![id])?;
        Ok(())
    }

    fn fetch_locations(&self) -> ServiceResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM locations ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_location(&self, name: &str) -> ServiceResult<()> {
        self.conn.execute(
            "INSERT INTO locations (name) VALUES (?)",
            rusqlite::params![name],
        )?;
        Ok(())
    }

    fn update_location(&self, old_name: &str, new_name: &str) -> ServiceResult<()> {
        let changed = self.conn.execute(
            "UPDATE locations SET name = ? WHERE name = ?",
            rusqlite::params![new_name, old_name],
        )?;
        if changed == 0 {
            return Err(ServiceError::NotFound(format!("location {}", old_name)));
        }
        Ok(())
    }

    fn delete_location(&self, name: &str) -> ServiceResult<()> {
        self.conn.execute(
            "DELETE FROM locations WHERE name = ?",
            rusqlite::params![name],
        )?;
        Ok(())
    }

    fn fetch_purposes(&self) -> ServiceResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM purposes ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_purpose(&self, name: &str) -> ServiceResult<()> {
        self.conn.execute(
            "INSERT INTO purposes (name) VALUES (?)",
            rusqlite::params![name],
        )?;
        Ok(())
    }

    fn update_purpose(&self, old_name: &str, new_name: &str) -> ServiceResult<()> {
        let changed = self.conn.execute(
            "UPDATE purposes SET name = ? WHERE name = ?",
            rusqlite::params![new_name, old_name],
        )?;
        if changed == 0 {
            return Err(ServiceError::NotFound(format!("purpose {}", old_name)));
        }
        Ok(())
    }

    fn delete_purpose(&self, name: &str) -> ServiceResult<()> {
        self.conn.execute(
            "DELETE FROM purposes WHERE name = ?",
            rusqlite::params![name],
        )?;
        Ok(())
    }

    fn fetch_registrations(&self) -> ServiceResult<Vec<Registration>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_name, product_name, location, purpose, qr_code, timestamp, date, time
             FROM registrations ORDER BY timestamp DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Registration {
                id: row.get(0)?,
                user: row.get(1)?,
                product: row.get(2)?,
                location: row.get(3)?,
                purpose: row.get(4)?,
                qrcode: row.get(5)?,
                timestamp: row.get(6)?,
                date: row.get(7)?,
                time: row.get(8)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_registration(&self, registration: &NewRegistration) -> ServiceResult<()> {
        self.conn.execute(
            "INSERT INTO registrations
             (user_name, product_name, location, purpose, qr_code, timestamp, date, time)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                registration.user,
                registration.product,
                registration.location,
                registration.purpose,
                registration.qrcode,
                registration.timestamp,
                registration.date,
                registration.time
            ],
        )?;
        Ok(())
    }

    fn fetch_badges(&self) -> ServiceResult<Vec<Badge>> {
        let mut stmt = self
            .conn
            .prepare("SELECT badge_id, user_email, user_name FROM user_badges")?;
        let rows = stmt.query_map([], |row| {
            Ok(Badge {
                badge_id: row.get(0)?,
                user_email: row.get(1)?,
                user_name: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_badge(&self, badge_id: &str, user_email: &str, user_name: &str) -> ServiceResult<()> {
        self.conn.execute(
            "DELETE FROM user_badges WHERE user_name = ?",
            rusqlite::params![user_name],
        )?;
        self.conn.execute(
            "INSERT INTO user_badges (badge_id, user_email, user_name) VALUES (?, ?, ?)",
            rusqlite::params![badge_id, user_email, user_name],
        )?;
        Ok(())
    }

    fn delete_badge_for(&self, user_name: &str) -> ServiceResult<()> {
        self.conn.execute(
            "DELETE FROM user_badges WHERE user_name = ?",
            rusqlite::params![user_name],
        )?;
        Ok(())
    }

    fn find_badge(&self, badge_id: &str) -> ServiceResult<Option<Badge>> {
        let mut stmt = self.conn.prepare(
            "SELECT badge_id, user_email, user_name FROM user_badges WHERE badge_id = ?",
        )?;
        let mut rows = stmt.query(rusqlite::params![badge_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Badge {
                badge_id: row.get(0)?,
                user_email: row.get(1)?,
                user_name: row.get(2)?,
            }))
        } else {
            Ok(None)
        }
    }

    fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> ServiceResult<()> {
        self.conn.execute(
            "INSERT INTO accounts (email, password, name, role) VALUES (?, ?, ?, ?)",
            rusqlite::params![email, password, name, role.as_str()],
        )?;
        // The app user record is best effort; the account is what matters.
        if let Err(e) = self.save_user(name, role) {
            log::warn!("account aangemaakt maar gebruikersrij mislukt voor {}: {}", name, e);
        }
        Ok(())
    }

    fn sign_in(&self, email: &str, password: &str) -> ServiceResult<AuthUser> {
        let mut stmt = self
            .conn
            .prepare("SELECT password, name, role FROM accounts WHERE email = ?")?;
        let mut rows = stmt.query(rusqlite::params![email])?;
        let Some(row) = rows.next()? else {
            return Err(ServiceError::Auth("unknown account".to_string()));
        };
        let stored: String = row.get(0)?;
        if stored != password {
            return Err(ServiceError::Auth("wrong password".to_string()));
        }
        Ok(AuthUser {
            email: email.to_string(),
            name: row.get(1)?,
            role: Role::parse(&row.get::<_, String>(2)?),
        })
    }

    fn store_attachment(
        &self,
        product_id: i64,
        file_name: &str,
        contents: &[u8],
    ) -> ServiceResult<String> {
        fs::create_dir_all(&self.attachments_dir)?;
        let path = self
            .attachments_dir
            .join(format!("{}_{}", product_id, file_name));
        fs::write(&path, contents)?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn delete_attachment(&self, url: &str) -> ServiceResult<()> {
        fs::remove_file(url)?;
        Ok(())
    }
}
