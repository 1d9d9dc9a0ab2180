//! In-memory mirror of the remote collections. Each collection is replaced
//! wholesale after a mutation or a push notification; there is no
//! incremental merge and no conflict detection.

use crate::service::{DataService, ServiceResult};
use crate::types::{Category, Product, Registration, User};

/// Collections a push notification can name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collection {
    Users,
    Products,
    Categories,
    Locations,
    Purposes,
    Registrations,
}

#[derive(Default)]
pub struct AppState {
    pub users: Vec<User>,
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub locations: Vec<String>,
    pub purposes: Vec<String>,
    pub registrations: Vec<Registration>,
}

impl AppState {
    pub fn new() -> AppState {
        AppState::default()
    }

    pub fn replace_users(&mut self, users: Vec<User>) {
        self.users = users;
    }

    pub fn replace_products(&mut self, products: Vec<Product>) {
        self.products = products;
    }

    pub fn replace_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
    }

    pub fn replace_locations(&mut self, locations: Vec<String>) {
        self.locations = locations;
    }

    pub fn replace_purposes(&mut self, purposes: Vec<String>) {
        self.purposes = purposes;
    }

    pub fn replace_registrations(&mut self, registrations: Vec<Registration>) {
        self.registrations = registrations;
    }

    /// Fetches the user list and folds the badge table into it; users
    /// without a badge get an empty code.
    pub fn refresh_users_with_badges<S: DataService>(&mut self, service: &S) -> ServiceResult<()> {
        let mut users = service.fetch_users()?;
        let badges = service.fetch_badges()?;
        for user in &mut users {
            user.badge_code = badges
                .iter()
                .find(|b| b.user_name == user.name)
                .map(|b| b.badge_id.clone())
                .unwrap_or_default();
        }
        log::debug!("{} gebruikers geladen", users.len());
        self.replace_users(users);
        Ok(())
    }

    /// Initial load of every collection.
    pub fn refresh_all<S: DataService>(&mut self, service: &S) -> ServiceResult<()> {
        self.refresh_users_with_badges(service)?;
        self.replace_products(service.fetch_products()?);
        self.replace_categories(service.fetch_categories()?);
        self.replace_locations(service.fetch_locations()?);
        self.replace_purposes(service.fetch_purposes()?);
        self.replace_registrations(service.fetch_registrations()?);
        Ok(())
    }

    /// Push-update handling: refetch the named collection and replace it.
    pub fn handle_change<S: DataService>(
        &mut self,
        service: &S,
        collection: Collection,
    ) -> ServiceResult<()> {
        log::debug!("wijziging ontvangen voor {:?}", collection);
        match collection {
            Collection::Users => self.refresh_users_with_badges(service)?,
            Collection::Products => self.replace_products(service.fetch_products()?),
            Collection::Categories => self.replace_categories(service.fetch_categories()?),
            Collection::Locations => self.replace_locations(service.fetch_locations()?),
            Collection::Purposes => self.replace_purposes(service.fetch_purposes()?),
            Collection::Registrations => {
                self.replace_registrations(service.fetch_registrations()?)
            }
        }
        Ok(())
    }
}
