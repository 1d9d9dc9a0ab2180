//! Registration history browsing: free-text search, per-field filters,
//! sorting and the small usage statistics shown on the dashboard.

use chrono::{DateTime, NaiveDate};

use crate::types::Registration;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    Date,
    User,
    Product,
    Location,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

#[derive(Clone, Debug, Default)]
pub struct HistoryFilter {
    /// Matches user, product, location, purpose and qr code,
    /// case-insensitively.
    pub search: String,
    /// `None` means all users.
    pub user: Option<String>,
    pub location: Option<String>,
    /// Inclusive, compared on the UTC date of the timestamp.
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub sort_by: SortBy,
    pub order: SortOrder,
}

fn utc_date(registration: &Registration) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(&registration.timestamp)
        .map(|dt| dt.naive_utc().date())
        .ok()
}

fn instant_millis(registration: &Registration) -> i64 {
    DateTime::parse_from_rfc3339(&registration.timestamp)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

fn matches(registration: &Registration, filter: &HistoryFilter) -> bool {
    if !filter.search.is_empty() {
        let needle = filter.search.to_lowercase();
        let found = registration.user.to_lowercase().contains(&needle)
            || registration.product.to_lowercase().contains(&needle)
            || registration.location.to_lowercase().contains(&needle)
            || registration.purpose.to_lowercase().contains(&needle)
            || registration
                .qrcode
                .as_deref()
                .is_some_and(|code| code.to_lowercase().contains(&needle));
        if !found {
            return false;
        }
    }

    if let Some(user) = &filter.user
        && registration.user != *user
    {
        return false;
    }
    if let Some(location) = &filter.location
        && registration.location != *location
    {
        return false;
    }

    if filter.date_from.is_some() || filter.date_to.is_some() {
        let Some(date) = utc_date(registration) else {
            return false;
        };
        if let Some(from) = filter.date_from
            && date < from
        {
            return false;
        }
        if let Some(to) = filter.date_to
            && date > to
        {
            return false;
        }
    }

    true
}

/// Applies the filter and sort settings to the registration list.
pub fn filter_and_sort(registrations: &[Registration], filter: &HistoryFilter) -> Vec<Registration> {
    let mut result: Vec<Registration> = registrations
        .iter()
        .filter(|r| matches(r, filter))
        .cloned()
        .collect();

    result.sort_by(|a, b| {
        let ordering = match filter.sort_by {
            SortBy::Date => instant_millis(a).cmp(&instant_millis(b)),
            SortBy::User => a.user.to_lowercase().cmp(&b.user.to_lowercase()),
            SortBy::Product => a.product.to_lowercase().cmp(&b.product.to_lowercase()),
            SortBy::Location => a.location.to_lowercase().cmp(&b.location.to_lowercase()),
        };
        match filter.order {
            SortOrder::Newest => ordering.reverse(),
            SortOrder::Oldest => ordering,
        }
    });

    result
}

fn top_counts<F>(registrations: &[Registration], key: F) -> Vec<(String, usize)>
where
    F: Fn(&Registration) -> &str,
{
    // First-seen order, so ties keep their insertion order after the stable
    // sort below.
    let mut counts: Vec<(String, usize)> = Vec::new();
    for registration in registrations {
        let name = key(registration);
        if let Some(entry) = counts.iter_mut().find(|(n, _)| n == name) {
            entry.1 += 1;
        } else {
            counts.push((name.to_string(), 1));
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(5);
    counts
}

/// Top five users by registration count.
pub fn top_users(registrations: &[Registration]) -> Vec<(String, usize)> {
    top_counts(registrations, |r| &r.user)
}

/// Top five products by registration count.
pub fn top_products(registrations: &[Registration]) -> Vec<(String, usize)> {
    top_counts(registrations, |r| &r.product)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(
        id: i64,
        user: &str,
        product: &str,
        location: &str,
        timestamp: &str,
    ) -> Registration {
        Registration {
            id,
            user: user.to_string(),
            product: product.to_string(),
            location: location.to_string(),
            purpose: "Reparatie".to_string(),
            qrcode: Some("IFLS001".to_string()),
            timestamp: timestamp.to_string(),
            date: timestamp.split('T').next().unwrap_or("").to_string(),
            time: String::new(),
        }
    }

    fn sample() -> Vec<Registration> {
        vec![
            registration(
                1,
                "Tom Peckstadt",
                "Interflon Metal Clean spray 500ml",
                "Warehouse Interflon",
                "2025-06-15T05:41:00Z",
            ),
            registration(
                2,
                "Nele Herteleer",
                "Interflon Metal Clean spray 500ml",
                "Warehouse Dematic klein beneden",
                "2025-06-15T05:48:00Z",
            ),
            registration(
                3,
                "Tom Peckstadt",
                "Interflon Fin Super",
                "Kantoor 1.1",
                "2025-06-16T09:00:00Z",
            ),
        ]
    }

    #[test]
    fn search_is_case_insensitive_and_covers_qrcode() {
        let filter = HistoryFilter {
            search: "ifls".to_string(),
            ..HistoryFilter::default()
        };
        assert_eq!(filter_and_sort(&sample(), &filter).len(), 3);

        let filter = HistoryFilter {
            search: "kantoor".to_string(),
            ..HistoryFilter::default()
        };
        let result = filter_and_sort(&sample(), &filter);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, 3);
    }

    #[test]
    fn user_filter_matches_exactly() {
        let filter = HistoryFilter {
            user: Some("Tom Peckstadt".to_string()),
            ..HistoryFilter::default()
        };
        let result = filter_and_sort(&sample(), &filter);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn date_range_is_inclusive() {
        let filter = HistoryFilter {
            date_from: Some(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()),
            date_to: Some(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()),
            ..HistoryFilter::default()
        };
        let result = filter_and_sort(&sample(), &filter);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn newest_first_is_the_default() {
        let result = filter_and_sort(&sample(), &HistoryFilter::default());
        let ids: Vec<_> = result.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn sort_by_user_oldest_is_ascending() {
        let filter = HistoryFilter {
            sort_by: SortBy::User,
            order: SortOrder::Oldest,
            ..HistoryFilter::default()
        };
        let result = filter_and_sort(&sample(), &filter);
        assert_eq!(result[0].user, "Nele Herteleer");
    }

    #[test]
    fn top_products_counts_and_caps() {
        let top = top_products(&sample());
        assert_eq!(top[0], ("Interflon Metal Clean spray 500ml".to_string(), 2));
        assert_eq!(top[1], ("Interflon Fin Super".to_string(), 1));

        let mut many = Vec::new();
        for i in 0..7 {
            many.push(registration(
                i,
                "Tom Peckstadt",
                &format!("Product {}", i),
                "Kantoor 1.1",
                "2025-06-15T05:41:00Z",
            ));
        }
        assert_eq!(top_products(&many).len(), 5);
    }
}
