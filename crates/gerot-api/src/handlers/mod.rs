pub mod activity;
pub mod agent;
pub mod auth;
pub mod bookings;
pub mod dashboard;
pub mod environments;
pub mod goals;
pub mod health;
pub mod items;
pub mod notifications;
pub mod reports;
pub mod routines;
pub mod sectors;
pub mod templates;
pub mod users;

use chrono::{Local, NaiveDate};

/// Calendar day on the server clock.
pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}
