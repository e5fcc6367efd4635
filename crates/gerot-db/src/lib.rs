pub mod activity;
pub mod agent;
pub mod bookings;
pub mod environments;
pub mod error;
pub mod goals;
pub mod models;
pub mod notifications;
pub mod password;
pub mod repository;
pub mod routines;
pub mod sectors;
pub mod stats;
pub mod templates;
pub mod users;

// Re-exports
pub use error::{Error, Result};
pub use models::*;
pub use repository::Database;
