pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod runner;

pub use client::GerotClient;
pub use config::AgentConfig;
pub use error::{Error, Result};
pub use executor::{execute_job, JsonRow, MySqlRunner, QueryRunner};
pub use runner::{Agent, CycleStats};
